//! Analysis runs.
//!
//! Each [`AnalysisKind`] loads the files it needs, aggregates them and
//! packages the outcome as a [`Report`].

use crate::analysis::{
    aggregate, composition, inner_join, linear_regression, normalize, parse_date, pearson,
    percent_change, strip_time_noise, Retained,
};
use crate::config::{CompositionConfig, Config};
use crate::error::{AnalysisError, Result};
use crate::ingest::{DistrictRow, Frame, HouseholdSchema, RawTable};
use crate::models::{
    AggregateTable, AnalysisKind, Findings, Grain, Reducer, Report, ReportMetadata, TimeKey,
    TimePattern, TrendRow,
};
use crate::report;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const HOUSEHOLD_LABEL: &str = "single_person_households";
const YOUNG_HOUSEHOLD_LABEL: &str = "households_aged_20_39";

/// Bookkeeping shared by every run.
#[derive(Debug, Default)]
struct RunLog {
    sources: Vec<String>,
    used: usize,
    dropped: usize,
    notes: Vec<String>,
}

impl RunLog {
    fn source(&mut self, source: String) {
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    fn record(&mut self, retained: &Retained) {
        self.used += retained.pairs.len();
        self.dropped += retained.dropped;
    }

    fn finish(self, kind: AnalysisKind, findings: Findings) -> Report {
        Report {
            metadata: ReportMetadata {
                analysis: kind,
                generated_at: Utc::now(),
                sources: self.sources,
                records_used: self.used,
                records_dropped: self.dropped,
            },
            findings,
            notes: self.notes,
        }
    }
}

/// Where a time/value column pair lives and how to read its time column.
struct ColumnSpec<'a> {
    time_column: &'a str,
    value_column: &'a str,
    pattern: TimePattern,
    clean_time: bool,
}

/// Pair each row's parsed time key with its parsed measurement.
fn observations(
    frame: &Frame,
    spec: &ColumnSpec<'_>,
    grain: Grain,
) -> Result<Vec<(Option<TimeKey>, Option<f64>)>> {
    let time_idx = frame.column(spec.time_column)?;
    let value_idx = frame.column(spec.value_column)?;

    Ok((0..frame.rows.len())
        .map(|row| {
            let raw_time = frame.cell(row, time_idx);
            let date = if spec.clean_time {
                parse_date(&strip_time_noise(raw_time), spec.pattern)
            } else {
                parse_date(raw_time, spec.pattern)
            };
            (date.map(|d| grain.key(d)), normalize(frame.cell(row, value_idx)))
        })
        .collect())
}

fn reduce_observations(
    observations: Vec<(Option<TimeKey>, Option<f64>)>,
    reducer: Reducer,
    label: &str,
    log: &mut RunLog,
) -> AggregateTable {
    let (table, retained) = aggregate(observations, reducer, label);
    log.record(&retained);
    table
}

fn aggregate_column(
    frame: &Frame,
    spec: &ColumnSpec<'_>,
    grain: Grain,
    reducer: Reducer,
    log: &mut RunLog,
) -> Result<AggregateTable> {
    let observations = observations(frame, spec, grain)?;
    Ok(reduce_observations(observations, reducer, spec.value_column, log))
}

fn waste_table(config: &Config, grain: Grain, reducer: Reducer, log: &mut RunLog) -> Result<AggregateTable> {
    let frame = Frame::load(&config.resolve(&config.waste.path))?;
    log.source(frame.source());

    let spec = ColumnSpec {
        time_column: &config.waste.time_column,
        value_column: &config.waste.value_column,
        pattern: config.waste.time_pattern,
        clean_time: config.waste.clean_time,
    };
    let table = aggregate_column(&frame, &spec, grain, reducer, log)?;
    non_empty(table, &frame)
}

/// How a row with one unparseable value column is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowExclusion {
    /// Only the failing column loses the row.
    PerColumn,
    /// The row is dropped from every column.
    Joint,
}

fn composition_spec<'a>(settings: &'a CompositionConfig, value_column: &'a str) -> ColumnSpec<'a> {
    ColumnSpec {
        time_column: &settings.time_column,
        value_column,
        pattern: settings.time_pattern,
        clean_time: settings.clean_time,
    }
}

/// Food and recycled tables from the composition file, in that order.
fn composition_tables(
    config: &Config,
    grain: Grain,
    exclusion: RowExclusion,
    log: &mut RunLog,
) -> Result<(AggregateTable, AggregateTable)> {
    let settings = &config.composition;
    let frame = Frame::load(&config.resolve(&settings.path))?;
    log.source(frame.source());

    let mut food = observations(&frame, &composition_spec(settings, &settings.food_column), grain)?;
    let mut recycled =
        observations(&frame, &composition_spec(settings, &settings.recycle_column), grain)?;

    if exclusion == RowExclusion::Joint {
        for (f, r) in food.iter_mut().zip(recycled.iter_mut()) {
            if f.1.is_none() || r.1.is_none() {
                f.1 = None;
                r.1 = None;
            }
        }
    }

    let food = reduce_observations(food, Reducer::Sum, &settings.food_column, log);
    let recycled = reduce_observations(recycled, Reducer::Sum, &settings.recycle_column, log);
    Ok((non_empty(food, &frame)?, non_empty(recycled, &frame)?))
}

fn district_row(config: &Config, log: &mut RunLog) -> Result<DistrictRow> {
    let raw = RawTable::load(&config.resolve(&config.household.path))?;
    let row = HouseholdSchema::from(&config.household).resolve(raw)?;
    log.source(row.source.clone());
    Ok(row)
}

fn household_table(
    observations: Vec<(Option<TimeKey>, Option<f64>)>,
    label: &str,
    log: &mut RunLog,
) -> Result<AggregateTable> {
    let (table, retained) = aggregate(observations, Reducer::Sum, label);
    log.record(&retained);
    if table.is_empty() {
        return Err(AnalysisError::Degenerate(format!(
            "no parseable {} values in the household file",
            label
        )));
    }
    Ok(table)
}

fn non_empty(table: AggregateTable, frame: &Frame) -> Result<AggregateTable> {
    if table.is_empty() {
        return Err(AnalysisError::Degenerate(format!(
            "no row of {} has both a parseable date and a parseable '{}'",
            frame.path.display(),
            table.label
        )));
    }
    Ok(table)
}

/// Run one analysis end to end.
pub fn run(kind: AnalysisKind, config: &Config) -> Result<Report> {
    info!("Running {:?}", kind);
    let mut log = RunLog::default();

    let findings = match kind {
        AnalysisKind::AnnualTrend => annual_trend(config, &mut log)?,
        AnalysisKind::MonthlyAverage => Findings::Series {
            table: waste_table(config, Grain::MonthOfYear, Reducer::Mean, &mut log)?,
        },
        AnalysisKind::HouseholdTrend => {
            let row = district_row(config, &mut log)?;
            Findings::Series {
                table: household_table(row.subtotals(), HOUSEHOLD_LABEL, &mut log)?,
            }
        }
        AnalysisKind::YoungHouseholdTrend => {
            let row = district_row(config, &mut log)?;
            let sums = row.bracket_sums(&config.household.age_offsets);
            Findings::Series {
                table: household_table(sums, YOUNG_HOUSEHOLD_LABEL, &mut log)?,
            }
        }
        AnalysisKind::Correlation => correlation(config, &mut log)?,
        AnalysisKind::Composition => waste_composition(config, &mut log)?,
        AnalysisKind::MonthlySeries => {
            let (food, recycled) =
                composition_tables(config, Grain::Month, RowExclusion::PerColumn, &mut log)?;
            Findings::MultiSeries {
                tables: vec![food, recycled],
            }
        }
        AnalysisKind::Export => export(config, &mut log)?,
    };

    if log.dropped > 0 {
        info!("{} records excluded for unparseable dates or values", log.dropped);
    }

    Ok(log.finish(kind, findings))
}

fn annual_trend(config: &Config, log: &mut RunLog) -> Result<Findings> {
    let table = waste_table(config, Grain::Year, Reducer::Sum, log)?;
    let changes = percent_change(&table.values());
    debug!("{} years, {:.1} in total", table.len(), table.total());

    let rows = table
        .rows()
        .iter()
        .zip(changes)
        .map(|(row, change_pct)| TrendRow {
            key: row.key,
            value: row.value,
            change_pct,
        })
        .collect();

    Ok(Findings::Trend {
        label: table.label.clone(),
        rows,
    })
}

fn correlation(config: &Config, log: &mut RunLog) -> Result<Findings> {
    let waste = waste_table(config, Grain::Year, Reducer::Sum, log)?;
    let row = district_row(config, log)?;
    let households = household_table(row.subtotals(), HOUSEHOLD_LABEL, log)?;

    let joined = inner_join(&[&waste, &households])?;
    debug!("Overlapping years: {:?}", joined.keys().map(|k| k.to_string()).collect::<Vec<_>>());
    if joined.rows.len() < 2 {
        warn!(
            "Only {} year(s) overlap between waste and household data",
            joined.rows.len()
        );
        log.notes.push(format!(
            "Only {} overlapping year(s); correlation is undefined.",
            joined.rows.len()
        ));
    }

    let xs = joined.column(1);
    let ys = joined.column(0);
    let pearson_r = pearson(&xs, &ys)?;
    let fit = linear_regression(&xs, &ys)?;
    let fitted = fit
        .map(|fit| xs.iter().map(|x| fit.predict(*x)).collect())
        .unwrap_or_default();

    info!("Pearson r = {:.4} over {} years", pearson_r, joined.rows.len());

    Ok(Findings::Correlation {
        joined,
        pearson_r,
        fit,
        fitted,
    })
}

fn waste_composition(config: &Config, log: &mut RunLog) -> Result<Findings> {
    let year = config.composition.target_year;
    let total = waste_table(config, Grain::Year, Reducer::Sum, log)?;
    let (food, recycled) = composition_tables(config, Grain::Year, RowExclusion::Joint, log)?;

    let joined = inner_join(&[&total, &food, &recycled])?;
    if joined.is_empty() {
        return Err(AnalysisError::Degenerate(
            "the waste and composition files share no year".to_string(),
        ));
    }
    let row = joined.row(&TimeKey::Year(year)).ok_or_else(|| {
        AnalysisError::Degenerate(format!("{} is not present in both the waste and composition files", year))
    })?;

    let breakdown = composition(
        year,
        row.values[0],
        row.values[1],
        row.values[2],
        config.composition.residual_policy,
    )?;
    if let Some(raw) = breakdown.clamped_residual {
        log.notes.push(format!(
            "Residual for {} was {:.1} and has been clamped to zero.",
            year, raw
        ));
    }

    Ok(Findings::Composition(breakdown))
}

fn export(config: &Config, log: &mut RunLog) -> Result<Findings> {
    let settings = &config.export;
    let table = waste_table(config, settings.grain, settings.reducer, log)?;

    log.notes.push(format!(
        "{} rows ({}) exported to {}.",
        table.len(),
        settings.reducer,
        config.resolve(&settings.path).display()
    ));

    Ok(Findings::Series { table })
}

/// Write the table of an export report to the configured CSV.
///
/// Runs after the report itself has been emitted. Returns the written path,
/// or `None` when the report is not an export.
pub fn write_export(config: &Config, outcome: &Report) -> Result<Option<PathBuf>> {
    let table = match (&outcome.metadata.analysis, &outcome.findings) {
        (AnalysisKind::Export, Findings::Series { table }) => table,
        _ => return Ok(None),
    };

    let settings = &config.export;
    let path = config.resolve(&settings.path);
    report::write_aggregate_csv(&path, table, &settings.key_label, &settings.value_label)?;
    info!("Exported {} rows to {}", table.len(), path.display());

    Ok(Some(path))
}
