//! Data models for the aggregation pipeline.
//!
//! This module contains the core data structures shared by the loaders,
//! the aggregation engine and the report generator.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Key that aggregate rows are grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeKey {
    /// A calendar year.
    Year(i32),
    /// A specific month of a specific year.
    YearMonth { year: i32, month: u32 },
    /// A calendar month pooled across years (1 = January).
    MonthOfYear(u32),
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeKey::Year(year) => write!(f, "{}", year),
            TimeKey::YearMonth { year, month } => write!(f, "{}-{:02}", year, month),
            TimeKey::MonthOfYear(month) => match MONTH_ABBR.get(month.wrapping_sub(1) as usize) {
                Some(abbr) => write!(f, "{}", abbr),
                None => write!(f, "M{}", month),
            },
        }
    }
}

impl Serialize for TimeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Granularity at which a parsed date becomes a [`TimeKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Grain {
    /// Calendar year.
    #[default]
    Year,
    /// Year and month.
    Month,
    /// Calendar month across all years.
    MonthOfYear,
}

impl Grain {
    /// Derive the grouping key for a date.
    pub fn key(&self, date: NaiveDate) -> TimeKey {
        match self {
            Grain::Year => TimeKey::Year(date.year()),
            Grain::Month => TimeKey::YearMonth {
                year: date.year(),
                month: date.month(),
            },
            Grain::MonthOfYear => TimeKey::MonthOfYear(date.month()),
        }
    }
}

/// Aggregation function applied per partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    #[default]
    Sum,
    Mean,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Sum => write!(f, "sum"),
            Reducer::Mean => write!(f, "mean"),
        }
    }
}

/// Text shape a time column is parsed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimePattern {
    /// `Jan-19` and nothing else.
    AbbreviatedMonth,
    /// Anything a general date parser resolves to a calendar date.
    FreeForm,
    /// The value is itself a year label (`2019`, `2019년`).
    YearLabel,
}

/// What to do when `total - food - recycled` comes out negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResidualPolicy {
    /// Fail the run; the inputs disagree with each other.
    #[default]
    Reject,
    /// Clamp the residual to zero and log a warning.
    Clamp,
}

/// Analysis selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisKind {
    /// Annual waste totals with year-over-year change
    #[default]
    AnnualTrend,
    /// Mean waste per calendar month
    MonthlyAverage,
    /// Single-person households per year
    HouseholdTrend,
    /// Single-person households aged 20-39 per year
    YoungHouseholdTrend,
    /// Annual waste vs. single-person households
    Correlation,
    /// Food / recycled / residual share for one year
    Composition,
    /// Monthly food and recycled waste
    MonthlySeries,
    /// Reduce waste per time key and write it to CSV
    Export,
}

impl AnalysisKind {
    /// Human-readable title used in report headings.
    pub fn title(&self) -> &'static str {
        match self {
            AnalysisKind::AnnualTrend => "Annual Waste Trend",
            AnalysisKind::MonthlyAverage => "Monthly Average Waste",
            AnalysisKind::HouseholdTrend => "Single-Person Household Trend",
            AnalysisKind::YoungHouseholdTrend => "Single-Person Households Aged 20-39",
            AnalysisKind::Correlation => "Waste vs. Single-Person Households",
            AnalysisKind::Composition => "Waste Composition",
            AnalysisKind::MonthlySeries => "Monthly Food and Recycled Waste",
            AnalysisKind::Export => "Aggregate Export",
        }
    }
}

/// One (Time Key, Reduced Value) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: TimeKey,
    pub value: f64,
}

/// A labelled value column keyed by time, at most one row per key.
///
/// Rows are always held in ascending key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    /// Name of the value column.
    pub label: String,
    rows: Vec<AggregateRow>,
}

impl AggregateTable {
    /// Build a table from already-reduced values.
    pub fn from_map(label: impl Into<String>, values: BTreeMap<TimeKey, f64>) -> Self {
        Self {
            label: label.into(),
            rows: values
                .into_iter()
                .map(|(key, value)| AggregateRow { key, value })
                .collect(),
        }
    }

    /// Build a table from pairs; a repeated key keeps the last value.
    #[allow(dead_code)] // Fixture helper
    pub fn from_pairs(label: impl Into<String>, pairs: impl IntoIterator<Item = (TimeKey, f64)>) -> Self {
        Self::from_map(label, pairs.into_iter().collect())
    }

    pub fn rows(&self) -> &[AggregateRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &TimeKey) -> Option<f64> {
        self.rows
            .binary_search_by(|row| row.key.cmp(key))
            .ok()
            .map(|idx| self.rows[idx].value)
    }

    pub fn keys(&self) -> impl Iterator<Item = TimeKey> + '_ {
        self.rows.iter().map(|row| row.key)
    }

    pub fn values(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.value).collect()
    }

    /// Sum of every value in the table.
    pub fn total(&self) -> f64 {
        self.rows.iter().map(|row| row.value).sum()
    }
}

/// One row of an inner join: the key plus one value per input table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRow {
    pub key: TimeKey,
    pub values: Vec<f64>,
}

/// Result of an inner join across aggregate tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedTable {
    /// Value column labels, in input table order.
    pub labels: Vec<String>,
    pub rows: Vec<JoinedRow>,
}

impl JoinedTable {
    /// Extract one value column by position.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.values.get(index).copied())
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = TimeKey> + '_ {
        self.rows.iter().map(|row| row.key)
    }

    /// Find the row for a key.
    pub fn row(&self, key: &TimeKey) -> Option<&JoinedRow> {
        self.rows.iter().find(|row| &row.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Ordinary least squares fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Evaluate the fitted line at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// A row of the annual trend: total and change against the previous year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendRow {
    pub key: TimeKey,
    pub value: f64,
    /// Percent change from the previous row; `None` when the previous value is zero.
    pub change_pct: Option<f64>,
}

/// One slice of a composition breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionShare {
    pub label: String,
    pub amount: f64,
    pub percent: f64,
}

/// Breakdown of one year's total into food, recycled and residual waste.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub year: i32,
    pub total: f64,
    pub shares: Vec<CompositionShare>,
    /// Residual before clamping, when clamping changed it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamped_residual: Option<f64>,
}

/// Analysis-specific results carried by a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Findings {
    /// Totals per year with year-over-year change.
    Trend { label: String, rows: Vec<TrendRow> },
    /// A single aggregate series.
    Series { table: AggregateTable },
    /// Several series sharing a key type, shown side by side.
    MultiSeries { tables: Vec<AggregateTable> },
    /// Joined series with correlation and regression.
    Correlation {
        joined: JoinedTable,
        pearson_r: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        fit: Option<LinearFit>,
        fitted: Vec<f64>,
    },
    Composition(Composition),
}

/// Metadata about an analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub analysis: AnalysisKind,
    pub generated_at: DateTime<Utc>,
    /// Input files that fed the analysis.
    pub sources: Vec<String>,
    /// Records kept after parsing.
    pub records_used: usize,
    /// Records excluded because their time key or measurement did not parse.
    pub records_dropped: usize,
}

/// Complete result of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub findings: Findings,
    /// Free-form remarks (clamped values, export destinations, ...).
    pub notes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_key_display() {
        assert_eq!(TimeKey::Year(2019).to_string(), "2019");
        assert_eq!(TimeKey::YearMonth { year: 2019, month: 3 }.to_string(), "2019-03");
        assert_eq!(TimeKey::MonthOfYear(1).to_string(), "Jan");
        assert_eq!(TimeKey::MonthOfYear(12).to_string(), "Dec");
        assert_eq!(TimeKey::MonthOfYear(13).to_string(), "M13");
    }

    #[test]
    fn test_time_key_ordering() {
        let mut keys = vec![
            TimeKey::YearMonth { year: 2020, month: 1 },
            TimeKey::YearMonth { year: 2019, month: 12 },
            TimeKey::YearMonth { year: 2019, month: 2 },
        ];
        keys.sort();
        assert_eq!(keys[0], TimeKey::YearMonth { year: 2019, month: 2 });
        assert_eq!(keys[2], TimeKey::YearMonth { year: 2020, month: 1 });
    }

    #[test]
    fn test_grain_key() {
        let date = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
        assert_eq!(Grain::Year.key(date), TimeKey::Year(2021));
        assert_eq!(Grain::Month.key(date), TimeKey::YearMonth { year: 2021, month: 7 });
        assert_eq!(Grain::MonthOfYear.key(date), TimeKey::MonthOfYear(7));
    }

    #[test]
    fn test_aggregate_table_lookup() {
        let table = AggregateTable::from_pairs(
            "SUM",
            vec![(TimeKey::Year(2021), 90.0), (TimeKey::Year(2019), 100.0)],
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].key, TimeKey::Year(2019));
        assert_eq!(table.get(&TimeKey::Year(2021)), Some(90.0));
        assert_eq!(table.get(&TimeKey::Year(2020)), None);
        assert_eq!(table.total(), 190.0);
    }

    #[test]
    fn test_time_key_serializes_as_string() {
        let row = AggregateRow {
            key: TimeKey::YearMonth { year: 2019, month: 1 },
            value: 1.5,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"key":"2019-01","value":1.5}"#);
    }

    #[test]
    fn test_linear_fit_predict() {
        let fit = LinearFit {
            slope: 2.0,
            intercept: 1.0,
        };
        assert_eq!(fit.predict(3.0), 7.0);
    }
}
