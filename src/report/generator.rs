//! Markdown report generation.
//!
//! This module renders an analysis [`Report`] as a Markdown document,
//! or as pretty-printed JSON for downstream tooling.

use crate::models::{
    AggregateTable, Composition, Findings, JoinedTable, LinearFit, Report, ReportMetadata,
    TimeKey, TrendRow,
};
use anyhow::Result;
use std::collections::BTreeSet;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    // Title
    output.push_str(&format!(
        "# WasteTrend Report: {}\n\n",
        report.metadata.analysis.title()
    ));

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_findings_section(&report.findings));
    output.push_str(&generate_notes_section(&report.notes));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    for source in &metadata.sources {
        section.push_str(&format!("- **Source:** `{}`\n", source));
    }
    section.push_str(&format!(
        "- **Records Used:** {}\n",
        metadata.records_used
    ));
    if metadata.records_dropped > 0 {
        section.push_str(&format!(
            "- **Records Excluded:** {}\n",
            metadata.records_dropped
        ));
    }
    section.push('\n');

    section
}

/// Generate the results section for whichever findings the run produced.
fn generate_findings_section(findings: &Findings) -> String {
    let mut section = String::new();

    section.push_str("## Results\n\n");
    match findings {
        Findings::Trend { label, rows } => section.push_str(&trend_table(label, rows)),
        Findings::Series { table } => section.push_str(&series_table(&[table])),
        Findings::MultiSeries { tables } => {
            let tables: Vec<&AggregateTable> = tables.iter().collect();
            section.push_str(&series_table(&tables));
        }
        Findings::Correlation {
            joined,
            pearson_r,
            fit,
            fitted,
        } => section.push_str(&correlation_block(joined, *pearson_r, fit.as_ref(), fitted)),
        Findings::Composition(breakdown) => section.push_str(&composition_table(breakdown)),
    }

    section
}

fn trend_table(label: &str, rows: &[TrendRow]) -> String {
    let mut table = String::new();

    table.push_str(&format!("| Year | {} | Change |\n", label));
    table.push_str("|:---|---:|---:|\n");
    for row in rows {
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            row.key,
            format_number(row.value, 1),
            format_percent(row.change_pct)
        ));
    }
    table.push('\n');

    table
}

/// Side-by-side series; a key missing from one table leaves its cell blank.
fn series_table(tables: &[&AggregateTable]) -> String {
    let mut table = String::new();

    let keys: BTreeSet<TimeKey> = tables.iter().flat_map(|t| t.keys()).collect();
    if keys.is_empty() {
        table.push_str("No rows to show.\n\n");
        return table;
    }

    table.push_str("| Key |");
    for t in tables {
        table.push_str(&format!(" {} |", t.label));
    }
    table.push_str("\n|:---|");
    table.push_str(&"---:|".repeat(tables.len()));
    table.push('\n');

    for key in &keys {
        table.push_str(&format!("| {} |", key));
        for t in tables {
            let cell = t.get(key).map(|v| format_number(v, 1)).unwrap_or_default();
            table.push_str(&format!(" {} |", cell));
        }
        table.push('\n');
    }
    table.push('\n');

    table
}

fn correlation_block(
    joined: &JoinedTable,
    pearson_r: f64,
    fit: Option<&LinearFit>,
    fitted: &[f64],
) -> String {
    let mut block = String::new();

    let (y_label, x_label) = match joined.labels.as_slice() {
        [y, x, ..] => (y.as_str(), x.as_str()),
        _ => ("y", "x"),
    };

    block.push_str(&format!("| Year | {} | {} | Fitted |\n", y_label, x_label));
    block.push_str("|:---|---:|---:|---:|\n");
    for (idx, row) in joined.rows.iter().enumerate() {
        let value = |i: usize| row.values.get(i).map(|v| format_number(*v, 1)).unwrap_or_default();
        let fitted_cell = fitted
            .get(idx)
            .map(|v| format_number(*v, 1))
            .unwrap_or_else(|| "n/a".to_string());
        block.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.key,
            value(0),
            value(1),
            fitted_cell
        ));
    }
    block.push('\n');

    if pearson_r.is_nan() {
        block.push_str("**Pearson r:** undefined\n\n");
    } else {
        block.push_str(&format!("**Pearson r:** {:.4}\n\n", pearson_r));
    }

    match fit {
        Some(fit) => block.push_str(&format!(
            "**Least-squares fit:** {} = {:.4} × {} {} {}\n\n",
            y_label,
            fit.slope,
            x_label,
            if fit.intercept < 0.0 { "-" } else { "+" },
            format_number(fit.intercept.abs(), 1)
        )),
        None => block.push_str("**Least-squares fit:** not defined for these points\n\n"),
    }

    block
}

fn composition_table(breakdown: &Composition) -> String {
    let mut table = String::new();

    table.push_str(&format!(
        "Total waste in {}: **{}**\n\n",
        breakdown.year,
        format_number(breakdown.total, 1)
    ));
    table.push_str("| Category | Amount | Share |\n");
    table.push_str("|:---|---:|---:|\n");
    for share in &breakdown.shares {
        table.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            share.label,
            format_number(share.amount, 1),
            share.percent
        ));
    }
    table.push('\n');

    table
}

fn generate_notes_section(notes: &[String]) -> String {
    if notes.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Notes\n\n");
    for note in notes {
        section.push_str(&format!("- {}\n", note));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!("---\n\n*Report generated by WasteTrend v{}*\n", env!("CARGO_PKG_VERSION"))
}

/// Format with thousands separators; non-finite values read `n/a`.
fn format_number(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }

    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    // "-0.0" reads oddly; only show the sign when a digit survives rounding
    let nonzero = formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    if value < 0.0 && nonzero {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn format_percent(change: Option<f64>) -> String {
    match change {
        Some(pct) if pct.is_finite() => format!("{:+.1}%", pct),
        _ => "n/a".to_string(),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisKind, CompositionShare, JoinedRow};
    use chrono::Utc;

    fn create_test_report(findings: Findings) -> Report {
        Report {
            metadata: ReportMetadata {
                analysis: AnalysisKind::AnnualTrend,
                generated_at: Utc::now(),
                sources: vec!["data/waste.csv".to_string()],
                records_used: 36,
                records_dropped: 2,
            },
            findings,
            notes: vec!["Only 1 overlapping year(s); correlation is undefined.".to_string()],
        }
    }

    fn trend() -> Findings {
        Findings::Trend {
            label: "SUM".to_string(),
            rows: vec![
                TrendRow {
                    key: TimeKey::Year(2019),
                    value: 1_234_567.0,
                    change_pct: Some(0.0),
                },
                TrendRow {
                    key: TimeKey::Year(2020),
                    value: 0.0,
                    change_pct: Some(-100.0),
                },
                TrendRow {
                    key: TimeKey::Year(2021),
                    value: 500.0,
                    change_pct: None,
                },
            ],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report(trend()));

        assert!(markdown.contains("# WasteTrend Report: Annual Waste Trend"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("`data/waste.csv`"));
        assert!(markdown.contains("Records Excluded:** 2"));
        assert!(markdown.contains("| 2019 | 1,234,567.0 | +0.0% |"));
        assert!(markdown.contains("| 2021 | 500.0 | n/a |"));
        assert!(markdown.contains("## Notes"));
    }

    #[test]
    fn test_series_table_blanks_missing_keys() {
        let food = AggregateTable::from_pairs(
            "Food Waste",
            vec![
                (TimeKey::YearMonth { year: 2019, month: 1 }, 300.0),
                (TimeKey::YearMonth { year: 2019, month: 2 }, 500.0),
            ],
        );
        let recycled = AggregateTable::from_pairs(
            "Recycled Waste",
            vec![(TimeKey::YearMonth { year: 2019, month: 2 }, 400.0)],
        );

        let table = series_table(&[&food, &recycled]);

        assert!(table.contains("| Key | Food Waste | Recycled Waste |"));
        assert!(table.contains("| 2019-01 | 300.0 |  |"));
        assert!(table.contains("| 2019-02 | 500.0 | 400.0 |"));
    }

    #[test]
    fn test_correlation_block() {
        let joined = JoinedTable {
            labels: vec!["SUM".to_string(), "households".to_string()],
            rows: vec![
                JoinedRow {
                    key: TimeKey::Year(2019),
                    values: vec![3000.0, 1000.0],
                },
                JoinedRow {
                    key: TimeKey::Year(2020),
                    values: vec![2500.0, 2000.0],
                },
            ],
        };
        let fit = LinearFit {
            slope: -0.5,
            intercept: 3500.0,
        };

        let block = correlation_block(&joined, -1.0, Some(&fit), &[3000.0, 2500.0]);
        assert!(block.contains("| Year | SUM | households | Fitted |"));
        assert!(block.contains("| 2020 | 2,500.0 | 2,000.0 | 2,500.0 |"));
        assert!(block.contains("**Pearson r:** -1.0000"));
        assert!(block.contains("SUM = -0.5000 × households + 3,500.0"));

        let block = correlation_block(&joined, f64::NAN, None, &[]);
        assert!(block.contains("**Pearson r:** undefined"));
        assert!(block.contains("not defined"));
    }

    #[test]
    fn test_composition_table() {
        let breakdown = Composition {
            year: 2019,
            total: 1000.0,
            shares: vec![
                CompositionShare {
                    label: "Food waste".to_string(),
                    amount: 250.0,
                    percent: 25.0,
                },
                CompositionShare {
                    label: "Other / residual".to_string(),
                    amount: 750.0,
                    percent: 75.0,
                },
            ],
            clamped_residual: None,
        };

        let table = composition_table(&breakdown);
        assert!(table.contains("Total waste in 2019: **1,000.0**"));
        assert!(table.contains("| Food waste | 250.0 | 25.0% |"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234.5, 1), "1,234.5");
        assert_eq!(format_number(999.0, 0), "999");
        assert_eq!(format_number(1_000_000.0, 0), "1,000,000");
        assert_eq!(format_number(-4321.0, 1), "-4,321.0");
        assert_eq!(format_number(-0.01, 1), "0.0");
        assert_eq!(format_number(f64::NAN, 1), "n/a");
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report(trend())).unwrap();

        assert!(json.contains("\"analysis\": \"annual-trend\""));
        assert!(json.contains("\"kind\": \"trend\""));
        assert!(json.contains("\"key\": \"2019\""));
        assert!(json.contains("\"change_pct\": null"));
    }
}
