//! Wide single-person household statistics.
//!
//! The household file is a pivoted export: a few title rows, then a header
//! row, then one row per (district, sex) with a block of columns per year.
//! Each block starts with the year's subtotal followed by age brackets.
//! [`HouseholdSchema`] names every position that is read and is checked
//! against the file once, before any value is extracted.

use crate::analysis::normalize;
use crate::error::{AnalysisError, Result};
use crate::ingest::RawTable;
use crate::models::TimeKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Where one year's block of columns starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBlock {
    pub year: i32,
    /// Zero-based position of the year's subtotal column.
    pub column: usize,
}

/// Layout of the wide household file.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdSchema {
    /// Zero-based record index of the real header.
    pub header_row: usize,
    pub district_column: String,
    pub district: String,
    pub sex_column: String,
    /// Value of the sex column that marks the both-sexes total.
    pub sex_total: String,
    pub year_blocks: Vec<YearBlock>,
    /// Offsets from a block's subtotal column to the age brackets of interest.
    pub age_offsets: Vec<usize>,
}

impl From<&crate::config::HouseholdConfig> for HouseholdSchema {
    fn from(config: &crate::config::HouseholdConfig) -> Self {
        Self {
            header_row: config.header_row,
            district_column: config.district_column.clone(),
            district: config.district.clone(),
            sex_column: config.sex_column.clone(),
            sex_total: config.sex_total.clone(),
            year_blocks: config.year_blocks.clone(),
            age_offsets: config.age_offsets.clone(),
        }
    }
}

/// The single district/total row picked out of the file.
#[derive(Debug, Clone)]
pub struct DistrictRow {
    pub source: String,
    cells: Vec<String>,
    blocks: Vec<YearBlock>,
}

impl HouseholdSchema {
    /// Validate the schema against `raw` and select the district total row.
    pub fn resolve(&self, raw: RawTable) -> Result<DistrictRow> {
        if self.year_blocks.is_empty() {
            return Err(AnalysisError::Schema(
                "household schema lists no year blocks".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.year_blocks.iter().find(|b| !seen.insert(b.year)) {
            return Err(AnalysisError::Schema(format!(
                "year {} appears in more than one household block",
                dup.year
            )));
        }

        let frame = raw.with_header_at(self.header_row)?;
        let district_idx = frame.column(&self.district_column)?;
        let sex_idx = frame.column(&self.sex_column)?;

        let width = frame.header.len();
        let reach = self.age_offsets.iter().copied().max().unwrap_or(0);
        for block in &self.year_blocks {
            let last = block.column + reach;
            if last >= width {
                return Err(AnalysisError::Schema(format!(
                    "block for {} needs column {} but {} has only {} columns",
                    block.year,
                    last,
                    frame.path.display(),
                    width
                )));
            }
        }

        let cells = frame
            .rows
            .iter()
            .find(|row| {
                row.get(district_idx).map(String::as_str) == Some(self.district.as_str())
                    && row.get(sex_idx).map(String::as_str) == Some(self.sex_total.as_str())
            })
            .cloned()
            .ok_or_else(|| {
                AnalysisError::Schema(format!(
                    "no row in {} with {} = {} and {} = {}",
                    frame.path.display(),
                    self.district_column,
                    self.district,
                    self.sex_column,
                    self.sex_total
                ))
            })?;

        debug!(
            "Selected {} / {} row with {} cells",
            self.district,
            self.sex_total,
            cells.len()
        );

        Ok(DistrictRow {
            source: frame.source(),
            cells,
            blocks: self.year_blocks.clone(),
        })
    }
}

impl DistrictRow {
    fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    /// Per-year subtotal, unparsed cells left as `None`.
    pub fn subtotals(&self) -> Vec<(Option<TimeKey>, Option<f64>)> {
        self.blocks
            .iter()
            .map(|block| (Some(TimeKey::Year(block.year)), normalize(self.cell(block.column))))
            .collect()
    }

    /// Per-year sum of the cells at `offsets` within each block.
    ///
    /// Cells that fail to parse are skipped; a year where none parse is `None`.
    pub fn bracket_sums(&self, offsets: &[usize]) -> Vec<(Option<TimeKey>, Option<f64>)> {
        self.blocks
            .iter()
            .map(|block| {
                let parsed: Vec<f64> = offsets
                    .iter()
                    .filter_map(|offset| normalize(self.cell(block.column + offset)))
                    .collect();
                let sum = if parsed.is_empty() {
                    None
                } else {
                    Some(parsed.iter().sum::<f64>())
                };
                (Some(TimeKey::Year(block.year)), sum)
            })
            .collect()
    }
}
