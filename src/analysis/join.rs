//! Inner join of aggregate tables on their time key.

use crate::error::{AnalysisError, Result};
use crate::models::{AggregateTable, JoinedRow, JoinedTable};

/// Keep only keys present in every table.
///
/// Output rows are in ascending key order and carry one value per table,
/// in the order the tables were given.
pub fn inner_join(tables: &[&AggregateTable]) -> Result<JoinedTable> {
    let (first, rest) = tables.split_first().ok_or(AnalysisError::EmptyJoin)?;

    let rows = first
        .rows()
        .iter()
        .filter_map(|row| {
            let mut values = Vec::with_capacity(tables.len());
            values.push(row.value);
            for table in rest {
                values.push(table.get(&row.key)?);
            }
            Some(JoinedRow {
                key: row.key,
                values,
            })
        })
        .collect();

    Ok(JoinedTable {
        labels: tables.iter().map(|t| t.label.clone()).collect(),
        rows,
    })
}
