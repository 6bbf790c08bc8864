//! Writing an aggregate table back out as a two-column CSV.

use crate::error::{AnalysisError, Result};
use crate::models::AggregateTable;
use csv::Writer;
use std::path::Path;
use tracing::debug;

/// Write `table` to `path` with a `key_label,value_label` header.
///
/// Keys are written in their display form (`2019`, `2019-01`, `Jan`) and
/// values in shortest round-trip form, so whole numbers carry no fraction.
pub fn write_aggregate_csv(
    path: &Path,
    table: &AggregateTable,
    key_label: &str,
    value_label: &str,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| AnalysisError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let csv_err = |source| AnalysisError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = Writer::from_path(path).map_err(csv_err)?;
    writer.write_record([key_label, value_label]).map_err(csv_err)?;

    for row in table.rows() {
        writer
            .write_record([row.key.to_string(), row.value.to_string()])
            .map_err(csv_err)?;
    }

    writer.flush().map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}
