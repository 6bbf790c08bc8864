//! Report rendering and CSV export.

pub mod export;
pub mod generator;

pub use export::write_aggregate_csv;
pub use generator::{generate_json_report, generate_markdown_report};
