//! Aggregation pipeline.
//!
//! Time-key parsing, measurement normalization, grouping/reduction,
//! joins and the statistics computed over the joined series.

pub mod aggregator;
pub mod join;
pub mod measure;
pub mod pipeline;
pub mod stats;
pub mod time_key;

pub use aggregator::{aggregate, Retained};
pub use join::inner_join;
pub use measure::normalize;
pub use stats::{composition, linear_regression, pearson, percent_change};
pub use time_key::{parse_date, strip_time_noise};
