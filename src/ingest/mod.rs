//! Input loading.
//!
//! Reads CSV files into raw records or headered frames, and resolves the
//! wide household layout against its schema.

pub mod household;
pub mod reader;

pub use household::{DistrictRow, HouseholdSchema, YearBlock};
pub use reader::{Frame, RawTable};
