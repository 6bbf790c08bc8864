//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.wastetrend.toml` files. Defaults describe the Jongno-gu data set.

use crate::ingest::YearBlock;
use crate::models::{Grain, Reducer, ResidualPolicy, TimePattern};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".wastetrend.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Monthly municipal waste file.
    #[serde(default)]
    pub waste: WasteConfig,

    /// Food waste / recycling file.
    #[serde(default)]
    pub composition: CompositionConfig,

    /// Wide single-person household file.
    #[serde(default)]
    pub household: HouseholdConfig,

    /// Aggregate export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory that relative input paths resolve against.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Write the rendered report here in addition to stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output: None,
            verbose: false,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// Monthly waste generation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteConfig {
    #[serde(default = "default_waste_path")]
    pub path: PathBuf,

    #[serde(default = "default_time_column")]
    pub time_column: String,

    #[serde(default = "default_waste_column")]
    pub value_column: String,

    #[serde(default = "default_waste_pattern")]
    pub time_pattern: TimePattern,

    /// Strip non-word characters from the time column before parsing.
    #[serde(default = "default_true")]
    pub clean_time: bool,
}

impl Default for WasteConfig {
    fn default() -> Self {
        Self {
            path: default_waste_path(),
            time_column: default_time_column(),
            value_column: default_waste_column(),
            time_pattern: default_waste_pattern(),
            clean_time: true,
        }
    }
}

fn default_waste_path() -> PathBuf {
    PathBuf::from("서울특별시 종로구_생활쓰레기 월별 발생량.csv")
}

fn default_time_column() -> String {
    "Year and month".to_string()
}

fn default_waste_column() -> String {
    "SUM".to_string()
}

fn default_waste_pattern() -> TimePattern {
    TimePattern::AbbreviatedMonth
}

fn default_true() -> bool {
    true
}

/// Food waste and recycling file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionConfig {
    #[serde(default = "default_composition_path")]
    pub path: PathBuf,

    #[serde(default = "default_time_column")]
    pub time_column: String,

    #[serde(default = "default_food_column")]
    pub food_column: String,

    #[serde(default = "default_recycle_column")]
    pub recycle_column: String,

    #[serde(default = "default_composition_pattern")]
    pub time_pattern: TimePattern,

    #[serde(default = "default_true")]
    pub clean_time: bool,

    /// Year broken down by the composition analysis.
    #[serde(default = "default_target_year")]
    pub target_year: i32,

    #[serde(default)]
    pub residual_policy: ResidualPolicy,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            path: default_composition_path(),
            time_column: default_time_column(),
            food_column: default_food_column(),
            recycle_column: default_recycle_column(),
            time_pattern: default_composition_pattern(),
            clean_time: true,
            target_year: default_target_year(),
            residual_policy: ResidualPolicy::default(),
        }
    }
}

fn default_composition_path() -> PathBuf {
    PathBuf::from("서울특별시 종로구_음식물류폐기물 및 재활용품 발생량.csv")
}

fn default_food_column() -> String {
    "Food Waste".to_string()
}

fn default_recycle_column() -> String {
    "Recycled Waste".to_string()
}

fn default_composition_pattern() -> TimePattern {
    TimePattern::FreeForm
}

fn default_target_year() -> i32 {
    2019
}

/// Wide single-person household file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdConfig {
    #[serde(default = "default_household_path")]
    pub path: PathBuf,

    /// Zero-based record index of the real header row.
    #[serde(default = "default_header_row")]
    pub header_row: usize,

    #[serde(default = "default_district_column")]
    pub district_column: String,

    #[serde(default = "default_district")]
    pub district: String,

    #[serde(default = "default_sex_column")]
    pub sex_column: String,

    #[serde(default = "default_sex_total")]
    pub sex_total: String,

    /// Subtotal column of each year's block.
    #[serde(default = "default_year_blocks")]
    pub year_blocks: Vec<YearBlock>,

    /// Offsets of the 20-39 age brackets from each block's subtotal column.
    #[serde(default = "default_age_offsets")]
    pub age_offsets: Vec<usize>,
}

impl Default for HouseholdConfig {
    fn default() -> Self {
        Self {
            path: default_household_path(),
            header_row: default_header_row(),
            district_column: default_district_column(),
            district: default_district(),
            sex_column: default_sex_column(),
            sex_total: default_sex_total(),
            year_blocks: default_year_blocks(),
            age_offsets: default_age_offsets(),
        }
    }
}

fn default_household_path() -> PathBuf {
    PathBuf::from("1인가구(연령별)_종로구.csv")
}

fn default_header_row() -> usize {
    2
}

fn default_district_column() -> String {
    "자치구별(2)".to_string()
}

fn default_district() -> String {
    "종로구".to_string()
}

fn default_sex_column() -> String {
    "성별(1)".to_string()
}

fn default_sex_total() -> String {
    "계".to_string()
}

fn default_year_blocks() -> Vec<YearBlock> {
    [(2024, 3), (2023, 19), (2022, 35), (2021, 51), (2020, 67), (2019, 83)]
        .into_iter()
        .map(|(year, column)| YearBlock { year, column })
        .collect()
}

fn default_age_offsets() -> Vec<usize> {
    vec![2, 3, 4, 5]
}

/// Aggregate export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_path")]
    pub path: PathBuf,

    #[serde(default = "default_export_reducer")]
    pub reducer: Reducer,

    #[serde(default)]
    pub grain: Grain,

    /// Header of the key column in the written CSV.
    #[serde(default = "default_key_label")]
    pub key_label: String,

    /// Header of the value column in the written CSV.
    #[serde(default = "default_value_label")]
    pub value_label: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: default_export_path(),
            reducer: default_export_reducer(),
            grain: Grain::default(),
            key_label: default_key_label(),
            value_label: default_value_label(),
        }
    }
}

fn default_export_path() -> PathBuf {
    PathBuf::from("서울특별시 종로구_년_평균_생활쓰레기_발생량.csv")
}

fn default_export_reducer() -> Reducer {
    Reducer::Mean
}

fn default_key_label() -> String {
    "년도".to_string()
}

fn default_value_label() -> String {
    "년_평균_생활쓰레기_발생량".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.data_dir {
            self.general.data_dir = dir.clone();
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }

        if let Some(ref path) = args.waste_file {
            self.waste.path = path.clone();
        }
        if let Some(ref path) = args.composition_file {
            self.composition.path = path.clone();
        }
        if let Some(ref path) = args.household_file {
            self.household.path = path.clone();
        }

        if let Some(year) = args.year {
            self.composition.target_year = year;
        }
        if let Some(policy) = args.residual_policy {
            self.composition.residual_policy = policy;
        }

        if let Some(ref path) = args.export_file {
            self.export.path = path.clone();
        }
        if let Some(reducer) = args.reducer {
            self.export.reducer = reducer;
        }
        if let Some(grain) = args.grain {
            self.export.grain = grain;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Resolve an input or output path against the data directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.general.data_dir.join(path)
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
