//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{AnalysisKind, Grain, Reducer, ResidualPolicy};
use clap::Parser;
use std::path::PathBuf;

/// WasteTrend - municipal waste and single-person household aggregation
///
/// Reads monthly waste, waste-composition and single-person household
/// CSV files, aggregates them per year or month and reports trends,
/// correlations and composition breakdowns.
///
/// Examples:
///   wastetrend --analysis annual-trend
///   wastetrend --analysis correlation --format json
///   wastetrend --analysis composition --year 2020 --residual-policy clamp
///   wastetrend --analysis export --grain month --reducer sum --export-file monthly.csv
///   wastetrend --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Analysis to run
    #[arg(short, long, value_enum, default_value_t = AnalysisKind::AnnualTrend)]
    pub analysis: AnalysisKind,

    /// Path to configuration file
    ///
    /// If not specified, looks for .wastetrend.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory that relative input and export paths resolve against
    #[arg(short, long, value_name = "DIR", env = "WASTETREND_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Monthly waste generation CSV
    #[arg(long, value_name = "FILE")]
    pub waste_file: Option<PathBuf>,

    /// Wide single-person household CSV
    #[arg(long, value_name = "FILE")]
    pub household_file: Option<PathBuf>,

    /// Food waste / recycling CSV
    #[arg(long, value_name = "FILE")]
    pub composition_file: Option<PathBuf>,

    /// Year to break down for the composition analysis
    #[arg(short, long, value_name = "YEAR")]
    pub year: Option<i32>,

    /// Reducer for the export analysis (sum, mean)
    #[arg(long, value_name = "REDUCER")]
    pub reducer: Option<Reducer>,

    /// Grouping granularity for the export analysis
    #[arg(long, value_name = "GRAIN")]
    pub grain: Option<Grain>,

    /// What to do when food and recycled waste exceed the total
    #[arg(long, value_name = "POLICY")]
    pub residual_policy: Option<ResidualPolicy>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Also write the rendered report to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Destination of the export analysis CSV
    #[arg(long, value_name = "FILE")]
    pub export_file: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .wastetrend.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(year) = self.year {
            if !(1900..=2100).contains(&year) {
                return Err(format!("Year must be between 1900 and 2100, got {}", year));
            }
        }

        if let Some(ref config) = self.config {
            if !config.is_file() {
                return Err(format!("Config file does not exist: {}", config.display()));
            }
        }

        if let Some(ref dir) = self.data_dir {
            if !dir.is_dir() {
                return Err(format!(
                    "Data directory does not exist: {}",
                    dir.display()
                ));
            }
        }

        if self.analysis != AnalysisKind::Export
            && (self.export_file.is_some() || self.reducer.is_some() || self.grain.is_some())
        {
            return Err(
                "--export-file, --reducer and --grain only apply to --analysis export".to_string(),
            );
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet` wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn make_args() -> Args {
        Args {
            analysis: AnalysisKind::AnnualTrend,
            config: None,
            data_dir: None,
            waste_file: None,
            household_file: None,
            composition_file: None,
            year: None,
            reducer: None,
            grain: None,
            residual_policy: None,
            format: OutputFormat::Markdown,
            output: None,
            export_file: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "wastetrend",
            "--analysis",
            "young-household-trend",
            "--format",
            "json",
            "--residual-policy",
            "clamp",
        ])
        .unwrap();

        assert_eq!(args.analysis, AnalysisKind::YoungHouseholdTrend);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.residual_policy, Some(ResidualPolicy::Clamp));
        assert_eq!(args.year, None);
    }

    #[test]
    fn test_export_flags_parse() {
        let args = Args::try_parse_from([
            "wastetrend",
            "-a",
            "export",
            "--grain",
            "month-of-year",
            "--reducer",
            "sum",
        ])
        .unwrap();

        assert_eq!(args.grain, Some(Grain::MonthOfYear));
        assert_eq!(args.reducer, Some(Reducer::Sum));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_year_range() {
        let mut args = make_args();
        args.year = Some(19);
        assert!(args.validate().is_err());

        args.year = Some(2019);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_export_flags_need_export() {
        let mut args = make_args();
        args.grain = Some(Grain::Month);
        assert!(args.validate().is_err());

        args.analysis = AnalysisKind::Export;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_config_file() {
        let mut args = make_args();
        args.config = Some(PathBuf::from("/nonexistent/.wastetrend.toml"));
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }

    #[test]
    fn test_merge_overrides_config() {
        let mut args = make_args();
        args.data_dir = Some(PathBuf::from("/srv/data"));
        args.year = Some(2021);
        args.reducer = Some(Reducer::Sum);
        args.verbose = true;

        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.general.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.composition.target_year, 2021);
        assert_eq!(config.export.reducer, Reducer::Sum);
        assert_eq!(config.export.grain, Grain::Year);
        assert!(config.general.verbose);
    }
}
