//! WasteTrend - municipal waste and single-person household aggregation
//!
//! A CLI tool that loads monthly waste, composition and household
//! statistics from CSV, groups them by year or month, and reports
//! trends, correlations and composition breakdowns.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing file, schema mismatch, degenerate aggregate, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod ingest;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Where the active configuration came from.
#[derive(Debug)]
enum ConfigSource {
    Explicit(PathBuf),
    WorkingDir,
    Builtin,
    /// The default file exists but could not be used.
    Fallback(String),
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // The config file may turn on verbose logging, so it is read first
    let loaded = load_config(&args);
    let config_verbose = loaded
        .as_ref()
        .map(|(config, _)| config.general.verbose)
        .unwrap_or(false);
    init_logging(&args, config_verbose);

    info!("WasteTrend v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let outcome = loaded.and_then(|(config, source)| {
        report_config_source(&source);
        run(&args, config)
    });

    if let Err(e) = outcome {
        error!("Analysis failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .wastetrend.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to point at your CSV files and adjust column names.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = args.log_level(config_verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::WorkingDir)),
        Ok(None) => Ok((Config::default(), ConfigSource::Builtin)),
        Err(e) => Ok((Config::default(), ConfigSource::Fallback(format!("{:#}", e)))),
    }
}

fn report_config_source(source: &ConfigSource) {
    match source {
        ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
        ConfigSource::WorkingDir => info!("Loaded default config from {}", CONFIG_FILE_NAME),
        ConfigSource::Builtin => debug!("No config file found, using defaults"),
        ConfigSource::Fallback(reason) => {
            warn!("Failed to load {}: {}; using defaults", CONFIG_FILE_NAME, reason)
        }
    }
}

/// Run the selected analysis and emit the report.
fn run(args: &Args, mut config: Config) -> Result<()> {
    config.merge_with_args(args);
    debug!("Data directory: {}", config.general.data_dir.display());

    let report = analysis::pipeline::run(args.analysis, &config)
        .with_context(|| format!("{} analysis failed", args.analysis.title()))?;

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    if let Some(ref path) = config.general.output {
        std::fs::write(path, &output)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report saved to {}", path.display());
    }

    // The export CSV goes last so a failed render leaves nothing behind
    analysis::pipeline::write_export(&config, &report).context("Failed to write export CSV")?;

    println!("{}", output);
    Ok(())
}
