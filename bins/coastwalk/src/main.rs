//! coastwalk - coastline geometry pipeline and collection tracker
//!
//! `fetch` downloads raw Overpass batches, `process` turns them into
//! published boundary and coastline documents, `resolve` serves a region's
//! merged geometry and `check` evaluates a position against it.

use clap::{Parser, Subcommand, ValueEnum};
use coastwalk_core::config::Config;
use coastwalk_core::error::exit_codes;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

mod backend;
mod commands;
mod exit;

use commands::{check, fetch, process, regions, resolve};

/// Coastline geometry pipeline and collection tracker
#[derive(Parser)]
#[command(name = "coastwalk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to coastwalk.toml in the current directory)
    #[arg(short, long, global = true, env = "COASTWALK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print collected metrics to stderr when done
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Download raw Overpass batches for coastal prefectures
    Fetch {
        /// Region codes to download (all coastal prefectures if not specified)
        regions: Vec<String>,

        /// Directory receiving the raw batches
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Seconds to wait between regions
        #[arg(long)]
        pause_secs: Option<u64>,
    },

    /// Assemble raw batches and publish processed geometry
    Process {
        /// Region codes to process (every downloaded region if not specified)
        regions: Vec<String>,

        /// Directory holding the raw batches
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Publish to remote object storage instead of the processed directory
        #[arg(long)]
        remote: bool,
    },

    /// Print the merged geometry of a region and its group
    Resolve {
        /// Region code of the request
        #[arg(short, long, default_value = coastwalk_geo::HOME_REGION)]
        prefecture: String,

        /// Region group name (for example 関東)
        #[arg(short, long)]
        region: Option<String>,

        /// Fall back to the built-in sample when nothing is available
        #[arg(long)]
        sample_fallback: bool,

        /// Read from remote object storage instead of the processed directory
        #[arg(long)]
        remote: bool,
    },

    /// Check a position and record newly collected areas
    Check {
        /// User the collection belongs to
        user_id: String,

        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Region code (looked up from the position if not specified)
        #[arg(short, long)]
        prefecture: Option<String>,

        /// Region group name
        #[arg(short, long)]
        region: Option<String>,

        /// Collected-areas file (overrides the configuration)
        #[arg(long)]
        collection_file: Option<PathBuf>,

        /// Read from remote object storage instead of the processed directory
        #[arg(long)]
        remote: bool,
    },

    /// List prefectures and region groups
    Regions,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            exit::report(&anyhow::Error::from(e), cli.format);
            return ExitCode::from(exit_codes::CONFIG_ERROR as u8);
        }
    };

    let _guard = match init_telemetry(&config, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            return ExitCode::from(exit_codes::CONFIG_ERROR as u8);
        }
    };

    let result = match cli.command {
        Commands::Fetch {
            regions,
            raw_dir,
            pause_secs,
        } => fetch::run(&config, regions, raw_dir, pause_secs, cli.format).await,

        Commands::Process {
            regions,
            raw_dir,
            remote,
        } => process::run(&config, regions, raw_dir, remote, cli.format).await,

        Commands::Resolve {
            prefecture,
            region,
            sample_fallback,
            remote,
        } => {
            resolve::run(
                &config,
                &prefecture,
                region.as_deref(),
                sample_fallback,
                remote,
                cli.format,
            )
            .await
        }

        Commands::Check {
            user_id,
            lat,
            lon,
            prefecture,
            region,
            collection_file,
            remote,
        } => {
            let request = check::CheckRequest {
                user_id,
                latitude: lat,
                longitude: lon,
                prefecture,
                region,
                collection_file,
                remote,
            };
            check::run(&config, request, cli.format).await
        }

        Commands::Regions => regions::run(cli.format),
    };

    if cli.metrics {
        match serde_json::to_string_pretty(&coastwalk_telemetry::metrics().snapshot()) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => tracing::warn!(error = %e, "could not serialize metrics"),
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            exit::report(&e, cli.format);
            ExitCode::from(exit::code_for(&e) as u8)
        }
    }
}

fn init_telemetry(
    config: &Config,
    verbose: bool,
) -> anyhow::Result<Option<coastwalk_telemetry::WorkerGuard>> {
    let logging = &config.schema.logging;
    let mut telemetry = coastwalk_telemetry::TelemetryConfig::new(&logging.level, &logging.format);
    if let Some(dir) = &logging.directory {
        telemetry = telemetry.with_log_directory(dir);
    }
    if verbose {
        telemetry = telemetry.verbose();
    }
    coastwalk_telemetry::init_with_config(telemetry)
}
