//! CLI command implementations

pub mod check;
pub mod fetch;
pub mod process;
pub mod regions;
pub mod resolve;

use crate::OutputFormat;
use serde::Serialize;

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Progress bars only make sense for humans
pub(crate) fn progress_bar(format: OutputFormat, total: usize, message: &str) -> indicatif::ProgressBar {
    match format {
        OutputFormat::Text => coastwalk_cli::progress::region_progress(total as u64, message),
        OutputFormat::Json => coastwalk_cli::progress::hidden(),
    }
}
