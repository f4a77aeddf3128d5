//! Raw Overpass download

use super::{print_json, progress_bar};
use crate::OutputFormat;
use anyhow::{bail, Result};
use coastwalk_cli::output::Status;
use coastwalk_cli::progress;
use coastwalk_core::config::Config;
use coastwalk_geo::region::{validate_region_code, COASTAL_PREFECTURES};
use coastwalk_store::{OverpassClient, OverpassTarget, RawDataDir};
use coastwalk_telemetry::metrics;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct FetchSummary {
    raw_dir: String,
    downloaded: Vec<String>,
    failed: Vec<FailedRegion>,
    elapsed_ms: u128,
}

#[derive(Debug, Serialize)]
struct FailedRegion {
    region: String,
    error: String,
}

/// Download every batch of each region, pausing between regions
pub async fn run(
    config: &Config,
    regions: Vec<String>,
    raw_dir: Option<PathBuf>,
    pause_secs: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let regions = if regions.is_empty() {
        COASTAL_PREFECTURES.iter().map(|c| c.to_string()).collect()
    } else {
        regions
    };
    for code in &regions {
        validate_region_code(code)?;
    }

    let overpass = &config.schema.overpass;
    let client = OverpassClient::new(&overpass.url, overpass.timeout_secs)?;
    let raw = RawDataDir::new(raw_dir.unwrap_or_else(|| PathBuf::from(&config.schema.store.raw_dir)));
    let pause = Duration::from_secs(pause_secs.unwrap_or(overpass.pause_secs));

    if format == OutputFormat::Text {
        Status::header(&format!("Fetching {} regions from {}", regions.len(), overpass.url));
    }

    let start = Instant::now();
    let pb = progress_bar(format, regions.len(), "Downloading");
    let mut downloaded = Vec::new();
    let mut failed = Vec::new();

    for (index, code) in regions.iter().enumerate() {
        if index > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        pb.set_message(code.clone());

        match fetch_region(&client, &raw, code).await {
            Ok(()) => downloaded.push(code.clone()),
            Err(e) => {
                warn!(region = %code, error = %e, "region download failed");
                failed.push(FailedRegion {
                    region: code.clone(),
                    error: e.to_string(),
                });
            }
        }
        pb.inc(1);
    }

    if failed.is_empty() {
        progress::finish_success(&pb, "Download complete");
    } else {
        progress::finish_error(&pb, &format!("{} regions failed", failed.len()));
    }
    info!(downloaded = downloaded.len(), failed = failed.len(), "fetch finished");

    let summary = FetchSummary {
        raw_dir: raw.root().display().to_string(),
        downloaded,
        failed,
        elapsed_ms: start.elapsed().as_millis(),
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            for failure in &summary.failed {
                Status::error(&format!("{}: {}", failure.region, failure.error));
            }
            Status::success(&format!(
                "{} downloaded into {} in {}",
                coastwalk_cli::output::format_count(summary.downloaded.len(), "region", "regions"),
                summary.raw_dir,
                coastwalk_cli::output::format_duration(start.elapsed())
            ));
        }
    }

    if !summary.failed.is_empty() {
        bail!("{} of {} regions failed to download", summary.failed.len(), regions.len());
    }
    Ok(())
}

async fn fetch_region(client: &OverpassClient, raw: &RawDataDir, code: &str) -> coastwalk_store::StoreResult<()> {
    for target in OverpassTarget::ALL {
        let bytes = client.fetch(code, target).await?;
        raw.write(code, target, &bytes).await?;
        metrics().increment("overpass.batches");
        metrics().increment_by("overpass.bytes", bytes.len() as u64);
    }
    Ok(())
}
