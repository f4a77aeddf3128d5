//! Raw batches → published boundaries and coastline

use super::{print_json, progress_bar};
use crate::backend::Backend;
use crate::OutputFormat;
use anyhow::{bail, Result};
use coastwalk_cli::output::{format_count, format_duration, Status};
use coastwalk_cli::progress;
use coastwalk_core::config::Config;
use coastwalk_geo::region::validate_region_code;
use coastwalk_geo::{process_regions, RegionInput};
use coastwalk_store::{GeometryStore, RawDataDir};
use coastwalk_telemetry::{metrics, Timer};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;

#[derive(Debug, Serialize)]
struct RegionReport {
    region: String,
    published: bool,
    boundaries: usize,
    coastline_segments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RegionReport {
    fn failed(region: &str, error: impl ToString) -> Self {
        Self {
            region: region.to_string(),
            published: false,
            boundaries: 0,
            coastline_segments: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Process regions on a rayon pool, then publish each one that succeeded
///
/// A region is only published once both its documents are built, so a
/// failure never replaces earlier geometry with a partial document.
pub async fn run(
    config: &Config,
    regions: Vec<String>,
    raw_dir: Option<PathBuf>,
    remote: bool,
    format: OutputFormat,
) -> Result<()> {
    let raw = RawDataDir::new(raw_dir.unwrap_or_else(|| PathBuf::from(&config.schema.store.raw_dir)));
    let regions = if regions.is_empty() { raw.regions().await? } else { regions };
    for code in &regions {
        validate_region_code(code)?;
    }
    if regions.is_empty() {
        bail!("no raw data found under {}", raw.root().display());
    }

    let store = Backend::from_config(config, remote)?;
    let start = Instant::now();

    if format == OutputFormat::Text {
        Status::header(&format!("Processing {} into {}", format_count(regions.len(), "region", "regions"), store.describe()));
    }

    let mut reports = Vec::new();
    let mut inputs: Vec<RegionInput> = Vec::new();
    for code in &regions {
        match raw.read_region(code).await {
            Ok(input) => inputs.push(input),
            Err(e) => {
                warn!(region = %code, error = %e, "raw data incomplete");
                reports.push(RegionReport::failed(code, e));
            }
        }
    }

    let timer = Timer::start("process.assemble_ms");
    let processed = tokio::task::spawn_blocking(move || process_regions(&inputs)).await?;
    timer.stop();

    let pb = progress_bar(format, processed.len(), "Publishing");
    for (code, result) in processed {
        pb.set_message(code.clone());
        let report = match result {
            Ok(region) => match store.publish_region(&region).await {
                Ok(published) => RegionReport {
                    region: code,
                    published: true,
                    boundaries: published,
                    coastline_segments: region.coastline.segment_count(),
                    error: None,
                },
                Err(e) => {
                    warn!(region = %code, error = %e, "publish failed");
                    RegionReport::failed(&code, e)
                }
            },
            Err(e) => RegionReport::failed(&code, e),
        };
        reports.push(report);
        pb.inc(1);
    }

    let failed = reports.iter().filter(|r| !r.published).count();
    metrics().gauge("process.regions_published", (reports.len() - failed) as u64);
    metrics().gauge("process.regions_failed", failed as u64);
    if failed == 0 {
        progress::finish_success(&pb, "Published");
    } else {
        progress::finish_error(&pb, &format!("{} regions failed", failed));
    }

    match format {
        OutputFormat::Json => print_json(&reports)?,
        OutputFormat::Text => {
            for report in &reports {
                match &report.error {
                    None => Status::success(&format!(
                        "{}: {} and {}",
                        report.region,
                        format_count(report.boundaries, "boundary", "boundaries"),
                        format_count(report.coastline_segments, "coastline segment", "coastline segments"),
                    )),
                    Some(error) => Status::error(&format!("{}: {}", report.region, error)),
                }
            }
            Status::info(&format!("Finished in {}", format_duration(start.elapsed())));
        }
    }

    if failed > 0 {
        bail!("{} of {} regions failed", failed, reports.len());
    }
    Ok(())
}
