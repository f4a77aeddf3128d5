//! Region resolution

use super::print_json;
use crate::backend::Backend;
use crate::OutputFormat;
use anyhow::Result;
use coastwalk_cli::output::{format_count, Status};
use coastwalk_core::config::Config;
use coastwalk_geo::region::{prefecture_name, validate_region_code};
use coastwalk_resolver::{RegionResolver, Resolution};

pub async fn run(
    config: &Config,
    prefecture: &str,
    region: Option<&str>,
    sample_fallback: bool,
    remote: bool,
    format: OutputFormat,
) -> Result<()> {
    validate_region_code(prefecture)?;

    let store = Backend::from_config(config, remote)?;
    let resolver = RegionResolver::from_config(store, &config.schema.cache)?;

    let resolution = if sample_fallback {
        resolver.resolve_or_sample(prefecture, region).await
    } else {
        Resolution {
            payload: resolver.resolve(prefecture, region).await?,
            using_sample: false,
            error: None,
        }
    };

    if let Some(error) = &resolution.error {
        Status::warning(&format!("Showing sample geometry: {}", error));
    }

    match format {
        OutputFormat::Json => print_json(&resolution.response_envelope()),
        OutputFormat::Text => {
            print_summary(&resolution);
            Ok(())
        }
    }
}

fn print_summary(resolution: &Resolution) {
    let payload = &resolution.payload;
    Status::header(if resolution.using_sample { "Sample geometry" } else { "Resolved geometry" });

    for code in &payload.covered_region_codes {
        println!("  {} {}", code, prefecture_name(code).unwrap_or("?"));
    }
    Status::info(&format!(
        "{} and {}",
        format_count(payload.polygons.len(), "boundary", "boundaries"),
        format_count(payload.coastline.segment_count(), "coastline segment", "coastline segments"),
    ));
}
