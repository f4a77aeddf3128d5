//! Position check against the resolved region

use super::print_json;
use crate::backend::Backend;
use crate::OutputFormat;
use anyhow::Result;
use coastwalk_cli::output::{format_distance_km, Status};
use coastwalk_core::config::Config;
use coastwalk_geo::region::validate_region_code;
use coastwalk_geo::{BoundaryLookup, Coordinate, GeoError, ProximityConfig, RectBoundaryLookup};
use coastwalk_resolver::{CheckOutcome, RegionResolver, Tracker};
use coastwalk_store::JsonlCollectionStore;
use std::path::PathBuf;
use tracing::debug;

/// Arguments of `coastwalk check`
pub struct CheckRequest {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub prefecture: Option<String>,
    pub region: Option<String>,
    pub collection_file: Option<PathBuf>,
    pub remote: bool,
}

pub async fn run(config: &Config, request: CheckRequest, format: OutputFormat) -> Result<()> {
    let position = Coordinate::new(request.latitude, request.longitude);
    if !position.is_valid() {
        return Err(GeoError::InvalidCoordinate(format!(
            "({}, {})",
            request.latitude, request.longitude
        ))
        .into());
    }

    let schema = &config.schema;
    let prefecture = match request.prefecture {
        Some(code) => code,
        None => RectBoundaryLookup::new(&schema.proximity.home_region)
            .region_for(&position)
            .to_string(),
    };
    validate_region_code(&prefecture)?;
    debug!(prefecture = %prefecture, "checking position");

    let store = Backend::from_config(config, request.remote)?;
    let resolver = RegionResolver::from_config(store, &schema.cache)?;
    let resolution = resolver
        .resolve_or_sample(&prefecture, request.region.as_deref())
        .await;

    let collections = JsonlCollectionStore::new(
        request
            .collection_file
            .unwrap_or_else(|| PathBuf::from(&schema.collection.path)),
    );
    let tracker = Tracker::new(collections)
        .with_threshold_km(schema.collection.threshold_km)
        .with_proximity(ProximityConfig {
            sample_budget: schema.proximity.sample_budget,
            early_exit_km: schema.proximity.early_exit_km,
        });

    let outcome = tracker.check(&request.user_id, &position, &resolution).await?;

    match format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Text => {
            print_outcome(&outcome);
            Ok(())
        }
    }
}

fn print_outcome(outcome: &CheckOutcome) {
    if outcome.using_sample {
        Status::warning("No region data available; showing sample geometry, nothing will be saved");
    }

    let area = outcome.area_name.as_deref().unwrap_or("outside every known area");
    let distance = format_distance_km(outcome.distance_km.unwrap_or(f64::INFINITY));
    Status::info(&format!("{} ({} from the coast)", area, distance));

    if outcome.collected {
        Status::success(&format!("Collected {}", area));
    } else if outcome.should_collect {
        Status::info("Within range, but not saved");
    }
}
