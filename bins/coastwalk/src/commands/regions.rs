//! Prefecture and region group listing

use super::print_json;
use crate::OutputFormat;
use anyhow::Result;
use coastwalk_cli::output::Status;
use coastwalk_geo::region::{group_containing, is_landlocked, RegionGroup, PREFECTURES, REGION_GROUPS};
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PrefectureRow {
    code: &'static str,
    name: &'static str,
    coastal: bool,
    group: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct Listing {
    prefectures: Vec<PrefectureRow>,
    groups: &'static [RegionGroup],
}

pub fn run(format: OutputFormat) -> Result<()> {
    let mut prefectures: Vec<PrefectureRow> = PREFECTURES
        .iter()
        .map(|p| PrefectureRow {
            code: p.code,
            name: p.name,
            coastal: !is_landlocked(p.code),
            group: group_containing(p.code).map(|g| g.name),
        })
        .collect();
    prefectures.sort_by_key(|p| p.code);

    if format == OutputFormat::Json {
        return print_json(&Listing {
            prefectures,
            groups: REGION_GROUPS,
        });
    }

    Status::header("Region groups");
    for group in REGION_GROUPS {
        println!("  {}  {}", group.name.bold(), group.prefectures.join(" ").dimmed());
    }

    Status::header("Prefectures");
    for p in &prefectures {
        let marker = if p.coastal { "coastal" } else { "inland" };
        println!("  {}  {}  {}", p.code, p.name, marker.dimmed());
    }
    Ok(())
}
