//! Prefecture and region group tables.
//!
//! Prefecture rectangles are a coarse stand-in for real administrative
//! boundaries and overlap near borders; lookups take the first rectangle in
//! table order. [`BoundaryLookup`] keeps that choice swappable.

use crate::{Coordinate, GeoError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Region used when nothing else applies (Tokyo)
pub const HOME_REGION: &str = "JP-13";

static REGION_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^JP-(0[1-9]|[1-3][0-9]|4[0-7])$").expect("valid region code regex"));

/// Latitude/longitude rectangle, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        point.latitude >= self.south
            && point.latitude <= self.north
            && point.longitude >= self.west
            && point.longitude <= self.east
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prefecture {
    /// ISO 3166-2 code, `JP-01` through `JP-47`
    pub code: &'static str,
    pub name: &'static str,
    pub bounds: Bounds,
}

impl Prefecture {
    const fn new(code: &'static str, name: &'static str, bounds: Bounds) -> Self {
        Self { code, name, bounds }
    }
}

/// A named group of prefectures shown together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionGroup {
    pub name: &'static str,
    pub prefectures: &'static [&'static str],
    pub description: &'static str,
}

/// All 47 prefectures, in lookup order.
pub static PREFECTURES: &[Prefecture] = &[
    Prefecture::new("JP-13", "東京都", Bounds::new(35.9, 35.4, 140.0, 139.4)),
    Prefecture::new("JP-14", "神奈川県", Bounds::new(35.8, 35.1, 139.8, 139.0)),
    Prefecture::new("JP-12", "千葉県", Bounds::new(36.0, 35.0, 140.8, 139.8)),
    Prefecture::new("JP-11", "埼玉県", Bounds::new(36.5, 35.8, 140.0, 139.0)),
    Prefecture::new("JP-27", "大阪府", Bounds::new(35.0, 34.3, 135.8, 135.2)),
    Prefecture::new("JP-26", "京都府", Bounds::new(35.8, 34.8, 136.2, 135.4)),
    Prefecture::new("JP-28", "兵庫県", Bounds::new(35.8, 34.2, 135.8, 134.2)),
    Prefecture::new("JP-23", "愛知県", Bounds::new(35.5, 34.5, 137.8, 136.8)),
    Prefecture::new("JP-22", "静岡県", Bounds::new(35.8, 34.5, 139.2, 137.8)),
    Prefecture::new("JP-01", "北海道", Bounds::new(45.8, 41.2, 145.8, 139.2)),
    Prefecture::new("JP-02", "青森県", Bounds::new(41.8, 40.2, 141.8, 140.2)),
    Prefecture::new("JP-03", "岩手県", Bounds::new(41.2, 38.5, 142.5, 140.5)),
    Prefecture::new("JP-04", "宮城県", Bounds::new(39.2, 37.8, 141.8, 140.8)),
    Prefecture::new("JP-05", "秋田県", Bounds::new(40.2, 38.8, 141.2, 139.8)),
    Prefecture::new("JP-06", "山形県", Bounds::new(39.2, 37.8, 140.8, 139.8)),
    Prefecture::new("JP-07", "福島県", Bounds::new(38.2, 36.8, 141.2, 139.8)),
    Prefecture::new("JP-08", "茨城県", Bounds::new(36.8, 35.8, 141.2, 139.8)),
    Prefecture::new("JP-09", "栃木県", Bounds::new(37.2, 36.2, 140.2, 139.2)),
    Prefecture::new("JP-10", "群馬県", Bounds::new(37.2, 36.2, 139.8, 138.8)),
    Prefecture::new("JP-15", "新潟県", Bounds::new(38.2, 36.8, 139.8, 137.8)),
    Prefecture::new("JP-16", "富山県", Bounds::new(37.2, 36.2, 138.2, 136.8)),
    Prefecture::new("JP-17", "石川県", Bounds::new(37.8, 36.2, 137.8, 136.2)),
    Prefecture::new("JP-18", "福井県", Bounds::new(36.8, 35.2, 136.8, 135.2)),
    Prefecture::new("JP-19", "山梨県", Bounds::new(36.2, 35.2, 139.2, 138.2)),
    Prefecture::new("JP-20", "長野県", Bounds::new(37.2, 35.2, 139.2, 137.2)),
    Prefecture::new("JP-21", "岐阜県", Bounds::new(36.8, 35.2, 137.8, 136.2)),
    Prefecture::new("JP-24", "三重県", Bounds::new(35.8, 34.2, 137.2, 135.8)),
    Prefecture::new("JP-25", "滋賀県", Bounds::new(35.8, 34.8, 136.8, 135.8)),
    Prefecture::new("JP-29", "奈良県", Bounds::new(35.2, 34.2, 136.2, 135.2)),
    Prefecture::new("JP-30", "和歌山県", Bounds::new(34.8, 33.2, 136.2, 135.2)),
    Prefecture::new("JP-31", "鳥取県", Bounds::new(36.2, 35.2, 134.8, 133.8)),
    Prefecture::new("JP-32", "島根県", Bounds::new(36.2, 34.2, 134.2, 132.2)),
    Prefecture::new("JP-33", "岡山県", Bounds::new(35.8, 34.2, 134.8, 133.2)),
    Prefecture::new("JP-34", "広島県", Bounds::new(35.8, 34.2, 133.8, 132.2)),
    Prefecture::new("JP-35", "山口県", Bounds::new(35.2, 33.8, 132.8, 130.8)),
    Prefecture::new("JP-36", "徳島県", Bounds::new(34.8, 33.2, 135.2, 133.8)),
    Prefecture::new("JP-37", "香川県", Bounds::new(34.8, 34.2, 134.8, 133.8)),
    Prefecture::new("JP-38", "愛媛県", Bounds::new(35.2, 33.2, 134.2, 132.2)),
    Prefecture::new("JP-39", "高知県", Bounds::new(34.2, 32.8, 134.2, 132.8)),
    Prefecture::new("JP-40", "福岡県", Bounds::new(34.2, 33.2, 131.8, 130.2)),
    Prefecture::new("JP-41", "佐賀県", Bounds::new(34.2, 33.2, 130.8, 129.8)),
    Prefecture::new("JP-42", "長崎県", Bounds::new(34.8, 32.2, 130.8, 128.2)),
    Prefecture::new("JP-43", "熊本県", Bounds::new(33.8, 32.2, 131.8, 130.2)),
    Prefecture::new("JP-44", "大分県", Bounds::new(34.2, 32.8, 132.2, 130.8)),
    Prefecture::new("JP-45", "宮崎県", Bounds::new(33.2, 31.8, 132.2, 130.8)),
    Prefecture::new("JP-46", "鹿児島県", Bounds::new(32.8, 30.2, 131.2, 129.2)),
    Prefecture::new("JP-47", "沖縄県", Bounds::new(27.2, 24.2, 129.2, 123.2)),
];

pub static REGION_GROUPS: &[RegionGroup] = &[
    RegionGroup {
        name: "北海道・東北",
        prefectures: &["JP-01", "JP-02", "JP-03", "JP-04", "JP-05", "JP-06", "JP-07"],
        description: "北海道と東北6県の海岸線を表示",
    },
    RegionGroup {
        name: "関東",
        prefectures: &["JP-08", "JP-09", "JP-10", "JP-11", "JP-12", "JP-13", "JP-14"],
        description: "関東7都県の海岸線を表示",
    },
    RegionGroup {
        name: "中部",
        prefectures: &[
            "JP-15", "JP-16", "JP-17", "JP-18", "JP-19", "JP-20", "JP-21", "JP-22", "JP-23",
        ],
        description: "中部9県の海岸線を表示",
    },
    RegionGroup {
        name: "近畿",
        prefectures: &["JP-24", "JP-25", "JP-26", "JP-27", "JP-28", "JP-29", "JP-30"],
        description: "近畿7府県の海岸線を表示",
    },
    RegionGroup {
        name: "中国",
        prefectures: &["JP-31", "JP-32", "JP-33", "JP-34", "JP-35"],
        description: "中国5県の海岸線を表示",
    },
    RegionGroup {
        name: "四国",
        prefectures: &["JP-36", "JP-37", "JP-38", "JP-39"],
        description: "四国4県の海岸線を表示",
    },
    RegionGroup {
        name: "九州・沖縄",
        prefectures: &[
            "JP-40", "JP-41", "JP-42", "JP-43", "JP-44", "JP-45", "JP-46", "JP-47",
        ],
        description: "九州7県と沖縄県の海岸線を表示",
    },
];

/// Prefectures treated as having no coastline.
pub static LANDLOCKED: &[&str] = &[
    "JP-09", "JP-10", "JP-19", "JP-20", "JP-25", "JP-29", "JP-31", "JP-32",
];

/// Prefectures the batch fetcher downloads, in fetch order.
pub static COASTAL_PREFECTURES: &[&str] = &[
    "JP-01", "JP-02", "JP-03", "JP-04", "JP-05", "JP-06", "JP-07", "JP-08", "JP-12", "JP-13",
    "JP-14", "JP-15", "JP-16", "JP-17", "JP-18", "JP-22", "JP-23", "JP-24", "JP-26", "JP-27",
    "JP-28", "JP-30", "JP-31", "JP-32", "JP-33", "JP-34", "JP-35", "JP-37", "JP-38", "JP-39",
    "JP-40", "JP-41", "JP-42", "JP-43", "JP-44", "JP-45", "JP-46", "JP-47",
];

/// Check a region code has the `JP-NN` form with NN in 01..=47.
pub fn validate_region_code(code: &str) -> Result<()> {
    if REGION_CODE.is_match(code) {
        Ok(())
    } else {
        Err(GeoError::InvalidRegionCode(code.to_string()))
    }
}

pub fn prefecture(code: &str) -> Option<&'static Prefecture> {
    PREFECTURES.iter().find(|p| p.code == code)
}

pub fn prefecture_name(code: &str) -> Option<&'static str> {
    prefecture(code).map(|p| p.name)
}

pub fn group_by_name(name: &str) -> Option<&'static RegionGroup> {
    REGION_GROUPS.iter().find(|g| g.name == name)
}

pub fn group_containing(code: &str) -> Option<&'static RegionGroup> {
    REGION_GROUPS.iter().find(|g| g.prefectures.contains(&code))
}

pub fn is_landlocked(code: &str) -> bool {
    LANDLOCKED.contains(&code)
}

/// Region codes covered by a `(region, sub_region)` request.
///
/// A known group name wins; otherwise the group containing `code`; otherwise
/// `code` alone.
pub fn grouping_for(code: &str, sub_region: Option<&str>) -> Vec<String> {
    sub_region
        .and_then(group_by_name)
        .or_else(|| group_containing(code))
        .map(|g| g.prefectures.iter().map(|c| c.to_string()).collect())
        .unwrap_or_else(|| vec![code.to_string()])
}

/// Position → region code strategy.
pub trait BoundaryLookup: Send + Sync {
    fn region_for(&self, point: &Coordinate) -> &str;
}

/// Rectangle table lookup, falling back to a home region.
#[derive(Debug, Clone)]
pub struct RectBoundaryLookup {
    home: String,
}

impl RectBoundaryLookup {
    pub fn new(home: impl Into<String>) -> Self {
        Self { home: home.into() }
    }
}

impl Default for RectBoundaryLookup {
    fn default() -> Self {
        Self::new(HOME_REGION)
    }
}

impl BoundaryLookup for RectBoundaryLookup {
    fn region_for(&self, point: &Coordinate) -> &str {
        PREFECTURES
            .iter()
            .find(|p| p.bounds.contains(point))
            .map(|p| p.code)
            .unwrap_or(self.home.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tables_are_complete() {
        assert_eq!(PREFECTURES.len(), 47);
        assert_eq!(REGION_GROUPS.len(), 7);
        assert_eq!(COASTAL_PREFECTURES.len(), 38);

        let codes: HashSet<_> = PREFECTURES.iter().map(|p| p.code).collect();
        assert_eq!(codes.len(), 47);
        for code in &codes {
            assert!(validate_region_code(code).is_ok(), "{}", code);
        }

        let grouped: usize = REGION_GROUPS.iter().map(|g| g.prefectures.len()).sum();
        assert_eq!(grouped, 47);
    }

    #[test]
    fn test_rect_lookup() {
        let lookup = RectBoundaryLookup::default();
        assert_eq!(lookup.region_for(&Coordinate::new(35.68, 139.77)), "JP-13");
        assert_eq!(lookup.region_for(&Coordinate::new(34.69, 135.50)), "JP-27");
        assert_eq!(lookup.region_for(&Coordinate::new(43.06, 141.35)), "JP-01");
        assert_eq!(lookup.region_for(&Coordinate::new(26.21, 127.68)), "JP-47");
    }

    #[test]
    fn test_rect_lookup_falls_back_to_home() {
        assert_eq!(RectBoundaryLookup::default().region_for(&Coordinate::new(0.0, 0.0)), "JP-13");
        let lookup = RectBoundaryLookup::new("JP-27");
        assert_eq!(lookup.region_for(&Coordinate::new(51.5, -0.12)), "JP-27");
    }

    #[test]
    fn test_grouping() {
        assert_eq!(grouping_for("JP-13", None).len(), 7);
        assert_eq!(grouping_for("JP-13", Some("四国")), vec!["JP-36", "JP-37", "JP-38", "JP-39"]);
        // Unknown group name falls back to the containing group
        assert!(grouping_for("JP-27", Some("unknown")).contains(&"JP-27".to_string()));
        assert_eq!(grouping_for("JP-99", None), vec!["JP-99"]);
    }

    #[test]
    fn test_lookups() {
        assert_eq!(prefecture_name("JP-13"), Some("東京都"));
        assert_eq!(prefecture_name("JP-00"), None);
        assert_eq!(group_containing("JP-47").map(|g| g.name), Some("九州・沖縄"));
        assert!(is_landlocked("JP-20"));
        assert!(!is_landlocked("JP-13"));
    }

    #[test]
    fn test_validate_region_code() {
        assert!(validate_region_code("JP-01").is_ok());
        assert!(validate_region_code("JP-47").is_ok());
        assert!(validate_region_code("JP-48").is_err());
        assert!(validate_region_code("JP-00").is_err());
        assert!(validate_region_code("jp-13").is_err());
        assert!(validate_region_code("../etc").is_err());
    }
}
