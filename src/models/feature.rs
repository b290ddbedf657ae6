//! OSM feature categories queried around each address.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a feature type is matched against a search box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    /// Topologically thin features matched by intersection
    Line,
    /// Areal features matched by bounding-range containment
    Area,
}

/// OSM key whose values are aggregated (e.g. `highway=motorway`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Building,
    Highway,
    Landuse,
}

impl FeatureType {
    pub fn all() -> &'static [FeatureType] {
        &[
            FeatureType::Building,
            FeatureType::Highway,
            FeatureType::Landuse,
        ]
    }

    /// The OSM tag key, which is also the GeoJSON property holding the value
    pub fn key(&self) -> &'static str {
        match self {
            FeatureType::Building => "building",
            FeatureType::Highway => "highway",
            FeatureType::Landuse => "landuse",
        }
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            FeatureType::Highway => GeometryKind::Line,
            FeatureType::Building | FeatureType::Landuse => GeometryKind::Area,
        }
    }

    /// Single uppercase letter appended to output column names
    pub fn column_suffix(&self) -> char {
        match self {
            FeatureType::Building => 'B',
            FeatureType::Highway => 'H',
            FeatureType::Landuse => 'L',
        }
    }

    /// Count column for a tag, e.g. `residential_L`
    pub fn count_column(&self, tag: &str) -> String {
        format!("{}_{}", tag, self.column_suffix())
    }

    /// Area column for a tag, e.g. `residential_L_area`
    pub fn area_column(&self, tag: &str) -> String {
        format!("{}_area", self.count_column(tag))
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FeatureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureType::all()
            .iter()
            .copied()
            .find(|ft| ft.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown feature type '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        assert_eq!(FeatureType::Landuse.count_column("residential"), "residential_L");
        assert_eq!(
            FeatureType::Highway.area_column("motorway"),
            "motorway_H_area"
        );
        assert_eq!(FeatureType::Building.count_column("yes"), "yes_B");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(FeatureType::Highway.kind(), GeometryKind::Line);
        assert_eq!(FeatureType::Building.kind(), GeometryKind::Area);
        assert_eq!(FeatureType::Landuse.kind(), GeometryKind::Area);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Highway".parse::<FeatureType>(), Ok(FeatureType::Highway));
        assert!("amenity".parse::<FeatureType>().is_err());
    }
}
