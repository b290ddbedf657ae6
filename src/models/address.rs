//! Address records read from the input table.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Parse a coordinate pair written as `(lat, lon)`, `lat, lon` or `lat lon`
    pub fn parse(text: &str) -> Option<Self> {
        static PAIR: OnceLock<Regex> = OnceLock::new();
        let re = PAIR.get_or_init(|| {
            Regex::new(r"^\s*\(?\s*([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)\s*[,\s]\s*([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)\s*\)?\s*$")
                .expect("coordinate pattern is valid")
        });
        let caps = re.captures(text)?;
        let lat = caps[1].parse().ok()?;
        let lon = caps[2].parse().ok()?;
        Some(Self { lat, lon })
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

/// A known address to extract context features around.
///
/// Immutable once read; the region is derived later and kept alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Opaque identifier carried through to the output
    pub id: String,
    /// Free-text address, expected to contain a two-letter state token
    pub address: String,
    pub location: GeoPoint,
    /// Optional outcome label (e.g. shipping)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Address {
    pub fn new(id: impl Into<String>, address: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            location,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
