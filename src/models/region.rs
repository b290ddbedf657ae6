//! US region buckets and state-abbreviation classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Geographic bucket an address is scoped to.
///
/// Each region corresponds to one Geofabrik North America extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Midwest,
    Northeast,
    Pacific,
    South,
    West,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("no recognized state abbreviation in address '{0}'")]
    Unclassified(String),
}

impl Region {
    /// All regions in their fixed processing order
    pub fn all() -> &'static [Region] {
        &[
            Region::Midwest,
            Region::Northeast,
            Region::Pacific,
            Region::South,
            Region::West,
        ]
    }

    /// State abbreviations that belong to this region
    pub fn states(&self) -> &'static [&'static str] {
        match self {
            Region::Midwest => &[
                "ND", "SD", "NE", "KS", "MO", "IL", "IN", "OH", "MI", "WI", "MN", "IA",
            ],
            Region::Northeast => &["ME", "NH", "VT", "MA", "RI", "CT", "NY", "PA", "NJ"],
            Region::Pacific => &["AK", "HI"],
            Region::South => &[
                "TX", "OK", "AR", "LA", "MS", "AL", "FL", "GA", "SC", "NC", "VA", "DE", "MD",
                "WV", "KY", "TN", "DC",
            ],
            Region::West => &[
                "WA", "OR", "CA", "AZ", "NM", "CO", "WY", "MT", "ID", "NV", "UT",
            ],
        }
    }

    /// Look up the region a state abbreviation belongs to
    pub fn from_state(abbr: &str) -> Option<Self> {
        Region::all()
            .iter()
            .copied()
            .find(|region| region.states().contains(&abbr))
    }

    /// Lowercase name used in config keys and output
    pub fn name(&self) -> &'static str {
        match self {
            Region::Midwest => "midwest",
            Region::Northeast => "northeast",
            Region::Pacific => "pacific",
            Region::South => "south",
            Region::West => "west",
        }
    }

    /// Geofabrik extract name, e.g. "us-midwest"
    pub fn extract_name(&self) -> &'static str {
        match self {
            Region::Midwest => "us-midwest",
            Region::Northeast => "us-northeast",
            Region::Pacific => "us-pacific",
            Region::South => "us-south",
            Region::West => "us-west",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::all()
            .iter()
            .copied()
            .find(|region| region.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown region '{}'", s))
    }
}

/// Classify a free-text address into a region.
///
/// The address is split on commas and the first two-character token that is a
/// known state abbreviation decides the region. Tokens are compared as written,
/// so lowercase abbreviations are not recognized.
pub fn classify(address: &str) -> Result<Region, ClassificationError> {
    address
        .split(',')
        .map(str::trim)
        .filter(|token| token.len() == 2)
        .find_map(Region::from_state)
        .ok_or_else(|| ClassificationError::Unclassified(address.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_states() {
        assert_eq!(classify("123 Main St, Chicago, IL"), Ok(Region::Midwest));
        assert_eq!(
            classify("1 Market St, San Francisco, CA"),
            Ok(Region::West)
        );
        assert_eq!(classify("10 Elm St, Boston, MA, 02101"), Ok(Region::Northeast));
        assert_eq!(classify("5 Palm Ave, Honolulu, HI"), Ok(Region::Pacific));
        assert_eq!(classify("1600 Pennsylvania Ave, Washington, DC"), Ok(Region::South));
    }

    #[test]
    fn test_classify_uses_first_state_token() {
        // "IN" is Indiana, reached before "OH"
        assert_eq!(classify("1 Road, IN, OH"), Ok(Region::Midwest));
        // Two-letter tokens that aren't states are passed over
        assert_eq!(classify("Apt 4, ZZ, Austin, TX"), Ok(Region::South));
    }

    #[test]
    fn test_classify_unrecognized() {
        let err = classify("221B Baker Street, London, UK").unwrap_err();
        assert_eq!(
            err,
            ClassificationError::Unclassified("221B Baker Street, London, UK".to_string())
        );
        assert!(classify("").is_err());
        assert!(classify("1 Oak Dr, Columbus, oh").is_err());
    }

    #[test]
    fn test_classify_is_deterministic() {
        let address = "1 Oak Dr, Columbus, OH";
        assert_eq!(classify(address), classify(address));
    }

    #[test]
    fn test_every_state_belongs_to_one_region() {
        for region in Region::all() {
            for state in region.states() {
                assert_eq!(Region::from_state(state), Some(*region), "{}", state);
            }
        }
    }

    #[test]
    fn test_region_from_str() {
        assert_eq!("South".parse::<Region>(), Ok(Region::South));
        assert_eq!(" pacific ".parse::<Region>(), Ok(Region::Pacific));
        assert!("atlantis".parse::<Region>().is_err());
    }
}
