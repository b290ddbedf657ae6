//! Core data models for address feature extraction.

pub mod address;
pub mod feature;
pub mod region;

pub use address::{Address, GeoPoint};
pub use feature::{FeatureType, GeometryKind};
pub use region::{classify, ClassificationError, Region};
