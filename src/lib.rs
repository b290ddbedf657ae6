//! Waypost - OSM context features around known addresses
//!
//! Partitions addresses into US regions, queries each region's OSM geometry
//! collection around every address, and turns the matches into per-tag
//! count/area columns for a downstream classifier.

pub mod config;
pub mod features;
pub mod models;
pub mod spatial;

pub use config::{Config, ExtractionConfig};
pub use features::{FeatureTable, FeatureTablePipeline, PipelineReport};
pub use models::{Address, FeatureType, Region};
