//! Spatial side of feature extraction.
//!
//! Loads regional geometry collections into R-tree backed stores and
//! selects the geometries that fall in a search box around an address.

mod bbox;
mod loader;
mod matcher;
mod store;

pub use bbox::{BoundingBox, MatchError, EARTH_RADIUS_M, METERS_PER_DEGREE_LAT};
pub use loader::{load_file, parse_features, FileSources, GeometrySource, LoadError};
pub use matcher::match_records;
pub use store::{GeometryRecord, GeometryStore, IndexedRecord};
