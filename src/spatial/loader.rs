//! Loading regional geometry collections from GeoJSON files.

use flate2::read::GzDecoder;
use geojson::{feature::Id, Feature, GeoJson};
use hashbrown::HashMap;
use serde_json::Value as JsonValue;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{GeometryRecord, GeometryStore};
use crate::config::Config;
use crate::models::{FeatureType, Region};

/// Properties checked, in order, for an OSM identifier
const OSM_ID_PROPERTIES: &[&str] = &["osm_id", "osm_way_id", "id"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no geometry sources configured for {region} {feature_type}")]
    NotConfigured {
        region: Region,
        feature_type: FeatureType,
    },
    #[error("geometry source {} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("failed to read geometry source {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not a geometry collection: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Provides the geometry store for a region and feature type.
///
/// Implementations must be shareable across region workers.
pub trait GeometrySource: Sync {
    fn load(&self, region: Region, feature_type: FeatureType)
        -> Result<GeometryStore, LoadError>;
}

impl<F> GeometrySource for F
where
    F: Fn(Region, FeatureType) -> Result<GeometryStore, LoadError> + Sync,
{
    fn load(
        &self,
        region: Region,
        feature_type: FeatureType,
    ) -> Result<GeometryStore, LoadError> {
        self(region, feature_type)
    }
}

/// File-backed geometry source resolved from the config's source table
#[derive(Debug, Clone, Default)]
pub struct FileSources {
    paths: HashMap<(Region, FeatureType), Vec<PathBuf>>,
}

impl FileSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        let mut sources = Self::new();
        for region in Region::all() {
            for feature_type in FeatureType::all() {
                let paths = config.source_paths(*region, *feature_type);
                if !paths.is_empty() {
                    sources.insert(*region, *feature_type, paths);
                }
            }
        }
        sources
    }

    pub fn insert(&mut self, region: Region, feature_type: FeatureType, paths: Vec<PathBuf>) {
        self.paths.insert((region, feature_type), paths);
    }

    pub fn paths(&self, region: Region, feature_type: FeatureType) -> &[PathBuf] {
        self.paths
            .get(&(region, feature_type))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl GeometrySource for FileSources {
    fn load(
        &self,
        region: Region,
        feature_type: FeatureType,
    ) -> Result<GeometryStore, LoadError> {
        let configured = self.paths(region, feature_type);
        if configured.is_empty() {
            return Err(LoadError::NotConfigured {
                region,
                feature_type,
            });
        }

        let mut parts = Vec::new();
        for path in configured {
            for file in expand_path(path)? {
                info!("Loading {} {} from {}", region, feature_type, file.display());
                let records = load_file(&file, feature_type)?;
                info!("  {} features", records.len());
                parts.push(records);
            }
        }

        Ok(GeometryStore::concat(region, feature_type, parts))
    }
}

/// A configured path is either a file or a directory of GeoJSON files
fn expand_path(path: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && is_geometry_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(LoadError::Invalid {
            path: path.to_path_buf(),
            reason: "directory contains no GeoJSON files".to_string(),
        });
    }
    Ok(files)
}

fn is_geometry_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    [".geojson", ".json", ".geojson.gz", ".json.gz"]
        .iter()
        .any(|ext| name.ends_with(ext))
}

/// Read and parse one geometry file, gunzipping `.gz` files on the fly
pub fn load_file(path: &Path, feature_type: FeatureType) -> Result<Vec<GeometryRecord>, LoadError> {
    let io_err = |source: io::Error| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::Missing(path.to_path_buf()),
        _ => io_err(e),
    })?;
    let mut reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut content = String::new();
    reader.read_to_string(&mut content).map_err(io_err)?;

    parse_features(&content, feature_type).map_err(|reason| LoadError::Invalid {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse GeoJSON text into records.
///
/// Accepts a FeatureCollection, a single Feature, or a bare array of
/// features. Features without geometry are skipped.
pub fn parse_features(
    content: &str,
    feature_type: FeatureType,
) -> Result<Vec<GeometryRecord>, String> {
    let value: JsonValue = serde_json::from_str(content).map_err(|e| e.to_string())?;

    let features: Vec<Feature> = match value {
        JsonValue::Array(items) => items
            .into_iter()
            .map(Feature::from_json_value)
            .collect::<Result<_, _>>()
            .map_err(|e| e.to_string())?,
        other => match GeoJson::from_json_value(other).map_err(|e| e.to_string())? {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err("expected features, found a bare geometry".to_string())
            }
        },
    };

    let mut records = Vec::with_capacity(features.len());
    let mut skipped = 0usize;
    for feature in features {
        let tag = feature.property(feature_type.key()).and_then(property_string);
        let osm_id = osm_id(&feature);

        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let geometry = geo_types::Geometry::<f64>::try_from(geometry.value)
            .map_err(|e| format!("feature {}: {}", osm_id.as_deref().unwrap_or("?"), e))?;

        records.push(GeometryRecord::new(osm_id, geometry, tag));
    }

    if skipped > 0 {
        debug!("Skipped {} features without geometry", skipped);
    }

    Ok(records)
}

fn property_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn osm_id(feature: &Feature) -> Option<String> {
    OSM_ID_PROPERTIES
        .iter()
        .find_map(|key| feature.property(key).and_then(property_string))
        .or_else(|| match &feature.id {
            Some(Id::String(s)) => Some(s.clone()),
            Some(Id::Number(n)) => Some(n.to_string()),
            None => None,
        })
}
