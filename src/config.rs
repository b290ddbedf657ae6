//! TOML configuration: extraction settings plus region geometry sources.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{FeatureType, Region};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Directory holding `{extract}-{key}.geojson` files for regions without explicit sources
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub sources: BTreeMap<Region, RegionSources>,
    /// Directory relative source paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ExtractionConfig {
    pub feature_type: FeatureType,
    pub tags: Vec<String>,
    /// Distance from the address to each side of the search box
    pub distance_m: f64,
    /// Also emit a summed area column per tag
    #[serde(default)]
    pub area: bool,
    /// Process regions on parallel workers
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

/// Source paths per feature type for one region.
///
/// A region whose extract was split on disk lists several files; they are
/// concatenated into a single store at load time.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct RegionSources {
    #[serde(default)]
    pub building: Vec<PathBuf>,
    #[serde(default)]
    pub highway: Vec<PathBuf>,
    #[serde(default)]
    pub landuse: Vec<PathBuf>,
}

impl RegionSources {
    pub fn paths(&self, feature_type: FeatureType) -> &[PathBuf] {
        match feature_type {
            FeatureType::Building => &self.building,
            FeatureType::Highway => &self.highway,
            FeatureType::Landuse => &self.landuse,
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tags.is_empty() {
            return Err(ConfigError::Invalid("no tags requested".to_string()));
        }
        if let Some(tag) = self.tags.iter().find(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("blank tag '{}'", tag)));
        }
        if !self.distance_m.is_finite() || self.distance_m <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "distance_m must be a positive number, got {}",
                self.distance_m
            )));
        }
        Ok(())
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Parse and validate; relative paths resolve against the working directory
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.extraction.validate()?;
        Ok(config)
    }

    /// Source files for a region and feature type.
    ///
    /// Explicit `[sources.<region>]` entries win; otherwise `data_dir` supplies
    /// the default `{extract}-{key}.geojson` layout. Empty when neither applies.
    pub fn source_paths(&self, region: Region, feature_type: FeatureType) -> Vec<PathBuf> {
        let explicit = self
            .sources
            .get(&region)
            .map(|s| s.paths(feature_type))
            .unwrap_or_default();

        if !explicit.is_empty() {
            return explicit.iter().map(|p| self.resolve(p)).collect();
        }

        match &self.data_dir {
            Some(dir) => vec![self.resolve(&dir.join(format!(
                "{}-{}.geojson",
                region.extract_name(),
                feature_type.key()
            )))],
            None => Vec::new(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}
