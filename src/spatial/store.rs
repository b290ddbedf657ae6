//! In-memory, R-tree indexed geometry collection for one region and feature type.

use geo::{Area, BoundingRect, Geometry};
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, info};

use crate::models::{FeatureType, Region};

/// A single OSM feature loaded from a geometry collection
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    /// Unique within the owning store
    pub id: u64,
    /// OSM identifier from the source properties, if present
    pub osm_id: Option<String>,
    pub geometry: Geometry<f64>,
    /// Value of the feature type's key (e.g. "motorway" for highway=motorway)
    pub tag: Option<String>,
    /// Unsigned planar area in the geometry's native units; 0 for points and lines
    pub area: f64,
}

impl GeometryRecord {
    pub fn new(osm_id: Option<String>, geometry: Geometry<f64>, tag: Option<String>) -> Self {
        let area = geometry.unsigned_area();
        Self {
            id: 0,
            osm_id,
            geometry,
            tag,
            area,
        }
    }

    fn envelope(&self) -> Option<AABB<[f64; 2]>> {
        let rect = self.geometry.bounding_rect()?;
        Some(AABB::from_corners(
            [rect.min().x, rect.min().y],
            [rect.max().x, rect.max().y],
        ))
    }
}

/// Wrapper for R-tree indexing of geometry records
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub record: GeometryRecord,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedRecord {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedRecord {
    pub fn new(record: GeometryRecord) -> Option<Self> {
        let envelope = record.envelope()?;
        Some(Self { record, envelope })
    }
}

/// Read-only geometry collection for one (region, feature type) pair
pub struct GeometryStore {
    region: Region,
    feature_type: FeatureType,
    tree: RTree<IndexedRecord>,
}

impl GeometryStore {
    /// Build the store from records in load order.
    ///
    /// Ids are reassigned `0..n` so records concatenated from several source
    /// files never collide. Records without an envelope (empty geometries) are
    /// dropped from the index.
    pub fn build(
        region: Region,
        feature_type: FeatureType,
        records: impl IntoIterator<Item = GeometryRecord>,
    ) -> Self {
        let mut dropped = 0usize;
        let indexed: Vec<IndexedRecord> = records
            .into_iter()
            .enumerate()
            .filter_map(|(i, mut record)| {
                record.id = i as u64;
                let indexed = IndexedRecord::new(record);
                if indexed.is_none() {
                    dropped += 1;
                }
                indexed
            })
            .collect();

        if dropped > 0 {
            debug!(
                "Dropped {} empty geometries from {} {} store",
                dropped, region, feature_type
            );
        }

        let tree = RTree::bulk_load(indexed);
        info!(
            "Built {} {} store with {} geometries",
            region,
            feature_type,
            tree.size()
        );

        Self {
            region,
            feature_type,
            tree,
        }
    }

    /// Concatenate the record lists of several source files into one store
    pub fn concat(
        region: Region,
        feature_type: FeatureType,
        parts: impl IntoIterator<Item = Vec<GeometryRecord>>,
    ) -> Self {
        Self::build(region, feature_type, parts.into_iter().flatten())
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    pub(crate) fn tree(&self) -> &RTree<IndexedRecord> {
        &self.tree
    }

    /// Get total number of indexed records
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Iterate over all indexed records, in no particular order
    pub fn records(&self) -> impl Iterator<Item = &GeometryRecord> {
        self.tree.iter().map(|ir| &ir.record)
    }
}
