//! Selects the geometries of a store that fall in a search box.

use geo::Intersects;
use tracing::trace;

use super::{BoundingBox, GeometryRecord, GeometryStore};
use crate::models::{FeatureType, GeometryKind};

/// Find the records of `store` matching `bbox` under the rule for `feature_type`.
///
/// Line features match when their geometry intersects the box, so a road
/// passing through counts even with both endpoints outside. Areal features
/// match only when their whole bounding range lies inside the box. The
/// result is ordered by record id.
pub fn match_records<'a>(
    bbox: &BoundingBox,
    store: &'a GeometryStore,
    feature_type: FeatureType,
) -> Vec<&'a GeometryRecord> {
    let envelope = bbox.envelope();

    let mut matched: Vec<&GeometryRecord> = match feature_type.kind() {
        GeometryKind::Line => {
            let polygon = bbox.to_polygon();
            // R-tree narrows to envelope hits, then exact intersection
            store
                .tree()
                .locate_in_envelope_intersecting(&envelope)
                .filter(|ir| ir.record.geometry.intersects(&polygon))
                .map(|ir| &ir.record)
                .collect()
        }
        GeometryKind::Area => store
            .tree()
            .locate_in_envelope(&envelope)
            .map(|ir| &ir.record)
            .collect(),
    };

    matched.sort_unstable_by_key(|record| record.id);

    trace!(
        "Matched {} {} records in box N{} S{} E{} W{}",
        matched.len(),
        feature_type,
        bbox.north,
        bbox.south,
        bbox.east,
        bbox.west
    );

    matched
}
