//! Per-tag count and area statistics over matched geometries.

use hashbrown::HashMap;
use serde::Serialize;

use crate::spatial::GeometryRecord;

/// Statistics for one requested tag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagStats {
    pub tag: String,
    pub count: u64,
    /// Summed area of the counted records, present only when area was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
}

/// Count (and optionally sum the area of) the records carrying each tag.
///
/// Returns exactly one entry per requested tag, in request order, so rows
/// built from the result always have the same width. Tags without matches
/// get a count of 0 and an area of 0.
pub fn aggregate(records: &[&GeometryRecord], tags: &[String], compute_area: bool) -> Vec<TagStats> {
    let mut tally: HashMap<&str, (u64, f64)> = HashMap::new();
    for record in records {
        if let Some(tag) = record.tag.as_deref() {
            let entry = tally.entry(tag).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += record.area;
        }
    }

    tags.iter()
        .map(|tag| {
            let (count, area) = tally.get(tag.as_str()).copied().unwrap_or((0, 0.0));
            TagStats {
                tag: tag.clone(),
                count,
                area: compute_area.then_some(area),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon, Geometry};

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn road(tag: &str) -> GeometryRecord {
        GeometryRecord::new(
            None,
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]),
            Some(tag.to_string()),
        )
    }

    fn lot(tag: Option<&str>, size: f64) -> GeometryRecord {
        GeometryRecord::new(
            None,
            Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: size, y: 0.0),
                (x: size, y: size),
                (x: 0.0, y: size),
                (x: 0.0, y: 0.0),
            ]),
            tag.map(str::to_string),
        )
    }

    #[test]
    fn test_no_matches_yields_zeros() {
        let stats = aggregate(&[], &tags(&["motorway", "residential"]), true);
        assert_eq!(
            stats,
            vec![
                TagStats {
                    tag: "motorway".into(),
                    count: 0,
                    area: Some(0.0)
                },
                TagStats {
                    tag: "residential".into(),
                    count: 0,
                    area: Some(0.0)
                },
            ]
        );
    }

    #[test]
    fn test_counts_and_areas() {
        let records = [
            lot(Some("residential"), 1.0),
            lot(Some("residential"), 2.0),
            lot(Some("commercial"), 3.0),
            lot(None, 5.0),
        ];
        let refs: Vec<&GeometryRecord> = records.iter().collect();
        let stats = aggregate(&refs, &tags(&["residential", "industrial"]), true);

        assert_eq!(stats[0].count, 2);
        assert!((stats[0].area.unwrap() - 5.0).abs() < 1e-12);
        assert_eq!(stats[1].count, 0);
        assert_eq!(stats[1].area, Some(0.0));
    }

    #[test]
    fn test_line_area_is_zero() {
        let records = [road("motorway"), road("motorway"), road("residential")];
        let refs: Vec<&GeometryRecord> = records.iter().collect();
        let stats = aggregate(&refs, &tags(&["motorway", "residential"]), true);

        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].area, Some(0.0));
        assert_eq!(stats[1].count, 1);
    }

    #[test]
    fn test_area_omitted_when_not_requested() {
        let records = [lot(Some("residential"), 1.0)];
        let refs: Vec<&GeometryRecord> = records.iter().collect();
        let stats = aggregate(&refs, &tags(&["residential"]), false);
        assert_eq!(stats[0].count, 1);
        assert_eq!(stats[0].area, None);
    }

    #[test]
    fn test_preserves_request_order_and_duplicates() {
        let stats = aggregate(&[], &tags(&["b", "a", "b"]), false);
        let order: Vec<&str> = stats.iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "b"]);
    }
}
