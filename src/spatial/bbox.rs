//! Search envelopes around a coordinate.

use geo::{coord, Polygon, Rect};
use rstar::AABB;
use thiserror::Error;

use crate::models::GeoPoint;

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// Meters spanned by one degree of latitude
pub const METERS_PER_DEGREE_LAT: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("cannot build a search box around ({lat}, {lon}) with distance {distance_m}m")]
    InvalidBox { lat: f64, lon: f64, distance_m: f64 },
}

/// Axis-aligned search box in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Box whose sides each lie `distance_m` meters from the point.
    ///
    /// The longitude offset is widened by `1 / cos(lat)` to account for
    /// meridians converging away from the equator.
    pub fn around(point: GeoPoint, distance_m: f64) -> Result<Self, MatchError> {
        let GeoPoint { lat, lon } = point;
        if !lat.is_finite() || !lon.is_finite() || !distance_m.is_finite() || distance_m < 0.0 {
            return Err(MatchError::InvalidBox {
                lat,
                lon,
                distance_m,
            });
        }

        let delta_lat = distance_m / METERS_PER_DEGREE_LAT;
        let delta_lon = delta_lat / lat.to_radians().cos();

        Ok(Self {
            north: lat + delta_lat,
            south: lat - delta_lat,
            east: lon + delta_lon,
            west: lon - delta_lon,
        })
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    /// As a `geo` rectangle in (lon, lat) order
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        )
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        self.to_rect().to_polygon()
    }

    /// R-tree envelope in [lon, lat] order
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.west, self.south], [self.east, self.north])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_box_is_symmetric() {
        let point = GeoPoint::new(39.96, -83.0);
        let bbox = BoundingBox::around(point, 500.0).unwrap();

        let delta_lat = 500.0 / METERS_PER_DEGREE_LAT;
        let delta_lon = delta_lat / 39.96_f64.to_radians().cos();

        assert!((bbox.lat_span() - 2.0 * delta_lat).abs() < EPS);
        assert!((bbox.lon_span() - 2.0 * delta_lon).abs() < EPS);
        assert!(((bbox.north - point.lat) - (point.lat - bbox.south)).abs() < EPS);
        assert!(((bbox.east - point.lon) - (point.lon - bbox.west)).abs() < EPS);
    }

    #[test]
    fn test_longitude_widens_with_latitude() {
        let equator = BoundingBox::around(GeoPoint::new(0.0, 0.0), 1000.0).unwrap();
        let north = BoundingBox::around(GeoPoint::new(60.0, 0.0), 1000.0).unwrap();

        assert!((equator.lat_span() - north.lat_span()).abs() < EPS);
        assert!((equator.lat_span() - equator.lon_span()).abs() < EPS);
        // cos(60°) = 0.5
        assert!((north.lon_span() - 2.0 * equator.lon_span()).abs() < 1e-6);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let bbox = BoundingBox::around(GeoPoint::new(10.0, 10.0), METERS_PER_DEGREE_LAT).unwrap();
        assert!((bbox.north - 11.0).abs() < EPS);
        assert!((bbox.south - 9.0).abs() < EPS);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(BoundingBox::around(GeoPoint::new(f64::NAN, 0.0), 100.0).is_err());
        assert!(BoundingBox::around(GeoPoint::new(0.0, 0.0), -1.0).is_err());
        assert!(BoundingBox::around(GeoPoint::new(0.0, 0.0), f64::INFINITY).is_err());
    }

    #[test]
    fn test_envelope_matches_rect() {
        let bbox = BoundingBox::around(GeoPoint::new(41.0, -87.0), 250.0).unwrap();
        let env = bbox.envelope();
        let rect = bbox.to_rect();
        assert_eq!(env.lower(), [rect.min().x, rect.min().y]);
        assert_eq!(env.upper(), [rect.max().x, rect.max().y]);
    }
}
