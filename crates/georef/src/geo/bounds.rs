use super::GeoPoint;

/// Axis-aligned lat/lon rectangle with `min <= max` on both axes.
///
/// Rectangles never wrap the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Rectangle spanned by two opposite corners given in any order.
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Self {
        Self {
            lat_min: a.lat.min(b.lat),
            lat_max: a.lat.max(b.lat),
            lon_min: a.lon.min(b.lon),
            lon_max: a.lon.max(b.lon),
        }
    }

    /// Inclusive on every edge.
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.lat_min..=self.lat_max).contains(&point.lat)
            && (self.lon_min..=self.lon_max).contains(&point.lon)
    }

    pub fn expand(&self, degrees: f64) -> Self {
        Self {
            lat_min: self.lat_min - degrees,
            lat_max: self.lat_max + degrees,
            lon_min: self.lon_min - degrees,
            lon_max: self.lon_max + degrees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_order_does_not_matter() {
        let sw = GeoPoint::new(40.0, 10.0);
        let ne = GeoPoint::new(45.0, 15.0);
        let nw = GeoPoint::new(45.0, 10.0);
        let se = GeoPoint::new(40.0, 15.0);

        let expected = BoundingBox {
            lat_min: 40.0,
            lat_max: 45.0,
            lon_min: 10.0,
            lon_max: 15.0,
        };
        assert_eq!(BoundingBox::from_corners(sw, ne), expected);
        assert_eq!(BoundingBox::from_corners(ne, sw), expected);
        assert_eq!(BoundingBox::from_corners(nw, se), expected);
        assert_eq!(BoundingBox::from_corners(se, nw), expected);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let bbox = BoundingBox::from_corners(GeoPoint::new(40.0, 10.0), GeoPoint::new(45.0, 15.0));
        assert!(bbox.contains(GeoPoint::new(40.0, 10.0)));
        assert!(bbox.contains(GeoPoint::new(45.0, 15.0)));
        assert!(bbox.contains(GeoPoint::new(41.9, 12.5)));
        assert!(!bbox.contains(GeoPoint::new(48.85, 2.35)));
    }
}
