//! Points, rectangles, great-circle distance and proximity predicates.

mod bounds;
mod proximity;

pub use bounds::BoundingBox;
pub use error::GeoError;
use error::Result;
pub use proximity::{DistanceEvaluator, ProximityQuery};

/// Mean earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.761;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Like [`GeoPoint::new`] but rejects coordinates off the globe.
    pub fn try_new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::InvalidLatitude(lat));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(GeoError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Haversine distance to `other` in miles.
    pub fn distance_to(&self, other: &Self) -> f64 {
        distance_miles(*self, *other)
    }
}

/// Great-circle (haversine) distance between two points in miles.
pub fn distance_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_MILES * h.sqrt().min(1.0).asin()
}

/// `true` when `candidate` is at most `radius_miles` from `center`.
pub fn is_within(center: GeoPoint, radius_miles: f64, candidate: GeoPoint) -> bool {
    distance_miles(center, candidate) <= radius_miles
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum GeoError {
        #[error("Invalid latitude: {0} (must be between -90 and 90)")]
        InvalidLatitude(f64),
        #[error("Invalid longitude: {0} (must be between -180 and 180)")]
        InvalidLongitude(f64),
        #[error("Invalid radius: {0} (must be a non-negative number of miles)")]
        InvalidRadius(f64),
    }

    pub type Result<T> = std::result::Result<T, GeoError>;
}
