use std::sync::Arc;

use super::{BoundingBox, EARTH_RADIUS_MILES, GeoError, GeoPoint, Result, distance_miles};

/// Slack added around a circle's bounding rectangle so float rounding never
/// drops a point that sits exactly on the circle.
const BOUNDS_SLACK_DEGREES: f64 = 1e-9;

/// "Within `radius_miles` of `center`", inclusive of the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProximityQuery {
    center: GeoPoint,
    radius_miles: f64,
}

impl ProximityQuery {
    pub fn new(center: GeoPoint, radius_miles: f64) -> Result<Self> {
        if radius_miles.is_nan() || radius_miles < 0.0 {
            return Err(GeoError::InvalidRadius(radius_miles));
        }
        Ok(Self {
            center,
            radius_miles,
        })
    }

    pub const fn center(&self) -> GeoPoint {
        self.center
    }

    pub const fn radius_miles(&self) -> f64 {
        self.radius_miles
    }

    /// Distance from the center when `candidate` is inside the circle.
    pub fn distance_within(&self, candidate: GeoPoint) -> Option<f64> {
        let distance = distance_miles(self.center, candidate);
        (distance <= self.radius_miles).then_some(distance)
    }

    /// Lat/lon rectangle enclosing the circle.
    ///
    /// `None` when the circle reaches a pole or crosses the antimeridian, or
    /// when the radius is unbounded; callers then skip grid pre-filtering.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        if !self.radius_miles.is_finite() {
            return None;
        }
        let angular = self.radius_miles / EARTH_RADIUS_MILES;
        let lat = self.center.lat.to_radians();
        let lat_min = lat - angular;
        let lat_max = lat + angular;
        if lat_min <= -std::f64::consts::FRAC_PI_2 || lat_max >= std::f64::consts::FRAC_PI_2 {
            return None;
        }

        let sin_ratio = angular.sin() / lat.cos();
        if !(0.0..1.0).contains(&sin_ratio) {
            return None;
        }
        let delta_lon = sin_ratio.asin().to_degrees();
        let lon_min = self.center.lon - delta_lon;
        let lon_max = self.center.lon + delta_lon;
        if lon_min < -180.0 || lon_max > 180.0 {
            return None;
        }

        Some(
            BoundingBox {
                lat_min: lat_min.to_degrees(),
                lat_max: lat_max.to_degrees(),
                lon_min,
                lon_max,
            }
            .expand(BOUNDS_SLACK_DEGREES),
        )
    }
}

/// Distances from a candidate to every proximity term of one request.
///
/// A slot is `Some(miles)` only when the candidate lies within that term's
/// circle. Cloning shares the terms.
#[derive(Debug, Clone)]
pub struct DistanceEvaluator {
    terms: Arc<[ProximityQuery]>,
}

impl DistanceEvaluator {
    pub fn new(terms: &[ProximityQuery]) -> Self {
        Self {
            terms: terms.into(),
        }
    }

    pub fn terms(&self) -> &[ProximityQuery] {
        &self.terms
    }

    /// One slot per term, in term order.
    pub fn evaluate(&self, candidate: GeoPoint) -> Vec<Option<f64>> {
        self.terms
            .iter()
            .map(|term| term.distance_within(candidate))
            .collect()
    }

    /// With no terms every candidate qualifies.
    pub fn qualifies(distances: &[Option<f64>]) -> bool {
        distances.is_empty() || distances.iter().any(Option::is_some)
    }

    /// Smallest distance among the circles the candidate is inside.
    pub fn nearest(distances: &[Option<f64>]) -> Option<f64> {
        distances.iter().flatten().copied().reduce(f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rome() -> GeoPoint {
        GeoPoint::new(41.9, 12.5)
    }

    #[test]
    fn test_negative_radius_is_rejected() {
        assert_eq!(
            ProximityQuery::new(rome(), -1.0),
            Err(GeoError::InvalidRadius(-1.0))
        );
        assert!(ProximityQuery::new(rome(), f64::NAN).is_err());
        assert!(ProximityQuery::new(rome(), f64::MAX).is_ok());
    }

    #[test]
    fn test_bounding_box_encloses_circle() {
        let query = ProximityQuery::new(rome(), 50.0).unwrap();
        let bbox = query.bounding_box().unwrap();
        assert!(bbox.contains(rome()));

        for bearing in (0..360).step_by(15) {
            let b = f64::from(bearing).to_radians();
            let angular = 50.0 / EARTH_RADIUS_MILES;
            let lat1 = rome().lat.to_radians();
            let lon1 = rome().lon.to_radians();
            let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * b.cos()).asin();
            let lon2 = lon1
                + (b.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());
            let edge = GeoPoint::new(lat2.to_degrees(), lon2.to_degrees());
            assert!(bbox.contains(edge), "bearing {bearing} escaped the box");
        }
    }

    #[test]
    fn test_unbounded_or_polar_circles_have_no_box() {
        assert!(ProximityQuery::new(rome(), f64::MAX).unwrap().bounding_box().is_none());
        let arctic = ProximityQuery::new(GeoPoint::new(89.5, 0.0), 100.0).unwrap();
        assert!(arctic.bounding_box().is_none());
        let dateline = ProximityQuery::new(GeoPoint::new(0.0, 179.9), 100.0).unwrap();
        assert!(dateline.bounding_box().is_none());
    }

    #[test]
    fn test_evaluator_fills_one_slot_per_term() {
        let near = ProximityQuery::new(rome(), 20.0).unwrap();
        let far = ProximityQuery::new(GeoPoint::new(48.85, 2.35), 20.0).unwrap();
        let evaluator = DistanceEvaluator::new(&[near, far]);
        assert_eq!(evaluator.terms().len(), 2);

        let tivoli = GeoPoint::new(41.9633, 12.7983);
        let distances = evaluator.evaluate(tivoli);
        assert_eq!(distances.len(), 2);
        assert!(distances[0].is_some_and(|d| d < 20.0));
        assert!(distances[1].is_none());
        assert!(DistanceEvaluator::qualifies(&distances));

        let atlantic = evaluator.evaluate(GeoPoint::new(0.0, -30.0));
        assert!(!DistanceEvaluator::qualifies(&atlantic));
        assert_eq!(DistanceEvaluator::nearest(&atlantic), None);
    }

    #[test]
    fn test_nearest_ignores_circles_the_candidate_is_outside() {
        assert_eq!(DistanceEvaluator::nearest(&[None, Some(7.5), Some(3.0)]), Some(3.0));
        assert_eq!(DistanceEvaluator::nearest(&[]), None);
    }

    #[test]
    fn test_qualifies_is_disjunctive() {
        assert!(DistanceEvaluator::qualifies(&[]));
        assert!(DistanceEvaluator::qualifies(&[None, Some(3.0)]));
        assert!(!DistanceEvaluator::qualifies(&[None, None]));
    }
}
