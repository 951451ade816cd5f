//! Parsing of textual search parameters.
//!
//! Coordinates arrive as delimited text, e.g. a bound `"40,10;45,15"` or a
//! list of proximity points `"41.9,12.5,50;48.85,2.35"`. Structurally
//! malformed input (wrong number of parts, words where numbers belong) is
//! treated as absent and the search runs without that filter. Text that is
//! shaped like a number but is not one, coordinates off the globe, and
//! negative radii are errors.

use std::collections::HashMap;

use tracing::warn;

use super::federation::IndexScope;
use super::{Result, SearchError};
use crate::geo::{BoundingBox, GeoPoint, ProximityQuery};

/// Separators and defaults used to read coordinate text.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoordinateSyntax {
    /// Between points, `;` by default.
    pub point_separator: char,
    /// Between the numbers of one point, `,` by default.
    pub coordinate_separator: char,
    /// Radius used when a proximity point gives none.
    pub default_range_miles: f64,
}

impl Default for CoordinateSyntax {
    fn default() -> Self {
        Self {
            point_separator: ';',
            coordinate_separator: ',',
            default_range_miles: f64::MAX,
        }
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

fn looks_numeric(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

/// `Ok(None)` for text that is not a number at all.
fn parse_number(text: &str) -> Result<Option<f64>> {
    let token = text.trim();
    if !looks_numeric(token) {
        return Ok(None);
    }
    token
        .parse::<f64>()
        .map(Some)
        .map_err(|_| SearchError::InvalidNumber(token.to_string()))
}

fn parse_point(lat: &str, lon: &str) -> Result<Option<GeoPoint>> {
    let (Some(lat), Some(lon)) = (parse_number(lat)?, parse_number(lon)?) else {
        return Ok(None);
    };
    Ok(Some(GeoPoint::try_new(lat, lon)?))
}

impl CoordinateSyntax {
    /// Parse two opposite corners, in any order, into a rectangle.
    pub fn parse_bound(&self, text: Option<&str>) -> Result<Option<BoundingBox>> {
        let Some(text) = non_blank(text) else {
            return Ok(None);
        };
        let corners: Vec<&str> = text.split(self.point_separator).collect();
        let [first, second] = corners.as_slice() else {
            warn!(bound = text, "Bound must have exactly two corners, ignoring it");
            return Ok(None);
        };

        let mut points = Vec::with_capacity(2);
        for corner in [first, second] {
            let coords: Vec<&str> = corner.split(self.coordinate_separator).collect();
            let [lat, lon] = coords.as_slice() else {
                warn!(bound = text, "Bound corner must have two coordinates, ignoring bound");
                return Ok(None);
            };
            let Some(point) = parse_point(lat, lon)? else {
                warn!(bound = text, "Bound corner is not numeric, ignoring bound");
                return Ok(None);
            };
            points.push(point);
        }
        Ok(Some(BoundingBox::from_corners(points[0], points[1])))
    }

    /// Parse one `lat,lon[,radius]` point. A missing or empty radius means
    /// the default range.
    pub fn parse_proximity(&self, text: &str) -> Result<Option<ProximityQuery>> {
        let tokens: Vec<&str> = text.split(self.coordinate_separator).collect();
        let (lat, lon, radius) = match tokens.as_slice() {
            [lat, lon] => (lat, lon, None),
            [lat, lon, radius] => (lat, lon, non_blank(Some(*radius))),
            _ => return Ok(None),
        };
        let Some(center) = parse_point(lat, lon)? else {
            return Ok(None);
        };
        let radius = match radius {
            None => self.default_range_miles,
            Some(radius) => match parse_number(radius)? {
                Some(radius) => radius,
                None => return Ok(None),
            },
        };
        Ok(Some(ProximityQuery::new(center, radius)?))
    }

    /// Parse a list of proximity points.
    ///
    /// One malformed point voids the whole list, leaving the search without
    /// a proximity filter. Blank entries are skipped.
    pub fn parse_proximity_list(&self, text: Option<&str>) -> Result<Vec<ProximityQuery>> {
        let Some(text) = non_blank(text) else {
            return Ok(Vec::new());
        };
        let mut terms = Vec::new();
        for point in text.split(self.point_separator).filter(|p| !p.trim().is_empty()) {
            match self.parse_proximity(point)? {
                Some(term) => terms.push(term),
                None => {
                    warn!(points = text, "Malformed proximity point, ignoring proximity filter");
                    return Ok(Vec::new());
                }
            }
        }
        Ok(terms)
    }
}

/// Raw request parameters as they arrive from a caller.
///
/// Keys follow the public request vocabulary: `type`, `placeName`, `bound`,
/// `nearbyPlaces`, `point`, `searchOption` and `inclusive`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryParams {
    pub kind: Option<String>,
    pub place_name: Option<String>,
    pub bound: Option<String>,
    pub nearby_places: Option<String>,
    pub point: Option<String>,
    pub scope: Option<String>,
    pub inclusive: Option<String>,
}

impl QueryParams {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.into()))
            .collect();
        Self {
            kind: map.remove("type"),
            place_name: map.remove("placeName"),
            bound: map.remove("bound"),
            nearby_places: map.remove("nearbyPlaces"),
            point: map.remove("point"),
            scope: map.remove("searchOption"),
            inclusive: map.remove("inclusive"),
        }
    }
}

/// A validated search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchRequest {
    /// Places matching a name, optionally inside a rectangle and near any
    /// of a set of points.
    Match {
        place_name: Option<String>,
        bound: Option<BoundingBox>,
        proximity: Vec<ProximityQuery>,
        scope: IndexScope,
    },
    /// Places near a point, optionally excluding those named `place_name`.
    /// `center` is `None` when the point could not be read; such a request
    /// finds nothing.
    Nearby {
        place_name: Option<String>,
        center: Option<ProximityQuery>,
        inclusive: bool,
        scope: IndexScope,
    },
}

impl SearchRequest {
    pub fn parse(params: &QueryParams, syntax: &CoordinateSyntax) -> Result<Self> {
        let scope = IndexScope::parse(params.scope.as_deref());
        match params.kind.as_deref().map(str::trim) {
            None | Some("" | "match") => Ok(Self::Match {
                place_name: params.place_name.clone(),
                bound: syntax.parse_bound(params.bound.as_deref())?,
                proximity: syntax.parse_proximity_list(params.nearby_places.as_deref())?,
                scope,
            }),
            Some("nearby") => {
                let center = syntax
                    .parse_proximity_list(params.point.as_deref())?
                    .into_iter()
                    .next();
                let inclusive = params
                    .inclusive
                    .as_deref()
                    .is_some_and(|v| matches!(v.trim(), "true" | "1" | "yes"));
                Ok(Self::Nearby {
                    place_name: params.place_name.clone(),
                    center,
                    inclusive,
                    scope,
                })
            }
            Some(other) => Err(SearchError::UnknownRequestType(other.to_string())),
        }
    }

    pub const fn scope(&self) -> IndexScope {
        match self {
            Self::Match { scope, .. } | Self::Nearby { scope, .. } => *scope,
        }
    }

    pub fn with_scope(mut self, new_scope: IndexScope) -> Self {
        match &mut self {
            Self::Match { scope, .. } | Self::Nearby { scope, .. } => *scope = new_scope,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoError;

    fn syntax() -> CoordinateSyntax {
        CoordinateSyntax::default()
    }

    #[test]
    fn test_bound_corners_are_normalized() {
        let a = syntax().parse_bound(Some("45,15;40,10")).unwrap().unwrap();
        let b = syntax().parse_bound(Some("40,10;45,15")).unwrap().unwrap();
        let c = syntax().parse_bound(Some("40,15;45,10")).unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.lat_min, 40.0);
        assert_eq!(a.lon_max, 15.0);
    }

    #[test]
    fn test_malformed_bound_is_ignored() {
        for text in ["40,10", "40,10;45,15;50,20", "40;45", "north,10;45,15", "", "   "] {
            assert_eq!(syntax().parse_bound(Some(text)).unwrap(), None, "{text:?}");
        }
        assert_eq!(syntax().parse_bound(None).unwrap(), None);
    }

    #[test]
    fn test_broken_numbers_in_bound_are_errors() {
        assert!(matches!(
            syntax().parse_bound(Some("40.1.2,10;45,15")),
            Err(SearchError::InvalidNumber(_))
        ));
        assert!(matches!(
            syntax().parse_bound(Some("95,10;45,15")),
            Err(SearchError::Geo(GeoError::InvalidLatitude(_)))
        ));
    }

    #[test]
    fn test_proximity_radius_defaults() {
        let terms = syntax()
            .parse_proximity_list(Some("41.9, 12.5, 50;48.85,2.35;51.5,-0.12,"))
            .unwrap();
        assert_eq!(terms.len(), 3);
        assert_eq!(terms[0].radius_miles(), 50.0);
        assert_eq!(terms[0].center(), GeoPoint::new(41.9, 12.5));
        assert_eq!(terms[1].radius_miles(), f64::MAX);
        assert_eq!(terms[2].radius_miles(), f64::MAX);
    }

    #[test]
    fn test_one_bad_point_voids_the_list() {
        let terms = syntax()
            .parse_proximity_list(Some("41.9,12.5,50;48.85"))
            .unwrap();
        assert!(terms.is_empty());
        let terms = syntax()
            .parse_proximity_list(Some("41.9,12.5,50;1,2,3,4"))
            .unwrap();
        assert!(terms.is_empty());
    }

    #[test]
    fn test_negative_radius_is_an_error() {
        assert!(matches!(
            syntax().parse_proximity_list(Some("41.9,12.5,-5")),
            Err(SearchError::Geo(GeoError::InvalidRadius(_)))
        ));
    }

    #[test]
    fn test_custom_separators() {
        let syntax = CoordinateSyntax {
            point_separator: '|',
            coordinate_separator: ' ',
            default_range_miles: 25.0,
        };
        let terms = syntax.parse_proximity_list(Some("41.9 12.5|48.85 2.35 10")).unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].radius_miles(), 25.0);
        assert_eq!(terms[1].radius_miles(), 10.0);
        assert!(syntax.parse_bound(Some("40 10|45 15")).unwrap().is_some());
    }

    #[test]
    fn test_request_parsing() {
        let params = QueryParams::from_pairs([
            ("placeName", "Rome"),
            ("bound", "40,10;45,15"),
            ("searchOption", "historical"),
        ]);
        let request = SearchRequest::parse(&params, &syntax()).unwrap();
        let SearchRequest::Match {
            place_name,
            bound,
            proximity,
            scope,
        } = request
        else {
            panic!("expected a match request");
        };
        assert_eq!(place_name.as_deref(), Some("Rome"));
        assert!(bound.is_some());
        assert!(proximity.is_empty());
        assert_eq!(scope, IndexScope::HistoricalOnly);
    }

    #[test]
    fn test_nearby_request_parsing() {
        let params = QueryParams::from_pairs([
            ("type", "nearby"),
            ("placeName", "Rome"),
            ("point", "41.9,12.5,20"),
        ]);
        let request = SearchRequest::parse(&params, &syntax()).unwrap();
        assert_eq!(request.scope(), IndexScope::Both);
        let SearchRequest::Nearby {
            center, inclusive, ..
        } = request
        else {
            panic!("expected a nearby request");
        };
        assert_eq!(center.map(|c| c.radius_miles()), Some(20.0));
        assert!(!inclusive);

        let bad_point = QueryParams::from_pairs([("type", "nearby"), ("point", "somewhere")]);
        let SearchRequest::Nearby { center, .. } = SearchRequest::parse(&bad_point, &syntax()).unwrap() else {
            panic!("expected a nearby request");
        };
        assert!(center.is_none());
    }

    #[test]
    fn test_unknown_request_type() {
        let params = QueryParams::from_pairs([("type", "route")]);
        assert!(matches!(
            SearchRequest::parse(&params, &syntax()),
            Err(SearchError::UnknownRequestType(_))
        ));
    }
}
