//! Turns parsed request parts into a tantivy query tree.
//!
//! Each part present becomes one `Must` clause of the top-level conjunction:
//!
//! - name: a disjunction of exact lowercased term matches over the name and
//!   both alternate name fields, the primary name boosted,
//! - bound: inclusive range filters on latitude and on longitude,
//! - proximity: a disjunction with one tier-box filter per proximity term.
//!
//! Filter clauses score zero so that relevance comes from the name clause
//! alone. Without a name clause every document scores one. The exact distance
//! check happens at collection time; the tier filter only narrows candidates.

use std::ops::Bound;

use tantivy::Term;
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, Occur, Query, RangeQuery, TermQuery,
    TermSetQuery,
};
use tantivy::schema::IndexRecordOption;
use tracing::debug;

use crate::geo::{BoundingBox, ProximityQuery};
use crate::index::PlaceFields;
use crate::tier::TierPlotter;

/// Upper bound on the number of tier boxes a single proximity filter may use.
pub const DEFAULT_MAX_TIER_BOXES: usize = 64;

fn filter(query: Box<dyn Query>) -> Box<dyn Query> {
    Box::new(ConstScoreQuery::new(query, 0.0))
}

/// Normalized form of a name term: trimmed and lowercased, `None` when empty.
pub fn normalize_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_lowercase)
}

#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    fields: &'a PlaceFields,
    plotter: TierPlotter,
    max_tier_boxes: usize,
}

impl<'a> QueryBuilder<'a> {
    pub const fn new(fields: &'a PlaceFields, plotter: TierPlotter, max_tier_boxes: usize) -> Self {
        Self {
            fields,
            plotter,
            max_tier_boxes,
        }
    }

    /// Build the query for a place search.
    ///
    /// A blank name, a missing bound and an empty proximity list each drop
    /// their clause. With nothing at all the query matches every document.
    pub fn build(
        &self,
        name: Option<&str>,
        bound: Option<&BoundingBox>,
        proximity: &[ProximityQuery],
    ) -> Box<dyn Query> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        match self.name_clause(name) {
            Some(name_query) => clauses.push((Occur::Must, name_query)),
            None => clauses.push((Occur::Must, Box::new(AllQuery))),
        }
        if let Some(bbox) = bound {
            clauses.extend(self.bound_clauses(bbox).map(|q| (Occur::Must, q)));
        }
        if let Some(proximity_query) = self.proximity_clause(proximity) {
            clauses.push((Occur::Must, proximity_query));
        }

        debug!(clauses = clauses.len(), "Built place query");
        Box::new(BooleanQuery::new(clauses))
    }

    /// Build the query for "places near a point".
    ///
    /// Matches everything near `proximity`; when `inclusive` is false, places
    /// matching `excluded_name` are removed.
    pub fn build_nearby(
        &self,
        excluded_name: Option<&str>,
        proximity: &ProximityQuery,
        inclusive: bool,
    ) -> Box<dyn Query> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, Box::new(AllQuery))];
        if !inclusive && let Some(name_query) = self.name_clause(excluded_name) {
            clauses.push((Occur::MustNot, name_query));
        }
        if let Some(proximity_query) = self.proximity_clause(std::slice::from_ref(proximity)) {
            clauses.push((Occur::Must, proximity_query));
        }
        Box::new(BooleanQuery::new(clauses))
    }

    pub fn name_clause(&self, name: Option<&str>) -> Option<Box<dyn Query>> {
        let term = normalize_name(name)?;
        let alternatives: Vec<(Occur, Box<dyn Query>)> = self
            .fields
            .name_fields()
            .into_iter()
            .map(|(field, boost)| {
                let query: Box<dyn Query> = Box::new(TermQuery::new(
                    Term::from_field_text(field, &term),
                    IndexRecordOption::WithFreqs,
                ));
                let query: Box<dyn Query> = if (boost - 1.0).abs() > f32::EPSILON {
                    Box::new(BoostQuery::new(query, boost))
                } else {
                    query
                };
                (Occur::Should, query)
            })
            .collect();
        Some(Box::new(BooleanQuery::new(alternatives)))
    }

    /// Inclusive latitude and longitude range filters.
    pub fn bound_clauses(&self, bbox: &BoundingBox) -> [Box<dyn Query>; 2] {
        let range = |field, min: f64, max: f64| -> Box<dyn Query> {
            filter(Box::new(RangeQuery::new(
                Bound::Included(Term::from_field_f64(field, min)),
                Bound::Included(Term::from_field_f64(field, max)),
            )))
        };
        [
            range(self.fields.latitude, bbox.lat_min, bbox.lat_max),
            range(self.fields.longitude, bbox.lon_min, bbox.lon_max),
        ]
    }

    /// Tier pre-filter for a set of proximity terms, `None` for an empty set.
    ///
    /// Terms whose circle cannot be covered cheaply fall back to matching
    /// everything, which keeps the disjunction a superset of the exact result.
    pub fn proximity_clause(&self, proximity: &[ProximityQuery]) -> Option<Box<dyn Query>> {
        if proximity.is_empty() {
            return None;
        }
        let per_term: Vec<(Occur, Box<dyn Query>)> = proximity
            .iter()
            .map(|term| (Occur::Should, self.tier_filter(term)))
            .collect();
        Some(Box::new(BooleanQuery::new(per_term)))
    }

    fn tier_filter(&self, term: &ProximityQuery) -> Box<dyn Query> {
        let cover = term
            .bounding_box()
            .and_then(|bbox| self.plotter.best_fit(&bbox, self.max_tier_boxes));
        let Some((level, boxes)) = cover else {
            debug!(radius = term.radius_miles(), "No tier cover, falling back to distance check only");
            return filter(Box::new(AllQuery));
        };
        let Some(field) = self.fields.tier(level) else {
            return filter(Box::new(AllQuery));
        };
        debug!(level, boxes = boxes.len(), "Using tier filter");
        filter(Box::new(TermSetQuery::new(
            boxes
                .into_iter()
                .map(|id| Term::from_field_u64(field, id.value)),
        )))
    }
}
