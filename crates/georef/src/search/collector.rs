use std::cmp::Ordering;

use tantivy::collector::{Collector, SegmentCollector};
use tantivy::columnar::Column;
use tantivy::{DocAddress, DocId, Score, SegmentOrdinal, SegmentReader};

use super::ScoreCombiner;
use crate::geo::{DistanceEvaluator, GeoPoint, ProximityQuery};
use crate::index::{LATITUDE_FIELD, LONGITUDE_FIELD, RECORD_ID_FIELD};

/// A matching document that passed the distance check.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub address: DocAddress,
    pub record_id: u64,
    pub point: GeoPoint,
    pub relevance: Score,
    /// Relevance blended with distance; candidates are ranked by it.
    pub score: f64,
    /// One slot per proximity term, `Some` when inside that term's circle.
    pub distances: Vec<Option<f64>>,
}

/// Best combined score first, then best relevance. Remaining ties are broken
/// by position in the index so results are stable.
pub fn by_score(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.relevance.total_cmp(&a.relevance))
        .then_with(|| a.address.segment_ord.cmp(&b.address.segment_ord))
        .then_with(|| a.address.doc_id.cmp(&b.address.doc_id))
}

fn keep_top(candidates: &mut Vec<Candidate>, limit: usize) {
    candidates.sort_by(by_score);
    candidates.truncate(limit);
}

/// Top-N collector that drops documents outside every proximity circle and
/// ranks the rest by relevance blended with distance.
///
/// Coordinates are read from fast fields, so the exact check costs no stored
/// document lookups. With no proximity terms every match is kept.
#[derive(Debug, Clone)]
pub struct ProximityCollector {
    evaluator: DistanceEvaluator,
    combiner: ScoreCombiner,
    limit: usize,
}

impl ProximityCollector {
    pub fn new(terms: &[ProximityQuery], combiner: ScoreCombiner, limit: usize) -> Self {
        Self {
            evaluator: DistanceEvaluator::new(terms),
            combiner,
            limit,
        }
    }
}

impl Collector for ProximityCollector {
    type Fruit = Vec<Candidate>;
    type Child = ProximitySegmentCollector;

    fn for_segment(
        &self,
        segment_local_id: SegmentOrdinal,
        segment: &SegmentReader,
    ) -> tantivy::Result<Self::Child> {
        let fast_fields = segment.fast_fields();
        Ok(ProximitySegmentCollector {
            segment_ord: segment_local_id,
            evaluator: self.evaluator.clone(),
            combiner: self.combiner,
            limit: self.limit,
            latitude: fast_fields.f64(LATITUDE_FIELD)?,
            longitude: fast_fields.f64(LONGITUDE_FIELD)?,
            record_id: fast_fields.u64(RECORD_ID_FIELD)?,
            candidates: Vec::new(),
        })
    }

    fn requires_scoring(&self) -> bool {
        true
    }

    fn merge_fruits(&self, segment_fruits: Vec<Vec<Candidate>>) -> tantivy::Result<Self::Fruit> {
        let mut merged: Vec<Candidate> = segment_fruits.into_iter().flatten().collect();
        keep_top(&mut merged, self.limit);
        Ok(merged)
    }
}

pub struct ProximitySegmentCollector {
    segment_ord: SegmentOrdinal,
    evaluator: DistanceEvaluator,
    combiner: ScoreCombiner,
    limit: usize,
    latitude: Column<f64>,
    longitude: Column<f64>,
    record_id: Column<u64>,
    candidates: Vec<Candidate>,
}

impl SegmentCollector for ProximitySegmentCollector {
    type Fruit = Vec<Candidate>;

    fn collect(&mut self, doc: DocId, score: Score) {
        let (Some(lat), Some(lon), Some(record_id)) = (
            self.latitude.first(doc),
            self.longitude.first(doc),
            self.record_id.first(doc),
        ) else {
            return;
        };
        let point = GeoPoint::new(lat, lon);
        let distances = self.evaluator.evaluate(point);
        if !DistanceEvaluator::qualifies(&distances) {
            return;
        }
        let combined = self.combiner.combine(f64::from(score), &distances);

        self.candidates.push(Candidate {
            address: DocAddress::new(self.segment_ord, doc),
            record_id,
            point,
            relevance: score,
            score: combined,
            distances,
        });
        if self.candidates.len() >= self.limit.saturating_mul(2).max(64) {
            keep_top(&mut self.candidates, self.limit);
        }
    }

    fn harvest(mut self) -> Self::Fruit {
        keep_top(&mut self.candidates, self.limit);
        self.candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(doc_id: DocId, relevance: Score, score: f64) -> Candidate {
        Candidate {
            address: DocAddress::new(0, doc_id),
            record_id: u64::from(doc_id),
            point: GeoPoint::new(0.0, 0.0),
            relevance,
            score,
            distances: Vec::new(),
        }
    }

    #[test]
    fn test_keep_top_ranks_by_combined_score() {
        // Equal relevance everywhere, the best combined score sits last
        let mut candidates: Vec<Candidate> =
            (0..150).map(|doc| candidate(doc, 1.0, 0.5)).collect();
        candidates.push(candidate(150, 1.0, 0.99));

        keep_top(&mut candidates, 1);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].record_id, 150);
    }

    #[test]
    fn test_ties_fall_back_to_relevance_then_index_order() {
        let mut candidates = vec![
            candidate(3, 1.0, 0.5),
            candidate(1, 2.0, 0.5),
            candidate(2, 1.0, 0.5),
        ];
        candidates.sort_by(by_score);
        let order: Vec<u64> = candidates.iter().map(|c| c.record_id).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }
}
