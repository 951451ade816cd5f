use std::fmt;
use std::str::FromStr;

use tantivy::query::{Bm25StatisticsProvider, Query};
use tantivy::schema::{Field, Value};
use tantivy::{Searcher, TantivyDocument, Term};
use tracing::{debug, info, instrument};

use super::collector::{Candidate, ProximityCollector, by_score};
use super::{Result, ScoreCombiner, SearchError};
use crate::geo::{GeoPoint, ProximityQuery};
use crate::index::{Collection, CollectionIndex, DocumentId, PlaceFields};
use crate::tier::TierPlotter;

/// Which collections a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexScope {
    ModernOnly,
    HistoricalOnly,
    /// One merged, score-ordered list over both collections.
    #[default]
    Both,
    /// The modern collection, then the historical one only when the modern
    /// search found nothing.
    ModernThenHistorical,
}

impl IndexScope {
    /// Parse a request value; anything unrecognized means [`IndexScope::Both`].
    pub fn parse(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for IndexScope {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "modern" => Ok(Self::ModernOnly),
            "historical" => Ok(Self::HistoricalOnly),
            "both" => Ok(Self::Both),
            "fallback" => Ok(Self::ModernThenHistorical),
            other => Err(SearchError::UnknownScope(other.to_string())),
        }
    }
}

impl fmt::Display for IndexScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ModernOnly => "modern",
            Self::HistoricalOnly => "historical",
            Self::Both => "both",
            Self::ModernThenHistorical => "fallback",
        })
    }
}

/// A collected candidate resolved to its stored fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub id: DocumentId,
    pub name: String,
    pub point: GeoPoint,
    pub relevance: f32,
    pub score: f64,
    pub distances: Vec<Option<f64>>,
}

/// Corpus statistics summed over several searchers so BM25 scores from
/// different collections are comparable.
struct FederatedStatistics<'a> {
    searchers: &'a [&'a Searcher],
}

impl Bm25StatisticsProvider for FederatedStatistics<'_> {
    fn total_num_tokens(&self, field: Field) -> tantivy::Result<u64> {
        self.searchers
            .iter()
            .map(|s| Bm25StatisticsProvider::total_num_tokens(*s, field))
            .sum()
    }

    fn total_num_docs(&self) -> tantivy::Result<u64> {
        self.searchers
            .iter()
            .map(|s| Bm25StatisticsProvider::total_num_docs(*s))
            .sum()
    }

    fn doc_freq(&self, term: &Term) -> tantivy::Result<u64> {
        self.searchers
            .iter()
            .map(|s| Bm25StatisticsProvider::doc_freq(*s, term))
            .sum()
    }
}

/// Runs one query tree against the modern and historical collections.
#[derive(Debug, Clone)]
pub struct IndexFederator {
    modern: CollectionIndex,
    historical: CollectionIndex,
}

impl IndexFederator {
    /// Both indexes must share a schema so one query fits both.
    pub fn new(modern: CollectionIndex, historical: CollectionIndex) -> Result<Self> {
        if modern.fields() != historical.fields() || modern.plotter() != historical.plotter() {
            return Err(SearchError::MismatchedCollections);
        }
        Ok(Self { modern, historical })
    }

    pub const fn modern(&self) -> &CollectionIndex {
        &self.modern
    }

    pub const fn historical(&self) -> &CollectionIndex {
        &self.historical
    }

    pub const fn fields(&self) -> &PlaceFields {
        self.modern.fields()
    }

    pub const fn plotter(&self) -> TierPlotter {
        self.modern.plotter()
    }

    const fn collection(&self, collection: Collection) -> &CollectionIndex {
        match collection {
            Collection::Modern => &self.modern,
            Collection::Historical => &self.historical,
        }
    }

    /// Top `limit` candidates of `query` within `scope`, ranked by the score
    /// `combiner` gives them, best first.
    #[instrument(name = "Federated search", skip(self, query, proximity, combiner), level = "debug")]
    pub fn search(
        &self,
        query: &dyn Query,
        proximity: &[ProximityQuery],
        combiner: ScoreCombiner,
        scope: IndexScope,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>> {
        let collector = ProximityCollector::new(proximity, combiner, limit);
        match scope {
            IndexScope::ModernOnly => self.search_one(Collection::Modern, query, &collector),
            IndexScope::HistoricalOnly => self.search_one(Collection::Historical, query, &collector),
            IndexScope::ModernThenHistorical => {
                let modern = self.search_one(Collection::Modern, query, &collector)?;
                if modern.is_empty() {
                    info!("No modern matches, falling back to historical collection");
                    self.search_one(Collection::Historical, query, &collector)
                } else {
                    Ok(modern)
                }
            }
            IndexScope::Both => self.search_both(query, &collector, limit),
        }
    }

    fn search_one(
        &self,
        collection: Collection,
        query: &dyn Query,
        collector: &ProximityCollector,
    ) -> Result<Vec<RankedCandidate>> {
        let searcher = self.collection(collection).searcher();
        let candidates = searcher.search(query, collector)?;
        debug!(%collection, hits = candidates.len(), "Collected candidates");
        self.resolve(collection, &searcher, candidates)
    }

    fn search_both(
        &self,
        query: &dyn Query,
        collector: &ProximityCollector,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>> {
        let modern = self.modern.searcher();
        let historical = self.historical.searcher();
        let searchers = [&modern, &historical];
        let statistics = FederatedStatistics {
            searchers: &searchers,
        };

        let mut tagged: Vec<(Collection, Candidate)> = Vec::new();
        for (collection, searcher) in [
            (Collection::Modern, &modern),
            (Collection::Historical, &historical),
        ] {
            let candidates = searcher.search_with_statistics_provider(query, collector, &statistics)?;
            debug!(%collection, hits = candidates.len(), "Collected candidates");
            tagged.extend(candidates.into_iter().map(|c| (collection, c)));
        }
        tagged.sort_by(|(ca, a), (cb, b)| by_score(a, b).then_with(|| ca.cmp(cb)));
        tagged.truncate(limit);

        tagged
            .into_iter()
            .map(|(collection, candidate)| {
                let searcher = match collection {
                    Collection::Modern => &modern,
                    Collection::Historical => &historical,
                };
                self.resolve_one(collection, searcher, candidate)
            })
            .collect()
    }

    fn resolve(
        &self,
        collection: Collection,
        searcher: &Searcher,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<RankedCandidate>> {
        candidates
            .into_iter()
            .map(|candidate| self.resolve_one(collection, searcher, candidate))
            .collect()
    }

    fn resolve_one(
        &self,
        collection: Collection,
        searcher: &Searcher,
        candidate: Candidate,
    ) -> Result<RankedCandidate> {
        let doc: TantivyDocument = searcher.doc(candidate.address)?;
        let name = doc
            .get_first(self.fields().name)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(RankedCandidate {
            id: DocumentId::new(collection, candidate.record_id),
            name,
            point: candidate.point,
            relevance: candidate.relevance,
            score: candidate.score,
            distances: candidate.distances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parsing() {
        assert_eq!(IndexScope::parse(Some("modern")), IndexScope::ModernOnly);
        assert_eq!(IndexScope::parse(Some("Historical")), IndexScope::HistoricalOnly);
        assert_eq!(IndexScope::parse(Some("fallback")), IndexScope::ModernThenHistorical);
        assert_eq!(IndexScope::parse(Some("everything")), IndexScope::Both);
        assert_eq!(IndexScope::parse(None), IndexScope::Both);
        assert!("nope".parse::<IndexScope>().is_err());
    }

    #[test]
    fn test_scope_display_round_trips() {
        for scope in [
            IndexScope::ModernOnly,
            IndexScope::HistoricalOnly,
            IndexScope::Both,
            IndexScope::ModernThenHistorical,
        ] {
            assert_eq!(scope.to_string().parse::<IndexScope>().unwrap(), scope);
        }
    }
}
