//! Query construction, federated execution, ranking and rendering.
//!
//! A request flows through [`SearchRequest::parse`], [`QueryBuilder`],
//! [`IndexFederator::search`] and [`ScoreCombiner::combine`] before
//! [`to_xml`] renders the hits.

pub use error::SearchError;
mod collector;
mod federation;
mod projection;
mod query;
mod request;
mod scoring;

pub use collector::{Candidate, ProximityCollector};
use error::Result;
pub use federation::{IndexFederator, IndexScope, RankedCandidate};
pub use projection::{SearchHit, to_xml};
pub use query::{DEFAULT_MAX_TIER_BOXES, QueryBuilder, normalize_name};
pub use request::{CoordinateSyntax, QueryParams, SearchRequest};
pub use scoring::{DecayFunction, DistanceAggregation, LEGACY_DECAY_BASE, ScoreCombiner};

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum SearchError {
        #[error("Tantivy error: {0}")]
        Tantivy(#[from] tantivy::TantivyError),
        #[error("Index error: {0}")]
        IndexError(#[from] crate::index::IndexError),
        #[error("Invalid coordinate: {0}")]
        Geo(#[from] crate::geo::GeoError),
        #[error("Not a number: {0:?}")]
        InvalidNumber(String),
        #[error("Unknown search scope: {0:?}")]
        UnknownScope(String),
        #[error("Unknown request type: {0:?}")]
        UnknownRequestType(String),
        #[error("Modern and historical indexes were built with different schemas")]
        MismatchedCollections,
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, SearchError>;
}
