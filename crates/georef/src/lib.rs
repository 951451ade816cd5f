//! Georef - Place Name Georeferencing Library
//!
//! Georef resolves free-text place names to coordinates by searching a
//! gazetteer of modern places (`GeoNames`) and one of ancient places
//! (Pleiades) as a single collection. Searches can be narrowed to a
//! rectangle and ranked by distance to one or more reference points, which
//! makes it practical to pick the right "Washington" or the right "Roma".
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use georef::{DataSourceDescriptor, Georeferencer, IndexScope};
//!
//! let georeferencer = Georeferencer::builder()
//!     .modern(DataSourceDescriptor::geonames("cities1000.txt"))
//!     .historical(DataSourceDescriptor::pleiades("pleiades-names.tsv"))
//!     .build()?;
//!
//! // Every Washington, modern places only
//! let hits = georeferencer.search_location(Some("Washington"), None, None, Some(IndexScope::ModernOnly))?;
//!
//! // Places called Roma inside a bounding box around Italy
//! let hits = georeferencer.search_location(Some("Roma"), Some("36,6;47,19"), None, None)?;
//! for hit in &hits {
//!     println!("{} ({}, {}) score {}", hit.name, hit.latitude, hit.longitude, hit.score);
//! }
//! # Ok::<(), georef::error::GeoreferenceError>(())
//! ```
//!
//! # Spatial filtering
//!
//! Every place is indexed with the cell it falls in on a hierarchy of
//! Cartesian grids ("tiers"). Proximity filters are answered by matching the
//! few cells covering a circle's bounding box and then checking the exact
//! great-circle distance of each candidate.
//!
//! # Data
//!
//! Gazetteers are read from delimited text files described by a
//! [`DataSourceDescriptor`]. Indexes are built on first use under the data
//! directory (see [`georef_data::DATA_DIR`]) and reused afterwards.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
mod core;
pub mod error;
pub mod geo;
pub mod index;
pub mod search;
pub mod tier;

pub use core::{Georeferencer, GeoreferencerBuilder, default_index_root};

pub use config::{GeoreferenceConfig, GeoreferenceConfigBuilder};
pub use georef_data as data;
pub use georef_data::{DataSourceDescriptor, DataSourceDescriptorBuilder};
pub use geo::{BoundingBox, GeoPoint, ProximityQuery};
pub use index::{Collection, CollectionIndex, DocumentId, IndexSettings};
pub use search::{
    CoordinateSyntax, DecayFunction, DistanceAggregation, IndexScope, QueryParams, ScoreCombiner,
    SearchHit, SearchRequest, to_xml,
};
pub use tier::{Projection, TierRange};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the Georef library.
///
/// Installs a formatting subscriber once per process. `RUST_LOG` overrides
/// `level` when set.
///
/// # Examples
///
/// ```rust
/// use georef::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), georef::error::GeoreferenceError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::GeoreferenceError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("tantivy=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .map_err(|e| error::GeoreferenceError::Other(anyhow::anyhow!(e)))?;
        Ok(())
    })
}
