//! Core georeferencing functionality.
//!
//! [`Georeferencer`] owns a modern and a historical place index and answers
//! place-name searches over them, optionally restricted to a rectangle and
//! ranked by distance to a set of points.
//!
//! ```rust,no_run
//! use georef::{DataSourceDescriptor, Georeferencer};
//!
//! let georeferencer = Georeferencer::builder()
//!     .modern(DataSourceDescriptor::geonames("cities1000.txt"))
//!     .historical(DataSourceDescriptor::pleiades("pleiades-names.tsv"))
//!     .build()?;
//!
//! // Places called Rome within 50 miles of 41.9N 12.5E
//! let hits = georeferencer.search_location(Some("Rome"), None, Some("41.9,12.5,50"), None)?;
//! # Ok::<(), georef::error::GeoreferenceError>(())
//! ```

use std::path::{Path, PathBuf};

use georef_data::{DATA_DIR, DataSourceDescriptor};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::GeoreferenceConfig,
    error::{GeoreferenceError, Result},
    geo::DistanceEvaluator,
    index::{Collection, CollectionIndex},
    search::{
        IndexFederator, IndexScope, QueryBuilder, QueryParams, SearchHit, SearchRequest, to_xml,
    },
};

/// Default directory holding one index per collection.
pub fn default_index_root() -> PathBuf {
    DATA_DIR.join("indexes")
}

fn collection_dir(root: &Path, collection: Collection) -> PathBuf {
    root.join(collection.name())
}

/// Searches modern and historical gazetteers as one.
///
/// # Examples
///
/// ```rust,no_run
/// use georef::{Georeferencer, GeoreferenceConfig, QueryParams};
///
/// let georeferencer = Georeferencer::load_existing("./indexes", GeoreferenceConfig::default())?
///     .expect("indexes were built earlier");
/// let xml = georeferencer.respond(&QueryParams::from_pairs([
///     ("placeName", "Washington"),
///     ("searchOption", "modern"),
/// ]))?;
/// println!("{xml}");
/// # Ok::<(), georef::error::GeoreferenceError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Georeferencer {
    federator: IndexFederator,
    config: GeoreferenceConfig,
}

impl Georeferencer {
    pub fn builder() -> GeoreferencerBuilder {
        GeoreferencerBuilder::default()
    }

    /// Combine two already opened collection indexes.
    pub fn from_indexes(
        modern: CollectionIndex,
        historical: CollectionIndex,
        config: GeoreferenceConfig,
    ) -> Result<Self> {
        let federator = IndexFederator::new(modern, historical)?;
        Ok(Self { federator, config })
    }

    /// Open indexes previously built under `index_root`.
    ///
    /// Returns `None` unless both collections have an index there.
    #[instrument(name = "Load existing Georeferencer", skip_all, level = "info")]
    pub fn load_existing(
        index_root: impl AsRef<Path>,
        config: GeoreferenceConfig,
    ) -> Result<Option<Self>> {
        let root = index_root.as_ref();
        let settings = config.index_settings();
        let modern = CollectionIndex::open_existing(
            Collection::Modern,
            &collection_dir(root, Collection::Modern),
            &settings,
        )?;
        let historical = CollectionIndex::open_existing(
            Collection::Historical,
            &collection_dir(root, Collection::Historical),
            &settings,
        )?;
        match (modern, historical) {
            (Some(modern), Some(historical)) => Self::from_indexes(modern, historical, config).map(Some),
            _ => {
                info!(root = ?root, "No complete set of indexes found");
                Ok(None)
            }
        }
    }

    pub const fn config(&self) -> &GeoreferenceConfig {
        &self.config
    }

    pub const fn modern_index(&self) -> &CollectionIndex {
        self.federator.modern()
    }

    pub const fn historical_index(&self) -> &CollectionIndex {
        self.federator.historical()
    }

    /// Parse raw parameters with the configured coordinate syntax.
    ///
    /// Requests that name no scope get the configured default scope.
    pub fn parse_request(&self, params: &QueryParams) -> Result<SearchRequest> {
        let request = SearchRequest::parse(params, &self.config.syntax)?;
        Ok(match params.scope {
            Some(_) => request,
            None => request.with_scope(self.config.default_scope),
        })
    }

    /// Run a parsed request, best hit first.
    #[instrument(name = "Georeference search", skip_all, fields(scope = %request.scope()))]
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let t_search = std::time::Instant::now();
        let builder = QueryBuilder::new(
            self.federator.fields(),
            self.federator.plotter(),
            self.config.max_tier_boxes,
        );
        let (query, terms) = match request {
            SearchRequest::Match {
                place_name,
                bound,
                proximity,
                ..
            } => (
                builder.build(place_name.as_deref(), bound.as_ref(), proximity),
                proximity.clone(),
            ),
            SearchRequest::Nearby {
                place_name,
                center,
                inclusive,
                ..
            } => {
                let Some(center) = center else {
                    warn!("Nearby search without a readable point, returning no places");
                    return Ok(Vec::new());
                };
                (
                    builder.build_nearby(place_name.as_deref(), center, *inclusive),
                    vec![*center],
                )
            }
        };

        let candidates = self.federator.search(
            query.as_ref(),
            &terms,
            self.config.scoring,
            request.scope(),
            self.config.hits_per_page,
        )?;
        debug!(candidates = candidates.len(), "Federated search complete");

        let hits: Vec<SearchHit> = candidates
            .into_iter()
            .map(|candidate| SearchHit {
                distance: DistanceEvaluator::nearest(&candidate.distances),
                id: candidate.id,
                name: candidate.name,
                latitude: candidate.point.lat,
                longitude: candidate.point.lon,
                relevance: candidate.relevance,
                score: candidate.score,
            })
            .collect();

        info!(
            hits = hits.len(),
            elapsed_seconds = ?t_search.elapsed(),
            "Search complete"
        );
        Ok(hits)
    }

    /// Places named `place_name`, optionally inside `bound` and near any of
    /// `nearby_places`, both given in the configured coordinate syntax.
    pub fn search_location(
        &self,
        place_name: Option<&str>,
        bound: Option<&str>,
        nearby_places: Option<&str>,
        scope: Option<IndexScope>,
    ) -> Result<Vec<SearchHit>> {
        let syntax = &self.config.syntax;
        let request = SearchRequest::Match {
            place_name: place_name.map(str::to_string),
            bound: syntax.parse_bound(bound)?,
            proximity: syntax.parse_proximity_list(nearby_places)?,
            scope: scope.unwrap_or(self.config.default_scope),
        };
        self.search(&request)
    }

    /// Places within range of `point`. Unless `inclusive`, places matching
    /// `place_name` are left out.
    pub fn search_nearby(
        &self,
        place_name: Option<&str>,
        point: &str,
        inclusive: bool,
        scope: Option<IndexScope>,
    ) -> Result<Vec<SearchHit>> {
        let center = self
            .config
            .syntax
            .parse_proximity_list(Some(point))?
            .into_iter()
            .next();
        let request = SearchRequest::Nearby {
            place_name: place_name.map(str::to_string),
            center,
            inclusive,
            scope: scope.unwrap_or(self.config.default_scope),
        };
        self.search(&request)
    }

    /// Parse, search and render the result as XML.
    #[instrument(name = "Respond", skip_all, level = "debug")]
    pub fn respond(&self, params: &QueryParams) -> Result<String> {
        let request = self.parse_request(params)?;
        let hits = self.search(&request)?;
        Ok(to_xml(&hits))
    }
}

/// Builder opening or building both collection indexes.
#[derive(Debug, Clone, Default)]
pub struct GeoreferencerBuilder {
    modern: Option<DataSourceDescriptor>,
    historical: Option<DataSourceDescriptor>,
    index_root: Option<PathBuf>,
    force_rebuild: bool,
    config: GeoreferenceConfig,
}

impl GeoreferencerBuilder {
    /// Gazetteer of present-day places.
    pub fn modern(mut self, descriptor: DataSourceDescriptor) -> Self {
        self.modern = Some(descriptor);
        self
    }

    /// Gazetteer of ancient places.
    pub fn historical(mut self, descriptor: DataSourceDescriptor) -> Self {
        self.historical = Some(descriptor);
        self
    }

    /// Directory holding the `modern/` and `historical/` indexes, by default
    /// `indexes/` under the data directory.
    pub fn index_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.index_root = Some(root.into());
        self
    }

    /// Rebuild both indexes even when they already exist.
    pub fn force_rebuild(mut self, force: bool) -> Self {
        self.force_rebuild = force;
        self
    }

    pub fn config(mut self, config: GeoreferenceConfig) -> Self {
        self.config = config;
        self
    }

    #[instrument(name = "Build Georeferencer", skip_all, level = "info")]
    pub fn build(self) -> Result<Georeferencer> {
        let t_init = std::time::Instant::now();
        let modern = match self.modern {
            Some(descriptor) => descriptor,
            None => default_modern_source()?,
        };
        let historical = self.historical.ok_or_else(|| {
            GeoreferenceError::ConfigError("A historical data source is required".to_string())
        })?;
        let root = self.index_root.unwrap_or_else(default_index_root);
        let settings = self.config.index_settings();

        let open = |collection: Collection, descriptor: &DataSourceDescriptor| {
            let dir = collection_dir(&root, collection);
            if self.force_rebuild {
                CollectionIndex::rebuild(collection, descriptor, &dir, &settings)
            } else {
                CollectionIndex::open_or_build(collection, descriptor, &dir, &settings)
            }
        };
        let (modern_index, historical_index) = rayon::join(
            || open(Collection::Modern, &modern),
            || open(Collection::Historical, &historical),
        );
        let (modern_index, historical_index) = (modern_index?, historical_index?);

        info!(
            modern_docs = modern_index.num_docs(),
            historical_docs = historical_index.num_docs(),
            elapsed_seconds = ?t_init.elapsed(),
            "Georeferencer ready"
        );
        Georeferencer::from_indexes(modern_index, historical_index, self.config)
    }
}

/// The GeoNames dump in the data directory, downloaded first when the
/// `download_data` feature is enabled.
fn default_modern_source() -> Result<DataSourceDescriptor> {
    let path = georef_data::ensure_geonames_dump(georef_data::GeoNamesDump::default())?;
    Ok(DataSourceDescriptor::geonames(path))
}

#[cfg(test)]
mod tests {
    use georef_data::test_data::{
        historical_places, modern_places, write_geonames_file, write_pleiades_file,
    };
    use tempfile::{NamedTempFile, TempDir};

    use super::*;

    struct Fixture {
        _modern: NamedTempFile,
        _historical: NamedTempFile,
        _dir: TempDir,
        georeferencer: Georeferencer,
    }

    fn fixture(config: GeoreferenceConfig) -> Fixture {
        crate::tests::setup_test_env();
        let modern = write_geonames_file(&modern_places()).unwrap();
        let historical = write_pleiades_file(&historical_places()).unwrap();
        let dir = TempDir::new().unwrap();
        let georeferencer = Georeferencer::builder()
            .modern(DataSourceDescriptor::geonames(modern.path()))
            .historical(DataSourceDescriptor::pleiades(historical.path()))
            .index_root(dir.path())
            .config(config)
            .build()
            .unwrap();
        Fixture {
            _modern: modern,
            _historical: historical,
            _dir: dir,
            georeferencer,
        }
    }

    #[test]
    fn test_missing_historical_source_is_a_config_error() {
        let modern = write_geonames_file(&modern_places()).unwrap();
        let result = Georeferencer::builder()
            .modern(DataSourceDescriptor::geonames(modern.path()))
            .build();
        assert!(matches!(result, Err(GeoreferenceError::ConfigError(_))));
    }

    #[test]
    fn test_load_existing_after_build() {
        let fx = fixture(GeoreferenceConfig::default());
        let root = fx.georeferencer.modern_index().path().parent().unwrap().to_path_buf();
        let loaded = Georeferencer::load_existing(&root, GeoreferenceConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(loaded.modern_index().num_docs(), modern_places().len() as u64);

        let empty = TempDir::new().unwrap();
        assert!(
            Georeferencer::load_existing(empty.path(), GeoreferenceConfig::default())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_default_scope_applies_when_request_names_none() {
        let config = GeoreferenceConfig::builder()
            .default_scope(IndexScope::HistoricalOnly)
            .build();
        let fx = fixture(config);
        let request = fx
            .georeferencer
            .parse_request(&QueryParams::from_pairs([("placeName", "Rome")]))
            .unwrap();
        assert_eq!(request.scope(), IndexScope::HistoricalOnly);

        let request = fx
            .georeferencer
            .parse_request(&QueryParams::from_pairs([
                ("placeName", "Rome"),
                ("searchOption", "unheard-of"),
            ]))
            .unwrap();
        assert_eq!(request.scope(), IndexScope::Both);
    }

    #[test]
    fn test_hits_per_page_limits_results() {
        let config = GeoreferenceConfig::builder().hits_per_page(3).build();
        let fx = fixture(config);
        let hits = fx
            .georeferencer
            .search_location(None, None, Some("41.9,12.5"), None)
            .unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_distance_reranks_equal_relevance() {
        let fx = fixture(GeoreferenceConfig::default());
        let hits = fx
            .georeferencer
            .search_location(None, None, Some("41.9,12.5,30"), Some(IndexScope::ModernOnly))
            .unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"Rome"));
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"Ostia"));
        assert!(names.contains(&"Tivoli"));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(hits.iter().all(|h| h.distance.is_some_and(|d| d <= 30.0)));
    }

    #[test]
    fn test_nearby_without_point_is_empty() {
        let fx = fixture(GeoreferenceConfig::default());
        let hits = fx
            .georeferencer
            .search_nearby(Some("Rome"), "not a point", false, None)
            .unwrap();
        assert!(hits.is_empty());
    }
}
