//! On-disk place indexes, one per gazetteer collection.
//!
//! Every collection shares the same schema: a lowercased exact-match name
//! field, two multi-valued alternate name fields, stored and fast latitude,
//! longitude and record id fields, and one indexed box-id field per tier
//! level. Identical schemas let a single query tree run against any
//! collection.

mod encoder;

use std::fmt;
use std::path::{Path, PathBuf};

pub use encoder::{ALT_NAME_SEPARATOR, PlaceRecord, SpatialFieldEncoder, SpatialFields, TierField};
pub use error::IndexError;
use error::Result;
use georef_data::DataSourceDescriptor;
use georef_data::raw::gazetteer;
use itertools::izip;
use polars::prelude::DataFrame;
use tantivy::schema::{
    FAST, Field, INDEXED, IndexRecordOption, STORED, Schema, SchemaBuilder, TextFieldIndexing,
    TextOptions,
};
use tantivy::tokenizer::{LowerCaser, RawTokenizer, TextAnalyzer};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher};
use tracing::{info, instrument, warn};

use crate::geo::GeoPoint;
use crate::tier::{Projection, TierPlotter, TierRange, tier_field_name};

pub const NAME_FIELD: &str = "name";
pub const ALT_NAME_1_FIELD: &str = "alt_name_1";
pub const ALT_NAME_2_FIELD: &str = "alt_name_2";
pub const LATITUDE_FIELD: &str = "latitude";
pub const LONGITUDE_FIELD: &str = "longitude";
pub const RECORD_ID_FIELD: &str = "record_id";

/// Tokenizer for name fields: the whole value as one lowercased token.
pub const PLACE_NAME_TOKENIZER: &str = "place_name";

const MANIFEST_FILE: &str = "georef_source.json";
pub const DEFAULT_WRITER_MEMORY: usize = 50_000_000;

/// Which gazetteer a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Collection {
    Modern,
    Historical,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Historical => "historical",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable identity of a place: its collection plus its record ordinal in the
/// source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentId {
    pub collection: Collection,
    pub record_id: u64,
}

impl DocumentId {
    pub const fn new(collection: Collection, record_id: u64) -> Self {
        Self {
            collection,
            record_id,
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection, self.record_id)
    }
}

/// Settings baked into an index when it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSettings {
    pub tiers: TierRange,
    pub projection: Projection,
    pub writer_memory_bytes: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            tiers: TierRange::default(),
            projection: Projection::default(),
            writer_memory_bytes: DEFAULT_WRITER_MEMORY,
        }
    }
}

/// Schema shared by every collection.
pub fn place_schema(tiers: TierRange) -> Schema {
    let mut schema_builder = SchemaBuilder::new();

    let name_indexing = TextFieldIndexing::default()
        .set_tokenizer(PLACE_NAME_TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqs);
    let name_options = TextOptions::default().set_indexing_options(name_indexing);

    schema_builder.add_u64_field(RECORD_ID_FIELD, STORED | INDEXED | FAST);
    schema_builder.add_text_field(NAME_FIELD, name_options.clone().set_stored());
    schema_builder.add_text_field(ALT_NAME_1_FIELD, name_options.clone());
    schema_builder.add_text_field(ALT_NAME_2_FIELD, name_options);
    schema_builder.add_f64_field(LATITUDE_FIELD, STORED | INDEXED | FAST);
    schema_builder.add_f64_field(LONGITUDE_FIELD, STORED | INDEXED | FAST);
    for level in tiers.levels() {
        schema_builder.add_u64_field(&tier_field_name(level), INDEXED);
    }
    schema_builder.build()
}

/// Resolved field handles of [`place_schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceFields {
    pub record_id: Field,
    pub name: Field,
    pub alt_name_1: Field,
    pub alt_name_2: Field,
    pub latitude: Field,
    pub longitude: Field,
    tiers: Vec<(u8, Field)>,
}

impl PlaceFields {
    pub fn from_schema(schema: &Schema, tiers: TierRange) -> Result<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| IndexError::MissingField(name.to_string()))
        };
        Ok(Self {
            record_id: field(RECORD_ID_FIELD)?,
            name: field(NAME_FIELD)?,
            alt_name_1: field(ALT_NAME_1_FIELD)?,
            alt_name_2: field(ALT_NAME_2_FIELD)?,
            latitude: field(LATITUDE_FIELD)?,
            longitude: field(LONGITUDE_FIELD)?,
            tiers: tiers
                .levels()
                .map(|level| field(&tier_field_name(level)).map(|f| (level, f)))
                .collect::<Result<_>>()?,
        })
    }

    pub fn tier(&self, level: u8) -> Option<Field> {
        self.tiers
            .iter()
            .find_map(|&(l, field)| (l == level).then_some(field))
    }

    /// Name fields with their boosts, primary name first.
    pub fn name_fields(&self) -> [(Field, f32); 3] {
        [(self.name, 1.2), (self.alt_name_1, 1.0), (self.alt_name_2, 1.0)]
    }
}

fn register_tokenizer(index: &Index) {
    index.tokenizers().register(
        PLACE_NAME_TOKENIZER,
        TextAnalyzer::builder(RawTokenizer::default())
            .filter(LowerCaser)
            .build(),
    );
}

/// A built, read-only place index for one collection.
///
/// Cloning is cheap; clones share the underlying reader.
#[derive(Clone)]
pub struct CollectionIndex {
    collection: Collection,
    path: PathBuf,
    reader: IndexReader,
    fields: PlaceFields,
    plotter: TierPlotter,
}

impl fmt::Debug for CollectionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionIndex")
            .field("collection", &self.collection)
            .field("path", &self.path)
            .field("num_docs", &self.num_docs())
            .finish_non_exhaustive()
    }
}

impl CollectionIndex {
    /// `true` when `path` already holds a committed index.
    pub fn exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    /// Open the index at `path`, building it from `descriptor` first if absent.
    ///
    /// An existing index is never rebuilt, even when the source file changed
    /// since; use [`CollectionIndex::rebuild`] for that.
    #[instrument(name = "Open or build index", skip_all, fields(collection = %collection))]
    pub fn open_or_build(
        collection: Collection,
        descriptor: &DataSourceDescriptor,
        path: &Path,
        settings: &IndexSettings,
    ) -> Result<Self> {
        info!(path = ?path, "Using index path.");
        if let Some(index) = Self::open_existing(collection, path, settings)? {
            info!(path = ?path, docs = index.num_docs(), "Loaded existing index.");
            index.warn_if_source_changed(descriptor);
            return Ok(index);
        }
        info!(path = ?path, "No existing index found (meta.json missing). Will create new index.");
        Self::build(collection, descriptor, path, settings)
    }

    /// Delete whatever is at `path` and build a fresh index.
    #[instrument(name = "Rebuild index", skip_all, fields(collection = %collection))]
    pub fn rebuild(
        collection: Collection,
        descriptor: &DataSourceDescriptor,
        path: &Path,
        settings: &IndexSettings,
    ) -> Result<Self> {
        if path.exists() {
            info!(path = ?path, "Overwriting existing index directory.");
            std::fs::remove_dir_all(path)?;
        }
        Self::build(collection, descriptor, path, settings)
    }

    /// Open an index previously built with compatible settings, `None` when
    /// nothing has been built at `path`.
    pub fn open_existing(
        collection: Collection,
        path: &Path,
        settings: &IndexSettings,
    ) -> Result<Option<Self>> {
        if !Self::exists(path) {
            return Ok(None);
        }
        let index = Index::open_in_dir(path)?;
        register_tokenizer(&index);
        if let Some(manifest) = read_manifest(path)? {
            let built_with = manifest
                .get("projection")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            let expected = format!("{:?}", settings.projection);
            if built_with != expected {
                return Err(IndexError::SettingsMismatch(format!(
                    "index at {} was built with the {built_with} projection, configured {expected}",
                    path.display()
                )));
            }
        }
        let fields = PlaceFields::from_schema(&index.schema(), settings.tiers)?;
        Self::from_index(collection, path, &index, fields, settings).map(Some)
    }

    fn from_index(
        collection: Collection,
        path: &Path,
        index: &Index,
        fields: PlaceFields,
        settings: &IndexSettings,
    ) -> Result<Self> {
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            collection,
            path: path.to_path_buf(),
            reader,
            fields,
            plotter: TierPlotter::new(settings.tiers, settings.projection),
        })
    }

    fn build(
        collection: Collection,
        descriptor: &DataSourceDescriptor,
        path: &Path,
        settings: &IndexSettings,
    ) -> Result<Self> {
        // Read the whole source before touching the index directory so a bad
        // file leaves nothing half-built behind.
        let data = georef_data::load_places(descriptor)?;

        info!(path = ?path, "Creating new place index");
        std::fs::create_dir_all(path)?;
        let schema = place_schema(settings.tiers);
        let index = Index::create_in_dir(path, schema.clone())?;
        register_tokenizer(&index);
        let fields = PlaceFields::from_schema(&schema, settings.tiers)?;
        let encoder = SpatialFieldEncoder::new(TierPlotter::new(settings.tiers, settings.projection));

        if data.is_empty() {
            warn!(%collection, "No data to index. Index will be empty.");
        }
        let populated = Self::populate(&index, &fields, &encoder, &data, settings.writer_memory_bytes)
            .and_then(|records| {
                write_manifest(path, collection, descriptor, settings, records)?;
                Ok(records)
            });
        match populated {
            Ok(records) => info!(%collection, records, "Index creation complete"),
            Err(e) => {
                warn!(path = ?path, error = %e, "Index build failed, removing partial index");
                if let Err(cleanup) = std::fs::remove_dir_all(path) {
                    warn!(path = ?path, error = %cleanup, "Failed to remove partial index");
                }
                return Err(e);
            }
        }

        Self::from_index(collection, path, &index, fields, settings)
    }

    fn populate(
        index: &Index,
        fields: &PlaceFields,
        encoder: &SpatialFieldEncoder,
        df: &DataFrame,
        memory_bytes: usize,
    ) -> Result<u64> {
        let record_ids = df.column(gazetteer::RECORD_ID)?.u64()?;
        let names = df.column(gazetteer::NAME)?.str()?;
        let alt_names_1 = df.column(gazetteer::ALT_NAME_1)?.str()?;
        let alt_names_2 = df.column(gazetteer::ALT_NAME_2)?.str()?;
        let latitudes = df.column(gazetteer::LATITUDE)?.f64()?;
        let longitudes = df.column(gazetteer::LONGITUDE)?.f64()?;

        let mut writer: IndexWriter = index.writer_with_num_threads(1, memory_bytes)?;
        let mut written = 0_u64;
        for (record_id, name, alt_1, alt_2, lat, lon) in izip!(
            record_ids,
            names,
            alt_names_1,
            alt_names_2,
            latitudes,
            longitudes
        ) {
            let (Some(record_id), Some(lat), Some(lon)) = (record_id, lat, lon) else {
                warn!(?record_id, "Skipping record without coordinates");
                continue;
            };
            let record = PlaceRecord::new(
                record_id,
                name.unwrap_or_default(),
                alt_1,
                alt_2,
                GeoPoint::new(lat, lon),
                encoder,
            );
            writer.add_document(record.to_document(fields)?)?;
            written += 1;
        }
        writer.commit()?;
        Ok(written)
    }

    fn warn_if_source_changed(&self, descriptor: &DataSourceDescriptor) {
        let manifest = match read_manifest(&self.path) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Could not read index manifest");
                return;
            }
        };
        let current = serde_json::to_value(descriptor).ok();
        if manifest.get("source") != current.as_ref() {
            warn!(
                collection = %self.collection,
                path = ?self.path,
                "Index was built from a different data source description; using it as is"
            );
        }
    }

    pub const fn collection(&self) -> Collection {
        self.collection
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn fields(&self) -> &PlaceFields {
        &self.fields
    }

    pub const fn plotter(&self) -> TierPlotter {
        self.plotter
    }

    pub fn searcher(&self) -> Searcher {
        self.reader.searcher()
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

fn write_manifest(
    path: &Path,
    collection: Collection,
    descriptor: &DataSourceDescriptor,
    settings: &IndexSettings,
    records: u64,
) -> Result<()> {
    let manifest = serde_json::json!({
        "collection": collection.name(),
        "source": descriptor,
        "tiers": { "start": settings.tiers.start(), "end": settings.tiers.end() },
        "projection": format!("{:?}", settings.projection),
        "records": records,
        "built_at": chrono::Utc::now().to_rfc3339(),
    });
    let file = std::fs::File::create(path.join(MANIFEST_FILE))?;
    serde_json::to_writer_pretty(file, &manifest)?;
    Ok(())
}

fn read_manifest(path: &Path) -> Result<Option<serde_json::Value>> {
    let manifest_path = path.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Ok(None);
    }
    let file = std::fs::File::open(manifest_path)?;
    Ok(Some(serde_json::from_reader(file)?))
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum IndexError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Tantivy error: {0}")]
        Tantivy(#[from] tantivy::TantivyError),
        #[error("DataFrame error: {0}")]
        DataFrame(#[from] polars::prelude::PolarsError),
        #[error("Data error: {0}")]
        Data(#[from] georef_data::DataError),
        #[error("Manifest error: {0}")]
        Manifest(#[from] serde_json::Error),
        #[error("Schema is missing field {0}")]
        MissingField(String),
        #[error("Index settings mismatch: {0}")]
        SettingsMismatch(String),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }
    pub type Result<T> = std::result::Result<T, IndexError>;
}
