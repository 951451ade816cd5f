use once_cell::sync::Lazy;
use std::path::PathBuf;

pub mod descriptor;
mod error;
pub mod raw;
pub mod test_data;

pub use descriptor::{ColumnMapping, DataSourceDescriptor, DataSourceDescriptorBuilder};
pub use error::{DataError, Result};
pub use raw::gazetteer::{PLACE_COLUMNS, load_places};
pub use raw::{GeoNamesDump, ensure_geonames_dump};

pub const DATA_DIR_DEFAULT: &str = "./georef_data";
pub const DATA_DIR_ENV: &str = "GEOREF_DATA_DIR";

/// Root directory for raw gazetteer files and built indexes.
///
/// `GEOREF_DATA_DIR` wins when set. With the `system-dirs` feature the
/// platform data directory is used next, then `./georef_data`.
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    #[cfg(feature = "system-dirs")]
    if let Some(dirs) = directories::ProjectDirs::from("", "", "georef") {
        return dirs.data_dir().to_path_buf();
    }
    PathBuf::from(DATA_DIR_DEFAULT)
});

pub fn get_data_dir() -> &'static std::path::Path {
    DATA_DIR.as_path()
}
