use std::path::PathBuf;

use tracing::{info, instrument, warn};

#[cfg(feature = "download_data")]
pub mod fetch;

pub mod gazetteer;

pub use super::error::Result;

/// GeoNames population-filtered extracts, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoNamesDump {
    Cities15000,
    Cities5000,
    #[default]
    Cities1000,
    Cities500,
    AllCountries,
}

impl GeoNamesDump {
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::Cities15000 => "cities15000",
            Self::Cities5000 => "cities5000",
            Self::Cities1000 => "cities1000",
            Self::Cities500 => "cities500",
            Self::AllCountries => "allCountries",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.txt", self.file_stem())
    }

    pub fn url(self) -> String {
        format!(
            "https://download.geonames.org/export/dump/{}.zip",
            self.file_stem()
        )
    }
}

/// Locate a GeoNames dump under `<DATA_DIR>/raw/`.
///
/// When the file is missing and the `download_data` feature is enabled the
/// dump is downloaded and extracted there; otherwise `RequiredFilesNotFound`
/// is returned.
#[instrument(name = "Get GeoNames raw data", skip_all, level = "info")]
pub fn ensure_geonames_dump(dump: GeoNamesDump) -> Result<PathBuf> {
    let raw_dir = crate::get_data_dir().join("raw");
    info!("Checking for raw data in: {}", raw_dir.display());

    let path = raw_dir.join(dump.file_name());
    if path.is_file() {
        info!(path = ?path, "Found existing raw data file");
        return Ok(path);
    }

    warn!(path = ?path, "Raw data file not found");

    #[cfg(feature = "download_data")]
    {
        info!("Attempting to download raw data as download_data feature is enabled.");
        std::fs::create_dir_all(&raw_dir)?;
        fetch::download_dump(dump, &path)?;
        Ok(path)
    }
    #[cfg(not(feature = "download_data"))]
    {
        warn!("Download_data feature is disabled. Cannot download missing files.");
        Err(crate::DataError::RequiredFilesNotFound)
    }
}
