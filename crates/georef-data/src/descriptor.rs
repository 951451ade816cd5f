//! Descriptions of delimited gazetteer files.
//!
//! A [`DataSourceDescriptor`] says where a file lives, how its fields are
//! separated, how many fields a well-formed record carries and which field
//! positions hold the name, alternate names and coordinates. Descriptors are
//! immutable once built; use [`DataSourceDescriptor::builder`] for sources
//! other than the two shipped presets.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{DataError, Result};

/// Zero-based field positions of the columns a place record is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub name: usize,
    pub alt_name_1: usize,
    pub alt_name_2: usize,
    pub latitude: usize,
    pub longitude: usize,
}

impl ColumnMapping {
    fn positions(&self) -> [(&'static str, usize); 5] {
        [
            ("name", self.name),
            ("alt_name_1", self.alt_name_1),
            ("alt_name_2", self.alt_name_2),
            ("latitude", self.latitude),
            ("longitude", self.longitude),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceDescriptor {
    path: PathBuf,
    delimiter: u8,
    column_count: usize,
    columns: ColumnMapping,
    skip_header: bool,
}

impl DataSourceDescriptor {
    /// GeoNames dump layout (`allCountries.txt`, `cities1000.txt`, ...).
    ///
    /// Tab separated, 19 fields, no header row. Field 1 is the name, 2 the
    /// ASCII name, 3 the comma separated alternate names, 4 and 5 latitude and
    /// longitude.
    pub fn geonames(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b'\t',
            column_count: 19,
            columns: ColumnMapping {
                name: 1,
                alt_name_1: 2,
                alt_name_2: 3,
                latitude: 4,
                longitude: 5,
            },
            skip_header: false,
        }
    }

    /// Pleiades `names` export layout: tab separated, 21 fields, one header row.
    pub fn pleiades(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b'\t',
            column_count: 21,
            columns: ColumnMapping {
                name: 19,
                alt_name_1: 8,
                alt_name_2: 10,
                latitude: 13,
                longitude: 15,
            },
            skip_header: true,
        }
    }

    pub fn builder(path: impl Into<PathBuf>) -> DataSourceDescriptorBuilder {
        DataSourceDescriptorBuilder::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub const fn column_count(&self) -> usize {
        self.column_count
    }

    pub const fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    pub const fn skip_header(&self) -> bool {
        self.skip_header
    }

    /// Same layout, different file.
    pub fn with_path(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..self.clone()
        }
    }
}

/// Builder for custom [`DataSourceDescriptor`]s.
///
/// Starts from the GeoNames layout so only the differing parts need setting.
#[derive(Debug, Clone)]
pub struct DataSourceDescriptorBuilder {
    descriptor: DataSourceDescriptor,
}

impl DataSourceDescriptorBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            descriptor: DataSourceDescriptor::geonames(path),
        }
    }

    pub const fn delimiter(mut self, delimiter: u8) -> Self {
        self.descriptor.delimiter = delimiter;
        self
    }

    pub const fn column_count(mut self, column_count: usize) -> Self {
        self.descriptor.column_count = column_count;
        self
    }

    pub const fn columns(mut self, columns: ColumnMapping) -> Self {
        self.descriptor.columns = columns;
        self
    }

    pub const fn skip_header(mut self, skip_header: bool) -> Self {
        self.descriptor.skip_header = skip_header;
        self
    }

    pub fn build(self) -> Result<DataSourceDescriptor> {
        let descriptor = self.descriptor;
        if descriptor.column_count == 0 {
            return Err(DataError::InvalidDescriptor(
                "column count must be at least 1".to_string(),
            ));
        }
        if matches!(descriptor.delimiter, b'\n' | b'\r') {
            return Err(DataError::InvalidDescriptor(
                "delimiter cannot be a line terminator".to_string(),
            ));
        }
        for (column, position) in descriptor.columns.positions() {
            if position >= descriptor.column_count {
                return Err(DataError::InvalidDescriptor(format!(
                    "{column} is mapped to field {position} but records only have {} fields",
                    descriptor.column_count
                )));
            }
        }
        Ok(descriptor)
    }
}
