use std::sync::Arc;

use polars::prelude::*;
use tracing::{info, instrument, warn};

use super::Result;
use crate::{DataError, DataSourceDescriptor};

pub const RECORD_ID: &str = "record_id";
pub const NAME: &str = "name";
pub const ALT_NAME_1: &str = "alt_name_1";
pub const ALT_NAME_2: &str = "alt_name_2";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";

/// Columns of the frame returned by [`load_places`], in order.
pub const PLACE_COLUMNS: [&str; 6] = [RECORD_ID, NAME, ALT_NAME_1, ALT_NAME_2, LATITUDE, LONGITUDE];

fn raw_column(position: usize) -> String {
    format!("column_{}", position + 1)
}

fn raw_schema(column_count: usize) -> Schema {
    Schema::from_iter(
        (0..column_count).map(|position| (PlSmallStr::from(raw_column(position)), DataType::String)),
    )
}

/// Read a delimited gazetteer file into a frame of place records.
///
/// Every field is read as text. Records with fewer fields than the
/// descriptor's column count are skipped, extra fields are ignored. The
/// `record_id` column is the zero-based ordinal of each accepted record.
/// Coordinates that do not parse as floating point fail the whole load.
#[instrument(name = "Load gazetteer", skip_all, fields(path = ?descriptor.path()), level = "info")]
pub fn load_places(descriptor: &DataSourceDescriptor) -> Result<DataFrame> {
    let path = descriptor.path();
    if !path.is_file() {
        return Err(DataError::DataFileNotFound(path.to_path_buf()));
    }

    let column_count = descriptor.column_count();
    let raw = CsvReadOptions::default()
        .with_has_header(false)
        .with_skip_rows(usize::from(descriptor.skip_header()))
        .with_schema(Some(Arc::new(raw_schema(column_count))))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(descriptor.delimiter())
                .with_quote_char(None)
                .with_truncate_ragged_lines(true)
                .with_missing_is_null(false),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let read_rows = raw.height();
    let columns = descriptor.columns();
    let last_column = raw_column(column_count - 1);

    let places = raw
        .lazy()
        .filter(col(last_column.as_str()).is_not_null())
        .with_row_index(RECORD_ID, None)
        .select([
            col(RECORD_ID).cast(DataType::UInt64),
            col(raw_column(columns.name).as_str())
                .fill_null(lit(""))
                .alias(NAME),
            col(raw_column(columns.alt_name_1).as_str())
                .fill_null(lit(""))
                .alias(ALT_NAME_1),
            col(raw_column(columns.alt_name_2).as_str())
                .fill_null(lit(""))
                .alias(ALT_NAME_2),
            col(raw_column(columns.latitude).as_str())
                .strict_cast(DataType::Float64)
                .alias(LATITUDE),
            col(raw_column(columns.longitude).as_str())
                .strict_cast(DataType::Float64)
                .alias(LONGITUDE),
        ])
        .collect()?;

    let skipped = read_rows - places.height();
    if skipped > 0 {
        warn!(skipped, "Skipped records with fewer fields than expected");
    }
    info!(rows = places.height(), "Loaded gazetteer records");

    Ok(places)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::{SamplePlace, write_geonames_file, write_pleiades_file};
    use crate::tests_utils::{assert_column_type, assert_has_columns};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_geonames_layout() {
        let file = write_geonames_file(&[
            SamplePlace::new("Rome", 41.9, 12.5).with_alternates(&["Roma", "Rom"]),
            SamplePlace::new("Paris", 48.85, 2.35),
        ])
        .unwrap();

        let df = load_places(&DataSourceDescriptor::geonames(file.path())).unwrap();

        assert_has_columns(&df, &PLACE_COLUMNS);
        assert_column_type(&df, LATITUDE, &DataType::Float64);
        assert_column_type(&df, RECORD_ID, &DataType::UInt64);
        assert_eq!(df.height(), 2);

        let names: Vec<Option<&str>> = df.column(NAME).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(names, vec![Some("Rome"), Some("Paris")]);

        let alternates: Vec<Option<&str>> =
            df.column(ALT_NAME_2).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(alternates[0], Some("Roma,Rom"));

        let latitudes: Vec<Option<f64>> =
            df.column(LATITUDE).unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(latitudes, vec![Some(41.9), Some(48.85)]);
    }

    #[test]
    fn test_load_pleiades_skips_header() {
        let file = write_pleiades_file(&[
            SamplePlace::new("Londinium", 51.51, -0.09).with_alternates(&["London"]),
        ])
        .unwrap();

        let df = load_places(&DataSourceDescriptor::pleiades(file.path())).unwrap();

        assert_eq!(df.height(), 1);
        let name = df.column(NAME).unwrap().str().unwrap().get(0);
        assert_eq!(name, Some("Londinium"));
        let longitude = df.column(LONGITUDE).unwrap().f64().unwrap().get(0);
        assert_eq!(longitude, Some(-0.09));
    }

    #[test]
    fn test_short_records_are_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0\tAlpha\t\t\t1.0\t2.0").unwrap();
        writeln!(file, "1\tBeta").unwrap();
        writeln!(file, "2\tGamma\t\t\t3.0\t4.0\textra").unwrap();
        file.flush().unwrap();

        let descriptor = DataSourceDescriptor::builder(file.path())
            .column_count(6)
            .build()
            .unwrap();
        let df = load_places(&descriptor).unwrap();

        let names: Vec<Option<&str>> = df.column(NAME).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(names, vec![Some("Alpha"), Some("Gamma")]);
        let ids: Vec<Option<u64>> = df.column(RECORD_ID).unwrap().u64().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_unparseable_coordinate_fails_load() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0\tAlpha\t\t\tnorth\t2.0").unwrap();
        file.flush().unwrap();

        let descriptor = DataSourceDescriptor::builder(file.path())
            .column_count(6)
            .build()
            .unwrap();
        assert!(load_places(&descriptor).is_err());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let descriptor = DataSourceDescriptor::geonames("/nonexistent/georef/cities.txt");
        assert!(matches!(
            load_places(&descriptor),
            Err(DataError::DataFileNotFound(_))
        ));
    }
}
