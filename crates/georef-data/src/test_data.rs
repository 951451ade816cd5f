use std::io::Write;

use itertools::Itertools;
use tempfile::NamedTempFile;
use tracing::info;

use super::error::Result;

/// One place to be written into a fixture gazetteer file.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePlace {
    pub name: String,
    pub alternates: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl SamplePlace {
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            alternates: Vec::new(),
            latitude,
            longitude,
        }
    }

    pub fn with_alternates(mut self, alternates: &[&str]) -> Self {
        self.alternates = alternates.iter().map(ToString::to_string).collect();
        self
    }
}

/// A handful of present-day places spread over Europe and North America.
pub fn modern_places() -> Vec<SamplePlace> {
    vec![
        SamplePlace::new("Rome", 41.9, 12.5).with_alternates(&["Roma", "Rom"]),
        SamplePlace::new("Paris", 48.85, 2.35).with_alternates(&["Paree"]),
        SamplePlace::new("London", 51.5074, -0.1278).with_alternates(&["Londres"]),
        SamplePlace::new("Washington", 38.9072, -77.0369).with_alternates(&["Washington DC"]),
        SamplePlace::new("Washington", 54.9, -1.52),
        SamplePlace::new("York", 53.959, -1.0815),
        SamplePlace::new("Ostia", 41.7327, 12.2785),
        SamplePlace::new("Tivoli", 41.9633, 12.7983),
    ]
}

/// Ancient places, several of them near a modern counterpart.
pub fn historical_places() -> Vec<SamplePlace> {
    vec![
        SamplePlace::new("Roma", 41.8919, 12.5113).with_alternates(&["Rome"]),
        SamplePlace::new("Lutetia", 48.8534, 2.3488).with_alternates(&["Paris"]),
        SamplePlace::new("Londinium", 51.5128, -0.0918).with_alternates(&["London"]),
        SamplePlace::new("Eboracum", 53.9583, -1.0803).with_alternates(&["York"]),
        SamplePlace::new("Ostia Antica", 41.7556, 12.2914).with_alternates(&["Ostia"]),
        SamplePlace::new("Tibur", 41.9633, 12.7983),
    ]
}

/// Write places in the GeoNames dump layout (19 tab separated fields, no header).
pub fn write_geonames_file(places: &[SamplePlace]) -> Result<NamedTempFile> {
    info!(rows = places.len(), "Creating GeoNames test data");
    let mut file = NamedTempFile::new()?;
    for (id, place) in places.iter().enumerate() {
        let mut fields = vec![String::new(); 19];
        fields[0] = (id + 1).to_string();
        fields[1].clone_from(&place.name);
        fields[2].clone_from(&place.name);
        fields[3] = place.alternates.iter().join(",");
        fields[4] = place.latitude.to_string();
        fields[5] = place.longitude.to_string();
        fields[6] = "P".to_string();
        fields[7] = "PPL".to_string();
        fields[18] = "2024-01-01".to_string();
        writeln!(file, "{}", fields.iter().join("\t"))?;
    }
    file.flush()?;
    Ok(file)
}

/// Write places in the Pleiades names layout (21 tab separated fields, one header row).
pub fn write_pleiades_file(places: &[SamplePlace]) -> Result<NamedTempFile> {
    info!(rows = places.len(), "Creating Pleiades test data");
    let mut file = NamedTempFile::new()?;
    let header = (0..21).map(|i| format!("field_{i}")).join("\t");
    writeln!(file, "{header}")?;
    for (id, place) in places.iter().enumerate() {
        let mut fields = vec![String::new(); 21];
        fields[0] = format!("pleiades-{}", id + 1);
        fields[8] = place.alternates.first().cloned().unwrap_or_default();
        fields[10] = place.alternates.get(1).cloned().unwrap_or_default();
        fields[13] = place.latitude.to_string();
        fields[15] = place.longitude.to_string();
        fields[19].clone_from(&place.name);
        fields[20] = "settlement".to_string();
        writeln!(file, "{}", fields.iter().join("\t"))?;
    }
    file.flush()?;
    Ok(file)
}
