//! Configuring georeferencing
//!
//! Shows the configuration presets, custom coordinate separators and the
//! XML response produced from raw request parameters.

use georef::{
    DataSourceDescriptor, DecayFunction, GeoreferenceConfigBuilder, Georeferencer, QueryParams,
    data::test_data::{historical_places, modern_places, write_geonames_file, write_pleiades_file},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    georef::init_logging(tracing::Level::WARN)?;

    let modern = write_geonames_file(&modern_places())?;
    let historical = write_pleiades_file(&historical_places())?;
    let index_root = tempfile::TempDir::new()?;

    // Pipe-separated points, space-separated coordinates, ten results at most
    let config = GeoreferenceConfigBuilder::new()
        .separators('|', ' ')?
        .hits_per_page(10)
        .decay(DecayFunction::Logarithmic)
        .build();
    println!("Custom configuration: {config:#?}");

    let georeferencer = Georeferencer::builder()
        .modern(DataSourceDescriptor::geonames(modern.path()))
        .historical(DataSourceDescriptor::pleiades(historical.path()))
        .index_root(index_root.path())
        .config(config)
        .build()?;

    let xml = georeferencer.respond(&QueryParams::from_pairs([
        ("placeName", "York"),
        ("nearbyPlaces", "53.96 -1.08 10|51.5 -0.12 10"),
    ]))?;
    println!("{xml}");

    // The legacy preset consults historical places only when no modern place matches
    let legacy = GeoreferenceConfigBuilder::legacy().build();
    let legacy_georeferencer = Georeferencer::load_existing(index_root.path(), legacy)?
        .ok_or("indexes should exist")?;
    let xml = legacy_georeferencer.respond(&QueryParams::from_pairs([("placeName", "Eboracum")]))?;
    println!("{xml}");

    Ok(())
}
