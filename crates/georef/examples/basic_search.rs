//! Basic place search
//!
//! This example demonstrates the fundamental search operations:
//! - Building indexes from two small sample gazetteers
//! - Name searches across modern and historical places
//! - Narrowing by a bounding box and ranking by distance

use georef::{
    DataSourceDescriptor, Georeferencer, IndexScope, SearchHit,
    data::test_data::{historical_places, modern_places, write_geonames_file, write_pleiades_file},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    georef::init_logging(tracing::Level::INFO)?;

    let modern = write_geonames_file(&modern_places())?;
    let historical = write_pleiades_file(&historical_places())?;
    let index_root = tempfile::TempDir::new()?;

    let georeferencer = Georeferencer::builder()
        .modern(DataSourceDescriptor::geonames(modern.path()))
        .historical(DataSourceDescriptor::pleiades(historical.path()))
        .index_root(index_root.path())
        .build()?;

    println!("Searching for 'Washington' (modern places):");
    let hits = georeferencer.search_location(Some("Washington"), None, None, Some(IndexScope::ModernOnly))?;
    print_hits(&hits);

    println!("\nSearching for 'Washington' inside northern England:");
    let hits = georeferencer.search_location(Some("Washington"), Some("54,-3;56,0"), None, None)?;
    print_hits(&hits);

    println!("\nSearching for 'Rome' within 50 miles of 41.9N 12.5E:");
    let hits = georeferencer.search_location(Some("Rome"), None, Some("41.9,12.5,50"), None)?;
    print_hits(&hits);

    println!("\nPlaces near Rome other than Rome itself:");
    let hits = georeferencer.search_nearby(Some("Rome"), "41.9,12.5,25", false, None)?;
    print_hits(&hits);

    Ok(())
}

fn print_hits(hits: &[SearchHit]) {
    for (i, hit) in hits.iter().enumerate() {
        let distance = hit
            .distance
            .map_or_else(String::new, |d| format!(", {d:.1} mi"));
        println!(
            "  {}. {} [{}] ({:.4}, {:.4}) - Score: {:.3}{distance}",
            i + 1,
            hit.name,
            hit.id,
            hit.latitude,
            hit.longitude,
            hit.score,
        );
    }
    if hits.is_empty() {
        println!("  no places found");
    }
}
