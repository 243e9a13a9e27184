// Example: extract buildings from an .osm.pbf file with energy estimates
// Usage: cargo run --example buildings_from_pbf -- path/to/city.osm.pbf mumbai
use anyhow::{Context, Result};
use osm_buildings::{BuildingCollection, RunConfig};

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let input = args.next().context("Missing a filename to parse")?;
    let region = args.next();

    println!("=== Example: buildings from {} ===\n", input);

    let config = RunConfig::new(input).with_region(region);
    let collection = BuildingCollection::from_osm_file(&config)?;

    println!("{}\n", collection.report());
    for feature in collection.features.iter().take(5) {
        println!("  {:?}", feature.properties);
    }

    let output = config.output_path();
    collection.to_geojson(&output, false)?;
    println!("\nSaved {} buildings to {}", collection.len(), output.display());

    Ok(())
}
