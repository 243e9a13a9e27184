use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, LevelFilter};
use std::path::PathBuf;

use osm_buildings::{BuildingCollection, RunConfig};

/// Scrape an OSM extract for buildings (name, height, levels) and save them as GeoJSON
#[derive(Parser, Debug)]
#[command(name = "osm-buildings", version)]
struct Args {
    /// `.osm.pbf` or `.osm` (XML) file to parse
    input: PathBuf,

    /// GeoJSON file to write (default: input with `.osm.pbf`/`.osm` replaced by `.geojson`)
    output: Option<PathBuf>,

    /// Region for energy estimation, e.g. "mumbai" or "new delhi"
    #[arg(long)]
    region: Option<String>,

    /// Give buildings without a height tag the mean height of tagged outline nodes
    #[arg(long, default_value_t = false)]
    infer_node_heights: bool,

    /// Indent the GeoJSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// More logging (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn into_config(self) -> RunConfig {
        RunConfig::new(self.input)
            .with_output(self.output)
            .with_region(self.region)
            .with_node_height_inference(self.infer_node_heights)
            .with_pretty(self.pretty)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = args.into_config();
    debug!(
        "Run configuration: {}",
        serde_json::to_string(&config).unwrap_or_default()
    );

    println!("Reading file: {}", config.input_path().display());
    let collection = BuildingCollection::from_osm_file(&config)?;

    println!("{}", collection.report());

    let output = config.output_path();
    println!("Saving buildings to {}", output.display());
    collection
        .to_geojson(&output, config.pretty)
        .context("Failed to save buildings")?;

    Ok(())
}
