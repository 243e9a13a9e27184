/// Assumed height of one storey, in meters
pub const DEFAULT_STOREY_HEIGHT: f64 = 3.0;

/// 1 foot = 0.3048 m
pub const FEET_TO_METERS: f64 = 0.3048;

/// Input suffixes replaced by `OUTPUT_EXTENSION` when no output path is given.
/// Longest first so `.osm.pbf` wins over `.osm`.
pub const OSM_SUFFIXES: [&str; 2] = [".osm.pbf", ".osm"];

pub const OUTPUT_EXTENSION: &str = ".geojson";

/// Tag keys read from OSM primitives
pub const TAG_BUILDING: &str = "building";
pub const TAG_HEIGHT: &str = "height";
pub const TAG_LEVELS: &str = "building:levels";
pub const TAG_NAME: &str = "name";
