pub mod osm_collect;

pub use osm_collect::{
    read_osm_file, read_osm_xml, AreaAssembler, BuildingArea, DecodeSummary, MapHandler, Tags,
};
