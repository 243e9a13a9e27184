pub mod collect;
pub mod commons;
pub mod config;
pub mod error;
pub mod geo_core;
pub mod geometric;

pub use collect::osm::{read_osm_file, BuildingArea, MapHandler, Tags};
pub use commons::basic_functions::parse_height;
pub use config::RunConfig;
pub use error::{BuildingsError, BuildingsResult};
pub use geometric::building::BuildingRecordBuilder;
pub use geometric::collection::{BuildingCollection, BuildingProcessor};
pub use geometric::energy::{estimate_energy, EnergyEstimator};
pub use geometric::statistics::{RunCounters, StatisticsReport};
