use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection};
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::collect::osm::{read_osm_file, BuildingArea, DecodeSummary, MapHandler, Tags};
use crate::config::RunConfig;
use crate::geometric::building::BuildingRecordBuilder;
use crate::geometric::energy::EnergyEstimator;
use crate::geometric::statistics::{RunCounters, StatisticsReport};

/// Buildings extracted by one run, with the counters gathered along the way
#[derive(Debug, Default)]
pub struct BuildingCollection {
    pub features: Vec<Feature>,
    pub counters: RunCounters,
    pub decode_summary: DecodeSummary,
}

impl BuildingCollection {
    /// Read the extract named by `config` and build every building feature
    /// Bad arguments and an unknown region fail here, before the input is opened.
    pub fn from_osm_file(config: &RunConfig) -> Result<Self> {
        config.validate()?;
        let mut processor = BuildingProcessor::from_config(config)?;

        info!("Reading file: {}", config.input_path().display());
        let summary = read_osm_file(config.input_path(), &mut processor)
            .with_context(|| format!("Failed to read {}", config.input_path().display()))?;

        let mut collection = processor.finish();
        collection.decode_summary = summary;
        Ok(collection)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn report(&self) -> StatisticsReport {
        self.counters.report()
    }

    pub fn into_feature_collection(self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features,
            foreign_members: None,
        }
    }

    /// Write the buildings as a GeoJSON FeatureCollection, replacing `path`
    pub fn to_geojson<P: AsRef<Path>>(&self, path: P, pretty: bool) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create GeoJSON file: {:?}", path))?;
        let mut writer = BufWriter::new(file);

        let geojson = FeatureCollectionRef {
            kind: "FeatureCollection",
            features: &self.features,
        };
        let written = if pretty {
            serde_json::to_writer_pretty(&mut writer, &geojson)
        } else {
            serde_json::to_writer(&mut writer, &geojson)
        };
        written.with_context(|| format!("Failed to write GeoJSON file: {:?}", path))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush GeoJSON file: {:?}", path))?;

        debug!("{} features written to {:?}", self.features.len(), path);
        Ok(())
    }
}

/// Serialises like `FeatureCollection` without owning the features
#[derive(Serialize)]
struct FeatureCollectionRef<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    features: &'a [Feature],
}

/// Receives decoder callbacks and accumulates building features
pub struct BuildingProcessor {
    builder: BuildingRecordBuilder,
    features: Vec<Feature>,
}

impl BuildingProcessor {
    pub fn new(builder: BuildingRecordBuilder) -> Self {
        BuildingProcessor {
            builder,
            features: Vec::new(),
        }
    }

    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let mut builder =
            BuildingRecordBuilder::new().with_node_height_inference(config.infer_node_heights);
        if let Some(ref region) = config.region {
            let estimator = EnergyEstimator::new(region)?;
            info!(
                "Energy estimation for {} (EUI {} kWh/m²/yr)",
                estimator.region(),
                estimator.eui()
            );
            builder = builder.with_energy(estimator);
        }
        Ok(Self::new(builder))
    }

    pub fn finish(self) -> BuildingCollection {
        BuildingCollection {
            features: self.features,
            counters: self.builder.into_counters(),
            decode_summary: DecodeSummary::default(),
        }
    }
}

impl MapHandler for BuildingProcessor {
    fn node(&mut self, id: i64, tags: &Tags, lat: f64, lon: f64) {
        self.builder.on_node(id, tags, lat, lon);
    }

    fn area(&mut self, area: &BuildingArea) {
        if let Some(feature) = self.builder.on_area(area) {
            self.features.push(feature);
        }
    }
}
