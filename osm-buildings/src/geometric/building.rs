use geo::Geometry as GeoGeometry;
use geojson::{Feature, Geometry, Value};
use log::{debug, warn};
use serde_json::{Map, Number};

use crate::collect::global_variables::{TAG_BUILDING, TAG_HEIGHT, TAG_LEVELS, TAG_NAME};
use crate::collect::osm::{BuildingArea, Tags};
use crate::commons::basic_functions::parse_height;
use crate::geo_core::{geometry_from_wkb, projected_area_m2};
use crate::geometric::energy::EnergyEstimator;
use crate::geometric::node_heights::NodeHeightIndex;
use crate::geometric::statistics::RunCounters;

/// Normalised attributes of one building
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingProperties {
    pub name: Option<String>,
    /// Meters
    pub height: Option<f64>,
    /// `building:levels`, verbatim
    pub levels: Option<String>,
    /// Planar footprint area, m² (energy estimation only)
    pub area: Option<f64>,
    /// Estimated energy use, kWh/year (energy estimation only)
    pub eui: Option<f64>,
}

impl BuildingProperties {
    /// Property bag of the GeoJSON feature; absent values are left out
    pub fn to_map(&self) -> Map<String, serde_json::Value> {
        let mut properties = Map::new();
        if let Some(ref levels) = self.levels {
            properties.insert(
                TAG_LEVELS.to_string(),
                serde_json::Value::String(levels.clone()),
            );
        }
        if let Some(height) = self.height.and_then(Number::from_f64) {
            properties.insert(TAG_HEIGHT.to_string(), serde_json::Value::Number(height));
        }
        if let Some(ref name) = self.name {
            properties.insert(TAG_NAME.to_string(), serde_json::Value::String(name.clone()));
        }
        if let Some(area) = self.area.and_then(Number::from_f64) {
            properties.insert("area".to_string(), serde_json::Value::Number(area));
        }
        if let Some(eui) = self.eui.and_then(Number::from_f64) {
            properties.insert("eui".to_string(), serde_json::Value::Number(eui));
        }
        properties
    }
}

/// Turns decoded areas into GeoJSON building features
///
/// Keeps the run counters and, when height inference is on, the heights of
/// tagged nodes seen so far.
pub struct BuildingRecordBuilder {
    estimator: Option<EnergyEstimator>,
    infer_node_heights: bool,
    node_heights: NodeHeightIndex,
    counters: RunCounters,
}

impl Default for BuildingRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildingRecordBuilder {
    pub fn new() -> Self {
        BuildingRecordBuilder {
            estimator: None,
            infer_node_heights: false,
            node_heights: NodeHeightIndex::new(),
            counters: RunCounters::default(),
        }
    }

    /// Attach `area` and `eui` to every building
    pub fn with_energy(mut self, estimator: EnergyEstimator) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Fill missing heights from tagged outline nodes
    pub fn with_node_height_inference(mut self, enabled: bool) -> Self {
        self.infer_node_heights = enabled;
        self
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn node_heights(&self) -> &NodeHeightIndex {
        &self.node_heights
    }

    /// Record a point primitive; only nodes with a `height` tag are kept
    pub fn on_node(&mut self, id: i64, tags: &Tags, lat: f64, lon: f64) {
        if let Some(raw) = tags.get(TAG_HEIGHT) {
            self.node_heights.insert(id, parse_height(raw), lat, lon);
            self.counters.height_nodes += 1;
        }
    }

    /// Build the feature of one area, or None if it is not a building
    pub fn on_area(&mut self, area: &BuildingArea) -> Option<Feature> {
        self.counters.areas_seen += 1;
        let tags = &area.tags;
        if !tags.contains(TAG_BUILDING) {
            return None;
        }

        let geometry = match geometry_from_wkb(&area.wkb) {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!("Skipping building: {}", e);
                self.counters.geometry_failures += 1;
                return None;
            }
        };

        self.counters.buildings += 1;
        let mut properties = BuildingProperties::default();

        if let Some(levels) = tags.get(TAG_LEVELS) {
            self.counters.with_levels += 1;
            properties.levels = Some(levels.to_string());
        }

        if let Some(raw) = tags.get(TAG_HEIGHT) {
            properties.height = Some(parse_height(raw));
            self.counters.with_height += 1;
        } else if self.infer_node_heights {
            if let Some(avg) = self.node_heights.average_height(&area.outer_node_ids) {
                debug!("Height {:.2} m inferred from outline nodes", avg);
                properties.height = Some(avg);
                self.counters.heights_from_nodes += 1;
            }
        }

        if let Some(name) = tags.get(TAG_NAME) {
            self.counters.named += 1;
            properties.name = Some(name.to_string());
        }

        if let Some(ref estimator) = self.estimator {
            match projected_area_m2(&geometry) {
                Ok(area_m2) => {
                    let levels = properties.levels.as_deref().and_then(parse_levels);
                    properties.area = Some(area_m2);
                    properties.eui = Some(estimator.estimate(levels, properties.height, area_m2));
                }
                Err(e) => warn!("No energy estimate for building: {}", e),
            }
        }

        Some(to_feature(&geometry, &properties))
    }

    pub fn into_counters(self) -> RunCounters {
        self.counters
    }
}

/// `building:levels` as a floor count, when it is a plain number
fn parse_levels(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|l| l.is_finite() && *l >= 0.0)
}

pub fn to_feature(geometry: &GeoGeometry<f64>, properties: &BuildingProperties) -> Feature {
    let mut feature = Feature::from(Geometry::new(Value::from(geometry)));
    feature.properties = Some(properties.to_map());
    feature
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_core::wkb_from_geometry;
    use geo::{polygon, MultiPolygon};

    fn area(pairs: &[(&str, &str)]) -> BuildingArea {
        let footprint = polygon![
            (x: 72.8300, y: 18.9300),
            (x: 72.8302, y: 18.9300),
            (x: 72.8302, y: 18.9302),
            (x: 72.8300, y: 18.9302),
            (x: 72.8300, y: 18.9300),
        ];
        let geometry = GeoGeometry::MultiPolygon(MultiPolygon(vec![footprint]));
        BuildingArea {
            tags: pairs.iter().copied().collect(),
            wkb: wkb_from_geometry(&geometry).unwrap(),
            outer_node_ids: vec![1, 2, 3, 4],
        }
    }

    fn prop<'a>(feature: &'a Feature, key: &str) -> Option<&'a serde_json::Value> {
        feature.properties.as_ref().and_then(|p| p.get(key))
    }

    #[test]
    fn test_non_building_is_ignored() {
        let mut builder = BuildingRecordBuilder::new();
        assert!(builder.on_area(&area(&[("landuse", "grass")])).is_none());

        let counters = builder.counters();
        assert_eq!(counters.buildings, 0);
        assert_eq!(counters.with_height, 0);
        assert_eq!(counters.areas_seen, 1);
    }

    #[test]
    fn test_building_properties() {
        let mut builder = BuildingRecordBuilder::new();
        let feature = builder
            .on_area(&area(&[
                ("building", "yes"),
                ("height", "40ft"),
                ("building:levels", "3"),
                ("name", "Tower"),
            ]))
            .unwrap();

        let height = prop(&feature, "height").and_then(|v| v.as_f64()).unwrap();
        assert!((height - 12.192).abs() < 1e-9);
        assert_eq!(prop(&feature, "building:levels"), Some(&serde_json::json!("3")));
        assert_eq!(prop(&feature, "name"), Some(&serde_json::json!("Tower")));
        assert!(prop(&feature, "area").is_none());
        assert!(prop(&feature, "eui").is_none());

        let geometry = feature.geometry.as_ref().unwrap();
        assert!(matches!(geometry.value, Value::MultiPolygon(_)));

        let counters = builder.counters();
        assert_eq!(counters.buildings, 1);
        assert_eq!(counters.with_height, 1);
        assert_eq!(counters.with_levels, 1);
        assert_eq!(counters.named, 1);
    }

    #[test]
    fn test_unparseable_height_is_zero() {
        let mut builder = BuildingRecordBuilder::new();
        let feature = builder
            .on_area(&area(&[("building", "yes"), ("height", "tall")]))
            .unwrap();
        assert_eq!(prop(&feature, "height").and_then(|v| v.as_f64()), Some(0.0));
    }

    #[test]
    fn test_broken_wkb_is_skipped_not_fatal() {
        let mut builder = BuildingRecordBuilder::new();
        let mut broken = area(&[("building", "yes")]);
        broken.wkb = vec![0xde, 0xad];
        assert!(builder.on_area(&broken).is_none());
        assert_eq!(builder.counters().geometry_failures, 1);
        assert_eq!(builder.counters().buildings, 0);

        assert!(builder.on_area(&area(&[("building", "yes")])).is_some());
        assert_eq!(builder.counters().buildings, 1);
    }

    #[test]
    fn test_node_height_inference() {
        let mut builder = BuildingRecordBuilder::new().with_node_height_inference(true);
        builder.on_node(2, &[("height", "10")].into_iter().collect(), 18.93, 72.83);
        builder.on_node(4, &[("height", "20")].into_iter().collect(), 18.93, 72.83);
        builder.on_node(7, &[("amenity", "bench")].into_iter().collect(), 18.93, 72.83);
        assert_eq!(builder.node_heights().len(), 2);

        let feature = builder.on_area(&area(&[("building", "yes")])).unwrap();
        assert_eq!(prop(&feature, "height").and_then(|v| v.as_f64()), Some(15.0));
        assert_eq!(builder.counters().heights_from_nodes, 1);
        assert_eq!(builder.counters().with_height, 0);
    }

    #[test]
    fn test_node_heights_unused_when_disabled() {
        let mut builder = BuildingRecordBuilder::new();
        builder.on_node(2, &[("height", "10")].into_iter().collect(), 18.93, 72.83);
        let feature = builder.on_area(&area(&[("building", "yes")])).unwrap();
        assert!(prop(&feature, "height").is_none());
    }

    #[test]
    fn test_energy_properties() {
        let estimator = EnergyEstimator::new("mumbai").unwrap();
        let mut builder = BuildingRecordBuilder::new().with_energy(estimator);
        let feature = builder
            .on_area(&area(&[("building", "yes"), ("height", "9")]))
            .unwrap();

        // Proj data may be missing; then the estimate is left out
        if let Some(area_m2) = prop(&feature, "area").and_then(|v| v.as_f64()) {
            assert!(area_m2 > 400.0 && area_m2 < 520.0, "area = {}", area_m2);
            let eui = prop(&feature, "eui").and_then(|v| v.as_f64()).unwrap();
            assert!((eui - 54.0 * 3.0 * area_m2).abs() < 1e-6);
        }
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!(parse_levels("4"), Some(4.0));
        assert_eq!(parse_levels(" 2.5 "), Some(2.5));
        assert_eq!(parse_levels("3;4"), None);
        assert_eq!(parse_levels("-1"), None);
    }
}
