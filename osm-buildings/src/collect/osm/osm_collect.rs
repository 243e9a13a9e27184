use geo::{Contains, Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use log::{debug, info, warn};
use osmpbf::{Element, ElementReader, RelMemberType};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

#[cfg(feature = "indicatif")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{BuildingsError, BuildingsResult};
use crate::geo_core::wkb_from_geometry;

/// Tag set of one OSM primitive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Tags(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Tags(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A closed area handed to the handler: tags plus its footprint as WKB
#[derive(Debug, Clone)]
pub struct BuildingArea {
    pub tags: Tags,
    /// MultiPolygon in lon/lat, Well-Known-Binary
    pub wkb: Vec<u8>,
    /// Node ids of the outer ring(s), closing vertex excluded
    pub outer_node_ids: Vec<i64>,
}

/// Callbacks driven by the map-data decoder
pub trait MapHandler {
    /// Called for every tagged point primitive
    fn node(&mut self, _id: i64, _tags: &Tags, _lat: f64, _lon: f64) {}

    /// Called for every closed area (closed way or simple multipolygon)
    fn area(&mut self, area: &BuildingArea);
}

/// Counters kept by the decoder itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub nodes: u64,
    pub ways: u64,
    pub relations: u64,
    pub areas: u64,
    /// Areas dropped because a node or member way was missing or a ring was open
    pub skipped_areas: u64,
}

/// Role of a way inside a multipolygon relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingRole {
    Outer,
    Inner,
}

impl RingRole {
    /// Empty roles count as outer, like most OSM tooling does
    pub fn from_role(role: &str) -> Option<Self> {
        match role {
            "outer" | "" => Some(RingRole::Outer),
            "inner" => Some(RingRole::Inner),
            _ => None,
        }
    }
}

/// Turns nodes, ways and relations into closed areas
///
/// Expects the usual PBF ordering (nodes, then ways, then relations). Only
/// closed ways and multipolygon relations whose members are each closed
/// ways become areas; joining open member ways into rings is not done.
#[derive(Default)]
pub struct AreaAssembler {
    node_locations: HashMap<i64, Coord<f64>>,
    closed_ways: HashMap<i64, Vec<i64>>,
    summary: DecodeSummary,
}

impl AreaAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node<H: MapHandler>(
        &mut self,
        handler: &mut H,
        id: i64,
        lat: f64,
        lon: f64,
        tags: Tags,
    ) {
        self.summary.nodes += 1;
        self.node_locations.insert(id, Coord { x: lon, y: lat });
        if !tags.is_empty() {
            handler.node(id, &tags, lat, lon);
        }
    }

    pub fn add_way<H: MapHandler>(&mut self, handler: &mut H, id: i64, refs: Vec<i64>, tags: Tags) {
        self.summary.ways += 1;
        if !is_closed(&refs) {
            return;
        }

        if !tags.is_empty() {
            match self.ring(&refs) {
                Some(ring) => {
                    let outer_node_ids = refs[..refs.len() - 1].to_vec();
                    let geometry = MultiPolygon(vec![Polygon::new(ring, vec![])]);
                    self.emit(handler, tags, geometry, outer_node_ids);
                }
                None => {
                    debug!("Way {} references unknown nodes, skipped", id);
                    self.summary.skipped_areas += 1;
                }
            }
        }

        self.closed_ways.insert(id, refs);
    }

    pub fn add_relation<H: MapHandler>(
        &mut self,
        handler: &mut H,
        id: i64,
        members: Vec<(i64, RingRole)>,
        tags: Tags,
    ) {
        self.summary.relations += 1;
        if tags.get("type") != Some("multipolygon") {
            return;
        }

        let mut outers: Vec<(Polygon<f64>, Vec<i64>)> = Vec::new();
        let mut inners: Vec<LineString<f64>> = Vec::new();

        for (way_id, role) in members {
            let ring = self
                .closed_ways
                .get(&way_id)
                .and_then(|refs| self.ring(refs).map(|ring| (ring, refs)));
            let Some((ring, refs)) = ring else {
                debug!(
                    "Multipolygon {} has an unclosed or missing member way {}, skipped",
                    id, way_id
                );
                self.summary.skipped_areas += 1;
                return;
            };
            match role {
                RingRole::Outer => {
                    let ids = refs[..refs.len() - 1].to_vec();
                    outers.push((Polygon::new(ring, vec![]), ids));
                }
                RingRole::Inner => inners.push(ring),
            }
        }

        if outers.is_empty() {
            debug!("Multipolygon {} has no outer ring, skipped", id);
            self.summary.skipped_areas += 1;
            return;
        }

        // Each inner ring goes to the first outer ring containing its first vertex
        for inner in inners {
            let Some(first) = inner.0.first().copied() else {
                continue;
            };
            match outers
                .iter_mut()
                .find(|(outer, _)| outer.contains(&Point::from(first)))
            {
                Some((outer, _)) => outer.interiors_push(inner),
                None => debug!("Multipolygon {}: inner ring outside every outer ring", id),
            }
        }

        let outer_node_ids = outers.iter().flat_map(|(_, ids)| ids.clone()).collect();
        let geometry = MultiPolygon(outers.into_iter().map(|(poly, _)| poly).collect());
        self.emit(handler, tags, geometry, outer_node_ids);
    }

    pub fn finish(self) -> DecodeSummary {
        self.summary
    }

    fn ring(&self, refs: &[i64]) -> Option<LineString<f64>> {
        refs.iter()
            .map(|id| self.node_locations.get(id).copied())
            .collect::<Option<Vec<_>>>()
            .map(LineString::from)
    }

    fn emit<H: MapHandler>(
        &mut self,
        handler: &mut H,
        tags: Tags,
        geometry: MultiPolygon<f64>,
        outer_node_ids: Vec<i64>,
    ) {
        match wkb_from_geometry(&Geometry::MultiPolygon(geometry)) {
            Ok(wkb) => {
                self.summary.areas += 1;
                handler.area(&BuildingArea {
                    tags,
                    wkb,
                    outer_node_ids,
                });
            }
            Err(e) => {
                warn!("Could not encode area geometry: {}", e);
                self.summary.skipped_areas += 1;
            }
        }
    }
}

fn is_closed(refs: &[i64]) -> bool {
    refs.len() >= 4 && refs.first() == refs.last()
}

/// Empty roles count as outer; any other role drops the member
fn member_role(relation_id: i64, way_id: i64, role: &str) -> Option<RingRole> {
    let ring_role = RingRole::from_role(role);
    if ring_role.is_none() {
        debug!(
            "Relation {}: member way {} with role '{}' ignored",
            relation_id, way_id, role
        );
    }
    ring_role
}

/// Stream an OSM extract into `handler`
///
/// `.osm` files are read as XML, anything else as PBF. Single pass,
/// blocking; the file is only read.
pub fn read_osm_file<P: AsRef<Path>, H: MapHandler>(
    path: P,
    handler: &mut H,
) -> BuildingsResult<DecodeSummary> {
    let path = path.as_ref();
    let summary = match path.extension().and_then(|ext| ext.to_str()) {
        Some("osm") => {
            let file = File::open(path).map_err(|e| {
                BuildingsError::Decode(format!("failed to open {}: {}", path.display(), e))
            })?;
            read_osm_xml(BufReader::new(file), handler).map_err(|e| match e {
                BuildingsError::Decode(msg) => {
                    BuildingsError::Decode(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })?
        }
        _ => read_osm_pbf(path, handler)?,
    };

    info!(
        "Read {} nodes, {} ways, {} relations; {} areas ({} skipped)",
        summary.nodes, summary.ways, summary.relations, summary.areas, summary.skipped_areas
    );
    Ok(summary)
}

fn read_osm_pbf<H: MapHandler>(path: &Path, handler: &mut H) -> BuildingsResult<DecodeSummary> {
    let reader = ElementReader::from_path(path).map_err(|e| {
        BuildingsError::Decode(format!("failed to open {}: {}", path.display(), e))
    })?;

    #[cfg(feature = "indicatif")]
    let progress = {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("[{elapsed_precise}] {spinner} {pos} elements {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(path.display().to_string());
        pb
    };

    let mut assembler = AreaAssembler::new();

    reader
        .for_each(|element| {
            #[cfg(feature = "indicatif")]
            progress.inc(1);

            match element {
                Element::Node(node) => {
                    let tags = node.tags().collect();
                    assembler.add_node(handler, node.id(), node.lat(), node.lon(), tags);
                }
                Element::DenseNode(node) => {
                    let tags = node.tags().collect();
                    assembler.add_node(handler, node.id(), node.lat(), node.lon(), tags);
                }
                Element::Way(way) => {
                    let tags = way.tags().collect();
                    assembler.add_way(handler, way.id(), way.refs().collect(), tags);
                }
                Element::Relation(relation) => {
                    let relation_id = relation.id();
                    let members = relation
                        .members()
                        .filter(|m| m.member_type == RelMemberType::Way)
                        .filter_map(|m| {
                            let role = m.role().unwrap_or("");
                            member_role(relation_id, m.member_id, role).map(|r| (m.member_id, r))
                        })
                        .collect();
                    let tags = relation.tags().collect();
                    assembler.add_relation(handler, relation_id, members, tags);
                }
            }
        })
        .map_err(|e| BuildingsError::Decode(format!("{}: {}", path.display(), e)))?;

    #[cfg(feature = "indicatif")]
    progress.finish_and_clear();

    Ok(assembler.finish())
}

/// Primitive being read from XML, handed over when its element closes
enum XmlPrimitive {
    Node { id: i64, lat: f64, lon: f64, tags: Tags },
    Way { id: i64, refs: Vec<i64>, tags: Tags },
    Relation { id: i64, members: Vec<(i64, RingRole)>, tags: Tags },
}

impl XmlPrimitive {
    fn tags_mut(&mut self) -> &mut Tags {
        match self {
            XmlPrimitive::Node { tags, .. }
            | XmlPrimitive::Way { tags, .. }
            | XmlPrimitive::Relation { tags, .. } => tags,
        }
    }

    fn feed<H: MapHandler>(self, assembler: &mut AreaAssembler, handler: &mut H) {
        match self {
            XmlPrimitive::Node { id, lat, lon, tags } => {
                assembler.add_node(handler, id, lat, lon, tags)
            }
            XmlPrimitive::Way { id, refs, tags } => assembler.add_way(handler, id, refs, tags),
            XmlPrimitive::Relation { id, members, tags } => {
                assembler.add_relation(handler, id, members, tags)
            }
        }
    }
}

fn attr_value(event: &BytesStart<'_>, key: &[u8]) -> BuildingsResult<Option<String>> {
    for attr in event.attributes().with_checks(false) {
        let attr = attr.map_err(|e| BuildingsError::Decode(e.to_string()))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|e| BuildingsError::Decode(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn required_attr<T: FromStr>(event: &BytesStart<'_>, key: &[u8]) -> BuildingsResult<T> {
    attr_value(event, key)?
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| {
            BuildingsError::Decode(format!(
                "<{}> without a valid '{}' attribute",
                String::from_utf8_lossy(event.name().as_ref()),
                String::from_utf8_lossy(key)
            ))
        })
}

/// Stream OSM XML (`<osm>` document) into `handler`
///
/// Same ordering expectations as the PBF reader.
pub fn read_osm_xml<R: BufRead, H: MapHandler>(
    input: R,
    handler: &mut H,
) -> BuildingsResult<DecodeSummary> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut assembler = AreaAssembler::new();
    let mut current: Option<XmlPrimitive> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| BuildingsError::Decode(e.to_string()))?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let self_closing = matches!(event, Event::Empty(_));
                let name = e.name();
                match name.as_ref() {
                    b"node" => {
                        current = Some(XmlPrimitive::Node {
                            id: required_attr(e, b"id")?,
                            lat: required_attr(e, b"lat")?,
                            lon: required_attr(e, b"lon")?,
                            tags: Tags::new(),
                        })
                    }
                    b"way" => {
                        current = Some(XmlPrimitive::Way {
                            id: required_attr(e, b"id")?,
                            refs: Vec::new(),
                            tags: Tags::new(),
                        })
                    }
                    b"relation" => {
                        current = Some(XmlPrimitive::Relation {
                            id: required_attr(e, b"id")?,
                            members: Vec::new(),
                            tags: Tags::new(),
                        })
                    }
                    b"tag" => {
                        if let Some(primitive) = current.as_mut() {
                            if let (Some(k), Some(v)) = (attr_value(e, b"k")?, attr_value(e, b"v")?) {
                                primitive.tags_mut().insert(k, v);
                            }
                        }
                    }
                    b"nd" => {
                        if let Some(XmlPrimitive::Way { refs, .. }) = current.as_mut() {
                            refs.push(required_attr(e, b"ref")?);
                        }
                    }
                    b"member" => {
                        if let Some(XmlPrimitive::Relation { id, members, .. }) = current.as_mut() {
                            if attr_value(e, b"type")?.as_deref() == Some("way") {
                                let way_id = required_attr(e, b"ref")?;
                                let role = attr_value(e, b"role")?.unwrap_or_default();
                                if let Some(role) = member_role(*id, way_id, &role) {
                                    members.push((way_id, role));
                                }
                            }
                        }
                    }
                    _ => {}
                }
                let is_primitive = matches!(name.as_ref(), b"node" | b"way" | b"relation");
                if self_closing && is_primitive {
                    if let Some(primitive) = current.take() {
                        primitive.feed(&mut assembler, handler);
                    }
                }
            }
            Event::End(ref e) => {
                if matches!(e.name().as_ref(), b"node" | b"way" | b"relation") {
                    if let Some(primitive) = current.take() {
                        primitive.feed(&mut assembler, handler);
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(assembler.finish())
}
