use geo::{Area, BoundingRect, Coord, Geometry, MapCoords};
use geos::{Geom, Geometry as GeosGeometry};
use proj::Proj;

use crate::error::{BuildingsError, BuildingsResult};

/// Geographic CRS of OSM coordinates
pub const WGS84: &str = "EPSG:4326";

/// Encode a footprint as Well-Known-Binary
/// Only polygons and multipolygons are building footprints.
pub fn wkb_from_geometry(geometry: &Geometry<f64>) -> BuildingsResult<Vec<u8>> {
    ensure_areal(geometry)?;

    let geos_geom: GeosGeometry = geometry
        .clone()
        .try_into()
        .map_err(|e: geos::Error| BuildingsError::GeometryDecode(e.to_string()))?;
    let buf = geos_geom
        .to_wkb()
        .map_err(|e| BuildingsError::GeometryDecode(e.to_string()))?;
    let bytes: &[u8] = buf.as_ref();

    Ok(bytes.to_vec())
}

/// Decode Well-Known-Binary into a polygon or multipolygon
pub fn geometry_from_wkb(wkb: &[u8]) -> BuildingsResult<Geometry<f64>> {
    let geos_geom = GeosGeometry::new_from_wkb(wkb)
        .map_err(|e| BuildingsError::GeometryDecode(e.to_string()))?;
    let geometry: Geometry<f64> = geos_geom
        .try_into()
        .map_err(|e: geos::Error| BuildingsError::GeometryDecode(e.to_string()))?;

    ensure_areal(&geometry)?;
    Ok(geometry)
}

fn ensure_areal(geometry: &Geometry<f64>) -> BuildingsResult<()> {
    match geometry {
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Ok(()),
        other => Err(BuildingsError::GeometryDecode(format!(
            "expected Polygon or MultiPolygon, got {}",
            geometry_type_name(other)
        ))),
    }
}

fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Albers equal-area projection fitted to one footprint
///
/// The standard parallels are the footprint's southern and northern
/// latitudes, which keeps the area distortion negligible at building scale.
pub struct EqualAreaProjector {
    proj: Proj,
    lat_1: f64,
    lat_2: f64,
}

impl EqualAreaProjector {
    /// Build a projector from WGS84 lon/lat to Albers meters
    pub fn new(lat_1: f64, lat_2: f64) -> BuildingsResult<Self> {
        let definition = format!(
            "+proj=aea +lat_1={} +lat_2={} +datum=WGS84 +units=m +no_defs +type=crs",
            lat_1, lat_2
        );
        let proj = Proj::new_known_crs(WGS84, &definition, None)
            .map_err(|e| BuildingsError::Projection(e.to_string()))?;

        Ok(EqualAreaProjector { proj, lat_1, lat_2 })
    }

    /// Projector whose standard parallels span the geometry's latitudes
    pub fn for_geometry(geometry: &Geometry<f64>) -> BuildingsResult<Self> {
        let rect = geometry
            .bounding_rect()
            .ok_or_else(|| BuildingsError::Projection("empty geometry".to_string()))?;
        Self::new(rect.min().y, rect.max().y)
    }

    pub fn standard_parallels(&self) -> (f64, f64) {
        (self.lat_1, self.lat_2)
    }

    /// Planar area of a lon/lat geometry in square meters
    pub fn area_m2(&self, geometry: &Geometry<f64>) -> BuildingsResult<f64> {
        let proj = &self.proj;
        let projected = geometry
            .try_map_coords(|c: Coord<f64>| {
                proj.convert((c.x, c.y)).map(|(x, y)| Coord { x, y })
            })
            .map_err(|e| BuildingsError::Projection(e.to_string()))?;

        Ok(projected.unsigned_area())
    }
}

/// Planar area of a lon/lat footprint, projected on its own latitude span
pub fn projected_area_m2(geometry: &Geometry<f64>) -> BuildingsResult<f64> {
    EqualAreaProjector::for_geometry(geometry)?.area_m2(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, LineString, MultiPolygon, Point};

    fn square() -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: 72.8300, y: 18.9300),
            (x: 72.8310, y: 18.9300),
            (x: 72.8310, y: 18.9310),
            (x: 72.8300, y: 18.9310),
            (x: 72.8300, y: 18.9300),
        ])
    }

    #[test]
    fn test_wkb_roundtrip_polygon() {
        let geometry = square();
        let wkb = wkb_from_geometry(&geometry).unwrap();
        assert!(!wkb.is_empty());

        let decoded = geometry_from_wkb(&wkb).unwrap();
        assert_eq!(decoded, geometry);
    }

    #[test]
    fn test_wkb_multipolygon() {
        let Geometry::Polygon(poly) = square() else {
            unreachable!()
        };
        let geometry = Geometry::MultiPolygon(MultiPolygon(vec![poly]));
        let decoded = geometry_from_wkb(&wkb_from_geometry(&geometry).unwrap()).unwrap();
        assert!(matches!(decoded, Geometry::MultiPolygon(_)));
    }

    #[test]
    fn test_rejects_non_areal() {
        let point = Geometry::Point(Point::new(1.0, 2.0));
        assert!(wkb_from_geometry(&point).is_err());

        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]));
        assert!(wkb_from_geometry(&line).is_err());
    }

    #[test]
    fn test_garbage_wkb_is_an_error() {
        let result = geometry_from_wkb(&[0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(BuildingsError::GeometryDecode(_))));
    }

    #[test]
    fn test_projected_area() {
        // Proj data may be missing on some machines
        let result = projected_area_m2(&square());
        if let Ok(area) = result {
            // ~105 m x ~111 m near Mumbai
            assert!(area > 10_000.0 && area < 13_000.0, "area = {}", area);
        }
    }

    #[test]
    fn test_standard_parallels_follow_bounds() {
        if let Ok(projector) = EqualAreaProjector::for_geometry(&square()) {
            let (lat_1, lat_2) = projector.standard_parallels();
            assert!((lat_1 - 18.93).abs() < 1e-9);
            assert!((lat_2 - 18.931).abs() < 1e-9);
        }
    }
}
