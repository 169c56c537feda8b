// Map overlays derived from the last prediction result and the current selection
use crate::aa_models::{PredictionResult, Station};
use crate::aa_state::Selection;
use geo::BoundingRect;
use geo_types::{Coord, MultiPoint, Point, Rect};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::Value;

/// Latitude-first coordinate, as consumed by the map surface.
pub type LatLon = [f64; 2];
pub type Polyline = Vec<LatLon>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Highlight {
    pub is_start: bool,
    pub is_end: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker<'a> {
    pub station: &'a Station,
    pub position: LatLon,
    pub highlight: Highlight,
}

/// Backend geometry is `[[[lon, lat], ...], ...]`. Each pair is flipped to
/// `[lat, lon]`; entries that are not arrays are dropped.
pub fn build_overlays(result: &PredictionResult) -> Vec<Polyline> {
    let sequences = match result.geometry.as_ref().and_then(Value::as_array) {
        Some(sequences) => sequences,
        None => return Vec::new(),
    };

    sequences
        .iter()
        .filter_map(Value::as_array)
        .map(|sequence| sequence.iter().filter_map(swap_axes).collect())
        .collect()
}

fn swap_axes(pair: &Value) -> Option<LatLon> {
    let pair = pair.as_array()?;
    let lon = pair.first()?.as_f64()?;
    let lat = pair.get(1)?.as_f64()?;
    Some([lat, lon])
}

pub fn highlight(station: &Station, selection: &Selection) -> Highlight {
    Highlight {
        is_start: selection
            .start
            .as_ref()
            .is_some_and(|start| start.same_station(station)),
        is_end: selection
            .end
            .as_ref()
            .is_some_and(|end| end.same_station(station)),
    }
}

/// Markers for every station with a usable position. Stations with NaN
/// coordinates stay selectable elsewhere but are never drawn.
pub fn renderable_markers<'a>(stations: &'a [Station], selection: &Selection) -> Vec<Marker<'a>> {
    stations
        .iter()
        .filter(|s| s.has_valid_position())
        .map(|station| Marker {
            station,
            position: [station.lat, station.lon],
            highlight: highlight(station, selection),
        })
        .collect()
}

/// Bounding box over markers and overlays, in lon/lat (x/y) space.
pub fn viewport_bounds(markers: &[Marker<'_>], overlays: &[Polyline]) -> Option<Rect<f64>> {
    let points: MultiPoint<f64> = markers
        .iter()
        .map(|m| m.position)
        .chain(overlays.iter().flatten().copied())
        .filter(|[lat, lon]| lat.is_finite() && lon.is_finite())
        .map(|[lat, lon]| Point::new(lon, lat))
        .collect::<Vec<_>>()
        .into();

    points.bounding_rect()
}

/// Grow a degenerate or tight rectangle so projection never divides by zero.
pub fn pad_bounds(rect: Rect<f64>, fraction: f64, min_span: f64) -> Rect<f64> {
    let pad_x = (rect.width() * fraction).max(min_span / 2.0);
    let pad_y = (rect.height() * fraction).max(min_span / 2.0);
    Rect::new(
        Coord { x: rect.min().x - pad_x, y: rect.min().y - pad_y },
        Coord { x: rect.max().x + pad_x, y: rect.max().y + pad_y },
    )
}

/// GeoJSON export; positions go back to longitude-first order.
pub fn overlays_to_geojson(overlays: &[Polyline]) -> FeatureCollection {
    let features = overlays
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let positions = line.iter().map(|[lat, lon]| vec![*lon, *lat]).collect();
            let mut properties = JsonObject::new();
            properties.insert("route_index".to_string(), Value::from(i + 1));

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::LineString(positions))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
