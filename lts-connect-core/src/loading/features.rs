use geo::{Geometry, LineString, MultiLineString, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use log::{debug, warn};
use serde_json::{Map, Value};

use super::{LayerSource, NetworkSource, read_feature_collection};
use crate::{
    EdgeId, Error,
    model::{DataLayers, GeometryKind, Layer, LayerFeature, NetworkType, RawEdge, SegmentRequest},
};

fn geometry_of(feature: &Feature) -> Result<Option<Geometry<f64>>, Error> {
    feature
        .geometry
        .clone()
        .map(Geometry::<f64>::try_from)
        .transpose()
        .map_err(|e| Error::GeoJsonError(e.to_string()))
}

fn properties_of(feature: &Feature) -> Map<String, Value> {
    feature.properties.clone().unwrap_or_default()
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

/// Single line of an edge; multi-lines are accepted when they hold one part
fn edge_line(geometry: Geometry<f64>) -> Option<LineString<f64>> {
    match geometry {
        Geometry::LineString(line) => Some(line),
        Geometry::MultiLineString(MultiLineString(mut parts)) if parts.len() == 1 => parts.pop(),
        _ => None,
    }
}

/// Reads the edges of one network. Edges without an id or a line geometry
/// are skipped with a warning; a missing stress value leaves the edge
/// unclassified.
pub fn read_edges(network: NetworkType, source: &NetworkSource) -> Result<Vec<RawEdge>, Error> {
    let collection = read_feature_collection(&source.edges)?;
    let id_property = source
        .id_property
        .as_deref()
        .unwrap_or_else(|| network.id_column());

    let mut edges = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for feature in &collection.features {
        let id: Option<EdgeId> = feature
            .property(id_property)
            .and_then(integer)
            .or_else(|| feature.id.as_ref().and_then(feature_id));
        let line = geometry_of(feature)?.and_then(edge_line);

        let (Some(id), Some(line)) = (id, line) else {
            skipped += 1;
            continue;
        };

        let stress = if network.uses_stress() {
            feature
                .property(&source.stress_property)
                .and_then(integer)
                .and_then(|s| u8::try_from(s).ok())
        } else {
            None
        };
        edges.push(RawEdge::new(id, line, stress));
    }

    if skipped > 0 {
        warn!(
            "Skipped {skipped} features of {} without an id or a line geometry",
            source.edges.display()
        );
    }
    Ok(edges)
}

fn feature_id(id: &geojson::feature::Id) -> Option<EdgeId> {
    match id {
        geojson::feature::Id::Number(n) => n.as_i64(),
        geojson::feature::Id::String(s) => s.parse().ok(),
    }
}

/// Loads one attribute layer into `layers`
pub fn read_layer(layers: &mut DataLayers, source: &LayerSource) -> Result<(), Error> {
    let collection = read_feature_collection(&source.path)?;
    let total = collection.features.len();

    match source.kind {
        GeometryKind::Polygon => {
            let mut features = Vec::with_capacity(total);
            for feature in &collection.features {
                let polygons = match geometry_of(feature)? {
                    Some(Geometry::Polygon(polygon)) => MultiPolygon::new(vec![polygon]),
                    Some(Geometry::MultiPolygon(polygons)) => polygons,
                    _ => continue,
                };
                features.push(LayerFeature::new(polygons, properties_of(feature)));
            }
            report(source, features.len(), total);
            layers.add_polygons(Layer::new(&source.name, features, source.is_incident()));
        }
        GeometryKind::Point => {
            let mut features = Vec::with_capacity(total);
            for feature in &collection.features {
                match geometry_of(feature)? {
                    Some(Geometry::Point(point)) => {
                        features.push(LayerFeature::new(point, properties_of(feature)));
                    }
                    Some(Geometry::MultiPoint(points)) => {
                        let properties = properties_of(feature);
                        features.extend(
                            points
                                .0
                                .into_iter()
                                .map(|point| LayerFeature::new(point, properties.clone())),
                        );
                    }
                    _ => {}
                }
            }
            report(source, features.len(), total);
            layers.add_points(Layer::new(&source.name, features, source.is_incident()));
        }
        GeometryKind::Line => {
            let mut features = Vec::with_capacity(total);
            for feature in &collection.features {
                let lines = match geometry_of(feature)? {
                    Some(Geometry::LineString(line)) => MultiLineString::new(vec![line]),
                    Some(Geometry::MultiLineString(lines)) => lines,
                    _ => continue,
                };
                features.push(LayerFeature::new(lines, properties_of(feature)));
            }
            report(source, features.len(), total);
            layers.add_lines(Layer::new(&source.name, features, source.is_incident()));
        }
    }
    Ok(())
}

fn report(source: &LayerSource, kept: usize, total: usize) {
    debug!("Layer {}: {kept} of {total} features loaded", source.name);
    if kept < total {
        warn!(
            "Layer {}: {} features had no usable geometry",
            source.name,
            total - kept
        );
    }
}

/// Candidate segments from an already parsed GeoJSON document, one request
/// per feature. The segment name is read from the `seg_name` or `name`
/// property and falls back to `default_name` followed by the feature index.
pub fn requests_from_geojson(
    geojson: GeoJson,
    template: &SegmentRequest,
    default_name: &str,
) -> Result<Vec<SegmentRequest>, Error> {
    let features = match geojson {
        GeoJson::FeatureCollection(FeatureCollection { features, .. }) => features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            geometry: Some(geometry),
            ..Feature::default()
        }],
    };

    let single = features.len() == 1;
    features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let geometry = geometry_of(feature)?.ok_or_else(|| {
                Error::InvalidGeometryKind(format!("feature {index} has no geometry"))
            })?;
            let name = ["seg_name", "name"]
                .iter()
                .find_map(|key| feature.property(*key).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| {
                    if single {
                        default_name.to_string()
                    } else {
                        format!("{default_name} {}", index + 1)
                    }
                });

            Ok(SegmentRequest {
                geometry,
                name,
                ..template.clone()
            })
        })
        .collect()
}

/// Candidate segments from a GeoJSON file
pub fn read_requests(
    path: &std::path::Path,
    template: &SegmentRequest,
    default_name: &str,
) -> Result<Vec<SegmentRequest>, Error> {
    let text = std::fs::read_to_string(path)?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| Error::GeoJsonError(format!("{}: {e}", path.display())))?;
    requests_from_geojson(geojson, template, default_name)
}
