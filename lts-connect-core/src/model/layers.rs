//! Attribute layers queried by the stat aggregator and land-use closure

use std::str::FromStr;

use geo::{Intersects, MultiLineString, MultiPolygon, Point};
use hashbrown::HashMap;
use rstar::{AABB, RTree, RTreeObject};
use serde_json::{Map, Value};

use crate::{Error, geometry::Bounds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Polygon,
    Point,
    Line,
}

impl FromStr for GeometryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "polygon" => Ok(GeometryKind::Polygon),
            "point" => Ok(GeometryKind::Point),
            "line" => Ok(GeometryKind::Line),
            other => Err(Error::InvalidData(format!("unknown geometry kind {other}"))),
        }
    }
}

/// One feature of a layer with its attributes
#[derive(Debug, Clone)]
pub struct LayerFeature<G> {
    pub geometry: G,
    pub properties: Map<String, Value>,
}

impl<G> LayerFeature<G> {
    pub fn new(geometry: G, properties: Map<String, Value>) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    /// Numeric attribute, numbers stored as strings are accepted
    pub fn number(&self, column: &str) -> Option<f64> {
        match self.properties.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Attribute rendered as a grouping category, `None` for null or missing
    pub fn category(&self, column: &str) -> Option<String> {
        match self.properties.get(column)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Feature bounds wrapper for R-tree spatial indexing.
#[derive(Debug, Clone)]
struct FeatureBounds {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Named set of features with a spatial index over their bounds
#[derive(Debug)]
pub struct Layer<G> {
    pub name: String,
    pub features: Vec<LayerFeature<G>>,
    /// Crash/incident layers are attributed to the corridor, not the region
    pub incident: bool,
    index: RTree<FeatureBounds>,
}

impl<G: Bounds> Layer<G> {
    pub fn new(name: impl Into<String>, features: Vec<LayerFeature<G>>, incident: bool) -> Self {
        let bounds = features
            .iter()
            .enumerate()
            .filter_map(|(index, feature)| {
                feature
                    .geometry
                    .bounds()
                    .map(|aabb| FeatureBounds { index, aabb })
            })
            .collect();

        Self {
            name: name.into(),
            features,
            incident,
            index: RTree::bulk_load(bounds),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Positions in `features` of every feature intersecting `region`, ascending
    pub fn intersecting_indices(&self, region: &MultiPolygon<f64>) -> Vec<usize>
    where
        G: Intersects<MultiPolygon<f64>>,
    {
        let Some(search) = region.bounds() else {
            return Vec::new();
        };
        let mut found: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&search)
            .map(|bounds| bounds.index)
            .filter(|&index| self.features[index].geometry.intersects(region))
            .collect();
        found.sort_unstable();
        found
    }

    /// Features whose geometry intersects `region`
    pub fn intersecting(&self, region: &MultiPolygon<f64>) -> Vec<&LayerFeature<G>>
    where
        G: Intersects<MultiPolygon<f64>>,
    {
        self.intersecting_indices(region)
            .into_iter()
            .map(|index| &self.features[index])
            .collect()
    }
}

/// Every attribute layer available to an analysis, keyed by layer name
#[derive(Debug, Default)]
pub struct DataLayers {
    pub polygons: HashMap<String, Layer<MultiPolygon<f64>>>,
    pub points: HashMap<String, Layer<Point<f64>>>,
    pub lines: HashMap<String, Layer<MultiLineString<f64>>>,
}

impl DataLayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_polygons(&mut self, layer: Layer<MultiPolygon<f64>>) {
        self.polygons.insert(layer.name.clone(), layer);
    }

    pub fn add_points(&mut self, layer: Layer<Point<f64>>) {
        self.points.insert(layer.name.clone(), layer);
    }

    pub fn add_lines(&mut self, layer: Layer<MultiLineString<f64>>) {
        self.lines.insert(layer.name.clone(), layer);
    }

    pub fn polygon_layer(&self, name: &str) -> Result<&Layer<MultiPolygon<f64>>, Error> {
        self.polygons
            .get(name)
            .ok_or_else(|| Error::UnknownLayer(name.to_string()))
    }

    pub fn point_layer(&self, name: &str) -> Result<&Layer<Point<f64>>, Error> {
        self.points
            .get(name)
            .ok_or_else(|| Error::UnknownLayer(name.to_string()))
    }

    pub fn line_layer(&self, name: &str) -> Result<&Layer<MultiLineString<f64>>, Error> {
        self.lines
            .get(name)
            .ok_or_else(|| Error::UnknownLayer(name.to_string()))
    }

    /// Whether the named layer holds incidents, whatever its geometry kind
    pub fn is_incident_layer(&self, name: &str) -> bool {
        self.polygons.get(name).is_some_and(|l| l.incident)
            || self.points.get(name).is_some_and(|l| l.incident)
            || self.lines.get(name).is_some_and(|l| l.incident)
    }
}
