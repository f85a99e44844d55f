//! Thin helpers over `geo` shared by the analysis steps

use geo::{
    BooleanOps, Buffer, Euclidean, Length, LineString, MultiLineString, MultiPolygon, Point,
    Polygon,
};
use rstar::AABB;

/// Axis aligned bounds used for R-tree lookups
pub trait Bounds {
    fn bounds(&self) -> Option<AABB<[f64; 2]>>;
}

fn aabb_of<'a>(coords: impl Iterator<Item = &'a geo::Coord<f64>>) -> Option<AABB<[f64; 2]>> {
    let points: Vec<[f64; 2]> = coords.map(|c| [c.x, c.y]).collect();
    if points.is_empty() {
        None
    } else {
        Some(AABB::from_points(points.iter()))
    }
}

impl Bounds for Point<f64> {
    fn bounds(&self) -> Option<AABB<[f64; 2]>> {
        Some(AABB::from_point([self.x(), self.y()]))
    }
}

impl Bounds for LineString<f64> {
    fn bounds(&self) -> Option<AABB<[f64; 2]>> {
        aabb_of(self.0.iter())
    }
}

impl Bounds for MultiLineString<f64> {
    fn bounds(&self) -> Option<AABB<[f64; 2]>> {
        aabb_of(self.0.iter().flat_map(|line| line.0.iter()))
    }
}

impl Bounds for MultiPolygon<f64> {
    fn bounds(&self) -> Option<AABB<[f64; 2]>> {
        aabb_of(self.0.iter().flat_map(|polygon| polygon.exterior().0.iter()))
    }
}

pub(crate) fn line_length(line: &LineString<f64>) -> f64 {
    Euclidean.length(line)
}

pub(crate) fn multi_line_length(lines: &MultiLineString<f64>) -> f64 {
    lines.0.iter().map(line_length).sum()
}

pub(crate) fn buffer_lines(lines: &MultiLineString<f64>, distance: f64) -> MultiPolygon<f64> {
    lines.buffer(distance)
}

/// Union of every polygon set, empty input gives an empty multipolygon
pub(crate) fn union_all(parts: impl IntoIterator<Item = MultiPolygon<f64>>) -> MultiPolygon<f64> {
    parts
        .into_iter()
        .fold(MultiPolygon::new(vec![]), |acc, part| {
            if acc.0.is_empty() {
                part
            } else if part.0.is_empty() {
                acc
            } else {
                acc.union(&part)
            }
        })
}

/// Drops every interior ring. Parts that sat inside a hole are merged into
/// the filled polygon, so the result never overlaps itself.
pub(crate) fn fill_holes(geometry: MultiPolygon<f64>) -> MultiPolygon<f64> {
    union_all(geometry.0.into_iter().map(|polygon| {
        let (exterior, _) = polygon.into_inner();
        MultiPolygon::new(vec![Polygon::new(exterior, vec![])])
    }))
}

/// Round half away from zero to the nearest hundred
pub(crate) fn round_to_hundred(value: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let rounded = ((value / 100.0).round() * 100.0) as i64;
    rounded
}
