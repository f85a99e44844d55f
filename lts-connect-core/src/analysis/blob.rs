//! Corridor buffer, proximate islands and the blob built from them

use geo::{Area, ConcaveHull, concave_hull::ConcaveHullOptions, MultiLineString, MultiPoint, MultiPolygon, Point};

use crate::{
    IslandId,
    geometry::{buffer_lines, union_all},
    model::StudySegment,
    network::IslandSet,
};

/// Buffer of `distance` network units around the segment geometry
pub fn corridor_buffer(segment: &StudySegment, distance: f64) -> MultiPolygon<f64> {
    buffer_lines(&segment.geometry, distance)
}

/// Islands touched by one corridor
#[derive(Debug, Clone, PartialEq)]
pub struct ProximateIslandSet {
    pub island_ids: Vec<IslandId>,
    pub geometry: MultiLineString<f64>,
    pub miles: f64,
}

impl ProximateIslandSet {
    pub fn is_empty(&self) -> bool {
        self.island_ids.is_empty()
    }
}

/// Every island intersecting `corridor`, with their collected geometry and
/// summed mileage. Zero islands give zero miles.
pub fn find_proximate_islands(islands: &IslandSet, corridor: &MultiPolygon<f64>) -> ProximateIslandSet {
    let found = islands.intersecting(corridor);

    ProximateIslandSet {
        island_ids: found.iter().map(|island| island.id).collect(),
        geometry: MultiLineString::new(
            found
                .iter()
                .flat_map(|island| island.geometry.0.iter().cloned())
                .collect(),
        ),
        miles: found.iter().fold(0.0, |miles, island| miles + island.size_miles),
    }
}

/// Concave hull of the proximate islands joined with the corridor.
///
/// Without islands the blob is the corridor itself. Islands whose vertices
/// cannot span a hull are kept as a thin buffer around their lines.
pub fn build_blob(
    proximate: &ProximateIslandSet,
    corridor: &MultiPolygon<f64>,
    concavity: f64,
) -> MultiPolygon<f64> {
    let mut points: Vec<Point<f64>> = proximate
        .geometry
        .0
        .iter()
        .flat_map(|line| line.points())
        .collect();
    points.sort_by(|a, b| a.x().total_cmp(&b.x()).then(a.y().total_cmp(&b.y())));
    points.dedup();

    let hull = (points.len() >= 3)
        .then(|| MultiPoint::new(points).concave_hull_with_options(ConcaveHullOptions::default().concavity(concavity)))
        .filter(|hull| hull.unsigned_area() > 0.0);

    match hull {
        Some(hull) => union_all([MultiPolygon::new(vec![hull]), corridor.clone()]),
        // too few points or all of them collinear
        None => union_all([corridor.clone(), buffer_lines(&proximate.geometry, 1.0)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AnalysisConfig,
        model::{NetworkTables, NetworkType, RawEdge, SegmentName},
        network::{LowStressNetwork, partition_islands},
    };
    use geo::{Contains, line_string};

    fn segment(line: geo::LineString<f64>) -> StudySegment {
        StudySegment {
            id: 1,
            owner: "ann".to_string(),
            name: SegmentName::sanitize("test"),
            tables: NetworkTables::new(NetworkType::Lts, Some(2)).unwrap(),
            geometry: MultiLineString::new(vec![line]),
        }
    }

    fn islands() -> IslandSet {
        let config = AnalysisConfig::default();
        let edges = vec![
            RawEdge::new(1, line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 1000.0)], Some(1)),
            RawEdge::new(2, line_string![(x: 0.0, y: 1000.0), (x: -500.0, y: 1500.0)], Some(1)),
            RawEdge::new(3, line_string![(x: 200.0, y: 0.0), (x: 200.0, y: 1000.0)], Some(2)),
            RawEdge::new(4, line_string![(x: 5000.0, y: 0.0), (x: 5000.0, y: 1000.0)], Some(2)),
        ];
        let network = LowStressNetwork::build(
            NetworkTables::new(NetworkType::Lts, Some(2)).unwrap(),
            &edges,
            &config,
        );
        IslandSet::new(partition_islands(&network, &config))
    }

    #[test]
    fn corridor_buffers_segment() {
        let corridor = corridor_buffer(&segment(line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)]), 30.0);
        // rectangle 100 x 60 plus two half discs of radius 30
        let expected = 100.0 * 60.0 + std::f64::consts::PI * 900.0;
        assert!((corridor.unsigned_area() - expected).abs() / expected < 0.01);
    }

    #[test]
    fn collects_islands_crossed_by_corridor() {
        let islands = islands();
        let corridor = corridor_buffer(
            &segment(line_string![(x: -50.0, y: 500.0), (x: 250.0, y: 500.0)]),
            30.0,
        );
        let proximate = find_proximate_islands(&islands, &corridor);

        assert_eq!(proximate.island_ids.len(), 2);
        assert_eq!(proximate.geometry.0.len(), 3);
        let expected_miles = (1000.0 + 500.0 * 2f64.sqrt() + 1000.0) / 1609.0;
        assert!((proximate.miles - expected_miles).abs() < 1e-9);

        let blob = build_blob(&proximate, &corridor, 2.0);
        assert!(blob.unsigned_area() > corridor.unsigned_area());
        assert!(blob.contains(&Point::new(100.0, 500.0)));
    }

    #[test]
    fn blob_without_islands_is_the_corridor() {
        let islands = islands();
        let corridor = corridor_buffer(
            &segment(line_string![(x: 2000.0, y: 0.0), (x: 2100.0, y: 0.0)]),
            30.0,
        );
        let proximate = find_proximate_islands(&islands, &corridor);

        assert!(proximate.is_empty());
        assert_eq!(proximate.miles, 0.0);
        let blob = build_blob(&proximate, &corridor, 2.0);
        assert!((blob.unsigned_area() - corridor.unsigned_area()).abs() < 1e-6);
    }

    #[test]
    fn collinear_island_is_kept() {
        let config = AnalysisConfig::default();
        let edges = vec![
            RawEdge::new(1, line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 500.0)], Some(1)),
            RawEdge::new(2, line_string![(x: 0.0, y: 500.0), (x: 0.0, y: 1000.0)], Some(1)),
            RawEdge::new(3, line_string![(x: 0.0, y: 1000.0), (x: 0.0, y: 1500.0)], Some(1)),
        ];
        let network = LowStressNetwork::build(
            NetworkTables::new(NetworkType::Lts, Some(2)).unwrap(),
            &edges,
            &config,
        );
        let islands = IslandSet::new(partition_islands(&network, &config));
        let corridor = corridor_buffer(
            &segment(line_string![(x: -50.0, y: 100.0), (x: 50.0, y: 100.0)]),
            30.0,
        );

        let proximate = find_proximate_islands(&islands, &corridor);
        assert_eq!(proximate.island_ids.len(), 1);

        let blob = build_blob(&proximate, &corridor, 2.0);
        assert!(blob.unsigned_area() > corridor.unsigned_area());
        assert!(blob.contains(&Point::new(0.0, 1400.0)));
    }
}
