//! Island partitioning of a low-stress sub-network

use geo::{Intersects, MultiLineString, MultiPolygon};
use itertools::Itertools;
use log::info;
use petgraph::unionfind::UnionFind;
use rayon::prelude::*;
use rstar::{AABB, RTree, RTreeObject};

use crate::{
    EdgeId, IslandId,
    config::AnalysisConfig,
    geometry::Bounds,
    model::Island,
    network::LowStressNetwork,
};

/// Connected components of `network`, one island per component.
///
/// Ids follow the smallest member edge id, so an unchanged edge set always
/// yields the same ids.
pub fn partition_islands(network: &LowStressNetwork, config: &AnalysisConfig) -> Vec<Island> {
    let mut components = UnionFind::<usize>::new(network.node_count());
    for edge in &network.edges {
        components.union(edge.source as usize, edge.target as usize);
    }

    let mut groups: Vec<Vec<usize>> = (0..network.edges.len())
        .into_group_map_by(|&index| components.find(network.edges[index].source as usize))
        .into_values()
        .collect();
    for group in &mut groups {
        group.sort_unstable_by_key(|&index| network.edges[index].id);
    }
    groups.sort_unstable_by_key(|group| network.edges[group[0]].id);

    let tables = &network.tables;
    let islands: Vec<Island> = groups
        .into_par_iter()
        .enumerate()
        .map(|(position, members)| {
            let edges: Vec<EdgeId> = members.iter().map(|&i| network.edges[i].id).collect();
            let geometry = MultiLineString::new(
                members
                    .iter()
                    .map(|&i| network.edges[i].geometry.clone())
                    .collect(),
            );
            let length: f64 = members.iter().map(|&i| network.edges[i].length).sum();

            Island {
                id: IslandId::try_from(position).unwrap_or(IslandId::MAX),
                network: tables.network,
                comfort_level: tables.comfort_level,
                edges,
                geometry,
                size_miles: length / config.meters_per_mile,
            }
        })
        .collect();

    info!(
        "Partitioned {} into {} islands",
        tables.ls_table,
        islands.len()
    );
    islands
}

#[derive(Debug, Clone)]
struct IslandBounds {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for IslandBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Islands of one partition with a spatial index over their bounds
#[derive(Debug)]
pub struct IslandSet {
    pub islands: Vec<Island>,
    index: RTree<IslandBounds>,
}

impl IslandSet {
    pub fn new(islands: Vec<Island>) -> Self {
        let bounds = islands
            .iter()
            .enumerate()
            .filter_map(|(index, island)| {
                island
                    .geometry
                    .bounds()
                    .map(|aabb| IslandBounds { index, aabb })
            })
            .collect();

        Self {
            islands,
            index: RTree::bulk_load(bounds),
        }
    }

    pub fn len(&self) -> usize {
        self.islands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    pub fn get(&self, id: IslandId) -> Option<&Island> {
        self.islands.get(id as usize).filter(|island| island.id == id)
    }

    /// Islands whose geometry intersects `region`, ordered by id
    pub fn intersecting(&self, region: &MultiPolygon<f64>) -> Vec<&Island> {
        let Some(search) = region.bounds() else {
            return Vec::new();
        };
        let mut found: Vec<&Island> = self
            .index
            .locate_in_envelope_intersecting(&search)
            .map(|bounds| &self.islands[bounds.index])
            .filter(|island| island.geometry.intersects(region))
            .collect();
        found.sort_unstable_by_key(|island| island.id);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NetworkTables, NetworkType, RawEdge};
    use geo::{line_string, polygon};
    use std::collections::BTreeSet;

    fn network(edges: &[RawEdge]) -> LowStressNetwork {
        let tables = NetworkTables::new(NetworkType::Lts, Some(2)).unwrap();
        LowStressNetwork::build(tables, edges, &AnalysisConfig::default())
    }

    fn two_islands() -> Vec<RawEdge> {
        vec![
            RawEdge::new(30, line_string![(x: 0.0, y: 0.0), (x: 1609.0, y: 0.0)], Some(1)),
            RawEdge::new(10, line_string![(x: 1609.0, y: 0.0), (x: 3218.0, y: 0.0)], Some(2)),
            RawEdge::new(20, line_string![(x: 0.0, y: 500.0), (x: 1609.0, y: 500.0)], Some(1)),
        ]
    }

    #[test]
    fn splits_disconnected_components() {
        let islands = partition_islands(&network(&two_islands()), &AnalysisConfig::default());
        assert_eq!(islands.len(), 2);

        assert_eq!(islands[0].edges, vec![10, 30]);
        assert!((islands[0].size_miles - 2.0).abs() < 1e-9);
        assert_eq!(islands[1].edges, vec![20]);
        assert!((islands[1].size_miles - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partition_is_idempotent() {
        let config = AnalysisConfig::default();
        let membership = |edges: &[RawEdge]| -> BTreeSet<Vec<EdgeId>> {
            partition_islands(&network(edges), &config)
                .into_iter()
                .map(|island| island.edges)
                .collect()
        };

        let mut reversed = two_islands();
        reversed.reverse();
        assert_eq!(membership(&two_islands()), membership(&two_islands()));
        assert_eq!(membership(&two_islands()), membership(&reversed));
    }

    #[test]
    fn finds_islands_touching_region() {
        let config = AnalysisConfig::default();
        let set = IslandSet::new(partition_islands(&network(&two_islands()), &config));
        let region = MultiPolygon::new(vec![polygon![
            (x: 100.0, y: -10.0), (x: 200.0, y: -10.0), (x: 200.0, y: 10.0), (x: 100.0, y: 10.0)
        ]]);

        let found = set.intersecting(&region);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].edges, vec![10, 30]);
        assert!(set.get(found[0].id).is_some());
    }
}
