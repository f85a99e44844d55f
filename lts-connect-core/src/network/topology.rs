//! Topology of a low-stress sub-network
//!
//! Edge endpoints closer than the snapping tolerance collapse into one node,
//! and each node sits at the centroid of the endpoints mapped to it.

use geo::{Intersects, MultiPolygon, Point};
use log::{debug, warn};
use petgraph::graph::{NodeIndex, UnGraph};
use rstar::{AABB, RTree, RTreeObject, primitives::GeomWithData};

use crate::{
    NodeId,
    config::AnalysisConfig,
    geometry::{Bounds, line_length},
    model::{NetworkEdge, NetworkNode, NetworkTables, RawEdge},
    network::stress::traversal_minutes,
};

/// Undirected graph over node ids, edge weight is the index into `edges`
pub type NetworkGraph = UnGraph<NodeId, usize>;

type SnapPoint = GeomWithData<[f64; 2], NodeId>;

#[derive(Debug, Clone)]
struct EdgeBounds {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for EdgeBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Low-stress sub-network of one network type and comfort level
#[derive(Debug)]
pub struct LowStressNetwork {
    pub tables: NetworkTables,
    pub edges: Vec<NetworkEdge>,
    pub nodes: Vec<NetworkNode>,
    graph: NetworkGraph,
    edge_index: RTree<EdgeBounds>,
}

impl LowStressNetwork {
    /// Builds the topology of already filtered edges
    pub fn build(tables: NetworkTables, raw_edges: &[RawEdge], config: &AnalysisConfig) -> Self {
        let speed = tables.network.speed_kmh(config);
        let mut snapper = NodeSnapper::new(config.snapping_tolerance);
        let mut edges = Vec::with_capacity(raw_edges.len());

        for raw in raw_edges {
            let coords = &raw.geometry.0;
            if coords.len() < 2 {
                warn!("Edge {} has fewer than two vertices, skipping", raw.id);
                continue;
            }
            let (start, end) = (coords[0], coords[coords.len() - 1]);

            let source = snapper.snap(start.x, start.y);
            let target = snapper.snap(end.x, end.y);
            let length = line_length(&raw.geometry);

            edges.push(NetworkEdge {
                id: raw.id,
                source,
                target,
                geometry: raw.geometry.clone(),
                stress: raw.stress,
                length,
                traversal_min: traversal_minutes(length, speed),
            });
        }

        let nodes = snapper.into_nodes();

        let mut graph = NetworkGraph::with_capacity(nodes.len(), edges.len());
        for node in &nodes {
            graph.add_node(node.id);
        }
        for (index, edge) in edges.iter().enumerate() {
            graph.add_edge(
                NodeIndex::new(edge.source as usize),
                NodeIndex::new(edge.target as usize),
                index,
            );
        }

        let bounds = edges
            .iter()
            .enumerate()
            .filter_map(|(index, edge)| {
                edge.geometry
                    .bounds()
                    .map(|aabb| EdgeBounds { index, aabb })
            })
            .collect();

        debug!(
            "Built {} topology with {} nodes and {} edges",
            tables.ls_table,
            nodes.len(),
            edges.len()
        );

        Self {
            tables,
            edges,
            nodes,
            graph,
            edge_index: RTree::bulk_load(bounds),
        }
    }

    pub fn graph(&self) -> &NetworkGraph {
        &self.graph
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Indices of the edges intersecting `region`, ascending
    pub fn edges_intersecting(&self, region: &MultiPolygon<f64>) -> Vec<usize> {
        let Some(search) = region.bounds() else {
            return Vec::new();
        };
        let mut found: Vec<usize> = self
            .edge_index
            .locate_in_envelope_intersecting(&search)
            .map(|bounds| bounds.index)
            .filter(|&index| self.edges[index].geometry.intersects(region))
            .collect();
        found.sort_unstable();
        found
    }
}

/// Assigns node ids to endpoints, merging endpoints within the tolerance
struct NodeSnapper {
    tolerance_sq: f64,
    tree: RTree<SnapPoint>,
    // running sum of x, y and endpoint count per node
    sums: Vec<(f64, f64, u32)>,
}

impl NodeSnapper {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance_sq: tolerance * tolerance,
            tree: RTree::new(),
            sums: Vec::new(),
        }
    }

    fn snap(&mut self, x: f64, y: f64) -> NodeId {
        let query = [x, y];
        let existing = self
            .tree
            .nearest_neighbor(&query)
            .filter(|candidate| {
                let [cx, cy] = *candidate.geom();
                (cx - x).powi(2) + (cy - y).powi(2) <= self.tolerance_sq
            })
            .map(|candidate| candidate.data);

        let id = match existing {
            Some(id) => id,
            None => {
                let id = NodeId::try_from(self.sums.len()).unwrap_or(NodeId::MAX);
                self.tree.insert(SnapPoint::new(query, id));
                self.sums.push((0.0, 0.0, 0));
                id
            }
        };

        let sum = &mut self.sums[id as usize];
        sum.0 += x;
        sum.1 += y;
        sum.2 += 1;
        id
    }

    fn into_nodes(self) -> Vec<NetworkNode> {
        self.sums
            .into_iter()
            .enumerate()
            .map(|(index, (x, y, count))| NetworkNode {
                id: NodeId::try_from(index).unwrap_or(NodeId::MAX),
                geometry: Point::new(x / f64::from(count), y / f64::from(count)),
            })
            .collect()
    }
}
