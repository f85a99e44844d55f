use std::{cmp::Ordering, collections::BinaryHeap};

use hashbrown::HashMap;
use petgraph::{graph::NodeIndex, visit::EdgeRef};

use crate::{Minutes, NodeId, network::LowStressNetwork};

#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: Minutes,
    node: NodeIndex,
}

impl Eq for State {}

// Implement Ord for State to use in BinaryHeap
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost (reversed from standard Rust BinaryHeap)
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Multi-source Dijkstra bounded by a travel-time budget.
///
/// Every seed starts at cost zero. Edges are traversed in both directions
/// with their traversal time as cost. Returns every node reached within
/// `budget` and its cost.
pub fn driving_distance(
    network: &LowStressNetwork,
    seeds: &[NodeId],
    budget: Minutes,
) -> HashMap<NodeId, Minutes> {
    let graph = network.graph();
    let mut distances: HashMap<NodeIndex, Minutes> = HashMap::new();
    let mut heap = BinaryHeap::new();

    for &seed in seeds {
        let node = NodeIndex::new(seed as usize);
        if node.index() >= graph.node_count() {
            continue;
        }
        distances.insert(node, 0.0);
        heap.push(State { cost: 0.0, node });
    }

    while let Some(State { cost, node }) = heap.pop() {
        // Skip if we've found a better path
        if let Some(&best) = distances.get(&node)
            && cost > best
        {
            continue;
        }

        for edge in graph.edges(node) {
            let next = if edge.source() == node {
                edge.target()
            } else {
                edge.source()
            };
            let next_cost = cost + network.edges[*edge.weight()].traversal_min;
            if next_cost > budget {
                continue;
            }

            match distances.entry(next) {
                hashbrown::hash_map::Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                    heap.push(State {
                        cost: next_cost,
                        node: next,
                    });
                }
                hashbrown::hash_map::Entry::Occupied(mut entry) => {
                    if next_cost < *entry.get() {
                        *entry.get_mut() = next_cost;
                        heap.push(State {
                            cost: next_cost,
                            node: next,
                        });
                    }
                }
            }
        }
    }

    distances
        .into_iter()
        .map(|(node, cost)| (*graph.node_weight(node).unwrap_or(&0), cost))
        .collect()
}
