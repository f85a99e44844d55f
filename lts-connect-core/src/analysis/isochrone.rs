//! Travel-time bounded reachable area around a corridor

use fixedbitset::FixedBitSet;
use geo::{MultiLineString, MultiPolygon};
use log::{debug, info};

use crate::{
    Error,
    config::AnalysisConfig,
    geometry::{buffer_lines, multi_line_length},
    network::LowStressNetwork,
    routing::driving_distance,
};

/// Area reached from the corridor within the travel budget
#[derive(Debug, Clone)]
pub struct IsochroneResult {
    pub geometry: MultiPolygon<f64>,
    /// Total length of the reached edges, in miles
    pub miles: f64,
    /// Indices into the network edges, ascending
    pub reached_edges: Vec<usize>,
}

/// An isochrone replaces the blob only past the scope threshold
pub fn isochrone_in_scope(miles: f64, threshold_miles: f64) -> bool {
    miles > threshold_miles
}

/// Expands from the sources of the edges crossing `corridor` and buffers
/// every edge whose source node is reached within the budget.
pub fn build_isochrone(
    network: &LowStressNetwork,
    corridor: &MultiPolygon<f64>,
    config: &AnalysisConfig,
) -> Result<IsochroneResult, Error> {
    let of_interest = network.edges_intersecting(corridor);
    if of_interest.is_empty() {
        return Err(Error::IsochroneComputationFailed(format!(
            "no edge of {} crosses the corridor",
            network.tables.ls_table
        )));
    }

    let mut seeds: Vec<_> = of_interest
        .iter()
        .map(|&index| network.edges[index].source)
        .collect();
    seeds.sort_unstable();
    seeds.dedup();

    let reached = driving_distance(network, &seeds, config.travel_time_min);
    if reached.is_empty() {
        return Err(Error::IsochroneComputationFailed(format!(
            "no node of {} reachable from {} seeds",
            network.tables.nodes_table,
            seeds.len()
        )));
    }
    debug!("Reached {} nodes from {} seeds", reached.len(), seeds.len());

    let mut reached_set = FixedBitSet::with_capacity(network.edges.len());
    for (index, edge) in network.edges.iter().enumerate() {
        if reached.contains_key(&edge.source) {
            reached_set.insert(index);
        }
    }
    let reached_edges: Vec<usize> = reached_set.ones().collect();

    let lines = MultiLineString::new(
        reached_edges
            .iter()
            .map(|&index| network.edges[index].geometry.clone())
            .collect(),
    );
    let miles = multi_line_length(&lines) / config.meters_per_mile;
    let geometry = buffer_lines(&lines, config.isochrone_edge_buffer);

    info!(
        "Isochrone covers {} edges, {miles:.2} miles",
        reached_edges.len()
    );

    Ok(IsochroneResult {
        geometry,
        miles,
        reached_edges,
    })
}
