//! Stress classification of network edges

use crate::{Minutes, model::RawEdge};

/// Edges of the low-stress sub-network: stress strictly below `threshold`.
///
/// A `None` threshold keeps every edge, which is how the sidewalk network
/// is treated. Unclassified edges never pass a threshold.
pub fn low_stress_edges(edges: &[RawEdge], threshold: Option<u8>) -> Vec<RawEdge> {
    match threshold {
        None => edges.to_vec(),
        Some(threshold) => edges
            .iter()
            .filter(|edge| edge.stress.is_some_and(|stress| stress < threshold))
            .cloned()
            .collect(),
    }
}

/// Gaps: classified edges at or above `threshold`, where a new low-stress
/// facility would have to be built to join islands.
pub fn gap_edges(edges: &[RawEdge], threshold: u8) -> Vec<RawEdge> {
    edges
        .iter()
        .filter(|edge| edge.stress.is_some_and(|stress| stress >= threshold))
        .cloned()
        .collect()
}

/// Minutes needed to cover `length_m` meters at `speed_kmh`
pub fn traversal_minutes(length_m: f64, speed_kmh: f64) -> Minutes {
    length_m / (speed_kmh * 1000.0) * 60.0
}
