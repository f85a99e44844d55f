//! Shortest-path expansion over low-stress sub-networks

pub mod dijkstra;

pub use dijkstra::driving_distance;
