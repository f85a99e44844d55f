//! Low-stress island detection and connectivity analysis.
//!
//! Partitions a classified road or sidewalk network into low-stress islands and
//! evaluates how a candidate segment would join them: which islands it touches,
//! the area it makes reachable and what lies inside that area.

pub mod analysis;
pub mod config;
pub mod error;
pub mod incidents;
pub mod loading;
pub mod model;
pub mod network;
pub mod prelude;
pub mod routing;
pub mod store;

pub mod geometry;

pub use error::Error;

/// Identifier of a network edge, unique within its network type
pub type EdgeId = i64;
/// Index of a node in a built network topology
pub type NodeId = u32;
/// Identifier of an island within one (network type, comfort level) partition
pub type IslandId = u32;
/// Identifier of a registered study segment
pub type SegmentId = u64;
/// Travel time in minutes
pub type Minutes = f64;
