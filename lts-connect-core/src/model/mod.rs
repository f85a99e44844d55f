//! Data model for network analysis
//!
//! Contains network, island, study segment and data layer types.

pub mod island;
pub mod layers;
pub mod network;
pub mod segment;

pub use island::Island;
pub use layers::{DataLayers, GeometryKind, Layer, LayerFeature};
pub use network::{NetworkEdge, NetworkNode, NetworkTables, NetworkType, RawEdge};
pub use segment::{RegionStatus, SegmentName, SegmentRequest, StudySegment};
