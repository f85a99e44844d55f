// Re-export key components
pub use crate::Error;
pub use crate::analysis::{Analyzer, SegmentSummary, StatValue, append_csv, write_geojson};
pub use crate::config::{AnalysisConfig, LandUseConfig, StatDefinition, StatKind};
pub use crate::incidents::IncidentSource;
#[cfg(feature = "crash-api")]
pub use crate::incidents::HttpIncidentSource;
pub use crate::loading::{
    LayerSource, NetworkSource, build_catalog, load_layers, read_requests,
};
pub use crate::model::{DataLayers, NetworkType, RegionStatus, SegmentRequest};
pub use crate::network::{NetworkCatalog, NetworkLevel};
pub use crate::store::{MemoryStore, SegmentStore};

// Identifier types
pub use crate::EdgeId;
pub use crate::IslandId;
pub use crate::SegmentId;
pub use crate::Minutes;
