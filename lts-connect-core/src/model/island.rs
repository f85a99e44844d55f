use geo::MultiLineString;
use serde::{Deserialize, Serialize};

use crate::{EdgeId, IslandId, model::NetworkType};

/// Maximal connected component of a low-stress sub-network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Island {
    pub id: IslandId,
    pub network: NetworkType,
    /// Highest comfortable stress level the island was built for
    pub comfort_level: Option<u8>,
    /// Member edges, sorted ascending
    pub edges: Vec<EdgeId>,
    pub geometry: MultiLineString<f64>,
    pub size_miles: f64,
}
