//! Network types, edges and nodes

use std::{fmt, str::FromStr};

use geo::{LineString, Point};
use serde::{Deserialize, Serialize};

use crate::{EdgeId, Error, Minutes, NodeId, config::AnalysisConfig};

/// Highest comfortable stress level an LTS analysis may plan for
pub const MAX_COMFORT_LEVEL: u8 = 3;

/// Supported networks. Each has its own id namespace, speed and derived tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Road network classified by level of traffic stress, ridden by bicycle
    Lts,
    /// Pedestrian network, walked
    Sidewalk,
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Lts => "lts",
            NetworkType::Sidewalk => "sidewalk",
        }
    }

    /// Id column of this network's edges
    pub fn id_column(&self) -> &'static str {
        match self {
            NetworkType::Lts => "dvrpc_id",
            NetworkType::Sidewalk => "objectid",
        }
    }

    /// Whether edges carry a stress classification
    pub fn uses_stress(&self) -> bool {
        matches!(self, NetworkType::Lts)
    }

    pub fn speed_kmh(&self, config: &AnalysisConfig) -> f64 {
        match self {
            NetworkType::Lts => config.bicycle_speed_kmh,
            NetworkType::Sidewalk => config.walking_speed_kmh,
        }
    }

    /// Normalizes a requested comfort level for this network.
    ///
    /// LTS requires a level in `1..=3`; the sidewalk network has no levels.
    pub fn comfort_level(&self, requested: Option<u8>) -> Result<Option<u8>, Error> {
        match self {
            NetworkType::Sidewalk => Ok(None),
            NetworkType::Lts => match requested {
                Some(level) if (1..=MAX_COMFORT_LEVEL).contains(&level) => Ok(Some(level)),
                Some(level) => Err(Error::InvalidData(format!(
                    "comfort level {level} is outside 1..={MAX_COMFORT_LEVEL}"
                ))),
                None => Err(Error::InvalidData(
                    "lts analysis requires a comfort level".to_string(),
                )),
            },
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lts" => Ok(NetworkType::Lts),
            "sidewalk" => Ok(NetworkType::Sidewalk),
            _ => Err(Error::NetworkTypeUnsupported(s.to_string())),
        }
    }
}

/// Names of the derived tables and id column for one network and comfort level.
///
/// This is the only place table names are built. They come from a closed
/// set of templates, never from user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTables {
    pub network: NetworkType,
    pub comfort_level: Option<u8>,
    /// Low-stress sub-network
    pub ls_table: String,
    /// Id column of the low-stress sub-network
    pub ids: String,
    pub nodes_table: String,
    pub islands_table: String,
}

impl NetworkTables {
    pub fn new(network: NetworkType, requested_level: Option<u8>) -> Result<Self, Error> {
        let comfort_level = network.comfort_level(requested_level)?;
        let tables = match (network, comfort_level) {
            (NetworkType::Lts, Some(level)) => {
                let threshold = level + 1;
                Self {
                    network,
                    comfort_level,
                    ls_table: format!("lts_stress_below_{threshold}"),
                    ids: network.id_column().to_string(),
                    nodes_table: format!("lts{threshold}nodes"),
                    islands_table: format!("lts{level}_islands"),
                }
            }
            _ => Self {
                network,
                comfort_level: None,
                ls_table: "ped_network".to_string(),
                ids: network.id_column().to_string(),
                nodes_table: "sidewalknodes".to_string(),
                islands_table: "sidewalk_islands".to_string(),
            },
        };
        Ok(tables)
    }

    /// Exclusive stress bound of the sub-network, `None` when every edge is included
    pub fn threshold(&self) -> Option<u8> {
        self.comfort_level.map(|level| level + 1)
    }
}

/// Classified edge as read from a source, before topology is built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEdge {
    pub id: EdgeId,
    pub geometry: LineString<f64>,
    /// Stress level 1..=4, `None` when unclassified
    pub stress: Option<u8>,
}

impl RawEdge {
    pub fn new(id: EdgeId, geometry: LineString<f64>, stress: Option<u8>) -> Self {
        Self {
            id,
            geometry,
            stress,
        }
    }
}

/// Edge of a built network topology
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub geometry: LineString<f64>,
    pub stress: Option<u8>,
    /// Length in network units (meters)
    pub length: f64,
    pub traversal_min: Minutes,
}

/// Node of a built network topology
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: NodeId,
    /// Centroid of every edge endpoint snapped to this node
    pub geometry: Point<f64>,
}
