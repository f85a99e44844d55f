//! Network preparation: stress filtering, topology, islands and gaps
//!
//! Everything here is built once per (network type, comfort level) in a batch
//! step and is read-only while segments are analyzed.

pub mod islands;
pub mod stress;
pub mod topology;

use hashbrown::HashMap;
use log::info;

pub use islands::{IslandSet, partition_islands};
pub use stress::{gap_edges, low_stress_edges, traversal_minutes};
pub use topology::{LowStressNetwork, NetworkGraph};

use crate::{
    EdgeId, Error,
    config::AnalysisConfig,
    model::{NetworkTables, NetworkType, RawEdge},
};

/// Prepared sub-network, islands and gaps of one comfort level
#[derive(Debug)]
pub struct NetworkLevel {
    pub network: LowStressNetwork,
    pub islands: IslandSet,
    /// Edges at or above the threshold, empty for networks without stress
    pub gaps: Vec<RawEdge>,
}

impl NetworkLevel {
    pub fn build(
        tables: NetworkTables,
        edges: &[RawEdge],
        config: &AnalysisConfig,
    ) -> NetworkLevel {
        let threshold = tables.threshold();
        let low_stress = low_stress_edges(edges, threshold);
        let gaps = threshold.map_or_else(Vec::new, |t| gap_edges(edges, t));

        info!(
            "Building {}: {} low-stress edges, {} gaps",
            tables.ls_table,
            low_stress.len(),
            gaps.len()
        );

        let network = LowStressNetwork::build(tables, &low_stress, config);
        let islands = IslandSet::new(partition_islands(&network, config));

        NetworkLevel {
            network,
            islands,
            gaps,
        }
    }

    pub fn tables(&self) -> &NetworkTables {
        &self.network.tables
    }

    /// Gap edges with the given ids, in the order requested
    pub fn gaps_by_id(&self, ids: &[EdgeId]) -> Result<Vec<&RawEdge>, Error> {
        ids.iter()
            .map(|id| {
                self.gaps
                    .iter()
                    .find(|gap| gap.id == *id)
                    .ok_or_else(|| {
                        Error::InvalidData(format!(
                            "edge {id} is not a gap of {}",
                            self.network.tables.ls_table
                        ))
                    })
            })
            .collect()
    }
}

/// Every prepared network level available to analyses
#[derive(Debug, Default)]
pub struct NetworkCatalog {
    levels: HashMap<(NetworkType, Option<u8>), NetworkLevel>,
}

impl NetworkCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and registers one level, replacing any previous build of it
    pub fn build_level(
        &mut self,
        network: NetworkType,
        comfort_level: Option<u8>,
        edges: &[RawEdge],
        config: &AnalysisConfig,
    ) -> Result<&NetworkLevel, Error> {
        let tables = NetworkTables::new(network, comfort_level)?;
        let key = (network, tables.comfort_level);
        let level = NetworkLevel::build(tables, edges, config);
        self.levels.insert(key, level);
        self.levels
            .get(&key)
            .ok_or_else(|| Error::InvalidData(format!("{network} level was not registered")))
    }

    pub fn insert(&mut self, level: NetworkLevel) {
        let tables = level.tables();
        self.levels
            .insert((tables.network, tables.comfort_level), level);
    }

    pub fn level(&self, tables: &NetworkTables) -> Result<&NetworkLevel, Error> {
        self.levels
            .get(&(tables.network, tables.comfort_level))
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "network {} has not been built",
                    tables.islands_table
                ))
            })
    }

    pub fn levels(&self) -> impl Iterator<Item = &NetworkLevel> {
        self.levels.values()
    }
}
