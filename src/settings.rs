//! TOML configuration of the command line tool

use std::{collections::BTreeMap, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use lts_connect_core::{
    config::AnalysisConfig,
    loading::{LayerSource, NetworkSource},
    model::NetworkType,
};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "lts-connect.toml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Edge sources keyed by network type (`lts`, `sidewalk`)
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkSource>,
    #[serde(default)]
    pub layers: Vec<LayerSource>,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_results_csv")]
    pub results_csv: PathBuf,
    pub results_geojson: Option<PathBuf>,
    pub crash_api: Option<CrashApiSettings>,
}

#[derive(Debug, Deserialize)]
pub struct CrashApiSettings {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CrashApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("lts_connect_store.json")
}

fn default_results_csv() -> PathBuf {
    PathBuf::from("lts_connect_results.csv")
}

fn default_timeout_secs() -> u64 {
    30
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let settings: Settings = toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        for key in self.networks.keys() {
            key.parse::<NetworkType>()
                .with_context(|| format!("[networks.{key}] is not a supported network"))?;
        }
        Ok(())
    }

    /// Configured networks, optionally restricted to one type
    pub fn networks(&self, only: Option<NetworkType>) -> Result<Vec<(NetworkType, NetworkSource)>> {
        let mut networks = Vec::new();
        for (key, source) in &self.networks {
            let network: NetworkType = key.parse()?;
            if only.is_none_or(|wanted| wanted == network) {
                networks.push((network, source.clone()));
            }
        }
        Ok(networks)
    }
}
