//! Loading of edges, attribute layers and candidate segments from GeoJSON,
//! and export of prepared islands and gaps.

mod export;
mod features;

use std::{fs, path::Path, path::PathBuf};

use geojson::{FeatureCollection, GeoJson};
use log::info;
use serde::Deserialize;

pub use export::{gaps_to_geojson, islands_to_geojson, write_feature_collection};
pub use features::{read_edges, read_layer, read_requests, requests_from_geojson};

use crate::{
    Error,
    config::AnalysisConfig,
    model::{DataLayers, GeometryKind, NetworkType, RawEdge},
    network::NetworkCatalog,
};

/// Where the edges of one network come from and how they are attributed
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSource {
    pub edges: PathBuf,
    /// Property holding the edge id, the network's id column when unset
    #[serde(default)]
    pub id_property: Option<String>,
    /// Property holding the stress class, unused for sidewalks
    #[serde(default = "default_stress_property")]
    pub stress_property: String,
    /// Comfort levels to prepare, ignored for networks without stress
    #[serde(default = "default_levels")]
    pub levels: Vec<u8>,
}

fn default_stress_property() -> String {
    "lts_score".to_string()
}

fn default_levels() -> Vec<u8> {
    vec![1, 2, 3]
}

/// One attribute layer on disk
#[derive(Debug, Clone, Deserialize)]
pub struct LayerSource {
    pub name: String,
    pub path: PathBuf,
    #[serde(deserialize_with = "deserialize_kind")]
    pub kind: GeometryKind,
    /// Measured over the corridor only. Unset means layers named `*crashes`
    /// are incident layers.
    #[serde(default)]
    pub incident: Option<bool>,
}

impl LayerSource {
    pub fn is_incident(&self) -> bool {
        self.incident.unwrap_or_else(|| self.name.ends_with("crashes"))
    }
}

fn deserialize_kind<'de, D>(deserializer: D) -> Result<GeometryKind, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// Parses a GeoJSON file into a feature collection. A lone feature becomes a
/// collection of one.
pub fn read_feature_collection(path: &Path) -> Result<FeatureCollection, Error> {
    let text = fs::read_to_string(path)?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| Error::GeoJsonError(format!("{}: {e}", path.display())))?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            features: vec![feature],
            bbox: None,
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => Err(Error::GeoJsonError(format!(
            "{} holds a bare geometry, expected features",
            path.display()
        ))),
    }
}

/// Prepares every configured level of every network
pub fn build_catalog(
    networks: &[(NetworkType, NetworkSource)],
    config: &AnalysisConfig,
) -> Result<NetworkCatalog, Error> {
    let mut catalog = NetworkCatalog::new();

    for (network, source) in networks {
        let edges: Vec<RawEdge> = read_edges(*network, source)?;
        info!(
            "Loaded {} {network} edges from {}",
            edges.len(),
            source.edges.display()
        );

        if network.uses_stress() {
            for &level in &source.levels {
                catalog.build_level(*network, Some(level), &edges, config)?;
            }
        } else {
            catalog.build_level(*network, None, &edges, config)?;
        }
    }

    Ok(catalog)
}

/// Loads every attribute layer
pub fn load_layers(sources: &[LayerSource]) -> Result<DataLayers, Error> {
    let mut layers = DataLayers::new();
    for source in sources {
        read_layer(&mut layers, source)?;
    }
    Ok(layers)
}
