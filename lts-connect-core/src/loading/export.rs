use std::{fs::File, io::BufWriter, path::Path};

use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use serde_json::json;

use crate::{Error, network::NetworkLevel};

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    }
}

/// Islands of one level, one feature per island
pub fn islands_to_geojson(level: &NetworkLevel) -> Result<FeatureCollection, Error> {
    let tables = level.tables();
    let features = level
        .islands
        .islands
        .iter()
        .map(|island| {
            let value = json!({
                "type": "Feature",
                "geometry": Geometry::new(GeoJsonValue::from(&island.geometry)),
                "properties": {
                    "uid": island.id,
                    "network_type": island.network.as_str(),
                    "comfort_level": island.comfort_level,
                    "edge_count": island.edges.len(),
                    "edges": island.edges,
                    "size_miles": island.size_miles,
                    "source_table": tables.ls_table,
                }
            });
            serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(collection(features))
}

/// Gap edges of one level, keyed by the network's id column
pub fn gaps_to_geojson(level: &NetworkLevel) -> Result<FeatureCollection, Error> {
    let tables = level.tables();
    let features = level
        .gaps
        .iter()
        .map(|gap| {
            let mut properties = serde_json::Map::new();
            properties.insert(tables.ids.clone(), json!(gap.id));
            properties.insert("stress".to_string(), json!(gap.stress));

            let value = json!({
                "type": "Feature",
                "geometry": Geometry::new(GeoJsonValue::from(&gap.geometry)),
                "properties": properties,
            });
            serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(collection(features))
}

pub fn write_feature_collection(path: &Path, collection: &FeatureCollection) -> Result<(), Error> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, collection).map_err(|e| Error::GeoJsonError(e.to_string()))
}
