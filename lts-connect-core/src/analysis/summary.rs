//! Flat result records and their export

use std::{
    fs::{File, OpenOptions},
    io::BufWriter,
    path::Path,
};

use chrono::{DateTime, Utc};
use geo::Geometry as GeoGeometry;
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use wkt::ToWkt;

use crate::{
    Error, SegmentId,
    analysis::stats::StatValue,
    model::{NetworkType, RegionStatus, StudySegment},
};

/// One analyzed segment: metadata, every stat field and the segment geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment_id: SegmentId,
    pub network: NetworkType,
    pub owner: String,
    pub name: String,
    /// Record fields in output order, the geometry is not among them
    pub fields: Vec<(String, Value)>,
    pub geometry: GeoGeometry<f64>,
    pub analyzed_at: DateTime<Utc>,
}

impl SegmentSummary {
    pub fn new(
        segment: &StudySegment,
        region: &RegionStatus,
        miles: f64,
        stats: &[(String, StatValue)],
    ) -> Self {
        let tables = &segment.tables;
        let mut fields: Vec<(String, Value)> = vec![
            ("id".into(), json!(segment.id)),
            ("username".into(), json!(segment.owner)),
            ("seg_name".into(), json!(segment.name.as_str())),
            ("network_type".into(), json!(tables.network.as_str())),
            (
                "highest_comfort_level".into(),
                json!(tables.comfort_level.unwrap_or(0)),
            ),
            ("ls_table".into(), json!(tables.ls_table)),
            ("ids".into(), json!(tables.ids)),
            ("nodes_table".into(), json!(tables.nodes_table)),
            ("has_isochrone".into(), json!(region.has_isochrone())),
            ("miles".into(), json!(miles)),
        ];
        fields.extend(
            stats
                .iter()
                .map(|(field, value)| (field.clone(), value.to_json())),
        );

        SegmentSummary {
            segment_id: segment.id,
            network: segment.network(),
            owner: segment.owner.clone(),
            name: segment.name.to_string(),
            fields,
            geometry: GeoGeometry::MultiLineString(segment.geometry.clone()),
            analyzed_at: Utc::now(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Column names, geometry last
    pub fn header(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|(field, _)| field.clone())
            .chain(["analyzed_at".to_string(), "geom".to_string()])
            .collect()
    }

    /// Tabular row: nested values as JSON text, geometry as WKT
    pub fn row(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|(_, value)| cell(value))
            .chain([self.analyzed_at.to_rfc3339(), self.geometry.wkt_string()])
            .collect()
    }

    pub fn to_feature(&self) -> Result<Feature, Error> {
        let mut properties: Map<String, Value> = self.fields.iter().cloned().collect();
        properties.insert("analyzed_at".into(), json!(self.analyzed_at));

        let value = json!({
            "type": "Feature",
            "geometry": Geometry::new(GeoJsonValue::from(&self.geometry)),
            "properties": properties,
        });

        serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Appends rows to a CSV file, writing the header only when the file is new
pub fn append_csv(path: &Path, summaries: &[SegmentSummary]) -> Result<(), Error> {
    let Some(first) = summaries.first() else {
        return Ok(());
    };
    let is_new = !std::fs::metadata(path).is_ok_and(|meta| meta.len() > 0);

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(BufWriter::new(file));

    let csv_error = |e: csv::Error| Error::CsvError(e.to_string());
    if is_new {
        writer.write_record(first.header()).map_err(csv_error)?;
    }
    for summary in summaries {
        writer.write_record(summary.row()).map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_feature_collection(summaries: &[SegmentSummary]) -> Result<FeatureCollection, Error> {
    Ok(FeatureCollection {
        features: summaries
            .iter()
            .map(SegmentSummary::to_feature)
            .collect::<Result<_, _>>()?,
        bbox: None,
        foreign_members: None,
    })
}

pub fn write_geojson(path: &Path, summaries: &[SegmentSummary]) -> Result<(), Error> {
    let collection = to_feature_collection(summaries)?;
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &collection).map_err(|e| Error::GeoJsonError(e.to_string()))
}
