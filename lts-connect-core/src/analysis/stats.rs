//! Attribute statistics over the analysis region

use std::collections::BTreeMap;

use geo::{Area, BooleanOps, MultiPolygon};
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Error,
    config::{AnalysisConfig, StatDefinition, StatKind},
    geometry::{multi_line_length, round_to_hundred},
    incidents::IncidentSource,
    model::{DataLayers, GeometryKind, RegionStatus},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMiles {
    pub value: String,
    pub miles: f64,
}

/// Result of one stat pull
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatValue {
    /// Area-weighted total rounded to the nearest hundred, `None` when no
    /// polygon intersects the region
    Interpolated(Option<i64>),
    Counts(Vec<CategoryCount>),
    Miles(Vec<CategoryMiles>),
    Incidents(u64),
    /// The stat source failed; the rest of the analysis went on
    Unavailable,
}

impl StatValue {
    /// Value stored on the segment record. Grouped values become lists of
    /// `[value, count]` pairs.
    pub fn to_json(&self) -> Value {
        match self {
            StatValue::Interpolated(Some(total)) => json!(total),
            StatValue::Interpolated(None) => Value::Null,
            StatValue::Counts(counts) => Value::Array(
                counts.iter().map(|c| json!([c.value, c.count])).collect(),
            ),
            StatValue::Miles(miles) => Value::Array(
                miles.iter().map(|m| json!([m.value, m.miles])).collect(),
            ),
            StatValue::Incidents(total) => json!(total),
            StatValue::Unavailable => Value::String("unavailable".to_string()),
        }
    }
}

/// Aggregates `column` of layer `layer` over the active region.
///
/// Incident layers are always measured over the corridor itself, never over
/// the blob or isochrone.
pub fn pull_stat(
    layers: &DataLayers,
    region: &RegionStatus,
    corridor: &MultiPolygon<f64>,
    column: &str,
    layer: &str,
    kind: GeometryKind,
    config: &AnalysisConfig,
) -> Result<StatValue, Error> {
    let area = if layers.is_incident_layer(layer) {
        corridor
    } else {
        region.geometry().unwrap_or(corridor)
    };

    match kind {
        GeometryKind::Polygon => {
            let features = layers.polygon_layer(layer)?.intersecting(area);
            if features.is_empty() {
                return Ok(StatValue::Interpolated(None));
            }

            let total: f64 = features
                .par_iter()
                .filter_map(|feature| {
                    let value = feature.number(column)?;
                    let full = feature.geometry.unsigned_area();
                    if full <= 0.0 {
                        return None;
                    }
                    let inside = feature.geometry.intersection(area).unsigned_area();
                    Some(inside / full * value)
                })
                .sum();

            Ok(StatValue::Interpolated(Some(round_to_hundred(total))))
        }
        GeometryKind::Point => {
            let mut counts: BTreeMap<String, u64> = BTreeMap::new();
            for feature in layers.point_layer(layer)?.intersecting(area) {
                if let Some(category) = feature.category(column) {
                    *counts.entry(category).or_default() += 1;
                }
            }
            Ok(StatValue::Counts(
                counts
                    .into_iter()
                    .map(|(value, count)| CategoryCount { value, count })
                    .collect(),
            ))
        }
        GeometryKind::Line => {
            let mut miles: BTreeMap<String, f64> = BTreeMap::new();
            for feature in layers.line_layer(layer)?.intersecting(area) {
                if let Some(category) = feature.category(column) {
                    *miles.entry(category).or_default() +=
                        multi_line_length(&feature.geometry) / config.meters_per_mile;
                }
            }
            Ok(StatValue::Miles(
                miles
                    .into_iter()
                    .map(|(value, miles)| CategoryMiles { value, miles })
                    .collect(),
            ))
        }
    }
}

/// Crash counts from the external service over the corridor. Any failure
/// is reported as [`StatValue::Unavailable`].
pub fn pull_incident_stat(
    source: Option<&dyn IncidentSource>,
    corridor: &MultiPolygon<f64>,
    modes: &str,
) -> StatValue {
    let Some(source) = source else {
        warn!("No crash statistics service configured");
        return StatValue::Unavailable;
    };

    let modes: Vec<String> = modes
        .split(',')
        .map(str::trim)
        .filter(|mode| !mode.is_empty())
        .map(str::to_string)
        .collect();

    match source.incident_counts(corridor) {
        Ok(counts) => StatValue::Incidents(counts.total(&modes)),
        Err(e) => {
            warn!("Crash statistics unavailable: {e}");
            StatValue::Unavailable
        }
    }
}

/// Evaluates one configured stat. Layer lookups and source failures are
/// contained to the field.
pub fn evaluate(
    definition: &StatDefinition,
    layers: &DataLayers,
    region: &RegionStatus,
    corridor: &MultiPolygon<f64>,
    incidents: Option<&dyn IncidentSource>,
    config: &AnalysisConfig,
) -> StatValue {
    let kind = match definition.kind {
        StatKind::IncidentApi => {
            return pull_incident_stat(incidents, corridor, &definition.column);
        }
        StatKind::Polygon => GeometryKind::Polygon,
        StatKind::Point => GeometryKind::Point,
        StatKind::Line => GeometryKind::Line,
    };

    debug!("Pulling {} from {}", definition.field, definition.layer);
    match pull_stat(
        layers,
        region,
        corridor,
        &definition.column,
        &definition.layer,
        kind,
        config,
    ) {
        Ok(value) => value,
        Err(e) => {
            warn!("Stat {} unavailable: {e}", definition.field);
            StatValue::Unavailable
        }
    }
}
