//! Policy constants for one analysis run
//!
//! Every tunable value lives here with a single default. The binary
//! deserializes this from the `[analysis]` table of its TOML file.

use serde::{Deserialize, Serialize};

use crate::model::GeometryKind;

pub const DEFAULT_BUFFER_DISTANCE: f64 = 30.0;
pub const DEFAULT_HULL_CONCAVITY: f64 = 2.0;
pub const DEFAULT_SCOPE_THRESHOLD_MILES: f64 = 1000.0;
pub const DEFAULT_TRAVEL_TIME_MIN: f64 = 15.0;
pub const DEFAULT_ISOCHRONE_EDGE_BUFFER: f64 = 100.0;
pub const DEFAULT_SNAPPING_TOLERANCE: f64 = 0.0005;
pub const METERS_PER_MILE: f64 = 1609.0;
pub const BICYCLE_SPEED_KMH: f64 = 16.0;
pub const WALKING_SPEED_KMH: f64 = 4.82;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Corridor buffer around a study segment, in network units
    pub buffer_distance: f64,
    /// Concavity of the hull drawn around proximate islands, higher is looser
    pub hull_concavity: f64,
    /// Proximate island mileage above which an isochrone replaces the blob
    pub scope_threshold_miles: f64,
    /// Travel budget of the isochrone
    pub travel_time_min: f64,
    /// Buffer drawn around every edge reached by the isochrone
    pub isochrone_edge_buffer: f64,
    /// Endpoints closer than this share a node
    pub snapping_tolerance: f64,
    pub meters_per_mile: f64,
    pub bicycle_speed_kmh: f64,
    pub walking_speed_kmh: f64,
    /// Drop interior rings after folding land use into a region
    pub fill_closure_holes: bool,
    pub land_use: LandUseConfig,
    pub stats: Vec<StatDefinition>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            buffer_distance: DEFAULT_BUFFER_DISTANCE,
            hull_concavity: DEFAULT_HULL_CONCAVITY,
            scope_threshold_miles: DEFAULT_SCOPE_THRESHOLD_MILES,
            travel_time_min: DEFAULT_TRAVEL_TIME_MIN,
            isochrone_edge_buffer: DEFAULT_ISOCHRONE_EDGE_BUFFER,
            snapping_tolerance: DEFAULT_SNAPPING_TOLERANCE,
            meters_per_mile: METERS_PER_MILE,
            bicycle_speed_kmh: BICYCLE_SPEED_KMH,
            walking_speed_kmh: WALKING_SPEED_KMH,
            fill_closure_holes: true,
            land_use: LandUseConfig::default(),
            stats: default_stats(),
        }
    }
}

/// Land-use parcels folded into a region when they sit on the corridor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LandUseConfig {
    /// Layer holding land-use parcels
    pub layer: String,
    /// Property carrying the land-use category
    pub category_property: String,
    pub prefixes: Vec<String>,
    pub exact: Vec<String>,
}

impl Default for LandUseConfig {
    fn default() -> Self {
        Self {
            layer: "landuse_2015".to_string(),
            category_property: "lu15subn".to_string(),
            prefixes: vec![
                "Parking".to_string(),
                "Institutional".to_string(),
                "Commercial".to_string(),
            ],
            exact: vec![
                "Recreation: General".to_string(),
                "Transportation: Rail Right-of-Way".to_string(),
                "Transportation: Facility".to_string(),
            ],
        }
    }
}

impl LandUseConfig {
    /// Prefix match for `prefixes`, exact match for `exact`
    pub fn allows(&self, category: &str) -> bool {
        self.prefixes.iter().any(|p| category.starts_with(p.as_str()))
            || self.exact.iter().any(|e| category == e)
    }
}

/// One statistic pulled for every analyzed segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatDefinition {
    /// Output field on the segment record
    pub field: String,
    /// Attribute read from the layer. For `incident_api` a comma separated
    /// list of travel modes, empty for every mode.
    #[serde(default)]
    pub column: String,
    pub layer: String,
    pub kind: StatKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Polygon,
    Point,
    Line,
    /// Counts fetched from the crash statistics service
    IncidentApi,
}

impl From<GeometryKind> for StatKind {
    fn from(kind: GeometryKind) -> Self {
        match kind {
            GeometryKind::Polygon => StatKind::Polygon,
            GeometryKind::Point => StatKind::Point,
            GeometryKind::Line => StatKind::Line,
        }
    }
}

fn stat(field: &str, column: &str, layer: &str, kind: StatKind) -> StatDefinition {
    StatDefinition {
        field: field.to_string(),
        column: column.to_string(),
        layer: layer.to_string(),
        kind,
    }
}

pub fn default_stats() -> Vec<StatDefinition> {
    vec![
        stat("total_pop", "totpop2020", "censusblock2020_demographics", StatKind::Polygon),
        stat("hisp_lat", "hislat2020", "censusblock2020_demographics", StatKind::Polygon),
        stat("circuit", "circuit", "circuittrails", StatKind::Line),
        stat("jobs", "coname", "nets_2015", StatKind::Point),
        stat("bike_crashes", "bike", "bikepedcrashes", StatKind::Point),
        stat("ped_crashes", "ped", "bikepedcrashes", StatKind::Point),
        stat("essential_services", "type", "essential_services", StatKind::Point),
        stat("rail_stations", "type", "passengerrailstations", StatKind::Point),
    ]
}
