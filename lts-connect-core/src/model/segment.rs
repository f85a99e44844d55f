//! Candidate segments submitted for analysis

use std::fmt;

use geo::{Geometry, MultiLineString, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::{SegmentId, model::NetworkTables, model::NetworkType};

/// Segment name with every character outside `[A-Za-z0-9 ]` removed.
///
/// Uniqueness checks compare sanitized names only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentName(String);

impl SegmentName {
    pub fn sanitize(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request to register and analyze one candidate segment
#[derive(Debug, Clone)]
pub struct SegmentRequest {
    pub network: NetworkType,
    pub geometry: Geometry<f64>,
    pub owner: String,
    pub name: String,
    /// Highest comfortable stress level; ignored by the sidewalk network
    pub comfort_level: Option<u8>,
    /// Purge prior segments with the same owner and name first
    pub overwrite: bool,
}

/// A registered study segment, held for the duration of one analysis
#[derive(Debug, Clone)]
pub struct StudySegment {
    pub id: SegmentId,
    pub owner: String,
    pub name: SegmentName,
    pub tables: NetworkTables,
    pub geometry: MultiLineString<f64>,
}

impl StudySegment {
    pub fn network(&self) -> NetworkType {
        self.tables.network
    }

    pub fn comfort_level(&self) -> Option<u8> {
        self.tables.comfort_level
    }
}

/// The reachable region of a study segment.
///
/// A segment has either a blob or an isochrone, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionStatus {
    Unresolved,
    Blob(MultiPolygon<f64>),
    Isochrone {
        geometry: MultiPolygon<f64>,
        /// Length of every edge reached within the travel budget
        miles: f64,
    },
}

impl RegionStatus {
    pub fn geometry(&self) -> Option<&MultiPolygon<f64>> {
        match self {
            RegionStatus::Unresolved => None,
            RegionStatus::Blob(geometry) | RegionStatus::Isochrone { geometry, .. } => {
                Some(geometry)
            }
        }
    }

    pub fn has_isochrone(&self) -> Option<bool> {
        match self {
            RegionStatus::Unresolved => None,
            RegionStatus::Blob(_) => Some(false),
            RegionStatus::Isochrone { .. } => Some(true),
        }
    }

    /// Replaces the region geometry, keeping the variant
    pub fn with_geometry(self, geometry: MultiPolygon<f64>) -> Self {
        match self {
            RegionStatus::Unresolved => RegionStatus::Unresolved,
            RegionStatus::Blob(_) => RegionStatus::Blob(geometry),
            RegionStatus::Isochrone { miles, .. } => RegionStatus::Isochrone { geometry, miles },
        }
    }
}
