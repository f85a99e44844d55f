//! Persistence of study segments, their derived geometries and results
//!
//! [`SegmentStore`] is the seam to the relational store. Values always travel
//! as typed arguments; column names are checked against a closed pattern
//! before they reach an implementation.

mod memory;

use geo::Geometry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use memory::MemoryStore;

use crate::{
    Error, SegmentId,
    analysis::SegmentSummary,
    model::{NetworkType, SegmentName},
};

/// Derived geometry tables kept per segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedLayer {
    Buffer,
    Islands,
    Blob,
    Isochrone,
}

impl DerivedLayer {
    pub fn table(&self) -> &'static str {
        match self {
            DerivedLayer::Buffer => "user_buffers",
            DerivedLayer::Islands => "user_islands",
            DerivedLayer::Blob => "user_blobs",
            DerivedLayer::Isochrone => "user_isochrones",
        }
    }
}

/// Row inserted on registration
#[derive(Debug, Clone)]
pub struct NewSegment {
    pub network: NetworkType,
    pub owner: String,
    pub name: SegmentName,
    pub geometry: Geometry<f64>,
}

/// Stored study segment with every field written so far
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub id: SegmentId,
    pub network: NetworkType,
    pub owner: String,
    pub name: SegmentName,
    pub geometry: Geometry<f64>,
    /// Fields appended by the analysis, one at a time
    pub fields: serde_json::Map<String, Value>,
}

pub trait SegmentStore {
    /// Sanitized names already used by `owner` on `network`
    fn segment_names(&self, network: NetworkType, owner: &str) -> Result<Vec<SegmentName>, Error>;

    fn insert_segment(&mut self, segment: NewSegment) -> Result<SegmentId, Error>;

    /// Deletes every segment of `owner` named `name` with its derived
    /// geometries, returns how many segments were removed
    fn delete_segments(
        &mut self,
        network: NetworkType,
        owner: &str,
        name: &SegmentName,
    ) -> Result<usize, Error>;

    /// Deletes everything `owner` stored, on every network
    fn delete_owner(&mut self, owner: &str) -> Result<usize, Error>;

    fn segment(&self, network: NetworkType, id: SegmentId) -> Result<Option<SegmentRecord>, Error>;

    fn update_field(
        &mut self,
        network: NetworkType,
        id: SegmentId,
        owner: &str,
        column: &str,
        value: Value,
    ) -> Result<(), Error>;

    fn put_geometry(
        &mut self,
        network: NetworkType,
        layer: DerivedLayer,
        id: SegmentId,
        owner: &str,
        geometry: Geometry<f64>,
    ) -> Result<(), Error>;

    fn geometry(
        &self,
        network: NetworkType,
        layer: DerivedLayer,
        id: SegmentId,
    ) -> Result<Option<Geometry<f64>>, Error>;

    fn append_result(&mut self, summary: &SegmentSummary) -> Result<(), Error>;
}

/// Column names are plain identifiers: ASCII letters, digits and underscores
pub fn validate_column(column: &str) -> Result<(), Error> {
    let valid = !column.is_empty()
        && !column.starts_with(|c: char| c.is_ascii_digit())
        && column
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::persistence(
            format!("update column {column:?}"),
            "column name is not a plain identifier",
        ))
    }
}
