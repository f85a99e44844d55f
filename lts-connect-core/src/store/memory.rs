use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use geo::Geometry;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DerivedLayer, NewSegment, SegmentRecord, SegmentStore, validate_column};
use crate::{
    Error, SegmentId,
    analysis::SegmentSummary,
    model::{NetworkType, SegmentName},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DerivedRow {
    network: NetworkType,
    layer: DerivedLayer,
    id: SegmentId,
    owner: String,
    geometry: Geometry<f64>,
}

/// In-process store, optionally persisted to a JSON file between runs
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    next_id: SegmentId,
    segments: BTreeMap<SegmentId, SegmentRecord>,
    derived: Vec<DerivedRow>,
    results: Vec<SegmentSummary>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store saved with [`MemoryStore::save`], or an empty one when
    /// the file does not exist yet
    pub fn open(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let context = || format!("read {}", path.display());
        let file = File::open(path).map_err(|e| Error::persistence(context(), e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::persistence(context(), e))
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let context = || format!("write {}", path.display());
        let file = File::create(path).map_err(|e| Error::persistence(context(), e))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .map_err(|e| Error::persistence(context(), e))
    }

    pub fn results(&self) -> &[SegmentSummary] {
        &self.results
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

impl SegmentStore for MemoryStore {
    fn segment_names(&self, network: NetworkType, owner: &str) -> Result<Vec<SegmentName>, Error> {
        Ok(self
            .segments
            .values()
            .filter(|s| s.network == network && s.owner == owner)
            .map(|s| s.name.clone())
            .collect())
    }

    fn insert_segment(&mut self, segment: NewSegment) -> Result<SegmentId, Error> {
        self.next_id += 1;
        let id = self.next_id;
        self.segments.insert(
            id,
            SegmentRecord {
                id,
                network: segment.network,
                owner: segment.owner,
                name: segment.name,
                geometry: segment.geometry,
                fields: serde_json::Map::new(),
            },
        );
        Ok(id)
    }

    fn delete_segments(
        &mut self,
        network: NetworkType,
        owner: &str,
        name: &SegmentName,
    ) -> Result<usize, Error> {
        let doomed: Vec<SegmentId> = self
            .segments
            .values()
            .filter(|s| s.network == network && s.owner == owner && &s.name == name)
            .map(|s| s.id)
            .collect();

        for id in &doomed {
            self.segments.remove(id);
        }
        self.derived
            .retain(|row| !(row.network == network && doomed.contains(&row.id)));
        self.results.retain(|summary| {
            !(summary.network == network && doomed.contains(&summary.segment_id))
        });

        debug!("Deleted {} segments named {name} for {owner}", doomed.len());
        Ok(doomed.len())
    }

    fn delete_owner(&mut self, owner: &str) -> Result<usize, Error> {
        let before = self.segments.len();
        self.segments.retain(|_, s| s.owner != owner);
        self.derived.retain(|row| row.owner != owner);
        self.results.retain(|summary| summary.owner != owner);
        Ok(before - self.segments.len())
    }

    fn segment(&self, network: NetworkType, id: SegmentId) -> Result<Option<SegmentRecord>, Error> {
        Ok(self
            .segments
            .get(&id)
            .filter(|s| s.network == network)
            .cloned())
    }

    fn update_field(
        &mut self,
        network: NetworkType,
        id: SegmentId,
        owner: &str,
        column: &str,
        value: Value,
    ) -> Result<(), Error> {
        validate_column(column)?;
        let record = self
            .segments
            .get_mut(&id)
            .filter(|s| s.network == network && s.owner == owner)
            .ok_or_else(|| {
                Error::persistence(
                    format!("update {network}.user_segments.{column} for segment {id}"),
                    "segment does not exist",
                )
            })?;
        record.fields.insert(column.to_string(), value);
        Ok(())
    }

    fn put_geometry(
        &mut self,
        network: NetworkType,
        layer: DerivedLayer,
        id: SegmentId,
        owner: &str,
        geometry: Geometry<f64>,
    ) -> Result<(), Error> {
        if !self.segments.contains_key(&id) {
            return Err(Error::persistence(
                format!("insert into {network}.{} for segment {id}", layer.table()),
                "segment does not exist",
            ));
        }
        self.derived
            .retain(|row| !(row.network == network && row.layer == layer && row.id == id));
        self.derived.push(DerivedRow {
            network,
            layer,
            id,
            owner: owner.to_string(),
            geometry,
        });
        Ok(())
    }

    fn geometry(
        &self,
        network: NetworkType,
        layer: DerivedLayer,
        id: SegmentId,
    ) -> Result<Option<Geometry<f64>>, Error> {
        Ok(self
            .derived
            .iter()
            .find(|row| row.network == network && row.layer == layer && row.id == id)
            .map(|row| row.geometry.clone()))
    }

    fn append_result(&mut self, summary: &SegmentSummary) -> Result<(), Error> {
        self.results.push(summary.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, line_string};

    fn new_segment(owner: &str, name: &str) -> NewSegment {
        let line: LineString<f64> = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)];
        NewSegment {
            network: NetworkType::Lts,
            owner: owner.to_string(),
            name: SegmentName::sanitize(name),
            geometry: Geometry::LineString(line),
        }
    }

    #[test]
    fn deletes_segment_with_derived_rows() {
        let mut store = MemoryStore::new();
        let id = store.insert_segment(new_segment("ann", "Main St")).unwrap();
        let other = store.insert_segment(new_segment("bob", "Main St")).unwrap();
        let point = Geometry::Point(geo::Point::new(0.0, 0.0));
        store
            .put_geometry(NetworkType::Lts, DerivedLayer::Buffer, id, "ann", point.clone())
            .unwrap();

        let removed = store
            .delete_segments(NetworkType::Lts, "ann", &SegmentName::sanitize("Main St"))
            .unwrap();

        assert_eq!(removed, 1);
        assert!(store.segment(NetworkType::Lts, id).unwrap().is_none());
        assert!(store.segment(NetworkType::Lts, other).unwrap().is_some());
        assert!(
            store
                .geometry(NetworkType::Lts, DerivedLayer::Buffer, id)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn update_of_missing_segment_carries_context() {
        let mut store = MemoryStore::new();
        let err = store
            .update_field(NetworkType::Lts, 42, "ann", "miles", Value::from(1.0))
            .unwrap_err();
        match err {
            Error::Persistence { context, .. } => assert!(context.contains("miles")),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn drops_all_data_of_one_owner() {
        let mut store = MemoryStore::new();
        store.insert_segment(new_segment("ann", "a")).unwrap();
        store.insert_segment(new_segment("ann", "b")).unwrap();
        store.insert_segment(new_segment("bob", "a")).unwrap();

        assert_eq!(store.delete_owner("ann").unwrap(), 2);
        assert_eq!(store.segment_count(), 1);
    }

    #[test]
    fn unwritable_store_path_carries_context() {
        let path = std::env::temp_dir()
            .join("lts_connect_missing_dir")
            .join("store.json");
        let err = MemoryStore::new().save(&path).unwrap_err();
        match err {
            Error::Persistence { context, .. } => assert!(context.starts_with("write")),
            other => panic!("unexpected error {other}"),
        }
    }
}
