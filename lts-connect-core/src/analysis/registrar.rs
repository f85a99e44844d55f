//! Registration of candidate segments

use geo::{Geometry, MultiLineString};
use log::info;

use crate::{
    EdgeId, Error,
    model::{NetworkTables, SegmentName, SegmentRequest, StudySegment},
    network::NetworkLevel,
    store::{NewSegment, SegmentStore},
};

/// Validates and stores a candidate segment.
///
/// Fails with [`Error::NameConflict`] when the owner already used the
/// sanitized name on this network, unless `overwrite` is set, in which case
/// the earlier segments and everything derived from them are purged first.
pub fn register<S: SegmentStore>(
    store: &mut S,
    request: &SegmentRequest,
) -> Result<StudySegment, Error> {
    let tables = NetworkTables::new(request.network, request.comfort_level)?;
    let geometry = line_geometry(&request.geometry)?;
    let name = SegmentName::sanitize(&request.name);
    if name.as_str().trim().is_empty() {
        return Err(Error::InvalidData(format!(
            "segment name {:?} is empty once sanitized",
            request.name
        )));
    }

    let taken = store
        .segment_names(request.network, &request.owner)?
        .contains(&name);
    if taken {
        if !request.overwrite {
            return Err(Error::NameConflict {
                owner: request.owner.clone(),
                name: name.to_string(),
            });
        }
        let removed = store.delete_segments(request.network, &request.owner, &name)?;
        info!("Overwriting {removed} earlier segment(s) named {name}");
    }

    let id = store.insert_segment(NewSegment {
        network: request.network,
        owner: request.owner.clone(),
        name: name.clone(),
        geometry: Geometry::MultiLineString(geometry.clone()),
    })?;

    info!("Registered segment {id} ({name}) on {}", tables.ls_table);

    Ok(StudySegment {
        id,
        owner: request.owner.clone(),
        name,
        tables,
        geometry,
    })
}

/// Accepts a line or multi-line, every other geometry kind is rejected
pub fn line_geometry(geometry: &Geometry<f64>) -> Result<MultiLineString<f64>, Error> {
    match geometry {
        Geometry::LineString(line) => Ok(MultiLineString::new(vec![line.clone()])),
        Geometry::MultiLineString(lines) => Ok(lines.clone()),
        other => Err(Error::InvalidGeometryKind(geometry_kind_name(other).to_string())),
    }
}

/// Candidate geometry made of existing gap edges
pub fn gap_geometry(level: &NetworkLevel, ids: &[EdgeId]) -> Result<Geometry<f64>, Error> {
    if ids.is_empty() {
        return Err(Error::InvalidData("no gap ids given".to_string()));
    }
    let lines = level
        .gaps_by_id(ids)?
        .into_iter()
        .map(|gap| gap.geometry.clone())
        .collect();
    Ok(Geometry::MultiLineString(MultiLineString::new(lines)))
}

fn geometry_kind_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::NetworkType, store::MemoryStore};
    use geo::{Point, line_string};

    fn request(name: &str, overwrite: bool) -> SegmentRequest {
        SegmentRequest {
            network: NetworkType::Lts,
            geometry: Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]),
            owner: "mmorley".to_string(),
            name: name.to_string(),
            comfort_level: Some(2),
            overwrite,
        }
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut store = MemoryStore::new();
        register(&mut store, &request("Horsham Pike #3!", false)).unwrap();

        let err = register(&mut store, &request("Horsham Pike 3", false)).unwrap_err();
        assert!(matches!(err, Error::NameConflict { ref name, .. } if name == "Horsham Pike 3"));
    }

    #[test]
    fn overwrite_replaces_prior_segment() {
        let mut store = MemoryStore::new();
        let first = register(&mut store, &request("Main", false)).unwrap();
        let second = register(&mut store, &request("Main", true)).unwrap();

        assert_ne!(first.id, second.id);
        assert!(store.segment(NetworkType::Lts, first.id).unwrap().is_none());
        assert!(store.segment(NetworkType::Lts, second.id).unwrap().is_some());
        assert_eq!(store.segment_count(), 1);
    }

    #[test]
    fn other_owner_may_reuse_name() {
        let mut store = MemoryStore::new();
        register(&mut store, &request("Main", false)).unwrap();
        let mut other = request("Main", false);
        other.owner = "cli_user".to_string();
        assert!(register(&mut store, &other).is_ok());
    }

    #[test]
    fn rejects_non_linear_geometry() {
        let mut store = MemoryStore::new();
        let mut point = request("Main", false);
        point.geometry = Geometry::Point(Point::new(0.0, 0.0));

        let err = register(&mut store, &point).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometryKind(ref kind) if kind == "Point"));
        assert_eq!(store.segment_count(), 0);
    }

    #[test]
    fn stores_sanitized_name() {
        let mut store = MemoryStore::new();
        let segment = register(&mut store, &request("Horsham Pike #3!", false)).unwrap();
        let record = store.segment(NetworkType::Lts, segment.id).unwrap().unwrap();
        assert_eq!(record.name.as_str(), "Horsham Pike 3");
    }
}
