use std::cell::Cell;

use geo::{Area, Geometry, LineString, MultiPolygon, Point, Polygon, line_string, polygon};
use lts_connect_core::{
    incidents::IncidentCounts,
    model::{Layer, LayerFeature, RawEdge},
    prelude::*,
    store::DerivedLayer,
};
use serde_json::{Map, Value, json};

const METERS_PER_MILE: f64 = 1609.0;

fn edge(id: i64, from: (f64, f64), to: (f64, f64), stress: u8) -> RawEdge {
    RawEdge::new(
        id,
        line_string![(x: from.0, y: from.1), (x: to.0, y: to.1)],
        Some(stress),
    )
}

/// Two square loops of 4 km each, joined by a high-stress link
fn edges() -> Vec<RawEdge> {
    vec![
        edge(1, (0.0, 0.0), (1000.0, 0.0), 1),
        edge(2, (1000.0, 0.0), (1000.0, 1000.0), 1),
        edge(3, (1000.0, 1000.0), (0.0, 1000.0), 1),
        edge(4, (0.0, 1000.0), (0.0, 0.0), 1),
        edge(5, (1200.0, 0.0), (2200.0, 0.0), 2),
        edge(6, (2200.0, 0.0), (2200.0, 1000.0), 2),
        edge(7, (2200.0, 1000.0), (1200.0, 1000.0), 2),
        edge(8, (1200.0, 1000.0), (1200.0, 0.0), 2),
        edge(9, (1000.0, 500.0), (1200.0, 500.0), 4),
    ]
}

fn catalog(config: &AnalysisConfig) -> NetworkCatalog {
    let mut catalog = NetworkCatalog::new();
    catalog
        .build_level(NetworkType::Lts, Some(2), &edges(), config)
        .unwrap();
    catalog
}

fn props(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    let p: Polygon<f64> = polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)];
    MultiPolygon::new(vec![p])
}

fn layers() -> DataLayers {
    let mut layers = DataLayers::new();
    layers.add_polygons(Layer::new(
        "blocks",
        vec![
            LayerFeature::new(rect(300.0, 300.0, 700.0, 700.0), props(json!({"pop": 1234}))),
            // straddles the upper edge of the far corridor
            LayerFeature::new(rect(5020.0, 0.0, 5080.0, 60.0), props(json!({"pop": 1000}))),
        ],
        false,
    ));
    layers.add_points(Layer::new(
        "crashes",
        vec![
            LayerFeature::new(Point::new(1100.0, 500.0), props(json!({"bike": "Y"}))),
            LayerFeature::new(Point::new(500.0, 500.0), props(json!({"bike": "Y"}))),
        ],
        true,
    ));
    layers
}

fn stat(field: &str, column: &str, layer: &str, kind: StatKind) -> StatDefinition {
    StatDefinition {
        field: field.to_string(),
        column: column.to_string(),
        layer: layer.to_string(),
        kind,
    }
}

fn config(threshold: f64) -> AnalysisConfig {
    AnalysisConfig {
        scope_threshold_miles: threshold,
        travel_time_min: 4.0,
        stats: vec![
            stat("total_pop", "pop", "blocks", StatKind::Polygon),
            stat("bike_crashes", "bike", "crashes", StatKind::Point),
            stat("crash_api", "", "crash_api", StatKind::IncidentApi),
        ],
        ..AnalysisConfig::default()
    }
}

fn request(name: &str, line: LineString<f64>, overwrite: bool) -> SegmentRequest {
    SegmentRequest {
        network: NetworkType::Lts,
        geometry: Geometry::LineString(line),
        owner: "cli_user".to_string(),
        name: name.to_string(),
        comfort_level: Some(2),
        overwrite,
    }
}

fn link() -> LineString<f64> {
    line_string![(x: 1000.0, y: 500.0), (x: 1200.0, y: 500.0)]
}

fn island_miles() -> f64 {
    8000.0 / METERS_PER_MILE
}

/// Records the area of the polygon it is queried with
struct RecordingService {
    queried_area: Cell<f64>,
}

impl RecordingService {
    fn new() -> Self {
        Self {
            queried_area: Cell::new(0.0),
        }
    }
}

impl IncidentSource for RecordingService {
    fn incident_counts(&self, region: &MultiPolygon<f64>) -> Result<IncidentCounts, Error> {
        self.queried_area.set(region.unsigned_area());
        Ok(serde_json::from_value(json!({
            "2020": {"mode": {"Bicyclists": 2, "Pedestrians": 1}},
            "2021": {"mode": {"Bicyclists": 1}}
        }))
        .unwrap())
    }
}

fn corridor_area(length: f64, buffer: f64) -> f64 {
    length * 2.0 * buffer + std::f64::consts::PI * buffer * buffer
}

#[test]
fn below_threshold_stays_blob() {
    let config = config(island_miles() + 0.001);
    let catalog = catalog(&config);
    let layers = layers();
    let mut store = MemoryStore::new();
    let service = RecordingService::new();

    let summary = Analyzer::new(&catalog, &layers, &mut store, &config)
        .with_incidents(&service)
        .analyze(&request("Link", link(), false))
        .unwrap();

    assert_eq!(summary.field("has_isochrone"), Some(&json!(false)));
    let miles = summary.field("miles").and_then(Value::as_f64).unwrap();
    assert!((miles - island_miles()).abs() < 1e-9);
    assert_eq!(summary.field("total_pop"), Some(&json!(1200)));
    assert_eq!(summary.field("bike_crashes"), Some(&json!([["Y", 1]])));
    assert_eq!(summary.field("crash_api"), Some(&json!(4)));

    let expected = corridor_area(200.0, 30.0);
    assert!((service.queried_area.get() - expected).abs() / expected < 0.01);

    let id = summary.segment_id;
    for layer in [DerivedLayer::Buffer, DerivedLayer::Islands, DerivedLayer::Blob] {
        assert!(store.geometry(NetworkType::Lts, layer, id).unwrap().is_some());
    }
    assert!(
        store
            .geometry(NetworkType::Lts, DerivedLayer::Isochrone, id)
            .unwrap()
            .is_none()
    );
}

#[test]
fn above_threshold_builds_isochrone() {
    let config = config(island_miles() - 0.001);
    let catalog = catalog(&config);
    let layers = layers();
    let mut store = MemoryStore::new();
    let service = RecordingService::new();

    let summary = Analyzer::new(&catalog, &layers, &mut store, &config)
        .with_incidents(&service)
        .analyze(&request("Link", link(), false))
        .unwrap();

    assert_eq!(summary.field("has_isochrone"), Some(&json!(true)));
    // three edges per loop start at a node within four minutes of a seed
    let miles = summary.field("miles").and_then(Value::as_f64).unwrap();
    assert!((miles - 6000.0 / METERS_PER_MILE).abs() < 1e-9);

    // crashes stay attributed to the corridor
    assert_eq!(summary.field("bike_crashes"), Some(&json!([["Y", 1]])));
    let expected = corridor_area(200.0, 30.0);
    assert!((service.queried_area.get() - expected).abs() / expected < 0.01);

    let record = store
        .segment(NetworkType::Lts, summary.segment_id)
        .unwrap()
        .unwrap();
    assert_eq!(record.fields.get("has_isochrone"), Some(&json!(true)));
    assert_eq!(record.fields.get("ls_table"), Some(&json!("lts_stress_below_3")));
    assert!(
        store
            .geometry(NetworkType::Lts, DerivedLayer::Blob, summary.segment_id)
            .unwrap()
            .is_none()
    );
}

#[test]
fn corridor_without_islands() {
    let config = config(300.0);
    let catalog = catalog(&config);
    let layers = layers();
    let mut store = MemoryStore::new();

    let summary = Analyzer::new(&catalog, &layers, &mut store, &config)
        .analyze(&request(
            "Far",
            line_string![(x: 5000.0, y: 0.0), (x: 5100.0, y: 0.0)],
            false,
        ))
        .unwrap();

    assert_eq!(summary.field("miles"), Some(&json!(0.0)));
    // half of the block lies inside the corridor
    assert_eq!(summary.field("total_pop"), Some(&json!(500)));
    assert_eq!(summary.field("bike_crashes"), Some(&json!([])));
    // no crash service configured
    assert_eq!(summary.field("crash_api"), Some(&json!("unavailable")));

    let blob = store
        .geometry(NetworkType::Lts, DerivedLayer::Blob, summary.segment_id)
        .unwrap();
    let Some(Geometry::MultiPolygon(blob)) = blob else {
        panic!("blob was not stored");
    };
    let expected = corridor_area(100.0, 30.0);
    assert!((blob.unsigned_area() - expected).abs() / expected < 0.01);
}

#[test]
fn failed_isochrone_falls_back_to_blob() {
    // every mileage is in scope, but no low-stress edge crosses the corridor
    let config = config(-1.0);
    let catalog = catalog(&config);
    let layers = layers();
    let mut store = MemoryStore::new();

    let summary = Analyzer::new(&catalog, &layers, &mut store, &config)
        .analyze(&request(
            "Far",
            line_string![(x: 5000.0, y: 0.0), (x: 5100.0, y: 0.0)],
            false,
        ))
        .unwrap();

    assert_eq!(summary.field("has_isochrone"), Some(&json!(false)));
    assert_eq!(summary.field("miles"), Some(&json!(0.0)));
    assert_eq!(summary.field("total_pop"), Some(&json!(500)));

    let id = summary.segment_id;
    let record = store.segment(NetworkType::Lts, id).unwrap().unwrap();
    assert_eq!(record.fields.get("has_isochrone"), Some(&json!(false)));
    assert!(
        store
            .geometry(NetworkType::Lts, DerivedLayer::Blob, id)
            .unwrap()
            .is_some()
    );
    assert!(
        store
            .geometry(NetworkType::Lts, DerivedLayer::Isochrone, id)
            .unwrap()
            .is_none()
    );
}

#[test]
fn duplicate_names_need_overwrite() {
    let config = config(300.0);
    let catalog = catalog(&config);
    let layers = layers();
    let mut store = MemoryStore::new();

    {
        let mut analyzer = Analyzer::new(&catalog, &layers, &mut store, &config);
        analyzer.analyze(&request("Link", link(), false)).unwrap();

        let err = analyzer
            .analyze(&request("Link!", link(), false))
            .unwrap_err();
        assert!(matches!(err, Error::NameConflict { .. }));

        analyzer.analyze(&request("Link", link(), true)).unwrap();
    }

    assert_eq!(store.segment_count(), 1);
    assert_eq!(store.results().len(), 1);
}

#[test]
fn gap_ids_become_the_segment() {
    let config = config(300.0);
    let catalog = catalog(&config);
    let layers = layers();
    let mut store = MemoryStore::new();

    let summary = Analyzer::new(&catalog, &layers, &mut store, &config)
        .analyze_gaps(NetworkType::Lts, Some(2), &[9], "cli_user", "gap 9", false)
        .unwrap();

    assert_eq!(summary.name, "gap 9");
    let miles = summary.field("miles").and_then(Value::as_f64).unwrap();
    assert!((miles - island_miles()).abs() < 1e-9);

    let err = Analyzer::new(&catalog, &layers, &mut store, &config)
        .analyze_gaps(NetworkType::Lts, Some(2), &[2], "cli_user", "not a gap", false)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));
}

#[test]
fn unbuilt_level_is_rejected_before_registration() {
    let config = config(300.0);
    let catalog = catalog(&config);
    let layers = layers();
    let mut store = MemoryStore::new();

    let mut req = request("Link", link(), false);
    req.comfort_level = Some(3);
    let result = Analyzer::new(&catalog, &layers, &mut store, &config).analyze(&req);

    assert!(result.is_err());
    assert_eq!(store.segment_count(), 0);
}

#[test]
fn land_use_closure_reaches_adjacent_services() {
    let mut config = config(300.0);
    config.stats = vec![stat("essential_services", "type", "services", StatKind::Point)];
    let catalog = catalog(&config);

    let mut layers = layers();
    layers.add_polygons(Layer::new(
        "landuse_2015",
        vec![
            LayerFeature::new(
                rect(5000.0, 0.0, 5100.0, 100.0),
                props(json!({"lu15subn": "Parking: Surface"})),
            ),
            LayerFeature::new(
                rect(5000.0, 100.0, 5100.0, 200.0),
                props(json!({"lu15subn": "Commercial: Retail"})),
            ),
        ],
        false,
    ));
    layers.add_points(Layer::new(
        "services",
        vec![
            LayerFeature::new(Point::new(5050.0, 150.0), props(json!({"type": "Grocery"}))),
            LayerFeature::new(Point::new(5050.0, 500.0), props(json!({"type": "Grocery"}))),
        ],
        false,
    ));
    let mut store = MemoryStore::new();

    let summary = Analyzer::new(&catalog, &layers, &mut store, &config)
        .analyze(&request(
            "Far",
            line_string![(x: 5000.0, y: 0.0), (x: 5100.0, y: 0.0)],
            false,
        ))
        .unwrap();

    assert_eq!(
        summary.field("essential_services"),
        Some(&json!([["Grocery", 1]]))
    );
}
