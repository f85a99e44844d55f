use criterion::{Criterion, black_box, criterion_group, criterion_main};
use geo::{Buffer, MultiLineString, line_string};

use lts_connect_core::{
    analysis::build_isochrone,
    config::AnalysisConfig,
    model::{NetworkTables, NetworkType, RawEdge},
    network::{LowStressNetwork, partition_islands},
};

const GRID: i64 = 60;
const BLOCK: f64 = 120.0;

/// Street grid where every seventh street is busy
fn grid_edges() -> Vec<RawEdge> {
    let mut edges = Vec::new();
    let mut id = 0;
    for row in 0..GRID {
        for col in 0..GRID {
            let (x, y) = (col as f64 * BLOCK, row as f64 * BLOCK);
            let stress = |n: i64| if n % 7 == 3 { 4 } else { 1 + (n % 2) as u8 };
            if col + 1 < GRID {
                id += 1;
                edges.push(RawEdge::new(
                    id,
                    line_string![(x: x, y: y), (x: x + BLOCK, y: y)],
                    Some(stress(row)),
                ));
            }
            if row + 1 < GRID {
                id += 1;
                edges.push(RawEdge::new(
                    id,
                    line_string![(x: x, y: y), (x: x, y: y + BLOCK)],
                    Some(stress(col)),
                ));
            }
        }
    }
    edges
}

fn bench_islands(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let edges = grid_edges();
    let tables = NetworkTables::new(NetworkType::Lts, Some(2)).unwrap();

    let mut group = c.benchmark_group("islands");
    group.bench_function("topology", |b| {
        b.iter(|| LowStressNetwork::build(tables.clone(), black_box(&edges), &config));
    });

    let network = LowStressNetwork::build(tables.clone(), &edges, &config);
    group.bench_function("partition", |b| {
        b.iter(|| partition_islands(black_box(&network), &config));
    });
    group.finish();
}

fn bench_isochrone(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let edges = grid_edges();
    let tables = NetworkTables::new(NetworkType::Lts, Some(3)).unwrap();
    let network = LowStressNetwork::build(tables, &edges, &config);

    let center = GRID as f64 * BLOCK / 2.0;
    let corridor = MultiLineString::new(vec![line_string![
        (x: center, y: center - BLOCK / 2.0),
        (x: center + BLOCK, y: center - BLOCK / 2.0)
    ]]);
    let corridor = corridor.buffer(config.buffer_distance);

    c.bench_function("isochrone_15_min", |b| {
        b.iter(|| build_isochrone(black_box(&network), black_box(&corridor), &config));
    });
}

criterion_group!(benches, bench_islands, bench_isochrone);
criterion_main!(benches);
