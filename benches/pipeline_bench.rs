use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use channel_net::config::NetworkConfig;
use channel_net::geometry::Point2;
use channel_net::io::{InMemoryHydrography, LinkIdentity, MeshBoundary, MeshEdge, StreamRecord};
use channel_net::pipeline::{build_channel_network, populate_link_table};
use channel_net::algs::prune::prune_all;
use channel_net::topology::{Endpoint, LinkId};

const STEP: f64 = 500.0;

fn record(link: usize, a: Point2, b: Point2, upstream: [Endpoint; 2], downstream: Endpoint) -> StreamRecord {
    StreamRecord {
        link: LinkId::new(link),
        polyline: vec![a, b],
        upstream_contributing_area: 1.0e6 * (link + 1) as f64,
        downstream_contributing_area: 1.0e6 * (link + 2) as f64,
        stream_order: 1,
        upstream,
        downstream,
    }
}

// Main stem of `n` links along y = 0, each fed by an unbound tributary from
// the north. Every stem link borders two coded mesh edges.
fn comb(n: usize) -> (InMemoryHydrography, MeshBoundary) {
    let mut streams = Vec::with_capacity(2 * n);
    for i in 0..n {
        let up = if i == 0 { Endpoint::INFLOW } else { Endpoint::Link(LinkId::new(i - 1)) };
        let down = if i + 1 == n { Endpoint::OUTFLOW } else { Endpoint::Link(LinkId::new(i + 1)) };
        streams.push(record(
            i,
            Point2::new(STEP * i as f64, 0.0),
            Point2::new(STEP * (i + 1) as f64, 0.0),
            [up, Endpoint::Link(LinkId::new(n + i))],
            down,
        ));
    }
    for i in 0..n {
        streams.push(record(
            n + i,
            Point2::new(STEP * i as f64, 400.0),
            Point2::new(STEP * i as f64, 0.0),
            [Endpoint::NO_FLOW; 2],
            Endpoint::Link(LinkId::new(i)),
        ));
    }
    let source = InMemoryHydrography {
        identities: (0..2 * n)
            .map(|i| LinkIdentity {
                link: LinkId::new(i),
                reach_code: 1_000 + i as i64,
            })
            .collect(),
        streams,
        ..Default::default()
    };

    let cols = 2 * n;
    let mut nodes: Vec<Point2> = (0..=cols).map(|k| Point2::new(0.5 * STEP * k as f64, 0.0)).collect();
    nodes.extend((0..=cols).map(|k| Point2::new(0.5 * STEP * k as f64, -300.0)));
    let top = cols + 1;
    let triangles = (0..cols)
        .flat_map(|k| [[k, k + 1, top + k + 1], [k, top + k + 1, top + k]])
        .collect();
    let edges = (0..cols)
        .map(|k| MeshEdge {
            nodes: [k, k + 1],
            code: 2 + (k / 2) as i64,
        })
        .collect();
    (
        source,
        MeshBoundary {
            nodes,
            triangles,
            edges,
        },
    )
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let config = NetworkConfig::default();
    for &n in &[50usize, 200, 800] {
        let (source, mesh) = comb(n);
        group.bench_with_input(BenchmarkId::new("build_channel_network", n), &n, |b, _| {
            b.iter(|| build_channel_network(&source, &mesh, &config).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("prune_all", n), &n, |b, _| {
            b.iter_batched(
                || populate_link_table(&source, &config).unwrap(),
                |mut table| prune_all(&mut table).unwrap(),
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
