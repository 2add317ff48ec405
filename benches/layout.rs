use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use graph_layout_rs::LayoutEngine;
use graph_layout_rs::cancel::CancellationToken;
use graph_layout_rs::config::{Config, EdgeRoutingKind, LayoutKind, OverlapRemovalKind};
use graph_layout_rs::geometry::Size;
use graph_layout_rs::ir::{Graph, Vertex, VertexId};
use graph_layout_rs::layout::{VertexPositions, VertexSizes};
use std::hint::black_box;

fn dense_graph(nodes: usize, extra_edges: usize) -> (Graph, VertexSizes) {
    let mut graph = Graph::new();
    let mut sizes = VertexSizes::new();
    let ids: Vec<VertexId> = (0..nodes)
        .map(|i| {
            let id = graph
                .add_vertex(Vertex::new(format!("n{i}")))
                .expect("fresh vertex");
            sizes.insert(id, Size::new(40.0 + (i % 3) as f64 * 10.0, 24.0));
            id
        })
        .collect();
    for pair in ids.windows(2) {
        graph.connect(pair[0], pair[1]).expect("known vertices");
    }
    let mut count = 0usize;
    'outer: for i in 0..nodes {
        for j in (i + 2)..nodes {
            if count >= extra_edges {
                break 'outer;
            }
            graph.connect(ids[i], ids[j]).expect("known vertices");
            count += 1;
        }
    }
    (graph, sizes)
}

fn config(layout: LayoutKind, overlap: OverlapRemovalKind, routing: EdgeRoutingKind) -> Config {
    let mut config = Config {
        seed: Some(7),
        ..Default::default()
    };
    config.layout.kind = layout;
    config.overlap.kind = overlap;
    config.routing.kind = routing;
    config
}

fn run(engine: &LayoutEngine, graph: &Graph, sizes: &VertexSizes) -> usize {
    let mut positions = VertexPositions::new();
    let routes = engine
        .run(graph, sizes, &mut positions, &CancellationToken::new())
        .expect("layout failed");
    positions.len() + routes.len()
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let (graph, sizes) = dense_graph(60, 90);
    for kind in [
        LayoutKind::Circular,
        LayoutKind::Fr,
        LayoutKind::BoundedFr,
        LayoutKind::KamadaKawai,
        LayoutKind::Isom,
        LayoutKind::LinLog,
        LayoutKind::EfficientSugiyama,
        LayoutKind::Tree,
    ] {
        let engine = LayoutEngine::new(config(kind, OverlapRemovalKind::None, EdgeRoutingKind::None));
        group.bench_with_input(BenchmarkId::from_parameter(kind.name()), &graph, |b, graph| {
            b.iter(|| black_box(run(&engine, black_box(graph), &sizes)));
        });
    }
    group.finish();
}

fn bench_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlap");
    for nodes in [40usize, 120, 240] {
        let (graph, sizes) = dense_graph(nodes, nodes);
        for kind in [OverlapRemovalKind::Fsa, OverlapRemovalKind::OneWayFsa] {
            let engine = LayoutEngine::new(config(LayoutKind::Random, kind, EdgeRoutingKind::None));
            group.bench_with_input(
                BenchmarkId::new(format!("{kind:?}"), nodes),
                &graph,
                |b, graph| {
                    b.iter(|| black_box(run(&engine, black_box(graph), &sizes)));
                },
            );
        }
    }
    group.finish();
}

fn bench_edge_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_routing");
    for (nodes, extra_edges) in [(20usize, 30usize), (40, 80)] {
        let name = format!("dense_{nodes}_{extra_edges}");
        let (graph, sizes) = dense_graph(nodes, extra_edges);
        for routing in [EdgeRoutingKind::Simple, EdgeRoutingKind::PathFinder] {
            let engine = LayoutEngine::new(config(
                LayoutKind::EfficientSugiyama,
                OverlapRemovalKind::Fsa,
                routing,
            ));
            group.bench_with_input(
                BenchmarkId::new(format!("{routing:?}"), &name),
                &graph,
                |b, graph| {
                    b.iter(|| black_box(run(&engine, black_box(graph), &sizes)));
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_layout, bench_overlap, bench_edge_routing);
criterion_main!(benches);
