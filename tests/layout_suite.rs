use std::collections::BTreeMap;
use std::path::Path;

use graph_layout_rs::cancel::CancellationToken;
use graph_layout_rs::config::{
    BoundedFrParameters, Config, EdgeRoutingKind, KkParameters, LayoutKind, LayoutParameters,
    OverlapRemovalKind, OverlapRemovalParameters, SugiyamaParameters,
};
use graph_layout_rs::geometry::{Point, Rect, Size};
use graph_layout_rs::ir::{Graph, Vertex, VertexId};
use graph_layout_rs::layout::{
    CompoundGraph, CompoundLayout, LayoutAlgorithm, LayoutInput, SugiyamaLayout, VertexPositions,
    VertexSizes, compute_layout, vertex_rects,
};
use graph_layout_rs::layout_dump::{GraphDocument, LoadedGraph};
use graph_layout_rs::overlap::{FsaOverlapRemoval, has_overlaps, remove_overlaps};
use graph_layout_rs::routing::{EdgeRoutingAlgorithm, PathFinderRouter, RoutingInput, SimpleRouter};
use graph_layout_rs::LayoutEngine;
use proptest::prelude::*;

const FIXTURES: [&str; 5] = [
    "cycle4.json",
    "self_loop.json",
    "pipeline.json",
    "org_chart.json",
    "pinned.json",
];

const FLAT_KINDS: [LayoutKind; 9] = [
    LayoutKind::Random,
    LayoutKind::Circular,
    LayoutKind::Fr,
    LayoutKind::BoundedFr,
    LayoutKind::KamadaKawai,
    LayoutKind::Isom,
    LayoutKind::LinLog,
    LayoutKind::EfficientSugiyama,
    LayoutKind::Tree,
];

fn load_fixture(name: &str) -> LoadedGraph {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    assert!(path.exists(), "fixture missing: {name}");
    GraphDocument::load(&path)
        .and_then(|doc| doc.build())
        .unwrap_or_else(|err| panic!("{name}: {err:#}"))
}

fn rects_of(loaded: &LoadedGraph, positions: &VertexPositions) -> BTreeMap<VertexId, Rect> {
    vertex_rects(&loaded.graph, positions, &loaded.sizes)
}

fn seeded(kind: LayoutKind, seed: u64) -> Config {
    let mut config = Config {
        seed: Some(seed),
        ..Default::default()
    };
    config.layout.kind = kind;
    config
}

#[test]
fn four_cycle_end_to_end() {
    let loaded = load_fixture("cycle4.json");
    let cancel = CancellationToken::new();
    let input = LayoutInput::new(&loaded.graph, &loaded.sizes, &cancel);
    let runs = [
        (
            LayoutKind::KamadaKawai,
            LayoutParameters::KamadaKawai(KkParameters {
                max_iterations: 100,
                seed: Some(5),
                ..Default::default()
            }),
            (300.0, 300.0),
        ),
        (
            LayoutKind::BoundedFr,
            LayoutParameters::BoundedFr(BoundedFrParameters {
                iteration_limit: 100,
                seed: Some(5),
                ..Default::default()
            }),
            (1000.0, 1000.0),
        ),
    ];
    for (kind, parameters, (width, height)) in runs {
        let mut positions = VertexPositions::new();
        compute_layout(kind, Some(parameters), &input, &mut positions).unwrap();
        assert_eq!(positions.len(), 4, "{kind:?}");
        let points: Vec<Point> = positions.values().copied().collect();
        for (i, p) in points.iter().enumerate() {
            assert!(p.is_finite(), "{kind:?}");
            assert!(p.x >= -1e-9 && p.x <= width + 1e-9, "{kind:?} x out of bounds: {p:?}");
            assert!(p.y >= -1e-9 && p.y <= height + 1e-9, "{kind:?} y out of bounds: {p:?}");
            for q in &points[i + 1..] {
                assert!(p.distance(*q) > 1e-6, "{kind:?} placed two vertices together");
            }
        }

        let mut fsa = FsaOverlapRemoval::new(OverlapRemovalParameters {
            horizontal_gap: 0.0,
            vertical_gap: 0.0,
            ..Default::default()
        });
        remove_overlaps(&mut fsa, &loaded.graph, &mut positions, &loaded.sizes, &cancel).unwrap();
        let rects: Vec<Rect> = rects_of(&loaded, &positions).into_values().collect();
        for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                assert!(!rects[i].intersects_with_tolerance(&rects[j], 1e-6), "{kind:?}");
            }
        }
    }
}

#[test]
fn self_loop_layouts_and_routes() {
    let loaded = load_fixture("self_loop.json");
    let cancel = CancellationToken::new();
    let input = LayoutInput::new(&loaded.graph, &loaded.sizes, &cancel);
    for kind in FLAT_KINDS {
        let mut positions = VertexPositions::new();
        compute_layout(kind, None, &input, &mut positions).unwrap();
        assert!(positions.values().all(|p| p.is_finite()), "{kind:?}");
    }

    let mut positions = VertexPositions::new();
    compute_layout(LayoutKind::Circular, None, &input, &mut positions).unwrap();
    let routing = RoutingInput::new(&loaded.graph, &positions, &loaded.sizes, &cancel);
    let routers: [Box<dyn EdgeRoutingAlgorithm>; 2] =
        [Box::new(SimpleRouter::default()), Box::new(PathFinderRouter::default())];
    for mut router in routers {
        let routes = router.compute(&routing).unwrap();
        let points = routes.values().next().unwrap();
        assert!(points.len() >= 3, "{:?}", router.kind());
        let length: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
        assert!(length > 0.0);
        let bounds = points
            .iter()
            .fold(Rect::EMPTY, |acc, p| acc.union(&Rect::new(p.x, p.y, 0.0, 0.0)));
        assert!(bounds.width > 0.0 && bounds.height > 0.0);
    }
}

#[test]
fn every_fixture_through_the_full_pipeline() {
    for name in FIXTURES {
        let loaded = load_fixture(name);
        for kind in FLAT_KINDS {
            let mut config = seeded(kind, 17);
            config.overlap.kind = OverlapRemovalKind::Fsa;
            config.routing.kind = EdgeRoutingKind::PathFinder;
            let gap = config.overlap.parameters.horizontal_gap;
            let mut positions = loaded.positions.clone();
            let routes = LayoutEngine::new(config)
                .run(&loaded.graph, &loaded.sizes, &mut positions, &CancellationToken::new())
                .unwrap_or_else(|err| panic!("{name} {kind:?}: {err}"));

            for id in loaded.graph.active_vertices() {
                let p = positions.get(&id).unwrap_or_else(|| panic!("{name} {kind:?}: {id} unplaced"));
                assert!(p.is_finite(), "{name} {kind:?}");
            }
            for (id, vertex) in loaded.graph.vertices() {
                if vertex.is_excluded() {
                    assert!(!positions.contains_key(&id), "{name} {kind:?}: excluded vertex placed");
                }
                if vertex.is_frozen() {
                    assert_eq!(positions.get(&id), loaded.positions.get(&id), "{name} {kind:?}");
                }
            }
            assert!(!has_overlaps(&rects_of(&loaded, &positions), gap, gap), "{name} {kind:?}");
            for points in routes.values() {
                assert!(points.iter().all(|p| p.is_finite()), "{name} {kind:?}");
            }
        }
    }
}

#[test]
fn layered_layout_keeps_edges_pointing_down() {
    for name in ["pipeline.json", "org_chart.json"] {
        let loaded = load_fixture(name);
        let cancel = CancellationToken::new();
        let mut layout = SugiyamaLayout::new(SugiyamaParameters::default());
        let mut positions = VertexPositions::new();
        let routes = layout
            .compute(&LayoutInput::new(&loaded.graph, &loaded.sizes, &cancel), &mut positions)
            .unwrap();
        let rects = rects_of(&loaded, &positions);
        for (id, edge) in loaded.graph.edges() {
            let (source, target) = (rects[&edge.source], rects[&edge.target]);
            if layout.reversed_edges().contains(&id) {
                assert!(source.center().y > target.center().y, "{name}: {id}");
            } else {
                assert!(source.bottom() <= target.top() + 1e-9, "{name}: {id}");
            }
            if let Some(points) = routes.get(&id) {
                assert!(points[0].distance(source.center()) < 1e-9, "{name}: {id}");
                assert!(points[points.len() - 1].distance(target.center()) < 1e-9);
            }
        }
    }
    // The org chart has no cycles, so nothing may be reversed.
    let loaded = load_fixture("org_chart.json");
    let mut layout = SugiyamaLayout::new(SugiyamaParameters::default());
    let cancel = CancellationToken::new();
    layout
        .compute(
            &LayoutInput::new(&loaded.graph, &loaded.sizes, &cancel),
            &mut VertexPositions::new(),
        )
        .unwrap();
    assert!(layout.reversed_edges().is_empty());
}

#[test]
fn seeded_runs_are_repeatable() {
    let loaded = load_fixture("pipeline.json");
    for kind in [
        LayoutKind::Random,
        LayoutKind::Fr,
        LayoutKind::BoundedFr,
        LayoutKind::KamadaKawai,
        LayoutKind::Isom,
        LayoutKind::LinLog,
    ] {
        let run = || {
            let mut positions = VertexPositions::new();
            let routes = LayoutEngine::new(seeded(kind, 99))
                .run(&loaded.graph, &loaded.sizes, &mut positions, &CancellationToken::new())
                .unwrap();
            (positions, routes)
        };
        assert_eq!(run(), run(), "{kind:?}");
    }
}

#[test]
fn path_finder_route_in_open_space_stays_short() {
    let mut graph = Graph::new();
    let a = graph.add_vertex(Vertex::new("a")).unwrap();
    let b = graph.add_vertex(Vertex::new("b")).unwrap();
    let e = graph.connect(a, b).unwrap();
    let positions = VertexPositions::from([(a, Point::new(0.0, 0.0)), (b, Point::new(240.0, 130.0))]);
    let sizes = VertexSizes::from([(a, Size::new(20.0, 20.0)), (b, Size::new(20.0, 20.0))]);
    let cancel = CancellationToken::new();
    let routes = PathFinderRouter::default()
        .compute(&RoutingInput::new(&graph, &positions, &sizes, &cancel))
        .unwrap();
    let points = &routes[&e];
    let length: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    let straight = Point::new(10.0, 10.0).distance(Point::new(250.0, 140.0));
    assert!(length >= straight - 1e-9);
    assert!(length <= straight * 1.5, "{length} vs {straight}");
}

#[test]
fn compound_layout_runs_through_the_engine() {
    let outer = load_fixture("org_chart.json");
    let inner = load_fixture("cycle4.json");
    let cto = outer.names["cto"];
    let mut sizes = outer.sizes.clone();
    sizes.remove(&cto);

    let mut layout = CompoundLayout::new(
        LayoutKind::EfficientSugiyama,
        None,
        Default::default(),
    )
    .with_child(cto, CompoundGraph::new(inner.graph.clone(), inner.sizes.clone(), LayoutKind::Circular));
    let mut config = Config::default();
    config.overlap.kind = OverlapRemovalKind::None;
    let mut positions = VertexPositions::new();
    LayoutEngine::new(config)
        .run_with(&mut layout, &outer.graph, &sizes, &mut positions, &CancellationToken::new())
        .unwrap();

    let group = Rect::from_position(positions[&cto], layout.effective_sizes()[&cto]);
    let nested = &layout.inner_layouts()[&cto];
    assert_eq!(nested.positions.len(), 4);
    for (id, p) in &nested.positions {
        let rect = Rect::from_position(*p, inner.sizes[id]);
        assert!(rect.left() >= group.left() - 1e-6 && rect.right() <= group.right() + 1e-6);
        assert!(rect.top() >= group.top() - 1e-6 && rect.bottom() <= group.bottom() + 1e-6);
    }
}

fn random_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..14).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..n * 2)))
}

fn build_graph(n: usize, edges: &[(usize, usize)], size: Size) -> (Graph, VertexSizes) {
    let mut graph = Graph::new();
    let mut sizes = VertexSizes::new();
    let ids: Vec<VertexId> = (0..n)
        .map(|i| {
            let id = graph.add_vertex(Vertex::new(format!("v{i}"))).unwrap();
            sizes.insert(id, size);
            id
        })
        .collect();
    for (s, t) in edges {
        graph.connect(ids[*s], ids[*t]).unwrap();
    }
    (graph, sizes)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn layouts_produce_finite_positions(
        (n, edges) in random_graph(),
        kind_index in 0usize..FLAT_KINDS.len(),
        seed in any::<u64>(),
    ) {
        let (graph, sizes) = build_graph(n, &edges, Size::new(16.0, 12.0));
        let kind = FLAT_KINDS[kind_index];
        let mut positions = VertexPositions::new();
        LayoutEngine::new(seeded(kind, seed))
            .run(&graph, &sizes, &mut positions, &CancellationToken::new())
            .unwrap();
        prop_assert_eq!(positions.len(), n);
        prop_assert!(positions.values().all(|p| p.is_finite()));
        prop_assert!(!has_overlaps(&vertex_rects(&graph, &positions, &sizes), 10.0, 10.0));
    }
}
