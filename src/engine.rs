use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::debug;

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::LayoutError;
use crate::ir::Graph;
use crate::layout::{
    EdgeRoutes, LayoutAlgorithm, LayoutInput, VertexPositions, VertexSizes,
    create_layout_algorithm,
};
use crate::overlap::{create_overlap_removal, remove_overlaps};
use crate::routing::{RoutingInput, create_edge_routing};

/// Positions and routes produced by one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    pub positions: VertexPositions,
    pub routes: EdgeRoutes,
}

/// Runs layout, overlap removal and edge routing in sequence, each stage
/// reading the previous stage's output.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: Config,
}

impl LayoutEngine {
    pub fn new(mut config: Config) -> Self {
        if let Some(seed) = config.seed {
            config.layout.set_seed(seed);
        }
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the configured pipeline. `positions` carries frozen positions in
    /// and the result out; after a cancellation it holds the last state a
    /// stage committed.
    pub fn run(
        &self,
        graph: &Graph,
        sizes: &VertexSizes,
        positions: &mut VertexPositions,
        cancel: &CancellationToken,
    ) -> Result<EdgeRoutes, LayoutError> {
        let kind = self.config.layout.kind;
        let mut algorithm =
            create_layout_algorithm(kind, self.config.layout.parameters_for(kind))?;
        self.run_with(algorithm.as_mut(), graph, sizes, positions, cancel)
    }

    /// Same pipeline with a caller-built layout stage, e.g. a
    /// [`crate::layout::CompoundLayout`].
    pub fn run_with(
        &self,
        algorithm: &mut dyn LayoutAlgorithm,
        graph: &Graph,
        sizes: &VertexSizes,
        positions: &mut VertexPositions,
        cancel: &CancellationToken,
    ) -> Result<EdgeRoutes, LayoutError> {
        let started = Instant::now();
        let layout_routes = algorithm.compute(&LayoutInput::new(graph, sizes, cancel), positions)?;
        debug!(
            layout = algorithm.kind().name(),
            vertices = positions.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "layout stage finished"
        );

        let mut moved = false;
        let overlap = &self.config.overlap;
        if let Some(mut remover) = create_overlap_removal(overlap.kind, overlap.parameters.clone()) {
            cancel.check()?;
            let started = Instant::now();
            let before = positions.clone();
            remove_overlaps(remover.as_mut(), graph, positions, sizes, cancel)?;
            moved = before != *positions;
            debug!(
                moved,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "overlap stage finished"
            );
        }

        let routing = &self.config.routing;
        let Some(mut router) = create_edge_routing(routing.kind, routing.parameters_for(routing.kind))?
        else {
            // Layered routes only hold while the vertices stay where the
            // layout put them.
            return Ok(if moved { EdgeRoutes::new() } else { layout_routes });
        };
        cancel.check()?;
        let started = Instant::now();
        let routes = router.compute(&RoutingInput::new(graph, positions, sizes, cancel))?;
        debug!(
            routes = routes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "routing stage finished"
        );
        Ok(routes)
    }

    /// Runs the pipeline on a worker thread. Cancel through `cancel` or the
    /// returned handle.
    pub fn spawn(
        self,
        graph: Graph,
        sizes: VertexSizes,
        mut positions: VertexPositions,
        cancel: CancellationToken,
    ) -> LayoutHandle {
        let token = cancel.clone();
        let handle = thread::spawn(move || {
            let result = self.run(&graph, &sizes, &mut positions, &cancel);
            (positions, result)
        });
        LayoutHandle {
            handle,
            cancel: token,
        }
    }
}

/// Background pipeline run started by [`LayoutEngine::spawn`].
pub struct LayoutHandle {
    handle: JoinHandle<(VertexPositions, Result<EdgeRoutes, LayoutError>)>,
    cancel: CancellationToken,
}

impl LayoutHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the worker. On cancellation the positions committed so far
    /// come back alongside the error.
    pub fn join(self) -> thread::Result<(VertexPositions, Result<LayoutResult, LayoutError>)> {
        let (positions, result) = self.handle.join()?;
        let result = result.map(|routes| LayoutResult {
            positions: positions.clone(),
            routes,
        });
        Ok((positions, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EdgeRoutingKind, LayoutKind, OverlapRemovalKind};
    use crate::geometry::{Point, Rect, Size};
    use crate::ir::{ProcessingOption, Vertex, VertexId};
    use crate::layout::vertex_rects;

    fn cycle(n: usize, size: Size) -> (Graph, Vec<VertexId>, VertexSizes) {
        let mut graph = Graph::new();
        let mut sizes = VertexSizes::new();
        let ids: Vec<VertexId> = (0..n)
            .map(|i| {
                let id = graph.add_vertex(Vertex::new(format!("v{i}"))).unwrap();
                sizes.insert(id, size);
                id
            })
            .collect();
        for i in 0..n {
            graph.connect(ids[i], ids[(i + 1) % n]).unwrap();
        }
        (graph, ids, sizes)
    }

    #[test]
    fn pipeline_separates_and_routes() {
        let (graph, _, sizes) = cycle(6, Size::new(40.0, 40.0));
        let mut config = Config {
            seed: Some(3),
            ..Default::default()
        };
        config.layout.kind = LayoutKind::Fr;
        config.routing.kind = EdgeRoutingKind::Simple;
        let engine = LayoutEngine::new(config);
        let mut positions = VertexPositions::new();
        engine
            .run(&graph, &sizes, &mut positions, &CancellationToken::new())
            .unwrap();
        let rects: Vec<Rect> = vertex_rects(&graph, &positions, &sizes).into_values().collect();
        assert_eq!(rects.len(), 6);
        for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                assert!(!rects[i].intersects_with_tolerance(&rects[j], 1e-6));
            }
        }
    }

    #[test]
    fn layered_routes_survive_without_a_router() {
        let mut graph = Graph::new();
        let mut sizes = VertexSizes::new();
        let ids: Vec<VertexId> = (0..3)
            .map(|i| {
                let id = graph.add_vertex(Vertex::new(format!("v{i}"))).unwrap();
                sizes.insert(id, Size::new(20.0, 20.0));
                id
            })
            .collect();
        graph.connect(ids[0], ids[1]).unwrap();
        graph.connect(ids[1], ids[2]).unwrap();
        let long = graph.connect(ids[0], ids[2]).unwrap();

        let mut config = Config::default();
        config.layout.kind = LayoutKind::EfficientSugiyama;
        config.overlap.kind = OverlapRemovalKind::None;
        let mut positions = VertexPositions::new();
        let routes = LayoutEngine::new(config)
            .run(&graph, &sizes, &mut positions, &CancellationToken::new())
            .unwrap();
        assert!(routes.contains_key(&long));
    }

    #[test]
    fn frozen_vertex_survives_the_pipeline() {
        let (mut graph, ids, sizes) = cycle(4, Size::new(30.0, 30.0));
        graph.set_processing(ids[0], ProcessingOption::Freeze).unwrap();
        let mut positions = VertexPositions::from([(ids[0], Point::new(500.0, 500.0))]);
        let config = Config {
            seed: Some(1),
            ..Default::default()
        };
        LayoutEngine::new(config)
            .run(&graph, &sizes, &mut positions, &CancellationToken::new())
            .unwrap();
        assert_eq!(positions[&ids[0]], Point::new(500.0, 500.0));
    }

    #[test]
    fn spawned_run_can_be_cancelled() {
        let (graph, _, sizes) = cycle(5, Size::new(10.0, 10.0));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let handle = LayoutEngine::default().spawn(graph, sizes, VertexPositions::new(), cancel);
        let (_, result) = handle.join().unwrap();
        assert_eq!(result.unwrap_err(), LayoutError::Cancelled);
    }

    #[test]
    fn spawned_run_delivers_positions() {
        let (graph, ids, sizes) = cycle(3, Size::new(10.0, 10.0));
        let config = Config {
            seed: Some(9),
            ..Default::default()
        };
        let handle = LayoutEngine::new(config).spawn(graph, sizes, VertexPositions::new(), CancellationToken::new());
        let (positions, result) = handle.join().unwrap();
        let result = result.unwrap();
        assert_eq!(result.positions, positions);
        assert!(ids.iter().all(|id| positions[id].is_finite()));
    }
}
