use std::collections::BTreeMap;

use tracing::debug;

use super::{EdgeRoutingAlgorithm, RoutingInput, compress_path, self_loop};
use crate::config::{EdgeRoutingKind, SimpleRoutingParameters};
use crate::error::LayoutError;
use crate::geometry::{Point, Rect, Vector};
use crate::ir::{Edge, EdgeId, VertexId};
use crate::layout::EdgeRoutes;

/// Cheap router: loops for self-loops, fanned midpoints for parallel edges
/// and corner detours around boxes a straight edge would cross.
#[derive(Debug, Clone, Default)]
pub struct SimpleRouter {
    parameters: SimpleRoutingParameters,
}

impl SimpleRouter {
    pub fn new(parameters: SimpleRoutingParameters) -> Self {
        Self { parameters }
    }

    fn route(
        &self,
        id: EdgeId,
        edge: &Edge,
        input: &RoutingInput<'_>,
        obstacles: &[(VertexId, Rect)],
        bundle: &BTreeMap<(VertexId, VertexId), Vec<EdgeId>>,
    ) -> Result<Option<Vec<Point>>, LayoutError> {
        if edge.is_self_loop() {
            let rect = input.rect_of(edge.source)?;
            return Ok(Some(self_loop(&rect, self.parameters.self_loop_size)));
        }
        let (source, target) = input.anchors(edge)?;

        let key = pair_key(edge);
        if let Some(siblings) = bundle.get(&key)
            && siblings.len() > 1
            && let Some(index) = siblings.iter().position(|e| *e == id)
        {
            let offset = (index as f64 - (siblings.len() - 1) as f64 * 0.5)
                * self.parameters.parallel_spacing;
            if offset.abs() > f64::EPSILON {
                let (low, high) = (input.rect_of(key.0)?.center(), input.rect_of(key.1)?.center());
                let mut normal = (high - low).normalized().perpendicular();
                if normal == Vector::ZERO {
                    normal = Vector::new(0.0, 1.0);
                }
                let bend = source.midpoint(target) + normal * offset;
                return Ok(Some(vec![source, bend, target]));
            }
        }

        let blocking: Vec<Rect> = obstacles
            .iter()
            .filter(|(v, _)| *v != edge.source && *v != edge.target)
            .map(|(_, r)| *r)
            .collect();
        Ok(self.detour(source, target, &blocking))
    }

    /// Inserts a corner of each crossed box until the path is clear or the
    /// iteration budget runs out. `None` when the straight line is clear.
    fn detour(&self, source: Point, target: Point, obstacles: &[Rect]) -> Option<Vec<Point>> {
        let mut path = vec![source, target];
        let mut bent = false;
        for _ in 0..self.parameters.max_iterations {
            let hit = path.windows(2).enumerate().find_map(|(idx, seg)| {
                obstacles
                    .iter()
                    .filter(|r| r.intersects_segment(seg[0], seg[1]))
                    .min_by(|a, b| {
                        seg[0]
                            .distance(a.center())
                            .total_cmp(&seg[0].distance(b.center()))
                    })
                    .map(|r| (idx, *r))
            });
            let Some((idx, rect)) = hit else {
                break;
            };
            let (a, b) = (path[idx], path[idx + 1]);
            let corner = best_corner(&rect.inflate(self.parameters.side_step, self.parameters.side_step), &rect, a, b);
            path.insert(idx + 1, corner);
            bent = true;
        }
        bent.then(|| compress_path(&path))
    }
}

/// Corner of `padded` giving the shortest clear two-segment detour from `a`
/// to `b` around `rect`. Falls back to the shortest corner overall.
fn best_corner(padded: &Rect, rect: &Rect, a: Point, b: Point) -> Point {
    let corners = [
        padded.top_left(),
        Point::new(padded.right(), padded.top()),
        Point::new(padded.right(), padded.bottom()),
        Point::new(padded.left(), padded.bottom()),
    ];
    let length = |c: &Point| a.distance(*c) + c.distance(b);
    corners
        .iter()
        .filter(|c| !rect.intersects_segment(a, **c) && !rect.intersects_segment(**c, b))
        .min_by(|x, y| length(x).total_cmp(&length(y)))
        .or_else(|| corners.iter().min_by(|x, y| length(x).total_cmp(&length(y))))
        .copied()
        .unwrap_or(a)
}

fn pair_key(edge: &Edge) -> (VertexId, VertexId) {
    if edge.source <= edge.target {
        (edge.source, edge.target)
    } else {
        (edge.target, edge.source)
    }
}

impl EdgeRoutingAlgorithm for SimpleRouter {
    fn kind(&self) -> EdgeRoutingKind {
        EdgeRoutingKind::Simple
    }

    fn compute(&mut self, input: &RoutingInput<'_>) -> Result<EdgeRoutes, LayoutError> {
        let obstacles = input.obstacles()?;
        let mut bundle: BTreeMap<(VertexId, VertexId), Vec<EdgeId>> = BTreeMap::new();
        for (id, edge) in input.graph.active_edges() {
            if !edge.is_self_loop() {
                bundle.entry(pair_key(edge)).or_default().push(id);
            }
        }

        let mut routes = EdgeRoutes::new();
        for (id, edge) in input.graph.active_edges() {
            input.cancel.check()?;
            if let Some(points) = self.route(id, edge, input, &obstacles, &bundle)? {
                routes.insert(id, points);
            }
        }
        debug!(routes = routes.len(), "simple routing finished");
        Ok(routes)
    }

    fn compute_single(
        &mut self,
        edge: EdgeId,
        input: &RoutingInput<'_>,
    ) -> Result<Option<Vec<Point>>, LayoutError> {
        let record = input.active_edge(edge)?;
        let obstacles = input.obstacles()?;
        let mut bundle: BTreeMap<(VertexId, VertexId), Vec<EdgeId>> = BTreeMap::new();
        let key = pair_key(record);
        for (id, other) in input.graph.active_edges() {
            if !other.is_self_loop() && pair_key(other) == key {
                bundle.entry(key).or_default().push(id);
            }
        }
        self.route(edge, record, input, &obstacles, &bundle)
    }
}
