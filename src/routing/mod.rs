mod pathfinder;
mod simple;

pub use pathfinder::PathFinderRouter;
pub use simple::SimpleRouter;

use crate::cancel::CancellationToken;
use crate::config::{EdgeRoutingKind, EdgeRoutingParameters};
use crate::error::{GraphError, LayoutError};
use crate::geometry::{Point, Rect, Size};
use crate::ir::{Edge, EdgeId, Graph, VertexId};
use crate::layout::{EdgeRoutes, VertexPositions, VertexSizes};

/// Final vertex geometry the routers read.
#[derive(Clone, Copy)]
pub struct RoutingInput<'a> {
    pub graph: &'a Graph,
    pub positions: &'a VertexPositions,
    pub sizes: &'a VertexSizes,
    pub cancel: &'a CancellationToken,
}

impl<'a> RoutingInput<'a> {
    pub fn new(
        graph: &'a Graph,
        positions: &'a VertexPositions,
        sizes: &'a VertexSizes,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            graph,
            positions,
            sizes,
            cancel,
        }
    }

    /// Box of an active vertex. Missing sizes count as a point-sized box.
    pub fn rect_of(&self, id: VertexId) -> Result<Rect, LayoutError> {
        let position = self
            .positions
            .get(&id)
            .ok_or(LayoutError::MissingVertexPosition(id))?;
        let size = self.sizes.get(&id).copied().unwrap_or(Size::ZERO);
        Ok(Rect::from_position(*position, size))
    }

    /// Boxes of every active vertex, insertion order.
    pub(crate) fn obstacles(&self) -> Result<Vec<(VertexId, Rect)>, LayoutError> {
        self.graph
            .active_vertices()
            .into_iter()
            .map(|id| Ok((id, self.rect_of(id)?)))
            .collect()
    }

    /// Source and target anchors: the named connection point when the edge
    /// binds one, otherwise the box centre.
    pub fn anchors(&self, edge: &Edge) -> Result<(Point, Point), LayoutError> {
        Ok((
            self.anchor(edge.source, edge.source_connection_point)?,
            self.anchor(edge.target, edge.target_connection_point)?,
        ))
    }

    fn anchor(&self, id: VertexId, connection_point: Option<u32>) -> Result<Point, LayoutError> {
        let rect = self.rect_of(id)?;
        let bound = connection_point
            .and_then(|cp| self.graph.vertex(id).and_then(|v| v.connection_point(cp)));
        Ok(match bound {
            Some(cp) => rect.top_left() + (cp.offset - Point::ORIGIN),
            None => rect.center(),
        })
    }

    pub(crate) fn active_edge(&self, id: EdgeId) -> Result<&'a Edge, LayoutError> {
        let graph: &'a Graph = self.graph;
        let edge = graph
            .edge(id)
            .ok_or(LayoutError::Graph(GraphError::UnknownEdge(id)))?;
        if !graph.is_active(edge.source) || !graph.is_active(edge.target) {
            return Err(LayoutError::InvalidParameter(format!(
                "edge {id} touches an excluded vertex"
            )));
        }
        Ok(edge)
    }
}

/// Computes polylines for the edges of a laid-out graph.
///
/// `compute` routes every active edge; edges the router leaves straight have
/// no entry. `compute_single` routes one edge on its own.
pub trait EdgeRoutingAlgorithm: Send {
    fn kind(&self) -> EdgeRoutingKind;

    fn compute(&mut self, input: &RoutingInput<'_>) -> Result<EdgeRoutes, LayoutError>;

    fn compute_single(
        &mut self,
        edge: EdgeId,
        input: &RoutingInput<'_>,
    ) -> Result<Option<Vec<Point>>, LayoutError>;
}

/// `Ok(None)` when `kind` disables routing.
pub fn create_edge_routing(
    kind: EdgeRoutingKind,
    parameters: Option<EdgeRoutingParameters>,
) -> Result<Option<Box<dyn EdgeRoutingAlgorithm>>, LayoutError> {
    let router: Box<dyn EdgeRoutingAlgorithm> = match (kind, parameters) {
        (EdgeRoutingKind::None, _) => return Ok(None),
        (EdgeRoutingKind::Simple, None) => Box::new(SimpleRouter::default()),
        (EdgeRoutingKind::Simple, Some(EdgeRoutingParameters::Simple(p))) => {
            Box::new(SimpleRouter::new(p))
        }
        (EdgeRoutingKind::PathFinder, None) => Box::new(PathFinderRouter::default()),
        (EdgeRoutingKind::PathFinder, Some(EdgeRoutingParameters::PathFinder(p))) => {
            Box::new(PathFinderRouter::new(p))
        }
        (kind, Some(other)) => {
            return Err(LayoutError::ParameterMismatch {
                expected: kind_name(kind),
                found: other.name(),
            });
        }
    };
    Ok(Some(router))
}

fn kind_name(kind: EdgeRoutingKind) -> &'static str {
    match kind {
        EdgeRoutingKind::None => "none",
        EdgeRoutingKind::Simple => "simple",
        EdgeRoutingKind::PathFinder => "path-finder",
    }
}

/// Loop leaving the right side, rounding the top-right corner and
/// re-entering through the top.
pub(crate) fn self_loop(rect: &Rect, pad: f64) -> Vec<Point> {
    let center = rect.center();
    let right = rect.right() + pad;
    let top = rect.top() - pad;
    vec![
        Point::new(rect.right(), center.y),
        Point::new(right, center.y),
        Point::new(right, top),
        Point::new(center.x, top),
        Point::new(center.x, rect.top()),
    ]
}

/// Drops repeated and collinear interior points.
pub(crate) fn compress_path(points: &[Point]) -> Vec<Point> {
    const EPS: f64 = 1e-6;
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().is_some_and(|last| last.distance(p) <= EPS) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let ab = b - a;
            let bp = p - b;
            if ab.cross(bp).abs() <= EPS * ab.length().max(1.0) && ab.dot(bp) > 0.0 {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PathFinderParameters, SimpleRoutingParameters};
    use crate::ir::Vertex;

    #[test]
    fn factory_matches_kinds() {
        assert!(create_edge_routing(EdgeRoutingKind::None, None).unwrap().is_none());
        let router = create_edge_routing(EdgeRoutingKind::Simple, None).unwrap().unwrap();
        assert_eq!(router.kind(), EdgeRoutingKind::Simple);
        let router = create_edge_routing(
            EdgeRoutingKind::PathFinder,
            Some(EdgeRoutingParameters::PathFinder(PathFinderParameters::default())),
        )
        .unwrap()
        .unwrap();
        assert_eq!(router.kind(), EdgeRoutingKind::PathFinder);
        let err = create_edge_routing(
            EdgeRoutingKind::PathFinder,
            Some(EdgeRoutingParameters::Simple(SimpleRoutingParameters::default())),
        )
        .err()
        .unwrap();
        assert_eq!(
            err,
            LayoutError::ParameterMismatch {
                expected: "path-finder",
                found: "simple"
            }
        );
    }

    #[test]
    fn anchors_prefer_connection_points() {
        let mut graph = Graph::new();
        let a = graph
            .add_vertex(Vertex::new("a").with_connection_point(1, Point::new(10.0, 0.0)))
            .unwrap();
        let b = graph.add_vertex(Vertex::new("b")).unwrap();
        let e = graph
            .add_edge(Edge::new(a, b).with_connection_points(Some(1), Some(7)))
            .unwrap();
        let positions = VertexPositions::from([(a, Point::new(0.0, 0.0)), (b, Point::new(100.0, 0.0))]);
        let sizes = VertexSizes::from([(a, Size::new(20.0, 20.0)), (b, Size::new(20.0, 20.0))]);
        let cancel = CancellationToken::new();
        let input = RoutingInput::new(&graph, &positions, &sizes, &cancel);
        let edge = graph.edge(e).unwrap();
        let (source, target) = input.anchors(edge).unwrap();
        assert_eq!(source, Point::new(10.0, 0.0));
        // Unknown connection point ids fall back to the centre.
        assert_eq!(target, Point::new(110.0, 10.0));
    }

    #[test]
    fn compress_drops_collinear_points() {
        let path = [
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        assert_eq!(
            compress_path(&path),
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)]
        );
    }

    #[test]
    fn self_loop_is_not_degenerate() {
        let points = self_loop(&Rect::new(0.0, 0.0, 0.0, 0.0), 20.0);
        assert_eq!(points.len(), 5);
        assert!(points.windows(2).all(|w| w[0].distance(w[1]) > 0.0));
    }
}
