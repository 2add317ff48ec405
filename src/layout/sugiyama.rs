use std::collections::BTreeSet;

use tracing::debug;

use super::ranking::{compute_ranks, order_rank_nodes, tighten_sources};
use super::types::ActiveSet;
use super::{
    EdgeRoutes, LayoutAlgorithm, LayoutInput, VertexPositions, bounding_box, orient, prepare,
};
use crate::config::{LayoutKind, SugiyamaParameters};
use crate::error::LayoutError;
use crate::geometry::{Point, Rect};
use crate::ir::EdgeId;

/// Layered drawing: cycle removal, longest-path layering, dummy chains for
/// long edges, median crossing reduction and balanced coordinate
/// assignment. Long edges are routed through their dummy chain.
#[derive(Debug, Clone, Default)]
pub struct SugiyamaLayout {
    parameters: SugiyamaParameters,
    reversed: BTreeSet<EdgeId>,
    crossings: usize,
}

/// One entry per layered node; dummies have no vertex slot.
#[derive(Debug, Clone, Copy)]
struct LayerNode {
    vertex: Option<usize>,
    /// Extent along the layer.
    breadth: f64,
    /// Extent across the layer.
    depth: f64,
}

/// Edge of the acyclic graph together with the original it stands for.
#[derive(Debug, Clone)]
struct Chain {
    edge: EdgeId,
    reversed: bool,
    nodes: Vec<usize>,
}

impl SugiyamaLayout {
    pub fn new(parameters: SugiyamaParameters) -> Self {
        Self {
            parameters,
            ..Default::default()
        }
    }

    /// Edges that were turned around to break cycles in the last run.
    pub fn reversed_edges(&self) -> &BTreeSet<EdgeId> {
        &self.reversed
    }

    /// Crossing count of the ordering chosen in the last run.
    pub fn crossings(&self) -> usize {
        self.crossings
    }
}

impl LayoutAlgorithm for SugiyamaLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::EfficientSugiyama
    }

    fn needs_vertex_sizes(&self) -> bool {
        true
    }

    fn compute(
        &mut self,
        input: &LayoutInput<'_>,
        positions: &mut VertexPositions,
    ) -> Result<EdgeRoutes, LayoutError> {
        self.reversed.clear();
        self.crossings = 0;
        if !prepare(input, positions, true)? {
            return Ok(EdgeRoutes::new());
        }
        let p = self.parameters.clone();
        let horizontal = p.direction.is_horizontal();
        let set = ActiveSet::new(input.graph);

        let mut nodes: Vec<LayerNode> = set
            .ids
            .iter()
            .enumerate()
            .map(|(slot, id)| {
                let size = input.size_of(*id);
                let (breadth, depth) = if horizontal {
                    (size.height, size.width)
                } else {
                    (size.width, size.height)
                };
                LayerNode {
                    vertex: Some(slot),
                    breadth,
                    depth,
                }
            })
            .collect();

        // Cycle removal.
        let edges: Vec<(EdgeId, usize, usize)> = input
            .graph
            .active_edges()
            .filter(|(_, e)| !e.is_self_loop())
            .filter_map(|(id, e)| Some((id, set.slot(e.source)?, set.slot(e.target)?)))
            .collect();
        let back = back_edges(set.len(), &edges);
        let dag: Vec<(usize, usize)> = edges
            .iter()
            .zip(&back)
            .map(|((_, s, t), rev)| if *rev { (*t, *s) } else { (*s, *t) })
            .collect();
        self.reversed = edges
            .iter()
            .zip(&back)
            .filter(|(_, rev)| **rev)
            .map(|((id, _, _), _)| *id)
            .collect();
        input.cancel.check()?;

        // Layering.
        let mut ranks = compute_ranks(set.len(), &dag);
        if p.minimize_edge_length {
            tighten_sources(&mut ranks, &dag);
        }

        // Dummy chains.
        let mut chains = Vec::with_capacity(dag.len());
        let mut segments = Vec::new();
        for (((edge, _, _), rev), (from, to)) in edges.iter().zip(&back).zip(&dag) {
            let mut chain = vec![*from];
            for rank in (ranks[*from] + 1)..ranks[*to] {
                nodes.push(LayerNode {
                    vertex: None,
                    breadth: 0.0,
                    depth: 0.0,
                });
                ranks.push(rank);
                chain.push(nodes.len() - 1);
            }
            chain.push(*to);
            segments.extend(chain.windows(2).map(|w| (w[0], w[1])));
            chains.push(Chain {
                edge: *edge,
                reversed: *rev,
                nodes: chain,
            });
        }

        let layer_count = ranks.iter().copied().max().unwrap_or(0) + 1;
        let mut layers: Vec<Vec<usize>> = vec![Vec::new(); layer_count];
        for (node, rank) in ranks.iter().enumerate() {
            layers[*rank].push(node);
        }
        input.cancel.check()?;

        // Crossing reduction.
        let cancel = input.cancel;
        self.crossings = order_rank_nodes(
            &mut layers,
            &segments,
            nodes.len(),
            p.crossing_sweeps,
            || !cancel.is_cancelled(),
        );
        input.cancel.check()?;

        // Coordinates in the top-to-bottom frame.
        let centers = assign_coordinates(&layers, &nodes, &segments, &p);
        let mut layer_top = Vec::with_capacity(layer_count);
        let mut layer_depth = Vec::with_capacity(layer_count);
        let mut y = 0.0;
        for layer in &layers {
            let depth = layer.iter().map(|n| nodes[*n].depth).fold(0.0, f64::max);
            layer_top.push(y);
            layer_depth.push(depth);
            y += depth + p.layer_distance;
        }
        let node_center = |node: usize| {
            let rank = ranks[node];
            Point::new(centers[node], layer_top[rank] + layer_depth[rank] * 0.5)
        };

        let mut rects: Vec<Rect> = (0..set.len())
            .map(|slot| {
                let c = node_center(slot);
                let n = nodes[slot];
                Rect::new(c.x - n.breadth * 0.5, c.y - n.depth * 0.5, n.breadth, n.depth)
            })
            .collect();
        let mut routes: Vec<(EdgeId, Vec<Point>)> = chains
            .iter()
            .filter(|chain| chain.nodes.len() > 2)
            .map(|chain| {
                let mut points: Vec<Point> = chain.nodes.iter().map(|n| node_center(*n)).collect();
                if chain.reversed {
                    points.reverse();
                }
                (chain.edge, points)
            })
            .collect();

        // Normalise to the origin, then rotate into the requested direction.
        let bounds = bounding_box(rects.iter());
        let shift = Point::new(bounds.x, bounds.y) - Point::ORIGIN;
        for rect in rects.iter_mut() {
            *rect = rect.translate(-shift);
        }
        for (_, points) in routes.iter_mut() {
            for point in points.iter_mut() {
                *point -= shift;
            }
        }
        let bounds = bounds.translate(-shift);
        let mut route_points: Vec<&mut Point> =
            routes.iter_mut().flat_map(|(_, pts)| pts.iter_mut()).collect();
        orient(p.direction, bounds, &mut rects, &mut route_points);

        for (slot, rect) in rects.iter().enumerate() {
            if !set.fixed[slot] {
                positions.insert(set.ids[slot], rect.top_left());
            }
        }
        debug!(
            layers = layer_count,
            dummies = nodes.len() - set.len(),
            reversed = self.reversed.len(),
            crossings = self.crossings,
            "sugiyama finished"
        );
        Ok(routes.into_iter().collect())
    }
}

/// Marks the edges that close a cycle in an insertion-order DFS.
fn back_edges(n: usize, edges: &[(EdgeId, usize, usize)]) -> Vec<bool> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }
    let mut outgoing: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
    for (idx, (_, s, t)) in edges.iter().enumerate() {
        outgoing[*s].push((idx, *t));
    }
    let mut back = vec![false; edges.len()];
    let mut mark = vec![Mark::New; n];
    for root in 0..n {
        if mark[root] != Mark::New {
            continue;
        }
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        mark[root] = Mark::Active;
        while let Some(frame) = stack.last_mut() {
            let (v, cursor) = *frame;
            if let Some(&(edge, w)) = outgoing[v].get(cursor) {
                frame.1 += 1;
                match mark[w] {
                    Mark::New => {
                        mark[w] = Mark::Active;
                        stack.push((w, 0));
                    }
                    Mark::Active => back[edge] = true,
                    Mark::Done => {}
                }
            } else {
                mark[v] = Mark::Done;
                stack.pop();
            }
        }
    }
    back
}

/// Horizontal centres for every layered node. Starts from a packed layout and
/// runs median alignment passes that alternate between looking up and down;
/// each pass averages a left-biased and a right-biased placement, both of
/// which respect the minimum separation.
fn assign_coordinates(
    layers: &[Vec<usize>],
    nodes: &[LayerNode],
    segments: &[(usize, usize)],
    p: &SugiyamaParameters,
) -> Vec<f64> {
    let mut upper: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut lower: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for &(from, to) in segments {
        lower[from].push(to);
        upper[to].push(from);
    }

    let gap = |a: usize, b: usize| {
        let spacing = if nodes[a].vertex.is_none() && nodes[b].vertex.is_none() {
            p.vertex_distance * 0.5
        } else {
            p.vertex_distance
        };
        (nodes[a].breadth + nodes[b].breadth) * 0.5 + spacing
    };

    let mut center = vec![0.0; nodes.len()];
    let widest = layers
        .iter()
        .map(|layer| {
            layer
                .windows(2)
                .map(|w| gap(w[0], w[1]))
                .sum::<f64>()
        })
        .fold(0.0, f64::max);
    for layer in layers {
        let span: f64 = layer.windows(2).map(|w| gap(w[0], w[1])).sum();
        let mut x = (widest - span) * 0.5;
        for (idx, node) in layer.iter().enumerate() {
            if idx > 0 {
                x += gap(layer[idx - 1], *node);
            }
            center[*node] = x;
        }
    }

    for pass in 0..p.alignment_passes {
        let downward = pass % 2 == 0;
        let order: Vec<usize> = if downward {
            (1..layers.len()).collect()
        } else {
            (0..layers.len().saturating_sub(1)).rev().collect()
        };
        for rank in order {
            let layer = &layers[rank];
            let neighbors = if downward { &upper } else { &lower };
            let desired: Vec<f64> = layer
                .iter()
                .map(|node| {
                    let mut xs: Vec<f64> = neighbors[*node].iter().map(|n| center[*n]).collect();
                    if xs.is_empty() {
                        return center[*node];
                    }
                    xs.sort_by(|a, b| a.total_cmp(b));
                    let mid = xs.len() / 2;
                    if xs.len() % 2 == 1 {
                        xs[mid]
                    } else {
                        (xs[mid - 1] + xs[mid]) * 0.5
                    }
                })
                .collect();

            let mut left = desired.clone();
            for i in 1..layer.len() {
                left[i] = left[i].max(left[i - 1] + gap(layer[i - 1], layer[i]));
            }
            let mut right = desired;
            for i in (0..layer.len().saturating_sub(1)).rev() {
                right[i] = right[i].min(right[i + 1] - gap(layer[i], layer[i + 1]));
            }
            for (i, node) in layer.iter().enumerate() {
                center[*node] = (left[i] + right[i]) * 0.5;
            }
        }
    }
    center
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::config::LayoutDirection;
    use crate::geometry::{Size, Vector};
    use crate::ir::{Graph, Vertex, VertexId};
    use crate::layout::{VertexSizes, vertex_rects};

    fn graph_with(n: usize, edges: &[(usize, usize)]) -> (Graph, Vec<VertexId>, VertexSizes) {
        let mut graph = Graph::new();
        let mut sizes = VertexSizes::new();
        let ids: Vec<VertexId> = (0..n)
            .map(|i| {
                let id = graph.add_vertex(Vertex::new(format!("v{i}"))).unwrap();
                sizes.insert(id, Size::new(40.0, 20.0));
                id
            })
            .collect();
        for (s, t) in edges {
            graph.connect(ids[*s], ids[*t]).unwrap();
        }
        (graph, ids, sizes)
    }

    fn run(
        graph: &Graph,
        sizes: &VertexSizes,
        direction: LayoutDirection,
    ) -> (SugiyamaLayout, VertexPositions, EdgeRoutes) {
        let cancel = CancellationToken::new();
        let mut layout = SugiyamaLayout::new(SugiyamaParameters {
            direction,
            ..Default::default()
        });
        let mut positions = VertexPositions::new();
        let routes = layout
            .compute(&LayoutInput::new(graph, sizes, &cancel), &mut positions)
            .unwrap();
        (layout, positions, routes)
    }

    #[test]
    fn acyclic_graph_keeps_every_edge() {
        let (graph, ids, sizes) = graph_with(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let (layout, positions, _) = run(&graph, &sizes, LayoutDirection::TopToBottom);
        assert!(layout.reversed_edges().is_empty());
        for (_, edge) in graph.edges() {
            assert!(positions[&edge.source].y < positions[&edge.target].y);
        }
        assert!(positions[&ids[1]].x != positions[&ids[2]].x);
    }

    #[test]
    fn cycle_is_broken_and_routes_keep_direction() {
        let (graph, ids, sizes) = graph_with(3, &[(0, 1), (1, 2), (2, 0)]);
        let (layout, positions, routes) = run(&graph, &sizes, LayoutDirection::TopToBottom);
        assert_eq!(layout.reversed_edges().len(), 1);
        let reversed = *layout.reversed_edges().iter().next().unwrap();
        let edge = graph.edge(reversed).unwrap();
        assert_eq!((edge.source, edge.target), (ids[2], ids[0]));

        // 2 -> 0 spans two layers, so it is routed through a dummy and must
        // start at vertex 2 and end at vertex 0.
        let points = &routes[&reversed];
        assert_eq!(points.len(), 3);
        let center = |id: VertexId| positions[&id] + Vector::new(20.0, 10.0);
        assert!(points[0].distance(center(ids[2])) < 1e-9);
        assert!(points[2].distance(center(ids[0])) < 1e-9);
    }

    #[test]
    fn no_overlaps_within_layers() {
        let (graph, _, sizes) =
            graph_with(7, &[(0, 1), (0, 2), (0, 3), (1, 4), (2, 4), (3, 5), (0, 6), (6, 5)]);
        let (_, positions, _) = run(&graph, &sizes, LayoutDirection::TopToBottom);
        let rects: Vec<Rect> = vertex_rects(&graph, &positions, &sizes).into_values().collect();
        for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                assert!(!rects[i].intersects(&rects[j]), "{i} overlaps {j}");
            }
        }
    }

    #[test]
    fn directions_rotate_the_drawing() {
        let (graph, ids, sizes) = graph_with(2, &[(0, 1)]);
        let (_, down, _) = run(&graph, &sizes, LayoutDirection::TopToBottom);
        let (_, up, _) = run(&graph, &sizes, LayoutDirection::BottomToTop);
        let (_, right, _) = run(&graph, &sizes, LayoutDirection::LeftToRight);
        let (_, left, _) = run(&graph, &sizes, LayoutDirection::RightToLeft);
        assert!(down[&ids[0]].y < down[&ids[1]].y);
        assert!(up[&ids[0]].y > up[&ids[1]].y);
        assert!(right[&ids[0]].x < right[&ids[1]].x);
        assert!(left[&ids[0]].x > left[&ids[1]].x);
    }

    #[test]
    fn self_loops_are_ignored() {
        let (graph, ids, sizes) = graph_with(2, &[(0, 0), (0, 1)]);
        let (layout, positions, routes) = run(&graph, &sizes, LayoutDirection::TopToBottom);
        assert!(layout.reversed_edges().is_empty());
        assert!(routes.is_empty());
        assert!(positions[&ids[0]].is_finite());
    }

    #[test]
    fn back_edge_detection_follows_insertion_order() {
        let edges = [(EdgeId(0), 0, 1), (EdgeId(1), 1, 0), (EdgeId(2), 1, 2)];
        assert_eq!(back_edges(3, &edges), vec![false, true, false]);
    }
}
