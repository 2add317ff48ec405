use std::collections::VecDeque;

use tracing::debug;

use super::types::ActiveSet;
use super::{
    EdgeRoutes, LayoutAlgorithm, LayoutInput, VertexPositions, bounding_box, orient, prepare,
};
use crate::config::{LayoutKind, SpanningTreeGeneration, TreeParameters};
use crate::error::LayoutError;
use crate::geometry::Rect;

/// Layered tree drawing over a BFS or DFS spanning forest. Subtree widths
/// are computed bottom-up and each parent is centred over its children.
#[derive(Debug, Clone, Default)]
pub struct TreeLayout {
    parameters: TreeParameters,
}

impl TreeLayout {
    pub fn new(parameters: TreeParameters) -> Self {
        Self { parameters }
    }
}

struct Forest {
    roots: Vec<usize>,
    /// Every vertex once, each parent ahead of its children.
    order: Vec<usize>,
    children: Vec<Vec<usize>>,
    depth: Vec<usize>,
}

impl LayoutAlgorithm for TreeLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Tree
    }

    fn needs_vertex_sizes(&self) -> bool {
        true
    }

    fn compute(
        &mut self,
        input: &LayoutInput<'_>,
        positions: &mut VertexPositions,
    ) -> Result<EdgeRoutes, LayoutError> {
        if !prepare(input, positions, true)? {
            return Ok(EdgeRoutes::new());
        }
        let p = &self.parameters;
        let set = ActiveSet::new(input.graph);
        let horizontal = p.direction.is_horizontal();
        let (breadth, extent): (Vec<f64>, Vec<f64>) = set
            .ids
            .iter()
            .map(|id| {
                let size = input.size_of(*id);
                if horizontal {
                    (size.height, size.width)
                } else {
                    (size.width, size.height)
                }
            })
            .unzip();

        let forest = spanning_forest(&set, input, p.spanning_tree);
        input.cancel.check()?;

        let max_depth = forest.depth.iter().copied().max().unwrap_or(0);
        let mut layer_extent = vec![0.0f64; max_depth + 1];
        for (v, d) in forest.depth.iter().enumerate() {
            layer_extent[*d] = layer_extent[*d].max(extent[v]);
        }
        let mut layer_top = Vec::with_capacity(layer_extent.len());
        let mut y = 0.0;
        for e in &layer_extent {
            layer_top.push(y);
            y += e + p.layer_gap;
        }

        let width = subtree_widths(&forest, &breadth, p.vertex_gap);
        input.cancel.check()?;
        let center = place(&forest, &width, p.vertex_gap);

        let mut rects: Vec<Rect> = (0..set.len())
            .map(|v| {
                let d = forest.depth[v];
                Rect::new(
                    center[v] - breadth[v] * 0.5,
                    layer_top[d] + (layer_extent[d] - extent[v]) * 0.5,
                    breadth[v],
                    extent[v],
                )
            })
            .collect();
        let bounds = bounding_box(rects.iter());
        orient(p.direction, bounds, &mut rects, &mut []);

        for (slot, rect) in rects.iter().enumerate() {
            if !set.fixed[slot] {
                positions.insert(set.ids[slot], rect.top_left());
            }
        }
        debug!(
            roots = forest.roots.len(),
            depth = max_depth,
            "tree layout finished"
        );
        Ok(EdgeRoutes::new())
    }
}

/// Roots are vertices without incoming edges, in insertion order; anything
/// left unreached (cycles) seeds a further tree.
fn spanning_forest(
    set: &ActiveSet,
    input: &LayoutInput<'_>,
    strategy: SpanningTreeGeneration,
) -> Forest {
    let n = set.len();
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut has_incoming = vec![false; n];
    for edge in set.edges(input.graph) {
        outgoing[edge.source].push(edge.target);
        has_incoming[edge.target] = true;
    }

    let mut candidates: Vec<usize> = (0..n).filter(|v| !has_incoming[*v]).collect();
    candidates.extend((0..n).filter(|v| has_incoming[*v]));

    let mut forest = Forest {
        roots: Vec::new(),
        order: Vec::with_capacity(n),
        children: vec![Vec::new(); n],
        depth: vec![0; n],
    };
    let mut seen = vec![false; n];
    for root in candidates {
        if seen[root] {
            continue;
        }
        seen[root] = true;
        forest.roots.push(root);
        forest.order.push(root);
        match strategy {
            SpanningTreeGeneration::Bfs => {
                let mut queue = VecDeque::from([root]);
                while let Some(v) = queue.pop_front() {
                    for &w in &outgoing[v] {
                        if !seen[w] {
                            seen[w] = true;
                            forest.children[v].push(w);
                            forest.depth[w] = forest.depth[v] + 1;
                            forest.order.push(w);
                            queue.push_back(w);
                        }
                    }
                }
            }
            SpanningTreeGeneration::Dfs => {
                let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
                while let Some(frame) = stack.last_mut() {
                    let (v, cursor) = *frame;
                    if let Some(&w) = outgoing[v].get(cursor) {
                        frame.1 += 1;
                        if !seen[w] {
                            seen[w] = true;
                            forest.children[v].push(w);
                            forest.depth[w] = forest.depth[v] + 1;
                            forest.order.push(w);
                            stack.push((w, 0));
                        }
                    } else {
                        stack.pop();
                    }
                }
            }
        }
    }
    forest
}

fn children_span(kids: &[usize], width: &[f64], gap: f64) -> f64 {
    if kids.is_empty() {
        return 0.0;
    }
    kids.iter().map(|c| width[*c]).sum::<f64>() + gap * (kids.len() - 1) as f64
}

/// Bottom-up subtree widths, walking the visit order backwards so every
/// child is finished before its parent.
fn subtree_widths(forest: &Forest, breadth: &[f64], gap: f64) -> Vec<f64> {
    let mut width = vec![0.0f64; breadth.len()];
    for &v in forest.order.iter().rev() {
        width[v] = breadth[v].max(children_span(&forest.children[v], &width, gap));
    }
    width
}

/// Centre coordinate of every vertex along the breadth axis. Left edges
/// flow down the visit order; centres come back up it.
fn place(forest: &Forest, width: &[f64], gap: f64) -> Vec<f64> {
    let mut left = vec![0.0f64; width.len()];
    let mut cursor = 0.0;
    for &root in &forest.roots {
        left[root] = cursor;
        cursor += width[root] + gap;
    }
    for &v in &forest.order {
        let kids = &forest.children[v];
        let mut next = left[v] + (width[v] - children_span(kids, width, gap)) * 0.5;
        for &child in kids {
            left[child] = next;
            next += width[child] + gap;
        }
    }

    let mut center = vec![0.0f64; width.len()];
    for &v in forest.order.iter().rev() {
        center[v] = match forest.children[v].as_slice() {
            [] => left[v] + width[v] * 0.5,
            [first, .., last] => (center[*first] + center[*last]) * 0.5,
            [only] => center[*only],
        };
    }
    center
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::config::LayoutDirection;
    use crate::geometry::Size;
    use crate::ir::{Graph, Vertex, VertexId};
    use crate::layout::{VertexSizes, vertex_rects};

    fn build(n: usize, edges: &[(usize, usize)]) -> (Graph, Vec<VertexId>, VertexSizes) {
        let mut graph = Graph::new();
        let mut sizes = VertexSizes::new();
        let ids: Vec<VertexId> = (0..n)
            .map(|i| {
                let id = graph.add_vertex(Vertex::new(format!("v{i}"))).unwrap();
                sizes.insert(id, Size::new(30.0, 10.0));
                id
            })
            .collect();
        for (s, t) in edges {
            graph.connect(ids[*s], ids[*t]).unwrap();
        }
        (graph, ids, sizes)
    }

    fn run(graph: &Graph, sizes: &VertexSizes, parameters: TreeParameters) -> VertexPositions {
        let cancel = CancellationToken::new();
        let mut positions = VertexPositions::new();
        TreeLayout::new(parameters)
            .compute(&LayoutInput::new(graph, sizes, &cancel), &mut positions)
            .unwrap();
        positions
    }

    #[test]
    fn parent_is_centred_over_children() {
        let (graph, ids, sizes) = build(4, &[(0, 1), (0, 2), (0, 3)]);
        let positions = run(&graph, &sizes, TreeParameters::default());
        let root = positions[&ids[0]];
        let first = positions[&ids[1]];
        let last = positions[&ids[3]];
        assert!((root.x - (first.x + last.x) * 0.5).abs() < 1e-9);
        assert!(root.y < first.y);
        assert_eq!(first.y, last.y);
    }

    #[test]
    fn forest_trees_sit_side_by_side() {
        let (graph, ids, sizes) = build(4, &[(0, 1), (2, 3)]);
        let positions = run(&graph, &sizes, TreeParameters::default());
        assert!(positions[&ids[2]].x >= positions[&ids[0]].x + 30.0);
        let rects: Vec<Rect> = vertex_rects(&graph, &positions, &sizes).into_values().collect();
        for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                assert!(!rects[i].intersects(&rects[j]));
            }
        }
    }

    #[test]
    fn cycle_without_roots_starts_at_first_vertex() {
        let (graph, ids, sizes) = build(3, &[(0, 1), (1, 2), (2, 0)]);
        let positions = run(&graph, &sizes, TreeParameters::default());
        assert!(positions[&ids[0]].y < positions[&ids[1]].y);
        assert!(positions[&ids[1]].y < positions[&ids[2]].y);
    }

    #[test]
    fn dfs_and_bfs_pick_different_parents() {
        // 0 -> 1 -> 3 and 0 -> 3: BFS hangs 3 off the root, DFS off 1.
        let (graph, ids, sizes) = build(4, &[(0, 1), (1, 3), (0, 3), (0, 2)]);
        let bfs = run(&graph, &sizes, TreeParameters::default());
        let dfs = run(
            &graph,
            &sizes,
            TreeParameters {
                spanning_tree: SpanningTreeGeneration::Dfs,
                ..Default::default()
            },
        );
        assert_eq!(bfs[&ids[3]].y, bfs[&ids[1]].y);
        assert!(dfs[&ids[3]].y > dfs[&ids[1]].y);
    }

    #[test]
    fn long_chain_is_laid_out_without_recursion() {
        let n = 20_000;
        let edges: Vec<(usize, usize)> = (1..n).map(|i| (i - 1, i)).collect();
        let (graph, ids, sizes) = build(n, &edges);
        let positions = run(&graph, &sizes, TreeParameters::default());
        assert_eq!(positions.len(), n);
        assert!(positions.values().all(|p| p.is_finite()));
        assert_eq!(positions[&ids[0]].x, positions[&ids[n - 1]].x);
        assert!(positions[&ids[n - 2]].y < positions[&ids[n - 1]].y);
    }

    #[test]
    fn left_to_right_grows_along_x() {
        let (graph, ids, sizes) = build(2, &[(0, 1)]);
        let positions = run(
            &graph,
            &sizes,
            TreeParameters {
                direction: LayoutDirection::LeftToRight,
                ..Default::default()
            },
        );
        assert!(positions[&ids[0]].x + 30.0 <= positions[&ids[1]].x);
    }
}
