use std::collections::{BTreeMap, HashMap};

use crate::cancel::CancellationToken;
use crate::error::LayoutError;
use crate::geometry::{Point, Rect, Size};
use crate::ir::{EdgeId, Graph, VertexId};

/// Top-left corner of every positioned vertex box.
pub type VertexPositions = BTreeMap<VertexId, Point>;
pub type VertexSizes = BTreeMap<VertexId, Size>;
/// Full polyline per edge, source anchor first. Absent entries are straight
/// lines.
pub type EdgeRoutes = BTreeMap<EdgeId, Vec<Point>>;

/// Read-only inputs shared by every layout algorithm.
#[derive(Clone, Copy)]
pub struct LayoutInput<'a> {
    pub graph: &'a Graph,
    pub sizes: &'a VertexSizes,
    pub cancel: &'a CancellationToken,
}

impl<'a> LayoutInput<'a> {
    pub fn new(graph: &'a Graph, sizes: &'a VertexSizes, cancel: &'a CancellationToken) -> Self {
        Self {
            graph,
            sizes,
            cancel,
        }
    }

    pub fn size_of(&self, id: VertexId) -> Size {
        self.sizes.get(&id).copied().unwrap_or(Size::ZERO)
    }
}

/// Dense view of the active vertices so iterative solvers can work on plain
/// arrays. Slot order follows graph insertion order.
#[derive(Debug, Clone)]
pub(crate) struct ActiveSet {
    pub(crate) ids: Vec<VertexId>,
    pub(crate) fixed: Vec<bool>,
    slots: HashMap<VertexId, usize>,
}

/// Edge between two active slots; self-loops are dropped.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotEdge {
    pub(crate) source: usize,
    pub(crate) target: usize,
    pub(crate) weight: f64,
}

impl ActiveSet {
    pub(crate) fn new(graph: &Graph) -> Self {
        let ids = graph.active_vertices();
        let fixed = ids.iter().map(|&id| graph.is_frozen(id)).collect();
        let slots = ids.iter().enumerate().map(|(idx, &id)| (id, idx)).collect();
        Self { ids, fixed, slots }
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub(crate) fn slot(&self, id: VertexId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    pub(crate) fn free_count(&self) -> usize {
        self.fixed.iter().filter(|f| !**f).count()
    }

    pub(crate) fn edges(&self, graph: &Graph) -> Vec<SlotEdge> {
        graph
            .active_edges()
            .filter(|(_, e)| !e.is_self_loop())
            .filter_map(|(_, e)| {
                Some(SlotEdge {
                    source: self.slot(e.source)?,
                    target: self.slot(e.target)?,
                    weight: e.weight,
                })
            })
            .collect()
    }

    /// Undirected neighbour lists, parallel edges collapsed.
    pub(crate) fn neighbors(&self, graph: &Graph) -> Vec<Vec<usize>> {
        let mut neighbors = vec![Vec::new(); self.len()];
        for edge in self.edges(graph) {
            if !neighbors[edge.source].contains(&edge.target) {
                neighbors[edge.source].push(edge.target);
            }
            if !neighbors[edge.target].contains(&edge.source) {
                neighbors[edge.target].push(edge.source);
            }
        }
        neighbors
    }

    /// Current positions as an array; slots without an entry get `fallback`.
    pub(crate) fn gather(
        &self,
        positions: &VertexPositions,
        mut fallback: impl FnMut(usize) -> Point,
    ) -> Vec<Point> {
        self.ids
            .iter()
            .enumerate()
            .map(|(idx, id)| positions.get(id).copied().unwrap_or_else(|| fallback(idx)))
            .collect()
    }

    /// Writes every free slot back into `positions`.
    pub(crate) fn commit(&self, working: &[Point], positions: &mut VertexPositions) {
        for (idx, id) in self.ids.iter().enumerate() {
            if !self.fixed[idx] {
                positions.insert(*id, working[idx]);
            }
        }
    }

    /// Iteration boundary. On cancellation `working` holds the last finished
    /// iteration and is committed before bailing out.
    pub(crate) fn checkpoint(
        &self,
        cancel: &CancellationToken,
        working: &[Point],
        positions: &mut VertexPositions,
    ) -> Result<(), LayoutError> {
        if cancel.is_cancelled() {
            self.commit(working, positions);
            return Err(LayoutError::Cancelled);
        }
        Ok(())
    }
}

/// Frozen vertices keep their coordinate; those without one are pinned to the
/// origin so the map stays total over active vertices.
pub(crate) fn pin_frozen_vertices(graph: &Graph, positions: &mut VertexPositions) {
    for id in graph.active_vertices() {
        if graph.is_frozen(id) {
            positions.entry(id).or_insert(Point::ORIGIN);
        }
    }
}

/// Boxes of every active vertex that has both a position and a size.
pub fn vertex_rects(
    graph: &Graph,
    positions: &VertexPositions,
    sizes: &VertexSizes,
) -> BTreeMap<VertexId, Rect> {
    graph
        .active_vertices()
        .into_iter()
        .filter_map(|id| {
            let position = positions.get(&id)?;
            let size = sizes.get(&id).copied().unwrap_or(Size::ZERO);
            Some((id, Rect::from_position(*position, size)))
        })
        .collect()
}

pub fn bounding_box<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Rect {
    rects
        .into_iter()
        .fold(Rect::EMPTY, |acc, rect| acc.union(rect))
}
