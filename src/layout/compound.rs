use std::collections::BTreeMap;

use tracing::debug;

use super::{
    EdgeRoutes, LayoutAlgorithm, LayoutInput, VertexPositions, VertexSizes, bounding_box,
    create_layout_algorithm, prepare, vertex_rects,
};
use crate::cancel::CancellationToken;
use crate::config::{CompoundParameters, LayoutKind, LayoutParameters};
use crate::error::LayoutError;
use crate::geometry::{Point, Size, Vector};
use crate::ir::{Graph, VertexId};

/// Graph nested inside a compound vertex, laid out with its own algorithm.
#[derive(Debug, Clone)]
pub struct CompoundGraph {
    pub graph: Graph,
    pub sizes: VertexSizes,
    pub layout: LayoutKind,
    pub parameters: Option<LayoutParameters>,
    pub children: BTreeMap<VertexId, CompoundGraph>,
}

impl CompoundGraph {
    pub fn new(graph: Graph, sizes: VertexSizes, layout: LayoutKind) -> Self {
        Self {
            graph,
            sizes,
            layout,
            parameters: None,
            children: BTreeMap::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: LayoutParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_child(mut self, vertex: VertexId, child: CompoundGraph) -> Self {
        self.children.insert(vertex, child);
        self
    }
}

/// Inner layout of one compound vertex in absolute coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundResult {
    pub positions: VertexPositions,
    /// Sizes the inner layout ran with, including nested compound vertices.
    pub sizes: VertexSizes,
    pub routes: EdgeRoutes,
    pub children: BTreeMap<VertexId, CompoundResult>,
}

impl CompoundResult {
    fn translate(&mut self, offset: Vector) {
        for p in self.positions.values_mut() {
            *p += offset;
        }
        for points in self.routes.values_mut() {
            for p in points.iter_mut() {
                *p += offset;
            }
        }
        for child in self.children.values_mut() {
            child.translate(offset);
        }
    }
}

/// Lays out every nested graph bottom-up, sizes each compound vertex to its
/// padded inner bounding box, then runs the outer algorithm.
#[derive(Debug, Clone)]
pub struct CompoundLayout {
    outer: LayoutKind,
    parameters: Option<LayoutParameters>,
    padding: CompoundParameters,
    children: BTreeMap<VertexId, CompoundGraph>,
    inner: BTreeMap<VertexId, CompoundResult>,
    sizes: VertexSizes,
}

impl CompoundLayout {
    pub fn new(
        outer: LayoutKind,
        parameters: Option<LayoutParameters>,
        padding: CompoundParameters,
    ) -> Self {
        Self {
            outer,
            parameters,
            padding,
            children: BTreeMap::new(),
            inner: BTreeMap::new(),
            sizes: VertexSizes::new(),
        }
    }

    pub fn with_child(mut self, vertex: VertexId, child: CompoundGraph) -> Self {
        self.children.insert(vertex, child);
        self
    }

    /// Inner layouts from the last run, keyed by compound vertex.
    pub fn inner_layouts(&self) -> &BTreeMap<VertexId, CompoundResult> {
        &self.inner
    }

    /// Sizes handed to the outer algorithm in the last run.
    pub fn effective_sizes(&self) -> &VertexSizes {
        &self.sizes
    }

    /// Lays out `nested` and returns its result relative to the padded box
    /// together with that box's size.
    fn nested(
        &self,
        nested: &CompoundGraph,
        cancel: &CancellationToken,
    ) -> Result<(CompoundResult, Size), LayoutError> {
        let mut layout = CompoundLayout::new(nested.layout, nested.parameters.clone(), self.padding.clone());
        layout.children = nested.children.clone();
        let mut positions = VertexPositions::new();
        let routes = layout.compute(
            &LayoutInput::new(&nested.graph, &nested.sizes, cancel),
            &mut positions,
        )?;

        let pad = self.padding.padding;
        let rects = vertex_rects(&nested.graph, &positions, &layout.sizes);
        let bounds = bounding_box(rects.values());
        let (offset, size) = if bounds.is_empty() {
            (Vector::ZERO, Size::new(pad.horizontal(), pad.vertical()))
        } else {
            let padded = bounds.inflate_by(pad);
            (Point::ORIGIN - padded.top_left(), padded.size())
        };

        let mut result = CompoundResult {
            positions: positions
                .into_iter()
                .filter(|(id, _)| nested.graph.is_active(*id))
                .collect(),
            sizes: layout.sizes,
            routes,
            children: layout.inner,
        };
        result.translate(offset);
        Ok((result, size))
    }
}

impl LayoutAlgorithm for CompoundLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Compound
    }

    fn needs_vertex_sizes(&self) -> bool {
        true
    }

    fn compute(
        &mut self,
        input: &LayoutInput<'_>,
        positions: &mut VertexPositions,
    ) -> Result<EdgeRoutes, LayoutError> {
        self.inner.clear();
        self.sizes = input.sizes.clone();
        if !prepare(input, positions, false)? {
            return Ok(EdgeRoutes::new());
        }

        let mut inner = BTreeMap::new();
        for (vertex, nested) in &self.children {
            if !input.graph.is_active(*vertex) {
                continue;
            }
            input.cancel.check()?;
            let (result, size) = self.nested(nested, input.cancel)?;
            self.sizes.insert(*vertex, size);
            inner.insert(*vertex, result);
        }

        let mut outer = create_layout_algorithm(self.outer, self.parameters.clone())?;
        let routes = outer.compute(
            &LayoutInput::new(input.graph, &self.sizes, input.cancel),
            positions,
        )?;

        for (vertex, result) in inner.iter_mut() {
            if let Some(origin) = positions.get(vertex) {
                result.translate(*origin - Point::ORIGIN);
            }
        }
        debug!(compounds = inner.len(), "compound layout finished");
        self.inner = inner;
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SugiyamaParameters;
    use crate::geometry::{Rect, Thickness};
    use crate::ir::Vertex;

    fn chain(names: &[&str], size: Size) -> (Graph, Vec<VertexId>, VertexSizes) {
        let mut graph = Graph::new();
        let mut sizes = VertexSizes::new();
        let ids: Vec<VertexId> = names
            .iter()
            .map(|n| {
                let id = graph.add_vertex(Vertex::new(*n)).unwrap();
                sizes.insert(id, size);
                id
            })
            .collect();
        for pair in ids.windows(2) {
            graph.connect(pair[0], pair[1]).unwrap();
        }
        (graph, ids, sizes)
    }

    #[test]
    fn compound_vertex_wraps_its_inner_graph() {
        let (inner_graph, inner_ids, inner_sizes) = chain(&["a", "b"], Size::new(20.0, 10.0));
        let (outer_graph, outer_ids, mut outer_sizes) = chain(&["group", "tail"], Size::new(30.0, 30.0));
        outer_sizes.remove(&outer_ids[0]);

        let nested = CompoundGraph::new(inner_graph, inner_sizes, LayoutKind::EfficientSugiyama);
        let mut layout = CompoundLayout::new(
            LayoutKind::EfficientSugiyama,
            Some(LayoutParameters::Sugiyama(SugiyamaParameters::default())),
            CompoundParameters {
                padding: Thickness::uniform(5.0),
            },
        )
        .with_child(outer_ids[0], nested);

        let cancel = CancellationToken::new();
        let mut positions = VertexPositions::new();
        layout
            .compute(&LayoutInput::new(&outer_graph, &outer_sizes, &cancel), &mut positions)
            .unwrap();

        // Two 20x10 boxes stacked with the default 15 layer gap, padded by 5.
        let group_size = layout.effective_sizes()[&outer_ids[0]];
        assert!((group_size.width - 30.0).abs() < 1e-9);
        assert!((group_size.height - 45.0).abs() < 1e-9);

        let group = Rect::from_position(positions[&outer_ids[0]], group_size);
        let result = &layout.inner_layouts()[&outer_ids[0]];
        for id in &inner_ids {
            let rect = Rect::from_position(result.positions[id], Size::new(20.0, 10.0));
            assert!(rect.left() >= group.left() - 1e-9 && rect.right() <= group.right() + 1e-9);
            assert!(rect.top() >= group.top() - 1e-9 && rect.bottom() <= group.bottom() + 1e-9);
        }
    }

    #[test]
    fn empty_inner_graph_is_just_padding() {
        let (outer_graph, outer_ids, mut outer_sizes) = chain(&["group"], Size::ZERO);
        outer_sizes.clear();
        let nested = CompoundGraph::new(Graph::new(), VertexSizes::new(), LayoutKind::Circular);
        let mut layout = CompoundLayout::new(LayoutKind::Circular, None, CompoundParameters::default())
            .with_child(outer_ids[0], nested);
        let cancel = CancellationToken::new();
        let mut positions = VertexPositions::new();
        layout
            .compute(&LayoutInput::new(&outer_graph, &outer_sizes, &cancel), &mut positions)
            .unwrap();
        assert_eq!(layout.effective_sizes()[&outer_ids[0]], Size::new(20.0, 20.0));
        assert!(layout.inner_layouts()[&outer_ids[0]].positions.is_empty());
    }
}
