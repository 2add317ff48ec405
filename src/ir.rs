use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::geometry::Point;

/// Sentinel for a vertex or edge id that has not been assigned yet.
pub const UNSET_ID: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// How the algorithms treat a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingOption {
    #[default]
    Default,
    /// Keeps its current position across recomputation.
    Freeze,
    /// Removed from every algorithm.
    Exclude,
}

/// Named anchor an edge endpoint can bind to, relative to the vertex box's
/// top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPoint {
    pub id: u32,
    pub offset: Point,
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: i64,
    pub name: String,
    pub processing: ProcessingOption,
    pub connection_points: Vec<ConnectionPoint>,
}

impl Vertex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UNSET_ID,
            name: name.into(),
            processing: ProcessingOption::Default,
            connection_points: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_processing(mut self, processing: ProcessingOption) -> Self {
        self.processing = processing;
        self
    }

    pub fn with_connection_point(mut self, id: u32, offset: Point) -> Self {
        self.connection_points.push(ConnectionPoint { id, offset });
        self
    }

    pub fn connection_point(&self, id: u32) -> Option<&ConnectionPoint> {
        self.connection_points.iter().find(|cp| cp.id == id)
    }

    pub fn is_excluded(&self) -> bool {
        self.processing == ProcessingOption::Exclude
    }

    pub fn is_frozen(&self) -> bool {
        self.processing == ProcessingOption::Freeze
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub id: i64,
    pub source: VertexId,
    pub target: VertexId,
    pub weight: f64,
    pub source_connection_point: Option<u32>,
    pub target_connection_point: Option<u32>,
    /// Polyline supplied by the host or a previous routing pass; `None` means
    /// a straight line.
    pub routing_points: Option<Vec<Point>>,
}

impl Edge {
    pub fn new(source: VertexId, target: VertexId) -> Self {
        Self {
            id: UNSET_ID,
            source,
            target,
            weight: 1.0,
            source_connection_point: None,
            target_connection_point: None,
            routing_points: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_connection_points(mut self, source: Option<u32>, target: Option<u32>) -> Self {
        self.source_connection_point = source;
        self.target_connection_point = target;
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Only valid once the edge has been inserted into a graph.
    pub fn key(&self) -> EdgeId {
        EdgeId(self.id.max(0) as u64)
    }
}

/// Directed multigraph. Vertices and edges iterate in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    vertex_slots: HashMap<VertexId, usize>,
    edge_slots: HashMap<EdgeId, usize>,
    next_vertex_id: u64,
    next_edge_id: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a vertex, assigning the next free id when `vertex.id` is unset.
    pub fn add_vertex(&mut self, mut vertex: Vertex) -> Result<VertexId, GraphError> {
        if vertex.id < 0 {
            while self.vertex_slots.contains_key(&VertexId(self.next_vertex_id)) {
                self.next_vertex_id += 1;
            }
            vertex.id = self.next_vertex_id as i64;
        }
        let key = VertexId(vertex.id as u64);
        if self.vertex_slots.contains_key(&key) {
            return Err(GraphError::DuplicateVertexId(vertex.id));
        }
        self.next_vertex_id = self.next_vertex_id.max(key.0 + 1);
        self.vertex_slots.insert(key, self.vertices.len());
        self.vertices.push(vertex);
        Ok(key)
    }

    pub fn add_edge(&mut self, mut edge: Edge) -> Result<EdgeId, GraphError> {
        for endpoint in [edge.source, edge.target] {
            if !self.vertex_slots.contains_key(&endpoint) {
                return Err(GraphError::UnknownVertex(endpoint));
            }
        }
        if edge.id < 0 {
            while self.edge_slots.contains_key(&EdgeId(self.next_edge_id)) {
                self.next_edge_id += 1;
            }
            edge.id = self.next_edge_id as i64;
        }
        let key = EdgeId(edge.id as u64);
        if self.edge_slots.contains_key(&key) {
            return Err(GraphError::DuplicateEdgeId(edge.id));
        }
        self.next_edge_id = self.next_edge_id.max(key.0 + 1);
        self.edge_slots.insert(key, self.edges.len());
        self.edges.push(edge);
        Ok(key)
    }

    /// Convenience for `add_edge(Edge::new(source, target))`.
    pub fn connect(&mut self, source: VertexId, target: VertexId) -> Result<EdgeId, GraphError> {
        self.add_edge(Edge::new(source, target))
    }

    /// Removes the vertex together with every incident edge.
    pub fn remove_vertex(&mut self, id: VertexId) -> Result<Vertex, GraphError> {
        let slot = *self
            .vertex_slots
            .get(&id)
            .ok_or(GraphError::UnknownVertex(id))?;
        let vertex = self.vertices.remove(slot);
        self.edges.retain(|e| e.source != id && e.target != id);
        self.reindex();
        Ok(vertex)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, GraphError> {
        let slot = *self.edge_slots.get(&id).ok_or(GraphError::UnknownEdge(id))?;
        let edge = self.edges.remove(slot);
        self.reindex();
        Ok(edge)
    }

    fn reindex(&mut self) {
        self.vertex_slots = self
            .vertices
            .iter()
            .enumerate()
            .map(|(idx, v)| (VertexId(v.id as u64), idx))
            .collect();
        self.edge_slots = self
            .edges
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.key(), idx))
            .collect();
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertex_slots.get(&id).map(|&slot| &self.vertices[slot])
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        let slot = *self.vertex_slots.get(&id)?;
        Some(&mut self.vertices[slot])
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_slots.get(&id).map(|&slot| &self.edges[slot])
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        let slot = *self.edge_slots.get(&id)?;
        Some(&mut self.edges[slot])
    }

    pub fn set_processing(
        &mut self,
        id: VertexId,
        processing: ProcessingOption,
    ) -> Result<(), GraphError> {
        let vertex = self.vertex_mut(id).ok_or(GraphError::UnknownVertex(id))?;
        vertex.processing = processing;
        Ok(())
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertex_slots.contains_key(&id)
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.vertices.iter().map(|v| (VertexId(v.id as u64), v))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter().map(|e| (e.key(), e))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn is_active(&self, id: VertexId) -> bool {
        self.vertex(id).is_some_and(|v| !v.is_excluded())
    }

    pub fn is_frozen(&self, id: VertexId) -> bool {
        self.vertex(id).is_some_and(|v| v.is_frozen())
    }

    /// Non-excluded vertices, insertion order.
    pub fn active_vertices(&self) -> Vec<VertexId> {
        self.vertices()
            .filter(|(_, v)| !v.is_excluded())
            .map(|(id, _)| id)
            .collect()
    }

    /// Edges whose endpoints are both active, insertion order.
    pub fn active_edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges()
            .filter(|(_, e)| self.is_active(e.source) && self.is_active(e.target))
    }

    pub fn out_edges(&self, id: VertexId) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges().filter(move |(_, e)| e.source == id)
    }

    pub fn in_edges(&self, id: VertexId) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges().filter(move |(_, e)| e.target == id)
    }

    pub fn out_degree(&self, id: VertexId) -> usize {
        self.out_edges(id).count()
    }

    pub fn in_degree(&self, id: VertexId) -> usize {
        self.in_edges(id).count()
    }

    /// Self-loops count twice, as in the usual undirected degree.
    pub fn degree(&self, id: VertexId) -> usize {
        self.in_degree(id) + self.out_degree(id)
    }

    /// Undirected adjacency over active vertices; self-loops and parallel
    /// edges collapse to one neighbour entry.
    pub fn undirected_adjacency(&self) -> HashMap<VertexId, Vec<VertexId>> {
        let mut adjacency: HashMap<VertexId, Vec<VertexId>> = self
            .active_vertices()
            .into_iter()
            .map(|id| (id, Vec::new()))
            .collect();
        for (_, edge) in self.active_edges() {
            if edge.is_self_loop() {
                continue;
            }
            for (from, to) in [(edge.source, edge.target), (edge.target, edge.source)] {
                if let Some(list) = adjacency.get_mut(&from)
                    && !list.contains(&to)
                {
                    list.push(to);
                }
            }
        }
        adjacency
    }

    /// Kahn ordering of active vertices ignoring self-loops. Ties resolve in
    /// insertion order.
    pub fn topological_order(&self) -> Result<Vec<VertexId>, GraphError> {
        let active = self.active_vertices();
        let mut indegree: HashMap<VertexId, usize> = active.iter().map(|&id| (id, 0)).collect();
        let mut outgoing: HashMap<VertexId, Vec<VertexId>> = HashMap::new();
        for (_, edge) in self.active_edges() {
            if edge.is_self_loop() {
                continue;
            }
            outgoing.entry(edge.source).or_default().push(edge.target);
            if let Some(deg) = indegree.get_mut(&edge.target) {
                *deg += 1;
            }
        }
        let mut ready: VecDeque<VertexId> = active
            .iter()
            .copied()
            .filter(|id| indegree.get(id).copied().unwrap_or(0) == 0)
            .collect();
        let mut order = Vec::with_capacity(active.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            for next in outgoing.get(&id).map(|v| v.as_slice()).unwrap_or(&[]) {
                if let Some(deg) = indegree.get_mut(next) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push_back(*next);
                    }
                }
            }
        }
        if order.len() < active.len() {
            let stuck = active
                .iter()
                .copied()
                .find(|id| indegree.get(id).copied().unwrap_or(0) > 0)
                .unwrap_or(active[0]);
            return Err(GraphError::Cycle(stuck));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> (Graph, Vec<VertexId>) {
        let mut graph = Graph::new();
        let ids: Vec<VertexId> = (0..n)
            .map(|i| graph.add_vertex(Vertex::new(format!("n{i}"))).unwrap())
            .collect();
        for pair in ids.windows(2) {
            graph.connect(pair[0], pair[1]).unwrap();
        }
        (graph, ids)
    }

    #[test]
    fn auto_assigns_ids_and_rejects_duplicates() {
        let mut graph = Graph::new();
        let a = graph.add_vertex(Vertex::new("a").with_id(5)).unwrap();
        let b = graph.add_vertex(Vertex::new("b")).unwrap();
        assert_eq!(a, VertexId(5));
        assert_eq!(b, VertexId(6));
        assert_eq!(
            graph.add_vertex(Vertex::new("c").with_id(5)).unwrap_err(),
            GraphError::DuplicateVertexId(5)
        );
    }

    #[test]
    fn edges_need_known_endpoints() {
        let mut graph = Graph::new();
        let a = graph.add_vertex(Vertex::new("a")).unwrap();
        assert_eq!(
            graph.connect(a, VertexId(99)).unwrap_err(),
            GraphError::UnknownVertex(VertexId(99))
        );
    }

    #[test]
    fn degree_queries_and_removal() {
        let (mut graph, ids) = chain(3);
        graph.connect(ids[1], ids[1]).unwrap();
        assert_eq!(graph.in_degree(ids[1]), 2);
        assert_eq!(graph.out_degree(ids[1]), 2);
        assert_eq!(graph.degree(ids[1]), 4);
        graph.remove_vertex(ids[1]).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.vertex_count(), 2);
        assert!(graph.vertex(ids[2]).is_some());
    }

    #[test]
    fn insertion_order_is_stable() {
        let mut graph = Graph::new();
        let c = graph.add_vertex(Vertex::new("c").with_id(30)).unwrap();
        let a = graph.add_vertex(Vertex::new("a").with_id(10)).unwrap();
        let b = graph.add_vertex(Vertex::new("b").with_id(20)).unwrap();
        let order: Vec<VertexId> = graph.vertices().map(|(id, _)| id).collect();
        assert_eq!(order, vec![c, a, b]);
    }

    #[test]
    fn excluded_vertices_drop_out_of_active_sets() {
        let (mut graph, ids) = chain(3);
        graph.set_processing(ids[2], ProcessingOption::Exclude).unwrap();
        assert_eq!(graph.active_vertices(), vec![ids[0], ids[1]]);
        assert_eq!(graph.active_edges().count(), 1);
    }

    #[test]
    fn topological_order_reports_cycles() {
        let (mut graph, ids) = chain(3);
        assert_eq!(graph.topological_order().unwrap(), ids);
        graph.connect(ids[2], ids[0]).unwrap();
        assert!(matches!(
            graph.topological_order(),
            Err(GraphError::Cycle(_))
        ));
    }

    #[test]
    fn self_loop_is_computed() {
        let mut graph = Graph::new();
        let a = graph.add_vertex(Vertex::new("a")).unwrap();
        let e = graph.connect(a, a).unwrap();
        assert!(graph.edge(e).unwrap().is_self_loop());
        assert!(graph.topological_order().is_ok());
    }
}
