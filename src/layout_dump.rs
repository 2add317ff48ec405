use crate::geometry::{Point, Rect, Size};
use crate::ir::{Edge, Graph, ProcessingOption, Vertex, VertexId};
use crate::layout::{EdgeRoutes, VertexPositions, VertexSizes, bounding_box, vertex_rects};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// JSON graph description read by the CLI and the fixture tests. Edges
/// refer to vertices by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphDocument {
    pub vertices: Vec<VertexDocument>,
    pub edges: Vec<EdgeDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VertexDocument {
    pub name: String,
    pub width: f64,
    pub height: f64,
    /// Starting position; required for frozen vertices to stay put.
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub processing: ProcessingOption,
    pub connection_points: Vec<ConnectionPointDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionPointDocument {
    pub id: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDocument {
    pub source: String,
    pub target: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub source_connection_point: Option<u32>,
    #[serde(default)]
    pub target_connection_point: Option<u32>,
}

fn default_weight() -> f64 {
    1.0
}

/// Graph plus the size and starting-position maps a pipeline run needs.
#[derive(Debug, Clone, Default)]
pub struct LoadedGraph {
    pub graph: Graph,
    pub sizes: VertexSizes,
    pub positions: VertexPositions,
    pub names: HashMap<String, VertexId>,
}

impl GraphDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid graph document")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn build(&self) -> Result<LoadedGraph> {
        let mut loaded = LoadedGraph::default();
        for doc in &self.vertices {
            if loaded.names.contains_key(&doc.name) {
                return Err(anyhow!("duplicate vertex name '{}'", doc.name));
            }
            let mut vertex = Vertex::new(doc.name.clone()).with_processing(doc.processing);
            for cp in &doc.connection_points {
                vertex = vertex.with_connection_point(cp.id, Point::new(cp.x, cp.y));
            }
            let id = loaded.graph.add_vertex(vertex)?;
            loaded.names.insert(doc.name.clone(), id);
            loaded.sizes.insert(id, Size::new(doc.width, doc.height));
            if let (Some(x), Some(y)) = (doc.x, doc.y) {
                loaded.positions.insert(id, Point::new(x, y));
            }
        }
        for doc in &self.edges {
            let lookup = |name: &str| {
                loaded
                    .names
                    .get(name)
                    .copied()
                    .ok_or_else(|| anyhow!("edge refers to unknown vertex '{name}'"))
            };
            let edge = Edge::new(lookup(&doc.source)?, lookup(&doc.target)?)
                .with_weight(doc.weight)
                .with_connection_points(doc.source_connection_point, doc.target_connection_point);
            loaded.graph.add_edge(edge)?;
        }
        Ok(loaded)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub layout: String,
    pub width: f64,
    pub height: f64,
    pub vertices: Vec<VertexDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct VertexDump {
    pub id: u64,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: u64,
    pub source: String,
    pub target: String,
    /// Absent for straight edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<[f64; 2]>>,
}

impl LayoutDump {
    pub fn from_layout(
        layout: &str,
        graph: &Graph,
        positions: &VertexPositions,
        sizes: &VertexSizes,
        routes: &EdgeRoutes,
    ) -> Self {
        let rects = vertex_rects(graph, positions, sizes);
        let vertices: Vec<VertexDump> = graph
            .vertices()
            .filter_map(|(id, vertex)| {
                let rect = rects.get(&id)?;
                Some(VertexDump {
                    id: id.0,
                    name: vertex.name.clone(),
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                })
            })
            .collect();

        let name_of = |id: VertexId| {
            graph
                .vertex(id)
                .map(|v| v.name.clone())
                .unwrap_or_default()
        };
        let edges = graph
            .active_edges()
            .map(|(id, edge)| EdgeDump {
                id: id.0,
                source: name_of(edge.source),
                target: name_of(edge.target),
                points: routes
                    .get(&id)
                    .map(|points| points.iter().map(|p| [p.x, p.y]).collect()),
            })
            .collect();

        let mut bounds = bounding_box(rects.values());
        for point in routes.values().flatten() {
            bounds = bounds.union(&Rect::new(point.x, point.y, 0.0, 0.0));
        }
        let (width, height) = if bounds.is_empty() {
            (0.0, 0.0)
        } else {
            (bounds.right().max(0.0), bounds.bottom().max(0.0))
        };

        LayoutDump {
            layout: layout.to_string(),
            width,
            height,
            vertices,
            edges,
        }
    }
}

/// Writes pretty JSON to `path`, or stdout when `path` is `None`.
pub fn write_layout_dump(path: Option<&Path>, dump: &LayoutDump) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, dump)?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "vertices": [
            { "name": "a", "width": 20, "height": 10, "x": 5, "y": 5, "processing": "freeze",
              "connectionPoints": [{ "id": 1, "x": 20, "y": 5 }] },
            { "name": "b", "width": 20, "height": 10 }
        ],
        "edges": [{ "source": "a", "target": "b", "sourceConnectionPoint": 1 }]
    }"#;

    #[test]
    fn document_builds_graph_and_maps() {
        let loaded = GraphDocument::from_json(DOC).unwrap().build().unwrap();
        let a = loaded.names["a"];
        let b = loaded.names["b"];
        assert_eq!(loaded.graph.vertex_count(), 2);
        assert!(loaded.graph.is_frozen(a));
        assert_eq!(loaded.sizes[&b], Size::new(20.0, 10.0));
        assert_eq!(loaded.positions.get(&a), Some(&Point::new(5.0, 5.0)));
        assert!(!loaded.positions.contains_key(&b));
        let (_, edge) = loaded.graph.edges().next().unwrap();
        assert_eq!(edge.weight, 1.0);
        assert_eq!(edge.source_connection_point, Some(1));
    }

    #[test]
    fn unknown_endpoint_is_an_error() {
        let doc = GraphDocument::from_json(
            r#"{ "vertices": [{ "name": "a" }], "edges": [{ "source": "a", "target": "zz" }] }"#,
        )
        .unwrap();
        let err = doc.build().unwrap_err();
        assert!(err.to_string().contains("zz"));
    }

    #[test]
    fn dump_lists_routes_only_for_routed_edges() {
        let loaded = GraphDocument::from_json(DOC).unwrap().build().unwrap();
        let a = loaded.names["a"];
        let b = loaded.names["b"];
        let positions = VertexPositions::from([(a, Point::new(0.0, 0.0)), (b, Point::new(50.0, 40.0))]);
        let dump = LayoutDump::from_layout("tree", &loaded.graph, &positions, &loaded.sizes, &EdgeRoutes::new());
        assert_eq!(dump.vertices.len(), 2);
        assert!(dump.edges[0].points.is_none());
        assert_eq!(dump.width, 70.0);
        assert_eq!(dump.height, 50.0);
        let json = serde_json::to_string(&dump).unwrap();
        assert!(!json.contains("points"));
    }
}
