use thiserror::Error;

use crate::ir::{EdgeId, VertexId};

/// Structural failures of the graph model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("vertex id {0} is already in use")]
    DuplicateVertexId(i64),
    #[error("edge id {0} is already in use")]
    DuplicateEdgeId(i64),
    #[error("unknown vertex {0}")]
    UnknownVertex(VertexId),
    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),
    #[error("graph contains a cycle through vertex {0}")]
    Cycle(VertexId),
}

/// Failures surfaced by layout, overlap removal and edge routing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("{found} parameters cannot configure the {expected} algorithm")]
    ParameterMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("vertex {0} has no size entry")]
    MissingVertexSize(VertexId),
    #[error("vertex {0} has no position entry")]
    MissingVertexPosition(VertexId),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("computation cancelled")]
    Cancelled,
    #[error(transparent)]
    Graph(#[from] GraphError),
}
