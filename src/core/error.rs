//! Error types for Strata.
//!
//! Every failure inside an update is surfaced to the original caller as a
//! single [`PipelineError`]. Errors carry the offending node where one
//! exists so the caller can tell which stage of the graph gave up.

use crate::core::region::Region;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a node ID from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Unique identifier for a connection in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Top-level error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A setter rejected a value. Raised synchronously, never deferred.
    #[error("Invalid parameter '{parameter}': {reason}")]
    Parameter { parameter: String, reason: String },

    /// A derived request falls outside the largest possible region.
    #[error("Requested region {requested} of node {node_id} is outside its largest possible region {largest}")]
    Region {
        node_id: NodeId,
        requested: String,
        largest: String,
    },

    /// Sample storage for a region could not be obtained.
    #[error("Could not allocate {pixels} pixels for node {node_id}")]
    Allocation { node_id: NodeId, pixels: usize },

    /// A chunk computation returned an error.
    #[error("Worker for chunk {chunk} failed: {source}")]
    Worker {
        chunk: usize,
        #[source]
        source: Box<PipelineError>,
    },

    /// A chunk computation panicked.
    #[error("Worker for chunk {chunk} panicked: {message}")]
    WorkerPanic { chunk: usize, message: String },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Node {node_id} execution failed: {reason}")]
    Execution { node_id: NodeId, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl PipelineError {
    /// Build a parameter validation error.
    pub fn parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Parameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Build a region error for `node_id`.
    pub fn region<const D: usize>(node_id: NodeId, requested: &Region<D>, largest: &Region<D>) -> Self {
        PipelineError::Region {
            node_id,
            requested: requested.to_string(),
            largest: largest.to_string(),
        }
    }

    /// Get the node ID that caused this error, if applicable.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            PipelineError::Region { node_id, .. }
            | PipelineError::Allocation { node_id, .. }
            | PipelineError::Execution { node_id, .. } => Some(*node_id),
            PipelineError::Worker { source, .. } => source.node_id(),
            PipelineError::Graph(error) => error.node_id(),
            _ => None,
        }
    }

    /// Check if this is a region negotiation failure.
    pub fn is_region_error(&self) -> bool {
        matches!(self, PipelineError::Region { .. })
    }
}

/// Errors related to graph structure and operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    #[error("Input slot {slot} does not exist on node {node_id} ({count} slots)")]
    SlotOutOfRange {
        node_id: NodeId,
        slot: usize,
        count: usize,
    },

    #[error("Input slot {slot} of node {node_id} is not connected")]
    MissingInput { node_id: NodeId, slot: usize },

    #[error("Cycle detected in graph involving nodes: {nodes:?}")]
    CycleDetected { nodes: Vec<NodeId> },

    #[error("Node {node_id} is not a {expected}")]
    WrongNodeType { node_id: NodeId, expected: String },

    #[error("Graph is empty")]
    EmptyGraph,
}

impl GraphError {
    /// Get the node ID that caused this error, if applicable.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            GraphError::NodeNotFound(node_id)
            | GraphError::SlotOutOfRange { node_id, .. }
            | GraphError::MissingInput { node_id, .. }
            | GraphError::WrongNodeType { node_id, .. } => Some(*node_id),
            _ => None,
        }
    }
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

// ============================================================================
// Validation Report
// ============================================================================

/// Non-fatal validation warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Warning message.
    pub message: String,
    /// Node that triggered the warning, if applicable.
    pub node_id: Option<NodeId>,
}

/// Outcome of running the validation pipeline over a graph.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Errors found. The graph should not be updated while any exist.
    pub errors: Vec<PipelineError>,
    /// Non-fatal issues.
    pub warnings: Vec<ValidationWarning>,
    /// Time taken for validation in milliseconds.
    pub duration_ms: u64,
}

impl ValidationReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error to the report.
    pub fn add_error(&mut self, error: PipelineError) {
        self.errors.push(error);
    }

    /// Add a warning to the report.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Check if the graph can be updated.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        if self.is_valid() {
            if self.warnings.is_empty() {
                "Graph is valid".to_string()
            } else {
                format!("Graph is valid with {} warning(s)", self.warnings.len())
            }
        } else {
            format!("Validation failed with {} error(s)", self.errors.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        let id = NodeId::new();
        let display = format!("{}", id);
        assert_eq!(display.len(), 8);
    }

    #[test]
    fn test_region_error_reports_node() {
        let node_id = NodeId::new();
        let error = PipelineError::region(
            node_id,
            &Region::new([0, 0], [10, 10]),
            &Region::from_size([4, 4]),
        );
        assert!(error.is_region_error());
        assert_eq!(error.node_id(), Some(node_id));
        assert!(error.to_string().contains("outside"));
    }

    #[test]
    fn test_worker_error_forwards_node() {
        let node_id = NodeId::new();
        let error = PipelineError::Worker {
            chunk: 3,
            source: Box::new(PipelineError::Execution {
                node_id,
                reason: "boom".to_string(),
            }),
        };
        assert_eq!(error.node_id(), Some(node_id));
    }

    #[test]
    fn test_validation_report() {
        let mut report = ValidationReport::new();
        assert!(report.is_valid());

        report.add_error(GraphError::EmptyGraph.into());
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 1);
    }
}
