//! Graph module for managing processing graphs.
//!
//! A processing graph is a directed acyclic graph (DAG) where nodes represent
//! filter operations and edges carry image data from a producer's output to
//! one input slot of a consumer.

pub mod connection;
pub mod structure;
pub mod topology;

// Re-export commonly used types
pub use connection::{Connection, Endpoint};
pub use structure::{GraphNode, ProcessingGraph};
pub use topology::TopologyAnalyzer;
