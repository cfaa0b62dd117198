//! Connection types for the graph.

use crate::core::error::{ConnectionId, NodeId};
use serde::{Deserialize, Serialize};

/// The receiving end of a connection (node + input slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// The node ID.
    pub node_id: NodeId,
    /// The input slot on that node.
    pub slot: usize,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(node_id: NodeId, slot: usize) -> Self {
        Self { node_id, slot }
    }
}

/// A connection from a node's output to another node's input slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier for this connection.
    pub id: ConnectionId,
    /// Upstream node whose output is read.
    pub from: NodeId,
    /// Downstream input slot.
    pub to: Endpoint,
}

impl Connection {
    /// Create a new connection.
    pub fn new(from: NodeId, to: Endpoint) -> Self {
        Self {
            id: ConnectionId::new(),
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection() {
        let node1 = NodeId::new();
        let node2 = NodeId::new();

        let conn = Connection::new(node1, Endpoint::new(node2, 1));

        assert_eq!(conn.from, node1);
        assert_eq!(conn.to.node_id, node2);
        assert_eq!(conn.to.slot, 1);
    }
}
