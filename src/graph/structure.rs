//! Graph structure and node management.
//!
//! The ProcessingGraph is an arena of nodes keyed by [`NodeId`]. Each node
//! owns its filter, its cached output buffer and the timestamps the engine
//! uses to decide whether that buffer is still current. Output buffers are
//! handed out as `Arc`s, so a buffer read by several consumers is released
//! when the last of them lets go.

use crate::core::buffer::{ImageBuffer, ImageInformation};
use crate::core::error::{ConnectionId, GraphError, GraphResult, NodeId, PipelineResult};
use crate::core::node::PipelineNode;
use crate::core::pixel::Pixel;
use crate::core::region::Region;
use crate::core::time::next_tick;
use crate::core::types::Value;
use crate::graph::connection::{Connection, Endpoint};
use indexmap::IndexMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Engine bookkeeping for one node.
#[derive(Debug)]
pub(crate) struct NodeState<P: Pixel, const D: usize> {
    /// Last generated output, shared with consumers.
    pub output: Option<Arc<ImageBuffer<P, D>>>,
    /// Output information from the last information phase.
    pub information: Option<ImageInformation<D>>,
    /// Tick at which `information` was generated.
    pub information_time: u64,
    /// Tick at which `output` was generated. Zero means never.
    pub update_time: u64,
    /// Tick of the last change to this node's input wiring.
    pub connection_time: u64,
    /// Region set by the caller for updates that start at this node.
    pub requested_region: Option<Region<D>>,
    /// Region negotiated for this node during the last successful update.
    pub negotiated_region: Option<Region<D>>,
}

impl<P: Pixel, const D: usize> Default for NodeState<P, D> {
    fn default() -> Self {
        Self {
            output: None,
            information: None,
            information_time: 0,
            update_time: 0,
            connection_time: next_tick(),
            requested_region: None,
            negotiated_region: None,
        }
    }
}

/// A node instance in the graph.
pub struct GraphNode<P: Pixel, const D: usize> {
    /// Unique identifier
    pub id: NodeId,
    /// The node implementation
    pub filter: Box<dyn PipelineNode<P, D>>,
    /// Optional display name override
    pub label: Option<String>,
    pub(crate) state: NodeState<P, D>,
}

impl<P: Pixel, const D: usize> std::fmt::Debug for GraphNode<P, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("filter", &self.filter.metadata().name)
            .field("label", &self.label)
            .field("update_time", &self.state.update_time)
            .finish()
    }
}

impl<P: Pixel, const D: usize> GraphNode<P, D> {
    /// Create a new graph node around a filter.
    pub fn new(filter: Box<dyn PipelineNode<P, D>>) -> Self {
        Self {
            id: NodeId::new(),
            filter,
            label: None,
            state: NodeState::default(),
        }
    }

    /// Create with a specific ID.
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the display name (label or filter name).
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.filter.metadata().name)
    }

    /// Modification time: the later of the filter's parameters and the
    /// node's input wiring.
    pub fn modified_time(&self) -> u64 {
        self.filter.modified_time().max(self.state.connection_time)
    }

    /// Tick of the last successful data generation (0 = never).
    pub fn update_time(&self) -> u64 {
        self.state.update_time
    }
}

/// The main processing graph structure.
///
/// Uses IndexMap to maintain insertion order for consistent iteration.
pub struct ProcessingGraph<P: Pixel, const D: usize> {
    /// All nodes in the graph, indexed by ID.
    nodes: IndexMap<NodeId, GraphNode<P, D>>,
    /// All connections in the graph.
    connections: Vec<Connection>,
}

impl<P: Pixel, const D: usize> ProcessingGraph<P, D> {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            connections: Vec::new(),
        }
    }

    // ========================================================================
    // Node Management
    // ========================================================================

    /// Add a node to the graph.
    pub fn add_node(&mut self, node: GraphNode<P, D>) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Add a filter and return the new node's ID.
    pub fn add_filter<F: PipelineNode<P, D>>(&mut self, filter: F) -> NodeId {
        self.add_node(GraphNode::new(Box::new(filter)))
    }

    /// Remove a node from the graph.
    ///
    /// Also removes all connections involving this node. Downstream nodes
    /// are marked modified because their wiring changed.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<GraphNode<P, D>> {
        let downstream: Vec<NodeId> = self.connections_from(id).map(|c| c.to.node_id).collect();
        self.connections
            .retain(|conn| conn.from != id && conn.to.node_id != id);
        for node_id in downstream {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.state.connection_time = next_tick();
            }
        }

        self.nodes
            .shift_remove(&id)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Get a reference to a node.
    pub fn get_node(&self, id: NodeId) -> GraphResult<&GraphNode<P, D>> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Get a mutable reference to a node.
    pub fn get_node_mut(&mut self, id: NodeId) -> GraphResult<&mut GraphNode<P, D>> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Check if a node exists.
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode<P, D>> {
        self.nodes.values()
    }

    /// Get all node IDs.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Typed access to a node's filter.
    pub fn filter<F: PipelineNode<P, D>>(&self, id: NodeId) -> GraphResult<&F> {
        self.get_node(id)?
            .filter
            .as_any()
            .downcast_ref::<F>()
            .ok_or_else(|| GraphError::WrongNodeType {
                node_id: id,
                expected: std::any::type_name::<F>().to_string(),
            })
    }

    /// Typed mutable access to a node's filter, e.g. to call its setters.
    pub fn filter_mut<F: PipelineNode<P, D>>(&mut self, id: NodeId) -> GraphResult<&mut F> {
        self.get_node_mut(id)?
            .filter
            .as_any_mut()
            .downcast_mut::<F>()
            .ok_or_else(|| GraphError::WrongNodeType {
                node_id: id,
                expected: std::any::type_name::<F>().to_string(),
            })
    }

    /// Set a parameter on a node by name. Validation happens immediately.
    pub fn set_parameter(&mut self, id: NodeId, name: &str, value: &Value) -> PipelineResult<()> {
        self.get_node_mut(id)?.filter.set_parameter(name, value)
    }

    // ========================================================================
    // Connection Management
    // ========================================================================

    /// Wire `upstream`'s output into input `slot` of `node`.
    ///
    /// Replaces any existing connection in that slot. Fails if the nodes do
    /// not exist, the slot is out of range, or the edge would close a cycle.
    pub fn set_input(&mut self, node: NodeId, slot: usize, upstream: NodeId) -> GraphResult<ConnectionId> {
        let count = self.get_node(node)?.filter.metadata().input_count;
        self.get_node(upstream)?;

        if slot >= count {
            return Err(GraphError::SlotOutOfRange {
                node_id: node,
                slot,
                count,
            });
        }

        if self.is_reachable(node, upstream) {
            return Err(GraphError::CycleDetected {
                nodes: vec![upstream, node],
            });
        }

        if let Some(existing) = self.connection_to_slot(node, slot) {
            if existing.from == upstream {
                return Ok(existing.id);
            }
        }
        self.connections
            .retain(|c| !(c.to.node_id == node && c.to.slot == slot));

        let connection = Connection::new(upstream, Endpoint::new(node, slot));
        let id = connection.id;
        self.connections.push(connection);
        self.get_node_mut(node)?.state.connection_time = next_tick();
        Ok(id)
    }

    /// Remove the connection feeding input `slot` of `node`, if any.
    pub fn disconnect_input(&mut self, node: NodeId, slot: usize) -> GraphResult<()> {
        let before = self.connections.len();
        self.connections
            .retain(|c| !(c.to.node_id == node && c.to.slot == slot));
        if self.connections.len() != before {
            self.get_node_mut(node)?.state.connection_time = next_tick();
        }
        Ok(())
    }

    /// Get all connections.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Get all connections from a node.
    pub fn connections_from(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(move |c| c.from == node_id)
    }

    /// Get all connections to a node.
    pub fn connections_to(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(move |c| c.to.node_id == node_id)
    }

    /// The connection feeding a particular input slot.
    pub fn connection_to_slot(&self, node_id: NodeId, slot: usize) -> Option<&Connection> {
        self.connections_to(node_id).find(|c| c.to.slot == slot)
    }

    /// Upstream node for every input slot, in slot order.
    ///
    /// Fails if any slot is unconnected.
    pub fn input_ids(&self, node_id: NodeId) -> GraphResult<Vec<NodeId>> {
        let count = self.get_node(node_id)?.filter.metadata().input_count;
        (0..count)
            .map(|slot| {
                self.connection_to_slot(node_id, slot)
                    .map(|c| c.from)
                    .ok_or(GraphError::MissingInput { node_id, slot })
            })
            .collect()
    }

    /// Get the number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // ========================================================================
    // Regions and Outputs
    // ========================================================================

    /// Set the region an update starting at `id` must produce.
    pub fn set_requested_region(&mut self, id: NodeId, region: Region<D>) -> GraphResult<()> {
        self.get_node_mut(id)?.state.requested_region = Some(region);
        Ok(())
    }

    /// Revert to requesting the largest possible region.
    pub fn clear_requested_region(&mut self, id: NodeId) -> GraphResult<()> {
        self.get_node_mut(id)?.state.requested_region = None;
        Ok(())
    }

    /// Region set by the caller for this node, if any.
    pub fn requested_region(&self, id: NodeId) -> GraphResult<Option<Region<D>>> {
        Ok(self.get_node(id)?.state.requested_region)
    }

    /// Region negotiated for this node by the last successful update.
    pub fn negotiated_region(&self, id: NodeId) -> GraphResult<Option<Region<D>>> {
        Ok(self.get_node(id)?.state.negotiated_region)
    }

    /// Output information from the last information phase.
    pub fn information(&self, id: NodeId) -> GraphResult<Option<&ImageInformation<D>>> {
        Ok(self.get_node(id)?.state.information.as_ref())
    }

    /// The node's output buffer. Only meaningful after a successful update
    /// whose requested region covered the caller's region of interest.
    pub fn output(&self, id: NodeId) -> GraphResult<Option<Arc<ImageBuffer<P, D>>>> {
        Ok(self.get_node(id)?.state.output.clone())
    }

    /// Drop the node's cached output. The next update regenerates it.
    pub fn release_output(&mut self, id: NodeId) -> GraphResult<()> {
        let node = self.get_node_mut(id)?;
        node.state.output = None;
        node.state.update_time = 0;
        Ok(())
    }

    // ========================================================================
    // Graph Analysis
    // ========================================================================

    /// Check if `target` is reachable from `start` following connections
    /// downstream.
    pub fn is_reachable(&self, start: NodeId, target: NodeId) -> bool {
        if start == target {
            return true;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }

            if visited.insert(current) {
                for conn in self.connections_from(current) {
                    queue.push_back(conn.to.node_id);
                }
            }
        }

        false
    }

    /// Get all nodes that the given node depends on (upstream).
    pub fn get_upstream(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        for conn in self.connections_to(node_id) {
            queue.push_back(conn.from);
        }

        while let Some(current) = queue.pop_front() {
            if visited.insert(current) {
                result.push(current);
                for conn in self.connections_to(current) {
                    queue.push_back(conn.from);
                }
            }
        }

        result
    }

    /// Get nodes with no outgoing connections.
    pub fn get_sink_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .keys()
            .filter(|&id| !self.connections.iter().any(|c| c.from == *id))
            .copied()
            .collect()
    }
}

impl<P: Pixel, const D: usize> Default for ProcessingGraph<P, D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::PassthroughNode;
    use crate::filters::bilateral::BilateralImageFilter;

    type Graph = ProcessingGraph<u8, 2>;

    #[test]
    fn test_add_remove_node() {
        let mut graph = Graph::new();

        let id = graph.add_filter(PassthroughNode::new());
        assert_eq!(graph.node_count(), 1);
        assert!(graph.has_node(id));

        graph.remove_node(id).unwrap();
        assert_eq!(graph.node_count(), 0);
        assert!(!graph.has_node(id));
    }

    #[test]
    fn test_set_input_replaces_slot_and_bumps_time() {
        let mut graph = Graph::new();
        let a = graph.add_filter(PassthroughNode::new());
        let b = graph.add_filter(PassthroughNode::new());
        let c = graph.add_filter(PassthroughNode::new());

        graph.set_input(c, 0, a).unwrap();
        let before = graph.get_node(c).unwrap().modified_time();
        graph.set_input(c, 0, b).unwrap();

        assert_eq!(graph.connection_count(), 1);
        assert_eq!(graph.input_ids(c).unwrap(), vec![b]);
        assert!(graph.get_node(c).unwrap().modified_time() > before);
    }

    #[test]
    fn test_slot_out_of_range() {
        let mut graph = Graph::new();
        let a = graph.add_filter(PassthroughNode::new());
        let b = graph.add_filter(PassthroughNode::new());
        let result = graph.set_input(b, 1, a);
        assert!(matches!(result, Err(GraphError::SlotOutOfRange { slot: 1, count: 1, .. })));
    }

    #[test]
    fn test_cycle_detection() {
        let mut graph = Graph::new();

        let node1 = graph.add_filter(PassthroughNode::new());
        let node2 = graph.add_filter(PassthroughNode::new());
        let node3 = graph.add_filter(PassthroughNode::new());

        graph.set_input(node2, 0, node1).unwrap();
        graph.set_input(node3, 0, node2).unwrap();

        let result = graph.set_input(node1, 0, node3);
        assert!(matches!(result, Err(GraphError::CycleDetected { .. })));
        assert!(matches!(
            graph.set_input(node1, 0, node1),
            Err(GraphError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_missing_input_reported() {
        let mut graph = Graph::new();
        let node = graph.add_filter(PassthroughNode::new());
        assert!(matches!(
            graph.input_ids(node),
            Err(GraphError::MissingInput { slot: 0, .. })
        ));
    }

    #[test]
    fn test_typed_filter_access() {
        let mut graph = Graph::new();
        let id = graph.add_filter(BilateralImageFilter::<2>::new());

        graph.filter_mut::<BilateralImageFilter<2>>(id)
            .unwrap()
            .set_range_sigma(12.0)
            .unwrap();
        assert_eq!(graph.filter::<BilateralImageFilter<2>>(id).unwrap().range_sigma(), 12.0);
        assert!(matches!(
            graph.filter::<PassthroughNode>(id),
            Err(GraphError::WrongNodeType { .. })
        ));
    }

    #[test]
    fn test_upstream_and_sinks() {
        let mut graph = Graph::new();

        let node1 = graph.add_filter(PassthroughNode::new());
        let node2 = graph.add_filter(PassthroughNode::new());
        let node3 = graph.add_filter(PassthroughNode::new());

        graph.set_input(node2, 0, node1).unwrap();
        graph.set_input(node3, 0, node2).unwrap();

        let upstream = graph.get_upstream(node3);
        assert_eq!(upstream.len(), 2);
        assert!(upstream.contains(&node1));
        assert!(upstream.contains(&node2));
        assert_eq!(graph.get_sink_nodes(), vec![node3]);
    }

    #[test]
    fn test_remove_node_marks_downstream_modified() {
        let mut graph = Graph::new();
        let a = graph.add_filter(PassthroughNode::new());
        let b = graph.add_filter(PassthroughNode::new());
        graph.set_input(b, 0, a).unwrap();
        let before = graph.get_node(b).unwrap().modified_time();

        graph.remove_node(a).unwrap();
        assert_eq!(graph.connection_count(), 0);
        assert!(graph.get_node(b).unwrap().modified_time() > before);
    }
}
