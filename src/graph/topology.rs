//! Topological analysis and sorting of graphs.
//!
//! Provides algorithms for:
//! - Topological sorting (producers before consumers)
//! - Depth and dependency analysis
//! - Disconnected subgraph detection

use crate::core::error::{GraphError, GraphResult, NodeId};
use crate::core::pixel::Pixel;
use crate::graph::structure::ProcessingGraph;
use std::collections::{HashMap, HashSet, VecDeque};

/// Analyzer for graph topology.
pub struct TopologyAnalyzer<'a, P: Pixel, const D: usize> {
    graph: &'a ProcessingGraph<P, D>,
}

impl<'a, P: Pixel, const D: usize> TopologyAnalyzer<'a, P, D> {
    /// Create a new analyzer for the given graph.
    pub fn new(graph: &'a ProcessingGraph<P, D>) -> Self {
        Self { graph }
    }

    /// Get the topological sort order (Kahn's algorithm).
    ///
    /// Returns nodes in an order where dependencies come before dependents.
    /// Ties are broken by insertion order.
    pub fn topological_sort(&self) -> GraphResult<Vec<NodeId>> {
        let mut in_degree: HashMap<NodeId, usize> =
            self.graph.node_ids().map(|id| (id, 0)).collect();
        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for conn in self.graph.connections() {
            adjacency.entry(conn.from).or_default().push(conn.to.node_id);
            *in_degree.entry(conn.to.node_id).or_insert(0) += 1;
        }

        let mut queue: VecDeque<NodeId> = self
            .graph
            .node_ids()
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut result = Vec::with_capacity(self.graph.node_count());

        while let Some(node) = queue.pop_front() {
            result.push(node);

            for neighbor in adjacency.get(&node).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(neighbor) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*neighbor);
                    }
                }
            }
        }

        if result.len() != self.graph.node_count() {
            let remaining: Vec<NodeId> = in_degree
                .iter()
                .filter(|(_, degree)| **degree > 0)
                .map(|(&id, _)| id)
                .collect();

            return Err(GraphError::CycleDetected { nodes: remaining });
        }

        Ok(result)
    }

    /// Nodes needed to produce `terminal`, producers first, ending with
    /// `terminal` itself.
    pub fn upstream_order(&self, terminal: NodeId) -> GraphResult<Vec<NodeId>> {
        if !self.graph.has_node(terminal) {
            return Err(GraphError::NodeNotFound(terminal));
        }
        let mut needed: HashSet<NodeId> = self.graph.get_upstream(terminal).into_iter().collect();
        needed.insert(terminal);
        Ok(self
            .topological_sort()?
            .into_iter()
            .filter(|id| needed.contains(id))
            .collect())
    }

    /// Get the execution depth of a node.
    ///
    /// Depth 0 = source nodes (no dependencies)
    /// Higher depth = longer chain of producers
    pub fn node_depth(&self, node_id: NodeId) -> GraphResult<usize> {
        let order = self.upstream_order(node_id)?;
        let mut depth: HashMap<NodeId, usize> = HashMap::new();
        for id in order {
            let d = self
                .graph
                .connections_to(id)
                .filter_map(|conn| depth.get(&conn.from))
                .max()
                .map_or(0, |parent| parent + 1);
            depth.insert(id, d);
        }
        Ok(depth.get(&node_id).copied().unwrap_or(0))
    }

    /// Check if the graph has any cycles.
    pub fn has_cycle(&self) -> bool {
        self.topological_sort().is_err()
    }

    /// Find all disconnected subgraphs.
    pub fn find_subgraphs(&self) -> Vec<HashSet<NodeId>> {
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut subgraphs = Vec::new();

        for node_id in self.graph.node_ids() {
            if !visited.contains(&node_id) {
                let subgraph = self.flood_fill(node_id);
                visited.extend(&subgraph);
                subgraphs.push(subgraph);
            }
        }

        subgraphs
    }

    /// Flood fill to find all connected nodes (ignoring edge direction).
    fn flood_fill(&self, start: NodeId) -> HashSet<NodeId> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if visited.insert(current) {
                for conn in self.graph.connections_from(current) {
                    queue.push_back(conn.to.node_id);
                }
                for conn in self.graph.connections_to(current) {
                    queue.push_back(conn.from);
                }
            }
        }

        visited
    }
}
