//! Progress reporting for updates.
//!
//! The tracker turns engine milestones into [`ProgressUpdate`] events and
//! hands them to an optional callback. Callers use the node events to
//! observe which nodes were actually regenerated.

use crate::core::error::NodeId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A progress update event.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    /// An update has started.
    Started {
        /// Nodes in the terminal's upstream closure.
        total_nodes: usize,
    },
    /// A node is about to generate data.
    NodeStarted {
        node_id: NodeId,
        node_name: String,
        /// Region being generated, formatted.
        region: String,
    },
    /// A node finished generating data.
    NodeCompleted {
        node_id: NodeId,
        duration_ms: u64,
        pixels: usize,
    },
    /// A node was not regenerated.
    NodeSkipped { node_id: NodeId, reason: SkipReason },
    /// The update finished successfully.
    Completed {
        total_duration_ms: u64,
        nodes_executed: usize,
        nodes_skipped: usize,
    },
    /// The update was aborted.
    Error {
        node_id: Option<NodeId>,
        message: String,
    },
}

/// Reason why a node was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Cached output already covers the request and is current.
    Cached,
}

/// Callback type for progress updates.
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Tracks one update and forwards events.
pub struct ProgressTracker {
    total_nodes: usize,
    executed: AtomicU64,
    skipped: AtomicU64,
    start_time: Option<Instant>,
    callback: Option<ProgressCallback>,
    /// Nodes regenerated during this update, in execution order.
    executed_nodes: parking_lot::Mutex<Vec<NodeId>>,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new(total_nodes: usize) -> Self {
        Self {
            total_nodes,
            executed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            start_time: None,
            callback: None,
            executed_nodes: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Set a callback for progress updates.
    pub fn with_callback(mut self, callback: Option<ProgressCallback>) -> Self {
        self.callback = callback;
        self
    }

    /// Start tracking.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.send_update(ProgressUpdate::Started {
            total_nodes: self.total_nodes,
        });
    }

    /// Report that a node has started generating data.
    pub fn node_started(&self, node_id: NodeId, node_name: String, region: String) {
        self.send_update(ProgressUpdate::NodeStarted {
            node_id,
            node_name,
            region,
        });
    }

    /// Report that a node has completed.
    pub fn node_completed(&self, node_id: NodeId, duration_ms: u64, pixels: usize) {
        self.executed.fetch_add(1, Ordering::Relaxed);
        self.executed_nodes.lock().push(node_id);
        self.send_update(ProgressUpdate::NodeCompleted {
            node_id,
            duration_ms,
            pixels,
        });
    }

    /// Report that a node was skipped.
    pub fn node_skipped(&self, node_id: NodeId, reason: SkipReason) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        self.send_update(ProgressUpdate::NodeSkipped { node_id, reason });
    }

    /// Report an error.
    pub fn report_error(&self, node_id: Option<NodeId>, message: String) {
        self.send_update(ProgressUpdate::Error { node_id, message });
    }

    /// Complete tracking.
    pub fn complete(&self) {
        self.send_update(ProgressUpdate::Completed {
            total_duration_ms: self.elapsed_ms(),
            nodes_executed: self.nodes_executed(),
            nodes_skipped: self.nodes_skipped(),
        });
    }

    /// Nodes regenerated so far.
    pub fn nodes_executed(&self) -> usize {
        self.executed.load(Ordering::Relaxed) as usize
    }

    /// Nodes reused so far.
    pub fn nodes_skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed) as usize
    }

    /// IDs of regenerated nodes in execution order.
    pub fn executed_nodes(&self) -> Vec<NodeId> {
        self.executed_nodes.lock().clone()
    }

    /// Milliseconds since `start`.
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    fn send_update(&self, update: ProgressUpdate) {
        if let Some(ref callback) = self.callback {
            callback(update);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_counts() {
        let tracker = ProgressTracker::new(3);
        let a = NodeId::new();
        let b = NodeId::new();
        tracker.node_completed(a, 1, 16);
        tracker.node_skipped(b, SkipReason::Cached);

        assert_eq!(tracker.nodes_executed(), 1);
        assert_eq!(tracker.nodes_skipped(), 1);
        assert_eq!(tracker.executed_nodes(), vec![a]);
    }

    #[test]
    fn test_callback_invoked() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();
        let node_id = NodeId::new();

        let callback: ProgressCallback = Arc::new(move |_| {
            call_count_clone.fetch_add(1, Ordering::Relaxed);
        });
        let mut tracker = ProgressTracker::new(5).with_callback(Some(callback));

        tracker.start();
        tracker.node_started(node_id, "Test".to_string(), "[]".to_string());
        tracker.node_completed(node_id, 100, 4);
        tracker.complete();

        // Started, NodeStarted, NodeCompleted, Completed
        assert_eq!(call_count.load(Ordering::Relaxed), 4);
    }
}
