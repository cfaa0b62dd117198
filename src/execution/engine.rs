//! Execution engine implementation.
//!
//! The engine runs the demand-driven update protocol over the upstream
//! closure of a terminal node:
//!
//! 1. **Information**: producers first, every node whose pipeline
//!    modification time is newer than its cached information regenerates
//!    its output metadata.
//! 2. **Negotiation**: consumers first, the terminal's requested region is
//!    translated into the region each producer must generate. Requests
//!    from several consumers are merged into their bounding union, and a
//!    request outside a producer's largest possible region aborts the
//!    update before any data moves.
//! 3. **Data**: producers first, every node whose cached output is stale
//!    or does not cover its negotiated region is recomputed exactly once.
//!
//! A failure at any point returns one error to the caller. Outputs already
//! regenerated in this update stay valid, and the failing node keeps its
//! previous output and timestamps.

use crate::core::buffer::{ImageBuffer, ImageInformation};
use crate::core::context::ComputeContext;
use crate::core::error::{NodeId, PipelineError, PipelineResult};
use crate::core::pixel::Pixel;
use crate::core::region::Region;
use crate::core::time::next_tick;
use crate::execution::dispatcher::Dispatcher;
use crate::execution::progress::{ProgressCallback, ProgressTracker, ProgressUpdate, SkipReason};
use crate::graph::structure::ProcessingGraph;
use crate::graph::topology::TopologyAnalyzer;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Execution options.
#[derive(Clone, Default)]
pub struct ExecutionOptions {
    /// Worker threads per node compute step (0 = hardware concurrency).
    pub threads: usize,
    /// Progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for ExecutionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionOptions")
            .field("threads", &self.threads)
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl ExecutionOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }
}

/// Statistics of one successful update.
#[derive(Debug, Clone, Default)]
pub struct UpdateStats {
    /// Total wall-clock time.
    pub total_duration: Duration,
    /// Nodes whose data was regenerated.
    pub nodes_executed: usize,
    /// Nodes whose cached output was reused.
    pub nodes_reused: usize,
    /// IDs of regenerated nodes, producers first.
    pub executed: Vec<NodeId>,
}

/// Regions negotiated for an update, without any data generated.
#[derive(Debug, Clone)]
pub struct UpdatePlan<const D: usize> {
    /// The node the update was planned for.
    pub terminal: NodeId,
    /// Nodes involved, producers first.
    pub order: Vec<NodeId>,
    /// Region each node must generate.
    pub regions: HashMap<NodeId, Region<D>>,
}

impl<const D: usize> UpdatePlan<D> {
    /// Region negotiated for `node_id`.
    pub fn region(&self, node_id: NodeId) -> Option<&Region<D>> {
        self.regions.get(&node_id)
    }
}

/// Output of the information phase.
struct InformationPass<const D: usize> {
    information: HashMap<NodeId, ImageInformation<D>>,
    /// Nodes whose information was regenerated rather than read from cache.
    regenerated: Vec<NodeId>,
}

/// The execution engine.
pub struct ExecutionEngine {
    dispatcher: Dispatcher,
    options: ExecutionOptions,
}

impl ExecutionEngine {
    /// Create an engine using the global worker pool.
    pub fn new() -> Self {
        Self {
            dispatcher: Dispatcher::new(),
            options: ExecutionOptions::default(),
        }
    }

    /// Create an engine with explicit options.
    pub fn with_options(options: ExecutionOptions) -> PipelineResult<Self> {
        Ok(Self {
            dispatcher: Dispatcher::with_threads(options.threads)?,
            options,
        })
    }

    /// The dispatcher handed to node compute steps.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Bring `terminal`'s output up to date over its requested region.
    ///
    /// The requested region is the one set with
    /// [`ProcessingGraph::set_requested_region`], or the largest possible
    /// region when none was set.
    pub fn update<P: Pixel, const D: usize>(
        &self,
        graph: &mut ProcessingGraph<P, D>,
        terminal: NodeId,
    ) -> PipelineResult<UpdateStats> {
        let start_time = Instant::now();
        let order = TopologyAnalyzer::new(graph).upstream_order(terminal)?;

        let mut tracker = ProgressTracker::new(order.len())
            .with_callback(self.options.progress_callback.clone());
        tracker.start();

        match self.run_update(graph, terminal, &order, &tracker) {
            Ok(()) => {
                tracker.complete();
                let stats = UpdateStats {
                    total_duration: start_time.elapsed(),
                    nodes_executed: tracker.nodes_executed(),
                    nodes_reused: tracker.nodes_skipped(),
                    executed: tracker.executed_nodes(),
                };
                info!(
                    "update of {} finished in {:?}: {} executed, {} reused",
                    terminal, stats.total_duration, stats.nodes_executed, stats.nodes_reused
                );
                Ok(stats)
            }
            Err(error) => {
                tracker.report_error(error.node_id(), error.to_string());
                debug!("update of {} aborted: {}", terminal, error);
                Err(error)
            }
        }
    }

    /// Negotiate the regions an update of `terminal` would generate.
    ///
    /// Runs the information phase and region negotiation only. The graph
    /// is left untouched, so a region error can be detected up front.
    pub fn plan<P: Pixel, const D: usize>(
        &self,
        graph: &ProcessingGraph<P, D>,
        terminal: NodeId,
    ) -> PipelineResult<UpdatePlan<D>> {
        let order = TopologyAnalyzer::new(graph).upstream_order(terminal)?;
        let pass = Self::collect_information(graph, &order)?;
        let regions = Self::negotiate(graph, terminal, &order, &pass.information)?;
        Ok(UpdatePlan {
            terminal,
            order,
            regions,
        })
    }

    fn run_update<P: Pixel, const D: usize>(
        &self,
        graph: &mut ProcessingGraph<P, D>,
        terminal: NodeId,
        order: &[NodeId],
        tracker: &ProgressTracker,
    ) -> PipelineResult<()> {
        let pass = Self::collect_information(graph, order)?;
        for &node_id in &pass.regenerated {
            let node = graph.get_node_mut(node_id)?;
            node.state.information = pass.information.get(&node_id).cloned();
            node.state.information_time = next_tick();
        }

        let regions = Self::negotiate(graph, terminal, order, &pass.information)?;

        for &node_id in order {
            let region = regions.get(&node_id).copied().unwrap_or_default();
            self.update_output_data(graph, node_id, region, &pass.information, tracker)?;
        }

        for (node_id, region) in regions {
            graph.get_node_mut(node_id)?.state.negotiated_region = Some(region);
        }
        Ok(())
    }

    /// Information phase over `order` (producers first).
    ///
    /// A node's cached information is reused when it is newer than the
    /// node's pipeline modification time: the latest parameter or wiring
    /// change of the node or anything upstream of it.
    fn collect_information<P: Pixel, const D: usize>(
        graph: &ProcessingGraph<P, D>,
        order: &[NodeId],
    ) -> PipelineResult<InformationPass<D>> {
        let mut pipeline_time: HashMap<NodeId, u64> = HashMap::new();
        let mut pass = InformationPass {
            information: HashMap::new(),
            regenerated: Vec::new(),
        };

        for &node_id in order {
            let node = graph.get_node(node_id)?;
            let inputs = graph.input_ids(node_id)?;

            let upstream_time = inputs
                .iter()
                .filter_map(|id| pipeline_time.get(id))
                .max()
                .copied()
                .unwrap_or(0);
            let modified = node.modified_time().max(upstream_time);
            pipeline_time.insert(node_id, modified);

            let cached = node
                .state
                .information
                .as_ref()
                .filter(|_| node.state.information_time > modified);

            let information = match cached {
                Some(information) => information.clone(),
                None => {
                    let input_information = Self::input_information(&pass.information, &inputs, node_id)?;
                    let information = node.filter.generate_output_information(&input_information)?;
                    debug!(
                        "{} ({}): information regenerated, largest possible region {}",
                        node.display_name(),
                        node_id,
                        information.largest_possible_region
                    );
                    pass.regenerated.push(node_id);
                    information
                }
            };
            pass.information.insert(node_id, information);
        }

        Ok(pass)
    }

    /// Region negotiation over `order` walked consumers first.
    fn negotiate<P: Pixel, const D: usize>(
        graph: &ProcessingGraph<P, D>,
        terminal: NodeId,
        order: &[NodeId],
        information: &HashMap<NodeId, ImageInformation<D>>,
    ) -> PipelineResult<HashMap<NodeId, Region<D>>> {
        let largest = |node_id: NodeId| {
            information
                .get(&node_id)
                .map(|info| info.largest_possible_region)
                .ok_or_else(|| missing_information(node_id))
        };

        let terminal_largest = largest(terminal)?;
        let requested = graph
            .requested_region(terminal)?
            .unwrap_or(terminal_largest);
        if !requested.is_subset_of(&terminal_largest) {
            return Err(PipelineError::region(terminal, &requested, &terminal_largest));
        }

        let mut regions: HashMap<NodeId, Region<D>> = HashMap::new();
        regions.insert(terminal, requested);

        for &node_id in order.iter().rev() {
            let Some(region) = regions.get(&node_id).copied() else {
                continue;
            };
            let node = graph.get_node(node_id)?;
            let inputs = graph.input_ids(node_id)?;
            if inputs.is_empty() {
                continue;
            }

            let input_information = Self::input_information(information, &inputs, node_id)?;
            let requests = node
                .filter
                .generate_input_requested_region(&region, &input_information)?;
            if requests.len() != inputs.len() {
                return Err(PipelineError::Execution {
                    node_id,
                    reason: format!(
                        "requested regions for {} input(s), node has {}",
                        requests.len(),
                        inputs.len()
                    ),
                });
            }

            for (input_id, request) in inputs.into_iter().zip(requests) {
                let input_largest = largest(input_id)?;
                if !request.is_subset_of(&input_largest) {
                    return Err(PipelineError::region(input_id, &request, &input_largest));
                }
                regions
                    .entry(input_id)
                    .and_modify(|existing| *existing = existing.bounding_union(&request))
                    .or_insert(request);
            }
        }

        Ok(regions)
    }

    /// Data phase for a single node whose producers are already current.
    fn update_output_data<P: Pixel, const D: usize>(
        &self,
        graph: &mut ProcessingGraph<P, D>,
        node_id: NodeId,
        region: Region<D>,
        information: &HashMap<NodeId, ImageInformation<D>>,
        tracker: &ProgressTracker,
    ) -> PipelineResult<()> {
        let input_ids = graph.input_ids(node_id)?;
        let mut inputs = Vec::with_capacity(input_ids.len());
        let mut newest_input = 0;
        for &input_id in &input_ids {
            let state = &graph.get_node(input_id)?.state;
            let output = state.output.clone().ok_or_else(|| PipelineError::Execution {
                node_id,
                reason: format!("input {} has no output", input_id),
            })?;
            newest_input = newest_input.max(state.update_time);
            inputs.push(output);
        }

        let node = graph.get_node_mut(node_id)?;
        let up_to_date = node.state.output.as_ref().is_some_and(|output| {
            region.is_subset_of(output.buffered_region())
        }) && node.state.update_time > node.modified_time()
            && node.state.update_time > node.state.information_time
            && node.state.update_time > newest_input;

        if up_to_date {
            debug!("{} ({}): up to date for {}", node.display_name(), node_id, region);
            tracker.node_skipped(node_id, SkipReason::Cached);
            return Ok(());
        }

        let output_information = information
            .get(&node_id)
            .cloned()
            .ok_or_else(|| missing_information(node_id))?;
        let mut output = ImageBuffer::allocate(node_id, output_information, region)?;

        tracker.node_started(node_id, node.display_name(), region.to_string());
        debug!("{} ({}): generating {}", node.display_name(), node_id, region);
        let exec_start = Instant::now();
        {
            let mut ctx = ComputeContext::new(node_id, &inputs, &mut output, &self.dispatcher);
            node.filter.compute(&mut ctx)?;
        }
        let duration = exec_start.elapsed();

        node.state.output = Some(Arc::new(output));
        node.state.update_time = next_tick();
        tracker.node_completed(node_id, duration.as_millis() as u64, region.number_of_pixels());
        Ok(())
    }

    fn input_information<'a, const D: usize>(
        information: &'a HashMap<NodeId, ImageInformation<D>>,
        inputs: &[NodeId],
        node_id: NodeId,
    ) -> PipelineResult<Vec<&'a ImageInformation<D>>> {
        inputs
            .iter()
            .map(|id| {
                information.get(id).ok_or_else(|| PipelineError::Execution {
                    node_id,
                    reason: format!("input {} has no information", id),
                })
            })
            .collect()
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_information(node_id: NodeId) -> PipelineError {
    PipelineError::Execution {
        node_id,
        reason: "no output information".to_string(),
    }
}
