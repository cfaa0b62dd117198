//! Compute context handed to a node while it generates data.
//!
//! The context owns nothing: it borrows the node's (already current) input
//! buffers, the freshly allocated output buffer, and the dispatcher used to
//! fan per-pixel work out across threads.

use crate::core::buffer::ImageBuffer;
use crate::core::error::{GraphError, NodeId, PipelineResult};
use crate::core::pixel::Pixel;
use crate::core::region::Region;
use crate::execution::dispatcher::{Dispatcher, OutputChunk};
use std::sync::Arc;

/// Context provided to [`PipelineNode::compute`](crate::core::node::PipelineNode::compute).
pub struct ComputeContext<'a, P: Pixel, const D: usize> {
    /// ID of the node being computed.
    pub node_id: NodeId,
    inputs: &'a [Arc<ImageBuffer<P, D>>],
    output: &'a mut ImageBuffer<P, D>,
    dispatcher: &'a Dispatcher,
}

impl<'a, P: Pixel, const D: usize> ComputeContext<'a, P, D> {
    /// Create a new compute context.
    pub fn new(
        node_id: NodeId,
        inputs: &'a [Arc<ImageBuffer<P, D>>],
        output: &'a mut ImageBuffer<P, D>,
        dispatcher: &'a Dispatcher,
    ) -> Self {
        Self {
            node_id,
            inputs,
            output,
            dispatcher,
        }
    }

    /// Number of connected inputs.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Input buffer in `slot`. Valid over at least the region this node
    /// requested from it.
    pub fn input(&self, slot: usize) -> PipelineResult<&'a ImageBuffer<P, D>> {
        let inputs: &'a [Arc<ImageBuffer<P, D>>] = self.inputs;
        inputs
            .get(slot)
            .map(|buffer| buffer.as_ref())
            .ok_or_else(|| {
                GraphError::MissingInput {
                    node_id: self.node_id,
                    slot,
                }
                .into()
            })
    }

    /// Region the output must cover after `compute` returns.
    pub fn output_region(&self) -> Region<D> {
        *self.output.buffered_region()
    }

    /// The output buffer.
    pub fn output(&self) -> &ImageBuffer<P, D> {
        &*self.output
    }

    /// Mutable access to the output buffer for single-threaded nodes.
    pub fn output_mut(&mut self) -> &mut ImageBuffer<P, D> {
        &mut *self.output
    }

    /// Number of workers the dispatcher fans out to.
    pub fn worker_count(&self) -> usize {
        self.dispatcher.thread_count()
    }

    /// Run `f` over disjoint chunks of the output region and join.
    pub fn dispatch<F>(&mut self, f: F) -> PipelineResult<()>
    where
        F: Fn(&mut OutputChunk<'_, P, D>) -> PipelineResult<()> + Send + Sync,
    {
        self.dispatcher.dispatch(&mut *self.output, f)
    }
}
