//! # Strata - Demand-driven N-D Image Pipelines
//!
//! Strata is a library for building image processing pipelines whose
//! nodes generate only the region a consumer asks for and only when
//! something upstream has changed.
//!
//! ## Features
//!
//! - **Region negotiation**: each node translates its output request into
//!   input requests (a smoothing kernel pads by its radius), checked
//!   against every producer's largest possible region before any data moves
//! - **Caching**: a node whose output is newer than its parameters and
//!   inputs, and covers the requested region, is not recomputed
//! - **Parallel compute**: a node's output region is split into disjoint
//!   chunks computed on a worker pool and joined before the update returns
//! - **N-D**: regions, buffers and filters are generic over the dimension
//! - **Bilateral filter**: edge-preserving smoothing with precomputed
//!   domain and range weight tables
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strata::prelude::*;
//! use strata::io::{ImageFileReader, ImageFileWriter, ImageSink, ImageSource};
//!
//! # fn main() -> Result<(), PipelineError> {
//! let image: ImageBuffer<u8, 2> = ImageFileReader::new("input.png").read()?;
//!
//! let mut graph = ProcessingGraph::new();
//! let source = graph.add_filter(ImageSourceNode::new(image));
//! let filter = graph.add_filter(BilateralImageFilter::<2>::new());
//! graph.set_input(filter, 0, source)?;
//!
//! let bilateral = graph.filter_mut::<BilateralImageFilter<2>>(filter)?;
//! bilateral.set_domain_sigma_all(2.0)?;
//! bilateral.set_range_sigma(20.0)?;
//!
//! let engine = ExecutionEngine::new();
//! engine.update(&mut graph, filter)?;
//!
//! if let Some(output) = graph.output(filter)? {
//!     ImageFileWriter::new("output.png").write(&*output, output.requested_region())?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Regions, buffers, pixel types, the node trait and errors
//! - [`graph`]: Graph structure and topology analysis
//! - [`execution`]: Update engine, worker dispatcher and progress
//! - [`filters`]: Built-in nodes and the filter registry
//! - [`io`]: Image sources and sinks
//! - [`validation`]: Pre-update validation pipeline
//! - [`config`]: TOML configuration
//!
//! ## Creating Custom Nodes
//!
//! Implement [`PipelineNode`](core::PipelineNode). The defaults copy the
//! first input's information and request the same region from every
//! input; override them when the node changes geometry or needs a
//! neighborhood.
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! #[derive(Default)]
//! struct Invert {
//!     modified: ModifiedTime,
//! }
//!
//! impl PipelineNode<u8, 2> for Invert {
//!     fn metadata(&self) -> NodeMetadata {
//!         NodeMetadata::builder("invert", "Invert").inputs(1).build()
//!     }
//!
//!     fn modified_time(&self) -> u64 {
//!         self.modified.get()
//!     }
//!
//!     fn compute(&mut self, ctx: &mut ComputeContext<'_, u8, 2>) -> PipelineResult<()> {
//!         let input = ctx.input(0)?;
//!         ctx.dispatch(|chunk| {
//!             for (index, value) in chunk.pixels_mut() {
//!                 *value = 255 - input.get(&index).unwrap_or(0);
//!             }
//!             Ok(())
//!         })
//!     }
//!
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod execution;
pub mod filters;
pub mod graph;
pub mod io;
pub mod validation;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use strata::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::buffer::{ImageBuffer, ImageInformation};
    pub use crate::core::pixel::Pixel;
    pub use crate::core::region::{Index, Region, Size};
    pub use crate::core::time::ModifiedTime;
    pub use crate::core::types::Value;

    // Node traits and types
    pub use crate::core::context::ComputeContext;
    pub use crate::core::node::{Category, NodeMetadata, PassthroughNode, PipelineNode};

    // Errors
    pub use crate::core::error::{
        GraphError, NodeId, PipelineError, PipelineResult, ValidationReport, ValidationWarning,
    };

    // Graph
    pub use crate::graph::connection::{Connection, Endpoint};
    pub use crate::graph::structure::{GraphNode, ProcessingGraph};
    pub use crate::graph::topology::TopologyAnalyzer;

    // Validation
    pub use crate::validation::pipeline::ValidationPipeline;
    pub use crate::validation::stages::{RegionValidation, StructuralValidation, ValidationStage};

    // Execution
    pub use crate::execution::dispatcher::{Dispatcher, OutputChunk};
    pub use crate::execution::engine::{ExecutionEngine, ExecutionOptions, UpdatePlan, UpdateStats};
    pub use crate::execution::progress::{ProgressCallback, ProgressTracker, ProgressUpdate, SkipReason};

    // Filters
    pub use crate::filters::registry::{FilterFactory, FilterRegistry};
    pub use crate::filters::{BilateralImageFilter, GaussianSmoothingFilter, ImageSourceNode};

    // Configuration
    pub use crate::config::PipelineConfig;
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "strata");
    }

    #[test]
    fn test_source_to_bilateral_pipeline() {
        let image = ImageBuffer::<u8, 2>::from_fn(
            ImageInformation::new(Region::from_size([12, 10])),
            |index| if index[0] < 6 { 20 } else { 200 },
        );

        let mut graph = ProcessingGraph::new();
        let source = graph.add_filter(ImageSourceNode::new(image));
        let filter = graph.add_filter(BilateralImageFilter::<2>::new());
        graph.set_input(filter, 0, source).unwrap();
        graph
            .filter_mut::<BilateralImageFilter<2>>(filter)
            .unwrap()
            .set_domain_sigma_all(1.0)
            .unwrap();

        assert!(ValidationPipeline::default().validate(&graph).is_valid());

        let engine = ExecutionEngine::new();
        let stats = engine.update(&mut graph, filter).unwrap();
        assert_eq!(stats.nodes_executed, 2);

        let output = graph.output(filter).unwrap().unwrap();
        assert_eq!(*output.buffered_region(), Region::from_size([12, 10]));
        assert_eq!(output.get(&[0, 0]), Some(20));
        assert_eq!(output.get(&[11, 9]), Some(200));

        let stats = engine.update(&mut graph, filter).unwrap();
        assert_eq!(stats.nodes_executed, 0);
    }

    #[test]
    fn test_registry_with_builtins() {
        let registry = FilterRegistry::<f32, 3>::with_builtins();
        assert!(registry.contains("bilateral"));
        assert!(registry.contains("gaussian"));
        assert!(registry.contains("passthrough"));
    }
}
