//! Core types and traits for the Strata pipeline.
//!
//! This module contains the foundational types every node works with:
//! - Region arithmetic and sample types
//! - Image buffers and their spatial metadata
//! - The node capability trait and compute context
//! - The modification clock
//! - Error types

pub mod buffer;
pub mod context;
pub mod error;
pub mod node;
pub mod pixel;
pub mod region;
pub mod time;
pub mod types;

// Re-export commonly used types
pub use buffer::{ImageBuffer, ImageInformation};
pub use context::ComputeContext;
pub use error::{GraphError, NodeId, PipelineError, PipelineResult};
pub use node::{Category, NodeMetadata, PipelineNode};
pub use pixel::Pixel;
pub use region::{Index, Region, Size};
pub use time::ModifiedTime;
pub use types::Value;
