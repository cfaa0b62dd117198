//! Validation module for pre-update checking.
//!
//! The validation pipeline runs before an update to catch wiring and
//! region errors without generating any data.

pub mod pipeline;
pub mod stages;

pub use pipeline::ValidationPipeline;
pub use stages::{RegionValidation, StructuralValidation, ValidationStage};
