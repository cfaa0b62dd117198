//! Filter module.
//!
//! Contains the built-in nodes, the weight tables they share and the filter
//! registry.

pub mod bilateral;
pub mod gaussian;
pub mod kernel;
pub mod registry;
pub mod source;

pub use bilateral::BilateralImageFilter;
pub use gaussian::GaussianSmoothingFilter;
pub use kernel::{DomainKernel, RangeTable, RANGE_CUTOFF_SIGMAS};
pub use registry::{FilterFactory, FilterRegistry};
pub use source::ImageSourceNode;
