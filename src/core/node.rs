//! PipelineNode trait and node metadata.
//!
//! The PipelineNode trait is the capability interface every node variant
//! implements. It mirrors the two phases of an update:
//!
//! 1. **Information** (`generate_output_information`): derive output
//!    metadata from input metadata. No samples move.
//! 2. **Data** (`generate_input_requested_region`, then `compute`): say
//!    which input regions are needed for a requested output region, then
//!    fill the output buffer.

use crate::core::buffer::ImageInformation;
use crate::core::context::ComputeContext;
use crate::core::error::{PipelineError, PipelineResult};
use crate::core::pixel::Pixel;
use crate::core::region::Region;
use crate::core::time::ModifiedTime;
use crate::core::types::Value;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Category for organizing nodes in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Nodes that bring data into the pipeline
    Source,
    /// Smoothing and denoising filters
    Smoothing,
    /// Utility nodes
    Utility,
    /// Custom/user-defined
    #[default]
    Custom,
}

impl Category {
    /// Get the display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Source => "Source",
            Category::Smoothing => "Smoothing",
            Category::Utility => "Utility",
            Category::Custom => "Custom",
        }
    }
}

/// Metadata describing a node type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Unique identifier for this node type (e.g., "bilateral")
    pub id: String,
    /// Human-readable name (e.g., "Bilateral Filter")
    pub name: String,
    /// Category for organization
    pub category: Category,
    /// Detailed description
    pub description: String,
    /// Number of input slots
    pub input_count: usize,
    /// Names of parameters accepted by `set_parameter`
    pub parameters: Vec<String>,
}

impl NodeMetadata {
    /// Create a new metadata builder.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> NodeMetadataBuilder {
        NodeMetadataBuilder::new(id, name)
    }
}

/// Builder for NodeMetadata.
pub struct NodeMetadataBuilder {
    id: String,
    name: String,
    category: Category,
    description: String,
    input_count: usize,
    parameters: Vec<String>,
}

impl NodeMetadataBuilder {
    /// Create a new builder with required fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: Category::Custom,
            description: String::new(),
            input_count: 0,
            parameters: Vec::new(),
        }
    }

    /// Set the category.
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the number of input slots.
    pub fn inputs(mut self, count: usize) -> Self {
        self.input_count = count;
        self
    }

    /// Add a parameter name.
    pub fn parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(name.into());
        self
    }

    /// Build the metadata.
    pub fn build(self) -> NodeMetadata {
        NodeMetadata {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            input_count: self.input_count,
            parameters: self.parameters,
        }
    }
}

/// The capability interface for pipeline nodes.
///
/// # Timestamps
///
/// `modified_time` must advance whenever a parameter that affects the
/// output changes. The engine compares it against the node's last update to
/// decide whether cached output can be reused.
///
/// # Thread Safety
///
/// `compute` is called from the thread driving the update. A node may fan
/// its per-pixel work out through [`ComputeContext::dispatch`]; state read
/// by the chunk closure must not change for the duration of that call.
pub trait PipelineNode<P: Pixel, const D: usize>: Send + Sync + 'static {
    /// Get the metadata for this node.
    fn metadata(&self) -> NodeMetadata;

    /// Tick of the last parameter change.
    fn modified_time(&self) -> u64;

    /// Derive output metadata from input metadata.
    ///
    /// The default copies the first input's information.
    fn generate_output_information(
        &self,
        inputs: &[&ImageInformation<D>],
    ) -> PipelineResult<ImageInformation<D>> {
        inputs.first().map(|info| (*info).clone()).ok_or_else(|| {
            PipelineError::Config(format!(
                "node '{}' has no inputs and does not generate information",
                self.metadata().id
            ))
        })
    }

    /// Regions needed from each input to produce `output_region`.
    ///
    /// The default requests exactly `output_region` from every input.
    fn generate_input_requested_region(
        &self,
        output_region: &Region<D>,
        inputs: &[&ImageInformation<D>],
    ) -> PipelineResult<Vec<Region<D>>> {
        Ok(vec![*output_region; inputs.len()])
    }

    /// Fill the output buffer's buffered region.
    fn compute(&mut self, ctx: &mut ComputeContext<'_, P, D>) -> PipelineResult<()>;

    /// Set a parameter by name.
    fn set_parameter(&mut self, name: &str, _value: &Value) -> PipelineResult<()> {
        Err(PipelineError::parameter(
            name,
            format!("node '{}' has no such parameter", self.metadata().id),
        ))
    }

    /// Current parameter values by name.
    fn parameters(&self) -> Vec<(String, Value)> {
        Vec::new()
    }

    /// Downcasting support for typed access through the graph.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcasting support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A node that copies its input to its output unchanged.
///
/// Useful for debugging and for exercising the engine without any
/// numeric work.
#[derive(Debug, Clone, Default)]
pub struct PassthroughNode {
    modified: ModifiedTime,
}

impl PassthroughNode {
    /// Create a new passthrough node.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: Pixel, const D: usize> PipelineNode<P, D> for PassthroughNode {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder("passthrough", "Passthrough")
            .category(Category::Utility)
            .description("Passes the input through unchanged")
            .inputs(1)
            .build()
    }

    fn modified_time(&self) -> u64 {
        self.modified.get()
    }

    fn compute(&mut self, ctx: &mut ComputeContext<'_, P, D>) -> PipelineResult<()> {
        let input = ctx.input(0)?;
        ctx.dispatch(|chunk| {
            for (index, value) in chunk.pixels_mut() {
                *value = input.get(&index).unwrap_or_default();
            }
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let metadata = NodeMetadata::builder("test_filter", "Test Filter")
            .category(Category::Utility)
            .description("A test filter")
            .inputs(2)
            .parameter("sigma")
            .build();

        assert_eq!(metadata.id, "test_filter");
        assert_eq!(metadata.name, "Test Filter");
        assert_eq!(metadata.category, Category::Utility);
        assert_eq!(metadata.input_count, 2);
        assert_eq!(metadata.parameters, vec!["sigma".to_string()]);
    }

    #[test]
    fn test_passthrough_defaults() {
        let node = PassthroughNode::new();
        let metadata = <PassthroughNode as PipelineNode<u8, 2>>::metadata(&node);
        assert_eq!(metadata.id, "passthrough");
        assert_eq!(metadata.input_count, 1);

        let info = ImageInformation::new(Region::from_size([4, 4]));
        let derived = <PassthroughNode as PipelineNode<u8, 2>>::generate_output_information(&node, &[&info]).unwrap();
        assert_eq!(derived, info);

        let error = <PassthroughNode as PipelineNode<u8, 2>>::set_parameter(
            &mut PassthroughNode::new(),
            "sigma",
            &Value::Float(1.0),
        );
        assert!(matches!(error, Err(PipelineError::Parameter { .. })));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Smoothing.display_name(), "Smoothing");
        assert_eq!(Category::default(), Category::Custom);
    }
}
