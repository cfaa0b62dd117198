//! Individual validation stages.
//!
//! Each stage checks for a specific category of errors.

use crate::core::error::{GraphError, PipelineError, ValidationWarning};
use crate::core::pixel::Pixel;
use crate::execution::ExecutionEngine;
use crate::graph::structure::ProcessingGraph;
use crate::graph::topology::TopologyAnalyzer;

/// Trait for validation stages.
pub trait ValidationStage<P: Pixel, const D: usize>: Send + Sync {
    /// Name of this validation stage.
    fn name(&self) -> &str;

    /// Validate the graph.
    ///
    /// Returns Ok with warnings, or Err with errors.
    fn validate(
        &self,
        graph: &ProcessingGraph<P, D>,
    ) -> Result<Vec<ValidationWarning>, Vec<PipelineError>>;
}

/// Structural validation - checks graph structure.
///
/// Verifies:
/// - Graph is a DAG (no cycles)
/// - Every input slot is connected
pub struct StructuralValidation;

impl<P: Pixel, const D: usize> ValidationStage<P, D> for StructuralValidation {
    fn name(&self) -> &str {
        "Structural Validation"
    }

    fn validate(
        &self,
        graph: &ProcessingGraph<P, D>,
    ) -> Result<Vec<ValidationWarning>, Vec<PipelineError>> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if graph.is_empty() {
            warnings.push(ValidationWarning {
                message: "Graph is empty".to_string(),
                node_id: None,
            });
            return Ok(warnings);
        }

        let analyzer = TopologyAnalyzer::new(graph);
        if let Err(error) = analyzer.topological_sort() {
            errors.push(error.into());
        }

        for node in graph.nodes() {
            let slots = node.filter.metadata().input_count;
            for slot in 0..slots {
                if graph.connection_to_slot(node.id, slot).is_none() {
                    errors.push(
                        GraphError::MissingInput {
                            node_id: node.id,
                            slot,
                        }
                        .into(),
                    );
                }
            }
        }

        // Disconnected subgraphs are legal but usually a wiring mistake
        let subgraphs = analyzer.find_subgraphs();
        if subgraphs.len() > 1 {
            warnings.push(ValidationWarning {
                message: format!("Graph contains {} disconnected subgraphs", subgraphs.len()),
                node_id: None,
            });
        }

        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(errors)
        }
    }
}

/// Region validation - dry-runs the negotiation of every terminal node.
///
/// Catches requested regions that fall outside a producer's largest
/// possible region before any data is generated.
pub struct RegionValidation;

impl<P: Pixel, const D: usize> ValidationStage<P, D> for RegionValidation {
    fn name(&self) -> &str {
        "Region Validation"
    }

    fn validate(
        &self,
        graph: &ProcessingGraph<P, D>,
    ) -> Result<Vec<ValidationWarning>, Vec<PipelineError>> {
        let engine = ExecutionEngine::new();
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        for terminal in graph.get_sink_nodes() {
            match engine.plan(graph, terminal) {
                Ok(plan) => {
                    let empty = plan.region(terminal).is_some_and(|region| region.is_empty());
                    if empty {
                        warnings.push(ValidationWarning {
                            message: "Terminal node requests an empty region".to_string(),
                            node_id: Some(terminal),
                        });
                    }
                }
                Err(error) => errors.push(error),
            }
        }

        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(errors)
        }
    }
}
