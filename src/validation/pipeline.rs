//! Validation pipeline implementation.

use crate::core::error::ValidationReport;
use crate::core::pixel::Pixel;
use crate::graph::structure::ProcessingGraph;
use crate::validation::stages::{RegionValidation, StructuralValidation, ValidationStage};
use log::{debug, warn};
use std::time::Instant;

/// Multi-stage validation pipeline.
///
/// Runs a series of validation stages on a graph to check for errors
/// before an update begins. A stage reporting errors stops the pipeline.
pub struct ValidationPipeline<P: Pixel, const D: usize> {
    stages: Vec<Box<dyn ValidationStage<P, D>>>,
}

impl<P: Pixel, const D: usize> ValidationPipeline<P, D> {
    /// Create a new pipeline with the given stages.
    pub fn new(stages: Vec<Box<dyn ValidationStage<P, D>>>) -> Self {
        Self { stages }
    }

    /// Structural checks followed by a dry-run region negotiation.
    pub fn default_pipeline() -> Self {
        Self {
            stages: vec![Box::new(StructuralValidation), Box::new(RegionValidation)],
        }
    }

    /// Structural checks only.
    pub fn minimal_pipeline() -> Self {
        Self {
            stages: vec![Box::new(StructuralValidation)],
        }
    }

    /// Add a custom validation stage.
    pub fn add_stage(&mut self, stage: Box<dyn ValidationStage<P, D>>) {
        self.stages.push(stage);
    }

    /// Validate a graph through all stages.
    pub fn validate(&self, graph: &ProcessingGraph<P, D>) -> ValidationReport {
        let start = Instant::now();
        let mut report = ValidationReport::new();

        for stage in &self.stages {
            debug!("running {}", stage.name());
            match stage.validate(graph) {
                Ok(warnings) => {
                    for warning in warnings {
                        warn!("{}: {}", stage.name(), warning.message);
                        report.add_warning(warning);
                    }
                }
                Err(errors) => {
                    for error in errors {
                        report.add_error(error);
                    }
                    break;
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }

    /// Quick validation - just check if the graph can be updated.
    pub fn can_execute(&self, graph: &ProcessingGraph<P, D>) -> bool {
        self.validate(graph).is_valid()
    }
}

impl<P: Pixel, const D: usize> Default for ValidationPipeline<P, D> {
    fn default() -> Self {
        Self::default_pipeline()
    }
}
