//! Validation pipeline implementation.

use crate::core::error::ValidationReport;
use crate::graph::structure::Graph;
use crate::validation::stages::{StructuralValidation, TypeValidation, ValidationStage, ValueValidation};
use std::time::Instant;

/// Multi-stage validation pipeline.
///
/// Runs a series of validation stages over a graph and collects what they
/// find. The graph maintains its invariants itself, so a failing report
/// points at a bug rather than at user input.
pub struct ValidationPipeline {
    stages: Vec<Box<dyn ValidationStage>>,
}

impl ValidationPipeline {
    /// Create a new pipeline with the given stages.
    pub fn new(stages: Vec<Box<dyn ValidationStage>>) -> Self {
        Self { stages }
    }

    /// Create the default validation pipeline with all standard stages.
    pub fn default_pipeline() -> Self {
        Self {
            stages: vec![
                Box::new(StructuralValidation),
                Box::new(TypeValidation),
                Box::new(ValueValidation),
            ],
        }
    }

    /// Create a minimal pipeline (just structural and type checks).
    pub fn minimal_pipeline() -> Self {
        Self {
            stages: vec![Box::new(StructuralValidation), Box::new(TypeValidation)],
        }
    }

    /// Add a custom validation stage.
    pub fn add_stage(&mut self, stage: Box<dyn ValidationStage>) {
        self.stages.push(stage);
    }

    /// Names of the stages, in run order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Validate a graph through all stages.
    pub fn validate(&self, graph: &Graph) -> ValidationReport {
        let start = Instant::now();
        let mut report = ValidationReport::new();

        for stage in &self.stages {
            match stage.validate(graph) {
                Ok(warnings) => {
                    for warning in warnings {
                        report.add_warning(warning);
                    }
                }
                Err(errors) => {
                    for error in errors {
                        let is_fatal = error.is_fatal();
                        report.add_error(error);

                        // Stop on fatal errors
                        if is_fatal {
                            report.duration_ms = start.elapsed().as_millis() as u64;
                            return report;
                        }
                    }
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }

    /// Quick check - true if no stage reported an error.
    pub fn is_consistent(&self, graph: &Graph) -> bool {
        self.validate(graph).success
    }
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::default_pipeline()
    }
}
