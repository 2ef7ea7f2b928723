//! Validation module for auditing graph invariants.
//!
//! The graph keeps its invariants on every mutation; the pipeline re-checks
//! them from scratch, e.g. after bulk edits or in tests.

pub mod pipeline;
pub mod stages;

pub use pipeline::ValidationPipeline;
pub use stages::{StructuralValidation, TypeValidation, ValidationStage, ValueValidation};
