//! Type definitions module
//!
//! Identifiers and names passed between workflow steps.

pub mod run;
pub mod project;

// Re-export commonly used types
pub use run::{RunId, RunIds};
pub use project::{Entity, ProjectNamespace, StagedModelName, TrackingEnv};
