//! modelcycle - model lifecycle workflow driver
//!
//! Trains a small model, stages its checkpoint under a name, fetches it
//! back, and cleans up afterwards. Every step is an external command; this
//! crate sequences them, recovers the run ids they create, and scopes the
//! final cleanup to exactly those runs.
//!
//! # Architecture
//!
//! - **runner**: command specs and the process-backed [`runner::CommandRunner`]
//! - **steps**: command builders for training, staging, fetching and cleanup
//! - **runlog**: run-id recovery and metric summaries from local logs
//! - **workflow**: the driver and its report

pub mod errors;
pub mod types;
pub mod config;
pub mod runner;
pub mod steps;
pub mod runlog;
pub mod workflow;

// Re-export commonly used types
pub use errors::{Result, WorkflowError};
pub use workflow::{Workflow, WorkflowReport};

// Presentation
pub mod cli;
pub mod display;
pub mod telemetry;
pub mod doctor;
