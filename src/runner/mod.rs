//! External command execution
//!
//! Every workflow step is one blocking external process. The
//! [`CommandRunner`] trait is the seam between the workflow and the
//! operating system, so the driver can be exercised without Python or a
//! tracking backend.

pub mod types;
pub mod process;

pub use types::{CommandSpec, StepResult};
pub use process::ProcessRunner;

use crate::errors::Result;
use async_trait::async_trait;

/// Runs one external command to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `spec` on behalf of `step`.
    ///
    /// A command that launches and exits non-zero is `Ok` with an
    /// unsuccessful [`StepResult`]; `Err` is reserved for failures of the
    /// runner itself.
    async fn run(&self, step: &str, spec: &CommandSpec) -> Result<StepResult>;
}
