//! Builders for the external commands each workflow step runs
//!
//! Nothing here executes anything: each function turns configuration into a
//! [`CommandSpec`](crate::runner::CommandSpec) for the runner.

pub mod train;
pub mod stage;
pub mod cleanup;

pub use train::train_command;
pub use stage::{fetch_command, stage_command};
pub use cleanup::{remove_local_artifacts, ArtifactSelector, LocalCleanup, RemoteCleanup};

use crate::config::Config;
use crate::runner::CommandSpec;

/// Environment variable the tracking client reads its project from
pub const PROJECT_ENV_VAR: &str = "WANDB_PROJECT";

/// `<python> <script>` running in the configured project root
pub(crate) fn script_command(config: &Config, script: &str) -> CommandSpec {
    CommandSpec::new(&config.commands.python)
        .arg(script)
        .current_dir(config.project_root())
}
