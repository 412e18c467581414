//! Staging a checkpoint and fetching the staged model back

use crate::config::Config;
use crate::runner::CommandSpec;
use crate::steps::script_command;
use crate::types::{RunId, StagedModelName};

/// Stage the checkpoint tagged `ckpt_alias` in `run` as `name`.
///
/// Source and destination are the same resolved project, so the fetch that
/// follows looks where the staging wrote.
pub fn stage_command(config: &Config, run: &RunId, name: &StagedModelName) -> CommandSpec {
    stage_command_for(config, run.as_str(), name)
}

/// Stage command with a free-form run reference, for rendering plans only
pub(crate) fn stage_command_for(config: &Config, run: &str, name: &StagedModelName) -> CommandSpec {
    let project = config.project();
    script_command(config, &config.commands.stage_script)
        .flag("--entity", &config.tracking.entity)
        .flag("--run", run)
        .flag("--staged_model_name", name)
        .flag("--ckpt_alias", &config.staging.ckpt_alias)
        .flag("--to_project", project)
        .flag("--from_project", project)
}

/// Download the latest version of `name` into the artifact root
pub fn fetch_command(config: &Config, name: &StagedModelName) -> CommandSpec {
    script_command(config, &config.commands.stage_script)
        .flag("--entity", &config.tracking.entity)
        .arg("--fetch")
        .flag("--from_project", config.project())
        .flag("--staged_model_name", name)
}
