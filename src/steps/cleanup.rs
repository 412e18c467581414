//! Local and remote cleanup
//!
//! Local cleanup always runs. Remote cleanup permanently deletes tracking
//! records, so it can only be built from an explicit, non-empty list of run
//! identifiers; there is no way to express "everything in the project".

use crate::config::Config;
use crate::errors::{CleanupError, Result};
use crate::runner::CommandSpec;
use crate::steps::script_command;
use crate::types::{Entity, RunId, RunIds};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Which artifacts of the selected runs the cleanup script removes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArtifactSelector {
    /// Every artifact logged by the runs
    All,
    /// Only artifacts that carry no alias
    NoAlias,
    /// Artifacts carrying any of these aliases
    Aliases(Vec<String>),
}

impl ArtifactSelector {
    pub fn aliases(aliases: Vec<String>) -> std::result::Result<Self, CleanupError> {
        if aliases.is_empty() {
            return Err(CleanupError::EmptyAliasList);
        }
        Ok(ArtifactSelector::Aliases(aliases))
    }

    fn to_args(&self) -> Vec<String> {
        match self {
            ArtifactSelector::All => vec!["--all".to_string()],
            ArtifactSelector::NoAlias => vec!["--no-alias".to_string()],
            ArtifactSelector::Aliases(aliases) => std::iter::once("--aliases".to_string())
                .chain(aliases.iter().cloned())
                .collect(),
        }
    }
}

/// Local staged-model directory to remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCleanup {
    pub dir: PathBuf,
}

impl LocalCleanup {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns whether anything was removed
    pub fn run(&self) -> Result<bool> {
        remove_local_artifacts(&self.dir)
    }
}

/// Recursively delete `dir`; a missing directory is not an error.
///
/// Returns whether the directory existed.
pub fn remove_local_artifacts(dir: &Path) -> Result<bool> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            tracing::debug!(dir = %dir.display(), "removed local artifacts");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// A scoped deletion of remote tracking records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteCleanup {
    entity: Entity,
    project: String,
    run_ids: RunIds,
    selector: ArtifactSelector,
    verbose: bool,
    dryrun: bool,
}

impl RemoteCleanup {
    /// Fails with [`CleanupError::UnscopedDeletion`] when `run_ids` is empty
    pub fn new(
        entity: Entity,
        project: impl Into<String>,
        run_ids: &[RunId],
        selector: ArtifactSelector,
    ) -> std::result::Result<Self, CleanupError> {
        let project = project.into();
        let run_ids = RunIds::new(run_ids.iter().cloned())
            .ok_or_else(|| CleanupError::UnscopedDeletion { project: project.clone() })?;
        if let ArtifactSelector::Aliases(aliases) = &selector {
            if aliases.is_empty() {
                return Err(CleanupError::EmptyAliasList);
            }
        }
        Ok(Self {
            entity,
            project,
            run_ids,
            selector,
            verbose: false,
            dryrun: false,
        })
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Only report what would be deleted
    pub fn dryrun(mut self, dryrun: bool) -> Self {
        self.dryrun = dryrun;
        self
    }

    pub fn run_ids(&self) -> &RunIds {
        &self.run_ids
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn command(&self, config: &Config) -> CommandSpec {
        let mut spec = cleanup_command_for(
            config,
            &self.entity,
            &self.project,
            self.run_ids.iter().map(|id| id.to_string()),
            &self.selector,
        );
        if self.verbose {
            spec = spec.arg("-v");
        }
        if self.dryrun {
            spec = spec.arg("--dryrun");
        }
        spec
    }
}

/// Cleanup command with free-form run references, for rendering plans only
pub(crate) fn cleanup_command_for(
    config: &Config,
    entity: &Entity,
    project: &str,
    run_refs: impl IntoIterator<Item = String>,
    selector: &ArtifactSelector,
) -> CommandSpec {
    script_command(config, &config.commands.cleanup_script)
        .flag("--entity", entity)
        .flag("--project", project)
        .arg("--run_ids")
        .args(run_refs)
        .args(selector.to_args())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ids(tokens: &[&str]) -> Vec<RunId> {
        tokens.iter().map(|t| RunId::parse(t).unwrap()).collect()
    }

    #[test]
    fn test_remove_local_artifacts() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("artifacts").join("test-dummy");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested").join("model.pt"), b"weights").unwrap();

        assert!(remove_local_artifacts(&dir).unwrap());
        assert!(!dir.exists());
    }

    #[test]
    fn test_remove_missing_dir_is_ok() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("never-created");
        assert!(!LocalCleanup::new(&dir).run().unwrap());
    }

    #[test]
    fn test_remote_cleanup_rejects_empty_ids() {
        let err = RemoteCleanup::new(
            Entity::default(),
            "fsdl-testing-2022",
            &[],
            ArtifactSelector::All,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CleanupError::UnscopedDeletion { project: "fsdl-testing-2022".to_string() }
        );
    }

    #[test]
    fn test_remote_cleanup_rejects_empty_aliases() {
        assert_eq!(ArtifactSelector::aliases(vec![]), Err(CleanupError::EmptyAliasList));
        let err = RemoteCleanup::new(
            Entity::default(),
            "p",
            &ids(&["abc"]),
            ArtifactSelector::Aliases(vec![]),
        )
        .unwrap_err();
        assert_eq!(err, CleanupError::EmptyAliasList);
    }

    #[test]
    fn test_remote_cleanup_command() {
        let config = Config::default();
        let cleanup = RemoteCleanup::new(
            Entity::default(),
            "fsdl-testing-2022",
            &ids(&["train1", "stage2"]),
            ArtifactSelector::All,
        )
        .unwrap()
        .verbose(true);

        let spec = cleanup.command(&config);
        assert_eq!(spec.args[0], "training/cleanup_artifacts.py");
        assert_eq!(spec.flag_value("--project"), Some("fsdl-testing-2022"));
        let at = spec.args.iter().position(|a| a == "--run_ids").unwrap();
        assert_eq!(&spec.args[at + 1..at + 3], &["train1".to_string(), "stage2".to_string()]);
        assert!(spec.has_arg("--all"));
        assert!(spec.has_arg("-v"));
        assert!(!spec.has_arg("--dryrun"));
    }

    #[test]
    fn test_alias_selector_args() {
        let config = Config::default();
        let cleanup = RemoteCleanup::new(
            Entity::new("fsdl"),
            "p",
            &ids(&["abc"]),
            ArtifactSelector::aliases(vec!["latest".to_string(), "best".to_string()]).unwrap(),
        )
        .unwrap()
        .dryrun(true);

        let spec = cleanup.command(&config);
        let at = spec.args.iter().position(|a| a == "--aliases").unwrap();
        assert_eq!(spec.args[at + 1], "latest");
        assert_eq!(spec.args[at + 2], "best");
        assert!(spec.has_arg("--dryrun"));
        assert!(!spec.has_arg("--all"));
    }
}
