//! Run identifier extraction
//!
//! The tracking client does not report the id of the run it creates, so it
//! is recovered from the `run-<token>.<ext>` file it leaves in the latest
//! run directory.

use crate::errors::{Result, RunIdError, WorkflowError};
use crate::runlog::latest_run_dir;
use crate::types::RunId;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::Path;

const RUN_FILE_PREFIX: &str = "run-";

/// `run-ab12CD34.wandb` with extension `wandb` gives `ab12CD34`
pub fn parse_run_file_name(name: &str, extension: &str) -> Option<RunId> {
    let token = name
        .strip_prefix(RUN_FILE_PREFIX)?
        .strip_suffix(extension)?
        .strip_suffix('.')?;
    RunId::parse(token).ok()
}

/// Extract the single run id under `<log_root>/wandb/latest-run`
pub fn extract_run_id(log_root: &Path, extension: &str) -> Result<RunId> {
    extract_run_id_from(&latest_run_dir(log_root), extension)
}

/// Like [`extract_run_id`], but a token equal to `previous` is stale.
///
/// A step that fails before creating its own run leaves `latest-run`
/// pointing at the run captured before it.
pub fn extract_new_run_id(
    log_root: &Path,
    extension: &str,
    previous: Option<&RunId>,
) -> Result<RunId> {
    let id = extract_run_id(log_root, extension)?;
    if previous == Some(&id) {
        return Err(RunIdError::Stale { id: id.to_string() }.into());
    }
    Ok(id)
}

/// Extract the single run id found anywhere under `dir`
pub fn extract_run_id_from(dir: &Path, extension: &str) -> Result<RunId> {
    let mut found = BTreeSet::new();
    match scan(dir, extension, &mut found) {
        Ok(()) => {}
        Err(WorkflowError::IoError(e)) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let dir_name = dir.display().to_string();
    let mut ids = found.into_iter();
    match (ids.next(), ids.next()) {
        (None, _) => Err(RunIdError::NotFound { dir: dir_name }.into()),
        (Some(id), None) => {
            tracing::debug!(run_id = %id, dir = %dir_name, "captured run id");
            Ok(id)
        }
        (Some(first), Some(second)) => {
            let candidates = [first, second]
                .into_iter()
                .chain(ids)
                .map(|id| id.to_string())
                .collect();
            Err(RunIdError::Ambiguous { dir: dir_name, candidates }.into())
        }
    }
}

fn scan(dir: &Path, extension: &str, found: &mut BTreeSet<RunId>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            scan(&entry.path(), extension, found)?;
            continue;
        }

        if let Some(id) = parse_run_file_name(&entry.file_name().to_string_lossy(), extension) {
            found.insert(id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_run_file_name() {
        assert_eq!(
            parse_run_file_name("run-ab12CD34.wandb", "wandb").unwrap().as_str(),
            "ab12CD34"
        );
        assert!(parse_run_file_name("run-.wandb", "wandb").is_none());
        assert!(parse_run_file_name("run-ab12.log", "wandb").is_none());
        assert!(parse_run_file_name("run-ab_12.wandb", "wandb").is_none());
        assert!(parse_run_file_name("xrun-ab12.wandb", "wandb").is_none());
        assert!(parse_run_file_name("run-ab12wandb", "wandb").is_none());
        assert!(parse_run_file_name("debug.log", "wandb").is_none());
    }

    #[test]
    fn test_single_file_extracts_token() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("run-ab12CD34.wandb"), b"").unwrap();

        let id = extract_run_id_from(temp.path(), "wandb").unwrap();
        assert_eq!(id.as_str(), "ab12CD34");
    }

    #[test]
    fn test_nested_and_unrelated_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("files")).unwrap();
        fs::create_dir_all(temp.path().join("logs")).unwrap();
        fs::write(temp.path().join("files").join("wandb-summary.json"), b"{}").unwrap();
        fs::write(temp.path().join("logs").join("debug.log"), b"").unwrap();
        fs::write(temp.path().join("logs").join("run-x9Y8.wandb"), b"").unwrap();

        assert_eq!(extract_run_id_from(temp.path(), "wandb").unwrap().as_str(), "x9Y8");
    }

    #[test]
    fn test_no_match_is_not_found() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("output.log"), b"").unwrap();

        let err = extract_run_id_from(temp.path(), "wandb").unwrap_err();
        assert!(matches!(err, WorkflowError::RunId(RunIdError::NotFound { .. })));
    }

    #[test]
    fn test_missing_dir_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = extract_run_id(&temp.path().join("training/logs"), "wandb").unwrap_err();
        assert!(matches!(err, WorkflowError::RunId(RunIdError::NotFound { .. })));
    }

    #[test]
    fn test_two_matches_are_ambiguous() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("run-aaa.wandb"), b"").unwrap();
        fs::write(temp.path().join("run-bbb.wandb"), b"").unwrap();

        match extract_run_id_from(temp.path(), "wandb").unwrap_err() {
            WorkflowError::RunId(RunIdError::Ambiguous { candidates, .. }) => {
                assert_eq!(candidates, vec!["aaa".to_string(), "bbb".to_string()]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_same_token_twice_is_not_ambiguous() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("run-aaa.wandb"), b"").unwrap();
        fs::write(temp.path().join("sub").join("run-aaa.wandb"), b"").unwrap();

        assert_eq!(extract_run_id_from(temp.path(), "wandb").unwrap().as_str(), "aaa");
    }

    #[test]
    fn test_stale_run_is_rejected() {
        let temp = TempDir::new().unwrap();
        let latest = latest_run_dir(temp.path());
        fs::create_dir_all(&latest).unwrap();
        fs::write(latest.join("run-old1.wandb"), b"").unwrap();

        let previous = RunId::parse("old1").unwrap();
        let err = extract_new_run_id(temp.path(), "wandb", Some(&previous)).unwrap_err();
        assert!(matches!(err, WorkflowError::RunId(RunIdError::Stale { .. })));

        let other = RunId::parse("other").unwrap();
        assert_eq!(
            extract_new_run_id(temp.path(), "wandb", Some(&other)).unwrap(),
            previous
        );
    }
}
