//! Final-metric assertions against a run summary
//!
//! The tracking client writes the last logged value of every metric to
//! `files/wandb-summary.json` in the run directory.

use crate::errors::{Result, WorkflowError};
use crate::runlog::latest_run_dir;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "wandb-summary.json";

/// Summary file of the latest run under `log_root`
pub fn summary_path(log_root: &Path) -> PathBuf {
    latest_run_dir(log_root).join("files").join(SUMMARY_FILE)
}

/// Read a summary file as a JSON object
pub fn read_summary(path: &Path) -> Result<Map<String, Value>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        WorkflowError::LossCheck(format!("Cannot read summary {}: {}", path.display(), e))
    })?;
    match serde_json::from_str::<Value>(&contents)? {
        Value::Object(map) => Ok(map),
        other => Err(WorkflowError::LossCheck(format!(
            "Summary {} is not a JSON object (found {})",
            path.display(),
            type_name(&other)
        ))),
    }
}

/// Outcome of comparing one metric against its threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossCheck {
    pub metric: String,
    pub value: f64,
    pub max: f64,
    pub passed: bool,
}

/// Compare `summary[metric]` against `max`; passes when strictly below.
///
/// A missing or non-numeric metric is an error rather than a failed check.
pub fn check_loss(summary: &Map<String, Value>, metric: &str, max: f64) -> Result<LossCheck> {
    let value = summary
        .get(metric)
        .ok_or_else(|| WorkflowError::LossCheck(format!("Metric {} not in summary", metric)))?;
    let value = value.as_f64().ok_or_else(|| {
        WorkflowError::LossCheck(format!(
            "Metric {} is not a number (found {})",
            metric,
            type_name(value)
        ))
    })?;

    Ok(LossCheck {
        metric: metric.to_string(),
        value,
        max,
        passed: value < max,
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn summary(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_loss_below_threshold_passes() {
        let s = summary(json!({"train/loss": 0.05, "_step": 200}));
        let check = check_loss(&s, "train/loss", 0.1).unwrap();
        assert!(check.passed);
        assert_eq!(check.value, 0.05);
    }

    #[test]
    fn test_loss_at_threshold_fails() {
        let s = summary(json!({"train/loss": 1.0}));
        assert!(!check_loss(&s, "train/loss", 1.0).unwrap().passed);
    }

    #[test]
    fn test_missing_or_non_numeric_metric_errors() {
        let s = summary(json!({"train/loss": "NaN"}));
        assert!(check_loss(&s, "train/loss", 1.0).is_err());
        assert!(check_loss(&s, "validation/loss", 1.0).is_err());
    }

    #[test]
    fn test_read_summary_from_latest_run() {
        let temp = TempDir::new().unwrap();
        let path = summary_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"train/loss": 0.25}"#).unwrap();

        let s = read_summary(&path).unwrap();
        assert_eq!(s.get("train/loss").and_then(Value::as_f64), Some(0.25));
    }

    #[test]
    fn test_read_summary_rejects_non_object() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SUMMARY_FILE);
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(read_summary(&path).is_err());
    }
}
