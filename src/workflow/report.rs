//! Per-step outcomes and the overall workflow verdict
//!
//! Steps never abort the workflow; each one appends a [`StepOutcome`] and
//! the verdict is computed from the full list at the end.

use crate::errors::Result;
use crate::runner::{CommandSpec, StepResult};
use crate::types::{RunId, TrackingEnv};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Workflow steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Train,
    ExtractTrainRun,
    CheckLoss,
    Stage,
    ExtractStageRun,
    Fetch,
    CleanupLocal,
    CleanupRemote,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Train => "train",
            Step::ExtractTrainRun => "extract-train-run",
            Step::CheckLoss => "check-loss",
            Step::Stage => "stage",
            Step::ExtractStageRun => "extract-stage-run",
            Step::Fetch => "fetch",
            Step::CleanupLocal => "cleanup-local",
            Step::CleanupRemote => "cleanup-remote",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    /// Not attempted; never counts as a failure by itself
    Skipped,
}

/// Which state the final cleanup removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupScope {
    /// Failure path: remote records are kept for inspection
    LocalOnly,
    /// Success path: local files and every captured run
    LocalAndRemote,
}

impl CleanupScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupScope::LocalOnly => "local-only",
            CleanupScope::LocalAndRemote => "local-and-remote",
        }
    }
}

/// How one step ended
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: Step,
    pub status: StepStatus,
    pub detail: Option<String>,
    pub command: Option<String>,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl StepOutcome {
    pub fn passed(step: Step, duration: Duration) -> Self {
        Self::new(step, StepStatus::Passed, None, duration)
    }

    pub fn failed(step: Step, detail: impl Into<String>, duration: Duration) -> Self {
        Self::new(step, StepStatus::Failed, Some(detail.into()), duration)
    }

    pub fn skipped(step: Step, detail: impl Into<String>) -> Self {
        Self::new(step, StepStatus::Skipped, Some(detail.into()), Duration::ZERO)
    }

    /// Outcome of an external command
    pub fn from_result(step: Step, spec: &CommandSpec, result: &StepResult) -> Self {
        Self {
            step,
            status: if result.success { StepStatus::Passed } else { StepStatus::Failed },
            detail: result.error.clone(),
            command: Some(spec.display()),
            exit_code: result.exit_code,
            duration_ms: result.duration_ms,
        }
    }

    /// Attach extra detail, keeping any existing message first
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        self.detail = Some(match self.detail.take() {
            Some(existing) => format!("{}; {}", existing, detail),
            None => detail,
        });
        self
    }

    fn new(step: Step, status: StepStatus, detail: Option<String>, duration: Duration) -> Self {
        Self {
            step,
            status,
            detail,
            command: None,
            exit_code: None,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Passed,
    Failed,
}

/// Everything one workflow execution did
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub env: TrackingEnv,
    pub project: String,
    pub staged_model_name: String,
    pub train_run: Option<RunId>,
    pub stage_run: Option<RunId>,
    pub steps: Vec<StepOutcome>,
    pub cleanup_scope: Option<CleanupScope>,
    /// Run ids handed to the remote cleanup command
    pub removed_run_ids: Vec<RunId>,
}

impl WorkflowReport {
    pub fn new(env: TrackingEnv, project: impl Into<String>, staged_model_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            env,
            project: project.into(),
            staged_model_name: staged_model_name.into(),
            train_run: None,
            stage_run: None,
            steps: Vec::new(),
            cleanup_scope: None,
            removed_run_ids: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: StepOutcome) {
        self.steps.push(outcome);
    }

    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps.iter().find(|o| o.step == step)
    }

    pub fn failed_steps(&self) -> Vec<Step> {
        self.steps
            .iter()
            .filter(|o| o.is_failure())
            .map(|o| o.step)
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(StepOutcome::is_failure)
    }

    pub fn status(&self) -> WorkflowStatus {
        if self.has_failures() {
            WorkflowStatus::Failed
        } else {
            WorkflowStatus::Passed
        }
    }

    /// Process exit code: 0 when every step passed or was skipped
    pub fn exit_code(&self) -> i32 {
        match self.status() {
            WorkflowStatus::Passed => 0,
            WorkflowStatus::Failed => 1,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Write the report as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
