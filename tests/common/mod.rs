//! Scripted command runner for driving the workflow without Python
//!
//! Mimics the side effects of the real scripts on the local filesystem:
//! training and staging each replace `wandb/latest-run` with a fresh run
//! file, fetching writes the staged model directory.

#![allow(dead_code)]

use async_trait::async_trait;
use modelcycle::config::Config;
use modelcycle::runlog::latest_run_dir;
use modelcycle::runner::{CommandRunner, CommandSpec, StepResult};
use modelcycle::Result;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

pub const TRAIN_RUN: &str = "tr41nRun";
pub const STAGE_RUN: &str = "st4geRun";

/// Model classes the fake training script accepts
const KNOWN_MODEL_CLASSES: &[&str] = &["ResnetTransformer", "LineCNNTransformer"];

pub struct ScriptedRunner {
    log_root: PathBuf,
    staged_dir: PathBuf,
    calls: Mutex<Vec<(String, CommandSpec)>>,
    failing: HashSet<String>,
    train_files: Vec<String>,
    train_logs: bool,
    loss: f64,
}

impl ScriptedRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            log_root: config.log_root(),
            staged_dir: config.staged_model_dir(),
            calls: Mutex::new(Vec::new()),
            failing: HashSet::new(),
            train_files: vec![format!("run-{}.wandb", TRAIN_RUN)],
            train_logs: true,
            loss: 0.5,
        }
    }

    /// Make `step` exit non-zero without side effects
    pub fn failing(mut self, step: &str) -> Self {
        self.failing.insert(step.to_string());
        self
    }

    /// Run files training leaves in the latest run directory
    pub fn train_files(mut self, files: &[&str]) -> Self {
        self.train_files = files.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Training exits 0 but leaves the log directory untouched
    pub fn train_without_logging(mut self) -> Self {
        self.train_logs = false;
        self
    }

    pub fn loss(mut self, loss: f64) -> Self {
        self.loss = loss;
        self
    }

    pub fn calls(&self) -> Vec<(String, CommandSpec)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn steps_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|(step, _)| step).collect()
    }

    pub fn call(&self, step: &str) -> Option<CommandSpec> {
        self.calls()
            .into_iter()
            .find(|(s, _)| s == step)
            .map(|(_, spec)| spec)
    }

    fn replace_latest_run(&self, files: &[String]) {
        let latest = latest_run_dir(&self.log_root);
        let _ = fs::remove_dir_all(&latest);
        fs::create_dir_all(latest.join("files")).unwrap();
        for file in files {
            fs::write(latest.join(file), b"").unwrap();
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, step: &str, spec: &CommandSpec) -> Result<StepResult> {
        self.calls
            .lock()
            .unwrap()
            .push((step.to_string(), spec.clone()));
        let elapsed = Duration::from_millis(3);

        if self.failing.contains(step) {
            return Ok(StepResult::with_exit_code(
                step.to_string(),
                format!("{} exploded", step),
                1,
                elapsed,
            ));
        }

        match step {
            "train" => {
                let model_class = spec.flag_value("--model_class").unwrap_or_default();
                if !KNOWN_MODEL_CLASSES.contains(&model_class) {
                    return Ok(StepResult::with_exit_code(
                        step.to_string(),
                        format!("AttributeError: module has no attribute '{}'", model_class),
                        1,
                        elapsed,
                    ));
                }
                if !self.train_logs {
                    return Ok(StepResult::success(step.to_string(), String::new(), elapsed));
                }
                self.replace_latest_run(&self.train_files);
                let summary = serde_json::json!({ "train/loss": self.loss, "epoch": 0 });
                fs::write(
                    latest_run_dir(&self.log_root).join("files").join("wandb-summary.json"),
                    summary.to_string(),
                )
                .unwrap();
            }
            "stage" => {
                self.replace_latest_run(&[format!("run-{}.wandb", STAGE_RUN)]);
            }
            "fetch" => {
                fs::create_dir_all(&self.staged_dir).unwrap();
                fs::write(self.staged_dir.join("model.pt"), b"weights").unwrap();
            }
            _ => {}
        }

        Ok(StepResult::success(step.to_string(), String::new(), elapsed))
    }
}

/// Config rooted in a temporary project directory
pub fn config_in(root: &Path) -> Config {
    let mut config = Config::default();
    config.commands.project_root = Some(root.to_string_lossy().to_string());
    config
}

pub fn temp_project() -> (TempDir, Config) {
    let temp = TempDir::new().unwrap();
    let config = config_in(temp.path());
    (temp, config)
}

/// Leave a run file from an earlier workflow under `latest-run`
pub fn seed_latest_run(config: &Config, token: &str) {
    let latest = latest_run_dir(&config.log_root());
    fs::create_dir_all(latest.join("files")).unwrap();
    fs::write(latest.join(format!("run-{}.wandb", token)), b"").unwrap();
}

/// Run ids listed after `--run_ids` in a cleanup command
pub fn run_ids_arg(spec: &CommandSpec) -> Vec<String> {
    spec.args
        .iter()
        .skip_while(|a| *a != "--run_ids")
        .skip(1)
        .take_while(|a| !a.starts_with('-'))
        .cloned()
        .collect()
}
