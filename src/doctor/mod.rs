//! Doctor command for environment diagnostics
//!
//! Checks that the interpreter and scripts the workflow launches are there
//! and that the directories it writes to are usable.

use crate::config::Config;
use crate::runlog::latest_run_dir;
use crate::runner::{CommandRunner, CommandSpec};
use colored::Colorize;
use std::path::Path;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor<'a, R: CommandRunner> {
    config: &'a Config,
    runner: &'a R,
}

impl<'a, R: CommandRunner> Doctor<'a, R> {
    pub fn new(config: &'a Config, runner: &'a R) -> Self {
        Self { config, runner }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let commands = &self.config.commands;
        vec![
            self.check_interpreter().await,
            self.check_project_root(),
            self.check_script("Train script", &commands.train_script),
            self.check_script("Stage script", &commands.stage_script),
            self.check_script("Cleanup script", &commands.cleanup_script),
            self.check_writable("Log root", &self.config.log_root()),
            self.check_writable("Artifact root", &self.config.resolve(&self.config.staging.artifact_root)),
            self.check_latest_run(),
        ]
    }

    /// Check 1: interpreter runs
    async fn check_interpreter(&self) -> HealthCheck {
        let spec = CommandSpec::new(&self.config.commands.python).arg("--version");
        match self.runner.run("doctor", &spec).await {
            Ok(result) if result.success => HealthCheck::new("Interpreter", HealthStatus::Pass),
            Ok(result) => HealthCheck::new(
                "Interpreter",
                HealthStatus::Fail(format!(
                    "{} --version failed: {}",
                    self.config.commands.python,
                    result.error.unwrap_or_else(|| "unknown error".to_string())
                )),
            ),
            Err(e) => HealthCheck::new(
                "Interpreter",
                HealthStatus::Fail(format!("Cannot run {}: {}", self.config.commands.python, e)),
            ),
        }
    }

    /// Check 2: project root exists
    fn check_project_root(&self) -> HealthCheck {
        let root = self.config.project_root();
        if root.is_dir() {
            HealthCheck::new("Project root", HealthStatus::Pass)
        } else {
            HealthCheck::new(
                "Project root",
                HealthStatus::Fail(format!("{} is not a directory", root.display())),
            )
        }
    }

    fn check_script(&self, name: &str, script: &str) -> HealthCheck {
        let path = self.config.resolve(script);
        if path.is_file() {
            HealthCheck::new(name, HealthStatus::Pass)
        } else {
            HealthCheck::new(name, HealthStatus::Fail(format!("{} not found", path.display())))
        }
    }

    /// Directory exists and is writable, or could be created
    fn check_writable(&self, name: &str, dir: &Path) -> HealthCheck {
        if !dir.exists() {
            let creatable = dir
                .ancestors()
                .skip(1)
                .find(|p| p.exists())
                .map(|p| p.is_dir())
                .unwrap_or(false);
            return if creatable {
                HealthCheck::new(
                    name,
                    HealthStatus::Warn(format!("{} does not exist yet", dir.display())),
                )
            } else {
                HealthCheck::new(
                    name,
                    HealthStatus::Fail(format!("{} cannot be created", dir.display())),
                )
            };
        }

        // Test write permission by attempting to create a temp file
        let test_file = dir.join(".modelcycle_test");
        match std::fs::write(&test_file, "test") {
            Ok(_) => {
                if let Err(e) = std::fs::remove_file(&test_file) {
                    tracing::debug!(file = %test_file.display(), error = %e, "could not remove write test file");
                }
                HealthCheck::new(name, HealthStatus::Pass)
            }
            Err(_) => HealthCheck::new(
                name,
                HealthStatus::Fail(format!("No write permission in {}", dir.display())),
            ),
        }
    }

    /// A leftover latest-run pointer is treated as stale by the next workflow
    fn check_latest_run(&self) -> HealthCheck {
        let latest = latest_run_dir(&self.config.log_root());
        if latest.exists() {
            HealthCheck::new(
                "Latest run",
                HealthStatus::Warn(format!(
                    "{} exists from an earlier run; new runs must replace it",
                    latest.display()
                )),
            )
        } else {
            HealthCheck::new("Latest run", HealthStatus::Pass)
        }
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n{}\n", "modelcycle Environment Diagnostics".bold());
        println!("{:<20} Status", "Check");
        println!("{}", "=".repeat(50));

        for check in checks {
            let message = match &check.status {
                HealthStatus::Pass => "PASS".green().to_string(),
                HealthStatus::Warn(msg) => format!("WARN: {}", msg).yellow().to_string(),
                HealthStatus::Fail(msg) => format!("FAIL: {}", msg).red().to_string(),
            };
            println!("{:<20} {}", check.name, message);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}
