//! Process-backed command runner
//!
//! Runs commands directly from argv (no shell), waits for them, and turns
//! the exit status into a [`StepResult`].

use crate::errors::Result;
use crate::runner::types::{CommandSpec, StepResult};
use crate::runner::CommandRunner;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

/// Default cap on captured output kept in a [`StepResult`]
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Runs steps as child processes of this one
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    /// Stream child output to the terminal instead of capturing it
    inherit_output: bool,
    max_output_bytes: usize,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            timeout: None,
            inherit_output: false,
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }

    /// Fail steps that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_inherited_output(mut self, inherit: bool) -> Self {
        self.inherit_output = inherit;
        self
    }

    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    fn build(&self, spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        if self.inherit_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        cmd.stdin(Stdio::null());
        // A timed-out step must not leave its process behind.
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, step: &str, spec: &CommandSpec) -> Result<StepResult> {
        let start = Instant::now();

        if spec.program.is_empty() {
            return Ok(StepResult::failure(
                step.to_string(),
                "Command cannot be empty".to_string(),
                start.elapsed(),
            ));
        }

        tracing::debug!(step, command = %spec.display(), "launching step");

        let mut cmd = self.build(spec);
        let output = match self.timeout {
            Some(limit) => match timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(step, timeout_secs = limit.as_secs(), "step timed out");
                    return Ok(StepResult::failure(
                        step.to_string(),
                        format!("Command timed out after {}s", limit.as_secs()),
                        start.elapsed(),
                    ));
                }
            },
            None => cmd.output().await,
        };

        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);

                let combined = if stderr.is_empty() {
                    stdout.to_string()
                } else {
                    format!("STDOUT:\n{}\n\nSTDERR:\n{}", stdout, stderr)
                };

                let exit_code = output.status.code().unwrap_or(-1);
                tracing::debug!(step, exit_code, "step finished");

                Ok(StepResult::with_exit_code(
                    step.to_string(),
                    tail(&combined, self.max_output_bytes),
                    exit_code,
                    start.elapsed(),
                ))
            }
            Err(e) => Ok(StepResult::failure(
                step.to_string(),
                format!("Failed to execute {}: {}", spec.program, e),
                start.elapsed(),
            )),
        }
    }
}

/// Last `max` bytes of `text`, cut on a char boundary
fn tail(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_success() {
        let runner = ProcessRunner::new();
        let spec = CommandSpec::new("echo").arg("hello");

        let result = runner.run("echo", &spec).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("hello"));
        assert_eq!(result.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_run_command_nonzero_exit() {
        let runner = ProcessRunner::new();

        let result = runner.run("false", &CommandSpec::new("false")).await.unwrap();

        assert!(!result.success);
        assert_ne!(result.exit_code.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_command_timeout() {
        let runner = ProcessRunner::new().with_timeout(Some(Duration::from_secs(1)));
        let spec = CommandSpec::new("sleep").arg("10");

        let result = runner.run("sleep", &spec).await.unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let runner = ProcessRunner::new();
        let spec = CommandSpec::new("definitely-not-a-real-program-4f1c");

        let result = runner.run("train", &spec).await.unwrap();

        assert!(!result.success);
        assert!(result.exit_code.is_none());
    }

    #[tokio::test]
    async fn test_run_command_empty() {
        let runner = ProcessRunner::new();
        let result = runner.run("empty", &CommandSpec::new("")).await.unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_env_and_cwd_are_applied() {
        let temp = tempfile::TempDir::new().unwrap();
        let runner = ProcessRunner::new();
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo $MODELCYCLE_PROBE; pwd")
            .env("MODELCYCLE_PROBE", "probe-value")
            .current_dir(temp.path());

        let result = runner.run("probe", &spec).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("probe-value"));
        let dir_name = temp.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(result.output.contains(&dir_name));
    }

    #[test]
    fn test_tail_truncates_on_char_boundary() {
        let text = "ééééé";
        let cut = tail(text, 3);
        assert!(cut.starts_with("..."));
        assert!(cut.ends_with('é'));
        assert_eq!(tail("short", 10), "short");
    }
}
