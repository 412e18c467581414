//! Command and step result types
//!
//! A [`CommandSpec`] describes one external process invocation; a
//! [`StepResult`] records how it ended.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One external command: program, argv, working directory and extra env
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `--name value`
    pub fn flag(self, name: &str, value: impl ToString) -> Self {
        self.arg(name).arg(value.to_string())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Whether `arg` appears verbatim in the argument list
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Value following `name` in the argument list
    pub fn flag_value(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == name)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Shell-style rendering for status lines and plans
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@+,".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Result of running one external command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Workflow step that ran the command
    pub step: String,

    /// Captured stdout/stderr tail (empty when output was streamed)
    pub output: String,

    pub success: bool,

    pub duration_ms: u64,

    /// Error message if failed
    pub error: Option<String>,

    /// Exit code, when the process ran to completion
    pub exit_code: Option<i32>,
}

impl StepResult {
    /// Create successful result
    pub fn success(step: String, output: String, duration: Duration) -> Self {
        Self {
            step,
            output,
            success: true,
            duration_ms: duration.as_millis() as u64,
            error: None,
            exit_code: Some(0),
        }
    }

    /// Create failed result
    pub fn failure(step: String, error: String, duration: Duration) -> Self {
        Self {
            step,
            output: String::new(),
            success: false,
            duration_ms: duration.as_millis() as u64,
            error: Some(error),
            exit_code: None,
        }
    }

    /// Create result with exit code
    pub fn with_exit_code(
        step: String,
        output: String,
        exit_code: i32,
        duration: Duration,
    ) -> Self {
        Self {
            step,
            output,
            success: exit_code == 0,
            duration_ms: duration.as_millis() as u64,
            error: if exit_code != 0 {
                Some(format!("Command exited with code {}", exit_code))
            } else {
                None
            },
            exit_code: Some(exit_code),
        }
    }
}
