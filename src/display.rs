//! Status output for workflow stages
//!
//! The workflow writes one human-readable line per stage boundary. In quiet
//! mode only the final verdict is printed; in silent mode nothing is.

use crate::cli::Verbosity;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// How status lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDisplay {
    /// Terminal output at the given verbosity
    Terminal { verbosity: Verbosity, progress: bool },

    /// No output at all
    Silent,
}

impl StatusDisplay {
    pub fn terminal(verbosity: Verbosity, progress: bool) -> Self {
        Self::Terminal { verbosity, progress }
    }

    pub fn silent() -> Self {
        Self::Silent
    }

    fn shows_stages(&self) -> bool {
        matches!(self, Self::Terminal { verbosity, .. } if *verbosity != Verbosity::Quiet)
    }

    fn shows_details(&self) -> bool {
        matches!(self, Self::Terminal { verbosity, .. } if verbosity.show_events())
    }

    /// Announce the start of a stage
    pub fn stage(&self, message: &str) {
        if self.shows_stages() {
            println!("{} {}", "==>".cyan().bold(), message);
        }
    }

    /// Extra detail, printed only when verbose
    pub fn detail(&self, message: &str) {
        if self.shows_details() {
            println!("    {}", message.dimmed());
        }
    }

    pub fn success(&self, message: &str) {
        if self.shows_stages() {
            println!("    {} {}", "✓".green(), message);
        }
    }

    pub fn failure(&self, message: &str) {
        if self.shows_stages() {
            println!("    {} {}", "✗".red(), message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.shows_stages() {
            println!("    {} {}", "!".yellow(), message);
        }
    }

    /// Last lines of a failed step's captured output
    pub fn excerpt(&self, output: &str, lines: usize) {
        if !self.shows_stages() {
            return;
        }
        let all: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = all.len().saturating_sub(lines);
        for line in &all[start..] {
            println!("      {}", line.dimmed());
        }
    }

    /// Final pass/fail line; printed even in quiet mode
    pub fn verdict(&self, passed: bool, message: &str) {
        if matches!(self, Self::Silent) {
            return;
        }
        if passed {
            println!("{}", message.green().bold());
        } else {
            println!("{}", message.red().bold());
        }
    }

    /// Spinner shown while an external step runs.
    ///
    /// Not shown when verbose, since the child's output is streamed then.
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        let show = matches!(
            self,
            Self::Terminal { verbosity: Verbosity::Normal, progress: true }
        );
        if !show {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("    {spinner:.green} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    /// Whether child process output should be streamed to the terminal
    pub fn streams_child_output(&self) -> bool {
        self.shows_details()
    }
}
