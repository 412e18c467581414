//! Command-line argument parsing for modelcycle
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::config::Config;
use crate::errors::{Result, WorkflowError};
use crate::types::{StagedModelName, TrackingEnv};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// modelcycle - exercise the train, stage, fetch and cleanup lifecycle of a model
#[derive(Parser, Debug)]
#[command(name = "modelcycle")]
#[command(version)]
#[command(about = "Run a model through training, staging, fetching and cleanup", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only the final verdict is printed)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full lifecycle workflow
    Run {
        /// Tracking environment (defaults to ci when CI is set)
        #[arg(long)]
        env: Option<TrackingEnv>,

        /// Name the trained model is staged under
        #[arg(long)]
        staged_model_name: Option<String>,

        /// Model class to train
        #[arg(long)]
        model_class: Option<String>,

        /// Write a JSON report of every step here
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Print every command the workflow would run
    Plan {
        /// Tracking environment (defaults to ci when CI is set)
        #[arg(long)]
        env: Option<TrackingEnv>,
    },

    /// Print the id of the latest logged run
    ExtractRunId {
        /// Root of the training logs
        #[arg(long, value_name = "DIR")]
        log_root: Option<PathBuf>,
    },

    /// Assert a summary metric of the latest run is below a threshold
    CheckLoss {
        /// Upper bound, exclusive
        #[arg(long)]
        max_loss: f64,

        /// Summary key to check
        #[arg(long)]
        metric: Option<String>,
    },

    /// Remove a staged model locally and, given run ids, their remote records
    Clean {
        #[arg(long)]
        staged_model_name: String,

        /// Tracking environment (defaults to ci when CI is set)
        #[arg(long)]
        env: Option<TrackingEnv>,

        /// Runs whose remote records are deleted
        #[arg(long, num_args = 1..)]
        run_ids: Vec<String>,

        /// Only report what would be deleted remotely
        #[arg(long)]
        dryrun: bool,
    },

    /// Run environment checks
    Doctor,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Apply subcommand overrides on top of a loaded config.
    ///
    /// `ci_flag` is the value of the `CI` environment variable; it only
    /// matters when no `--env` was given.
    pub fn apply_overrides(&self, config: &mut Config, ci_flag: Option<&str>) -> Result<()> {
        match &self.command {
            Commands::Run {
                env,
                staged_model_name,
                model_class,
                ..
            } => {
                config.tracking.env = env.unwrap_or_else(|| TrackingEnv::from_ci_flag(ci_flag));
                if let Some(name) = staged_model_name {
                    config.staging.staged_model_name = name.clone();
                }
                if let Some(class) = model_class {
                    config.training.model_class = class.clone();
                }
            }
            Commands::Plan { env } => {
                config.tracking.env = env.unwrap_or_else(|| TrackingEnv::from_ci_flag(ci_flag));
            }
            Commands::ExtractRunId { log_root: Some(root) } => {
                config.paths.log_root = root.to_string_lossy().to_string();
            }
            Commands::CheckLoss { max_loss, metric } => {
                config.loss_check.max_loss = Some(*max_loss);
                if let Some(metric) = metric {
                    config.loss_check.metric = metric.clone();
                }
            }
            Commands::Clean { staged_model_name, env, .. } => {
                config.tracking.env = env.unwrap_or_else(|| TrackingEnv::from_ci_flag(ci_flag));
                StagedModelName::parse(staged_model_name).map_err(WorkflowError::ConfigError)?;
                config.staging.staged_model_name = staged_model_name.clone();
            }
            _ => {}
        }
        config.validate()
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Parse a configured default; unknown values mean normal
    pub fn from_config(value: &str) -> Self {
        match value {
            "quiet" => Verbosity::Quiet,
            "verbose" => Verbosity::Verbose,
            "very_verbose" => Verbosity::VeryVerbose,
            _ => Verbosity::Normal,
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show detailed events
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }

    /// Default `tracing` filter directive for this level
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::VeryVerbose => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("modelcycle").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_verbosity_quiet() {
        assert_eq!(parse(&["-q", "doctor"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_normal() {
        assert_eq!(parse(&["doctor"]).verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_verbosity_verbose() {
        assert_eq!(parse(&["run", "-v"]).verbosity(), Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_very_verbose() {
        assert_eq!(parse(&["-vv", "plan"]).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["modelcycle"]).is_err());
    }

    #[test]
    fn test_run_overrides() {
        let args = parse(&[
            "run",
            "--env",
            "ci",
            "--staged-model-name",
            "nightly",
            "--model-class",
            "LineCNN",
        ]);
        let mut config = Config::default();
        args.apply_overrides(&mut config, None).unwrap();

        assert_eq!(config.tracking.env, TrackingEnv::Ci);
        assert_eq!(config.project(), "fsdl-testing-2022-ci");
        assert_eq!(config.staging.staged_model_name, "nightly");
        assert_eq!(config.training.model_class, "LineCNN");
    }

    #[test]
    fn test_env_falls_back_to_ci_flag() {
        let mut config = Config::default();
        parse(&["run"]).apply_overrides(&mut config, Some("true")).unwrap();
        assert_eq!(config.tracking.env, TrackingEnv::Ci);

        parse(&["plan"]).apply_overrides(&mut config, None).unwrap();
        assert_eq!(config.tracking.env, TrackingEnv::Interactive);

        // An explicit --env wins over CI.
        parse(&["run", "--env", "interactive"])
            .apply_overrides(&mut config, Some("1"))
            .unwrap();
        assert_eq!(config.tracking.env, TrackingEnv::Interactive);
    }

    #[test]
    fn test_unknown_env_rejected() {
        assert!(Args::try_parse_from(["modelcycle", "run", "--env", "staging"]).is_err());
    }

    #[test]
    fn test_clean_args() {
        let args = parse(&["clean", "--staged-model-name", "test-dummy", "--run-ids", "a1", "b2", "--dryrun"]);
        match &args.command {
            Commands::Clean { staged_model_name, run_ids, dryrun, env } => {
                assert_eq!(*env, None);
                assert_eq!(staged_model_name, "test-dummy");
                assert_eq!(run_ids, &vec!["a1".to_string(), "b2".to_string()]);
                assert!(*dryrun);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_clean_env_selects_project() {
        let args = parse(&["clean", "--staged-model-name", "test-dummy", "--env", "ci"]);
        let mut config = Config::default();
        args.apply_overrides(&mut config, None).unwrap();
        assert_eq!(config.tracking.env, TrackingEnv::Ci);
        assert_eq!(config.project(), "fsdl-testing-2022-ci");

        let args = parse(&["clean", "--staged-model-name", "test-dummy", "--env", "interactive"]);
        args.apply_overrides(&mut config, Some("true")).unwrap();
        assert_eq!(config.project(), "fsdl-testing-2022");
    }

    #[test]
    fn test_clean_rejects_bad_name() {
        let args = parse(&["clean", "--staged-model-name", "../etc"]);
        assert!(args.apply_overrides(&mut Config::default(), None).is_err());
    }

    #[test]
    fn test_check_loss_overrides() {
        let args = parse(&["check-loss", "--max-loss", "2.5", "--metric", "validation/loss"]);
        let mut config = Config::default();
        args.apply_overrides(&mut config, None).unwrap();
        assert_eq!(config.loss_check.max_loss, Some(2.5));
        assert_eq!(config.loss_check.metric, "validation/loss");
    }

    #[test]
    fn test_verbosity_methods() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());

        assert!(!Verbosity::Normal.show_events());
        assert!(Verbosity::Verbose.show_events());

        assert_eq!(Verbosity::from_config("verbose"), Verbosity::Verbose);
        assert_eq!(Verbosity::from_config("bogus"), Verbosity::Normal);
        assert_eq!(Verbosity::VeryVerbose.log_filter(), "debug");
    }
}
