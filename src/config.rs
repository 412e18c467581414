//! Configuration management for modelcycle
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.modelcycle/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::errors::{WorkflowError, Result};
use crate::types::{Entity, ProjectNamespace, StagedModelName, TrackingEnv};

/// Complete configuration for modelcycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub commands: CommandsConfig,
    pub training: TrainingConfig,
    pub staging: StagingConfig,
    pub paths: PathsConfig,
    pub loss_check: LossCheckConfig,
    pub execution: ExecutionConfig,
    pub telemetry: TelemetryConfig,
}

/// Tracking backend namespaces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub entity: Entity,
    pub projects: ProjectNamespace,
    pub env: TrackingEnv,
}

/// External scripts the workflow shells out to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub python: String,
    pub train_script: String,
    pub stage_script: String,
    pub cleanup_script: String,
    /// Directory the scripts run in; relative paths below resolve against it
    pub project_root: Option<String>,
}

/// Abbreviated training run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub data_class: String,
    pub model_class: String,
    pub loss: String,
    pub tf_dim: u32,
    pub tf_fc_dim: u32,
    pub tf_layers: u32,
    pub tf_nhead: u32,
    pub batch_size: u32,
    pub lr: f64,
    pub max_epochs: u32,
    pub limit_train_batches: u32,
    pub limit_val_batches: u32,
    pub limit_test_batches: u32,
    pub num_sanity_val_steps: u32,
    pub num_workers: u32,
    pub wandb: bool,
}

/// Staging and fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub staged_model_name: String,
    pub ckpt_alias: String,
    pub artifact_root: String,
}

/// Tracking log layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_root: String,
    pub run_file_extension: String,
}

/// Optional assertion on the last run's summary metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LossCheckConfig {
    pub metric: String,
    pub max_loss: Option<f64>,
}

/// Step execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub step_timeout_sec: Option<u64>,
    pub cleanup_verbose: bool,
}

/// Terminal output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub default_verbosity: String,
    pub show_progress_bars: bool,
    pub color_output: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            entity: Entity::default(),
            projects: ProjectNamespace::default(),
            env: TrackingEnv::Interactive,
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            train_script: "training/run_experiment.py".to_string(),
            stage_script: "training/stage_model.py".to_string(),
            cleanup_script: "training/cleanup_artifacts.py".to_string(),
            project_root: None,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_class: "IAMParagraphs".to_string(),
            model_class: "ResnetTransformer".to_string(),
            loss: "transformer".to_string(),
            tf_dim: 16,
            tf_fc_dim: 32,
            tf_layers: 1,
            tf_nhead: 2,
            batch_size: 2,
            lr: 0.0001,
            max_epochs: 1,
            limit_train_batches: 1,
            limit_val_batches: 1,
            limit_test_batches: 1,
            num_sanity_val_steps: 0,
            num_workers: 4,
            wandb: true,
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            staged_model_name: "test-dummy".to_string(),
            ckpt_alias: "latest".to_string(),
            artifact_root: "text_recognizer/artifacts".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_root: "training/logs".to_string(),
            run_file_extension: "wandb".to_string(),
        }
    }
}

impl Default for LossCheckConfig {
    fn default() -> Self {
        Self {
            metric: "train/loss".to_string(),
            max_loss: None,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            step_timeout_sec: None,
            cleanup_verbose: true,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_verbosity: "normal".to_string(),
            show_progress_bars: true,
            color_output: true,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| WorkflowError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| WorkflowError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard config location, if a home directory is known
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".modelcycle").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let projects = &self.tracking.projects;
        if projects.interactive.trim().is_empty() || projects.ci.trim().is_empty() {
            return Err(WorkflowError::ConfigError(
                "tracking project names must not be empty".to_string()
            ));
        }

        if self.tracking.entity.as_str().trim().is_empty() {
            return Err(WorkflowError::ConfigError(
                "tracking entity must not be empty (use DEFAULT for the logged-in entity)".to_string()
            ));
        }

        StagedModelName::parse(&self.staging.staged_model_name)
            .map_err(WorkflowError::ConfigError)?;

        if self.staging.ckpt_alias.trim().is_empty() {
            return Err(WorkflowError::ConfigError(
                "ckpt_alias must not be empty".to_string()
            ));
        }

        if self.training.batch_size == 0 {
            return Err(WorkflowError::ConfigError(
                "batch_size must be greater than 0".to_string()
            ));
        }

        if !(self.training.lr > 0.0) {
            return Err(WorkflowError::ConfigError(
                format!("lr must be positive, got {}", self.training.lr)
            ));
        }

        if self.paths.run_file_extension.is_empty() || self.paths.run_file_extension.contains('.') {
            return Err(WorkflowError::ConfigError(
                format!("Invalid run file extension: {:?}", self.paths.run_file_extension)
            ));
        }

        if let Some(max_loss) = self.loss_check.max_loss {
            if !max_loss.is_finite() {
                return Err(WorkflowError::ConfigError(
                    "max_loss must be a finite number".to_string()
                ));
            }
        }

        if self.execution.step_timeout_sec == Some(0) {
            return Err(WorkflowError::ConfigError(
                "step_timeout_sec must be greater than 0 when set".to_string()
            ));
        }

        match self.telemetry.default_verbosity.as_str() {
            "quiet" | "normal" | "verbose" | "very_verbose" => {}
            _ => return Err(WorkflowError::ConfigError(
                format!("Invalid verbosity level: {}", self.telemetry.default_verbosity)
            )),
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| WorkflowError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WorkflowError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| WorkflowError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Project every step of this workflow uses
    pub fn project(&self) -> &str {
        self.tracking.projects.resolve(self.tracking.env)
    }

    /// Validated staged model name
    pub fn staged_model_name(&self) -> Result<StagedModelName> {
        StagedModelName::parse(&self.staging.staged_model_name).map_err(WorkflowError::ConfigError)
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Directory the external scripts run in
    pub fn project_root(&self) -> PathBuf {
        match &self.commands.project_root {
            Some(root) => Self::expand_path(root),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &str) -> PathBuf {
        let expanded = Self::expand_path(path);
        if expanded.is_absolute() {
            expanded
        } else {
            self.project_root().join(expanded)
        }
    }

    /// Root of the tracking client's local logs
    pub fn log_root(&self) -> PathBuf {
        self.resolve(&self.paths.log_root)
    }

    /// Local directory a staged model is fetched into
    pub fn staged_model_dir(&self) -> PathBuf {
        self.resolve(&self.staging.artifact_root)
            .join(&self.staging.staged_model_name)
    }
}
