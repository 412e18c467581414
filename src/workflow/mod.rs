//! Model lifecycle workflow driver
//!
//! Runs `train → extract-train-run → [check-loss] → stage → extract-stage-run
//! → fetch → cleanup`. No step aborts the sequence: every step appends an
//! outcome and the verdict is reduced from all of them at the end.
//!
//! Cleanup scope follows the verdict. A failed workflow only removes the
//! local staged-model directory and keeps remote runs for inspection; a
//! passing one also deletes exactly the runs it captured. Remote deletion
//! needs both run ids, so a failed extraction can never widen it.

pub mod report;

pub use report::{CleanupScope, Step, StepOutcome, StepStatus, WorkflowReport, WorkflowStatus};

use crate::config::Config;
use crate::display::StatusDisplay;
use crate::errors::Result;
use crate::runlog::{self, latest_run_dir};
use crate::runner::{CommandRunner, CommandSpec};
use crate::steps::cleanup::cleanup_command_for;
use crate::steps::stage::stage_command_for;
use crate::steps::{
    fetch_command, remove_local_artifacts, stage_command, train_command, ArtifactSelector,
    RemoteCleanup,
};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::types::{RunId, StagedModelName};
use std::time::{Duration, Instant};

/// Output lines shown from a failed step
const FAILURE_EXCERPT_LINES: usize = 5;

/// One line of a rendered plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub step: Step,
    pub action: String,
    pub condition: Option<&'static str>,
}

/// The lifecycle workflow over a command runner
pub struct Workflow<R: CommandRunner> {
    config: Config,
    staged_model_name: StagedModelName,
    runner: R,
    display: StatusDisplay,
    telemetry: TelemetryCollector,
}

impl<R: CommandRunner> Workflow<R> {
    /// Validates `config` up front so no step starts on a bad configuration
    pub fn new(config: Config, runner: R) -> Result<Self> {
        config.validate()?;
        let staged_model_name = config.staged_model_name()?;
        Ok(Self {
            config,
            staged_model_name,
            runner,
            display: StatusDisplay::silent(),
            telemetry: TelemetryCollector::new(),
        })
    }

    pub fn with_display(mut self, display: StatusDisplay) -> Self {
        self.display = display;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Execute every step and return the report; never exits early
    pub async fn run(&self) -> WorkflowReport {
        let config = &self.config;
        let mut report = WorkflowReport::new(
            config.tracking.env,
            config.project(),
            self.staged_model_name.as_str(),
        );
        tracing::info!(
            workflow_id = %report.id,
            env = %config.tracking.env,
            project = config.project(),
            "starting model lifecycle workflow"
        );

        // Whatever latest-run points at now belongs to an earlier run.
        let leftover = runlog::extract_run_id(
            &config.log_root(),
            &config.paths.run_file_extension,
        )
        .ok();
        if let Some(id) = &leftover {
            tracing::debug!(run_id = %id, "latest run present before training");
        }

        self.display.stage(&format!(
            "Training {} on {} (project {})",
            config.training.model_class,
            config.training.data_class,
            config.project()
        ));
        let outcome = self.execute(Step::Train, &train_command(config)).await;
        self.record(&mut report, outcome);

        self.display.stage("Capturing training run id");
        let train_run = self.capture(&mut report, Step::ExtractTrainRun, leftover.as_ref());
        report.train_run = train_run.clone();

        if let Some(max_loss) = config.loss_check.max_loss {
            self.display.stage(&format!(
                "Checking {} < {}",
                config.loss_check.metric, max_loss
            ));
            let outcome = self.check_loss(train_run.is_some(), max_loss);
            self.record(&mut report, outcome);
        }

        let stage_attempted = match &train_run {
            Some(run) => {
                self.display.stage(&format!("Staging trained model from run {}", run));
                let spec = stage_command(config, run, &self.staged_model_name);
                let outcome = self.execute(Step::Stage, &spec).await;
                self.record(&mut report, outcome);
                true
            }
            None => {
                self.display.stage("Staging trained model");
                self.record(
                    &mut report,
                    StepOutcome::failed(
                        Step::Stage,
                        "no training run id captured; staging not attempted",
                        Duration::ZERO,
                    ),
                );
                false
            }
        };

        let stage_run = if stage_attempted {
            self.display.stage("Capturing staging run id");
            self.capture(&mut report, Step::ExtractStageRun, train_run.as_ref())
        } else {
            self.record(
                &mut report,
                StepOutcome::skipped(Step::ExtractStageRun, "staging was not attempted"),
            );
            None
        };
        report.stage_run = stage_run.clone();

        self.display.stage(&format!("Fetching staged model {}", self.staged_model_name));
        let outcome = self
            .execute(Step::Fetch, &fetch_command(config, &self.staged_model_name))
            .await;
        self.record(&mut report, outcome);

        self.cleanup(&mut report, train_run, stage_run).await;
        report.finish();

        let passed = !report.has_failures();
        tracing::info!(
            workflow_id = %report.id,
            passed,
            failed_steps = ?report.failed_steps(),
            "workflow finished"
        );
        if passed {
            self.display.verdict(true, "Model lifecycle workflow passed");
        } else {
            let failed: Vec<&str> = report.failed_steps().iter().map(Step::as_str).collect();
            self.display.verdict(
                false,
                &format!("Model lifecycle workflow failed ({})", failed.join(", ")),
            );
        }
        report
    }

    /// Every action the workflow would take, without running anything
    pub fn plan(&self) -> Vec<PlannedStep> {
        let config = &self.config;
        let ext = &config.paths.run_file_extension;
        let latest = latest_run_dir(&config.log_root());
        let mut plan = vec![PlannedStep {
            step: Step::Train,
            action: train_command(config).display(),
            condition: None,
        }];

        plan.push(PlannedStep {
            step: Step::ExtractTrainRun,
            action: format!("TRAIN_RUN <- run-<id>.{} under {}", ext, latest.display()),
            condition: None,
        });

        if let Some(max_loss) = config.loss_check.max_loss {
            plan.push(PlannedStep {
                step: Step::CheckLoss,
                action: format!(
                    "assert {} < {} in {}",
                    config.loss_check.metric,
                    max_loss,
                    runlog::summary_path(&config.log_root()).display()
                ),
                condition: None,
            });
        }

        plan.push(PlannedStep {
            step: Step::Stage,
            action: stage_command_for(config, "$TRAIN_RUN", &self.staged_model_name).display(),
            condition: Some("when TRAIN_RUN was captured"),
        });
        plan.push(PlannedStep {
            step: Step::ExtractStageRun,
            action: format!("STAGE_RUN <- run-<id>.{} under {}", ext, latest.display()),
            condition: Some("must differ from TRAIN_RUN"),
        });
        plan.push(PlannedStep {
            step: Step::Fetch,
            action: fetch_command(config, &self.staged_model_name).display(),
            condition: None,
        });
        plan.push(PlannedStep {
            step: Step::CleanupLocal,
            action: format!("remove {}", config.staged_model_dir().display()),
            condition: Some("always"),
        });

        let mut remote = cleanup_command_for(
            config,
            &config.tracking.entity,
            config.project(),
            ["$TRAIN_RUN".to_string(), "$STAGE_RUN".to_string()],
            &ArtifactSelector::All,
        );
        if config.execution.cleanup_verbose {
            remote = remote.arg("-v");
        }
        plan.push(PlannedStep {
            step: Step::CleanupRemote,
            action: remote.display(),
            condition: Some("only when every step passed"),
        });

        plan
    }

    async fn execute(&self, step: Step, spec: &CommandSpec) -> StepOutcome {
        self.started(step);
        self.display.detail(&spec.display());

        let spinner = self.display.spinner(step.as_str());
        let result = self.runner.run(step.as_str(), spec).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        match result {
            Ok(result) => {
                if !result.success {
                    self.display.excerpt(&result.output, FAILURE_EXCERPT_LINES);
                }
                StepOutcome::from_result(step, spec, &result)
            }
            Err(e) => {
                let mut outcome = StepOutcome::failed(step, e.to_string(), Duration::ZERO);
                outcome.command = Some(spec.display());
                outcome
            }
        }
    }

    /// Recover the run id the previous step created
    fn capture(
        &self,
        report: &mut WorkflowReport,
        step: Step,
        previous: Option<&RunId>,
    ) -> Option<RunId> {
        self.started(step);
        let start = Instant::now();
        let config = &self.config;

        match runlog::extract_new_run_id(
            &config.log_root(),
            &config.paths.run_file_extension,
            previous,
        ) {
            Ok(id) => {
                self.telemetry.record(TelemetryEvent::RunCaptured {
                    step,
                    run_id: id.to_string(),
                    timestamp: Instant::now(),
                });
                let outcome = StepOutcome::passed(step, start.elapsed())
                    .with_detail(format!("run {}", id));
                self.record(report, outcome);
                Some(id)
            }
            Err(e) => {
                tracing::error!(step = %step, error = %e, "run id extraction failed");
                let outcome = StepOutcome::failed(
                    step,
                    format!("{}; remote cleanup disabled for this workflow", e),
                    start.elapsed(),
                );
                self.record(report, outcome);
                None
            }
        }
    }

    fn check_loss(&self, train_run_captured: bool, max_loss: f64) -> StepOutcome {
        self.started(Step::CheckLoss);
        let start = Instant::now();
        if !train_run_captured {
            return StepOutcome::failed(
                Step::CheckLoss,
                "no training run captured; summary would belong to another run",
                start.elapsed(),
            );
        }

        let metric = &self.config.loss_check.metric;
        let path = runlog::summary_path(&self.config.log_root());
        let checked = runlog::read_summary(&path)
            .and_then(|summary| runlog::check_loss(&summary, metric, max_loss));

        match checked {
            Ok(check) if check.passed => StepOutcome::passed(Step::CheckLoss, start.elapsed())
                .with_detail(format!("{} = {}", check.metric, check.value)),
            Ok(check) => StepOutcome::failed(
                Step::CheckLoss,
                format!("{} = {} is not below {}", check.metric, check.value, check.max),
                start.elapsed(),
            ),
            Err(e) => StepOutcome::failed(Step::CheckLoss, e.to_string(), start.elapsed()),
        }
    }

    async fn cleanup(
        &self,
        report: &mut WorkflowReport,
        train_run: Option<RunId>,
        stage_run: Option<RunId>,
    ) {
        let config = &self.config;
        let failed = report.has_failures();
        let dir = config.staged_model_dir();

        if failed {
            self.display.stage("Cleaning up local files");
        } else {
            self.display.stage("Cleaning up local and remote files");
        }

        self.started(Step::CleanupLocal);
        let start = Instant::now();
        let outcome = match remove_local_artifacts(&dir) {
            Ok(true) => StepOutcome::passed(Step::CleanupLocal, start.elapsed())
                .with_detail(format!("removed {}", dir.display())),
            Ok(false) => StepOutcome::passed(Step::CleanupLocal, start.elapsed())
                .with_detail(format!("{} already absent", dir.display())),
            Err(e) => StepOutcome::failed(
                Step::CleanupLocal,
                format!("could not remove {}: {}", dir.display(), e),
                start.elapsed(),
            ),
        };
        self.record(report, outcome);

        if failed {
            self.set_scope(report, CleanupScope::LocalOnly);
            self.record(
                report,
                StepOutcome::skipped(
                    Step::CleanupRemote,
                    "workflow failed; leaving remote runs in place for inspection",
                ),
            );
            return;
        }

        let (train_run, stage_run) = match (train_run, stage_run) {
            (Some(train), Some(stage)) => (train, stage),
            _ => {
                // Unreachable while extraction failures are recorded as step
                // failures; kept so a missing id can never reach the script.
                self.set_scope(report, CleanupScope::LocalOnly);
                self.record(
                    report,
                    StepOutcome::failed(
                        Step::CleanupRemote,
                        "missing run id; refusing remote cleanup",
                        Duration::ZERO,
                    ),
                );
                return;
            }
        };

        let ids = vec![train_run, stage_run];
        let cleanup = match RemoteCleanup::new(
            config.tracking.entity.clone(),
            config.project(),
            &ids,
            ArtifactSelector::All,
        ) {
            Ok(cleanup) => cleanup.verbose(config.execution.cleanup_verbose),
            Err(e) => {
                self.set_scope(report, CleanupScope::LocalOnly);
                self.record(
                    report,
                    StepOutcome::failed(Step::CleanupRemote, e.to_string(), Duration::ZERO),
                );
                return;
            }
        };

        self.set_scope(report, CleanupScope::LocalAndRemote);
        report.removed_run_ids = cleanup.run_ids().iter().cloned().collect();
        let outcome = self
            .execute(Step::CleanupRemote, &cleanup.command(config))
            .await;
        self.record(report, outcome);
    }

    fn set_scope(&self, report: &mut WorkflowReport, scope: CleanupScope) {
        report.cleanup_scope = Some(scope);
        self.telemetry.record(TelemetryEvent::CleanupScoped {
            scope,
            timestamp: Instant::now(),
        });
    }

    fn started(&self, step: Step) {
        self.telemetry.record(TelemetryEvent::StepStarted {
            step,
            timestamp: Instant::now(),
        });
    }

    fn record(&self, report: &mut WorkflowReport, outcome: StepOutcome) {
        let detail = outcome.detail.as_deref().unwrap_or("");
        let line = if detail.is_empty() {
            outcome.step.to_string()
        } else {
            format!("{}: {}", outcome.step, detail)
        };
        match outcome.status {
            StepStatus::Passed => self.display.success(&line),
            StepStatus::Failed => {
                tracing::warn!(step = %outcome.step, detail, "step failed");
                self.display.failure(&line)
            }
            StepStatus::Skipped => self.display.warning(&line),
        }

        self.telemetry.record(TelemetryEvent::StepCompleted {
            step: outcome.step,
            status: outcome.status,
            duration_ms: outcome.duration_ms,
            timestamp: Instant::now(),
        });
        report.push(outcome);
    }
}
