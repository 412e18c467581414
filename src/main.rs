//! modelcycle - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use modelcycle::{
    cli::{Args, Commands, Verbosity},
    config::Config,
    display::StatusDisplay,
    doctor::Doctor,
    errors::WorkflowError,
    runlog,
    runner::{CommandRunner, ProcessRunner},
    steps::{ArtifactSelector, LocalCleanup, RemoteCleanup},
    telemetry::TelemetryDisplay,
    types::RunId,
    workflow::Workflow,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.clone())?;
    let ci_flag = std::env::var("CI").ok();
    args.apply_overrides(&mut config, ci_flag.as_deref())?;

    let verbosity = if args.quiet || args.verbose > 0 {
        args.verbosity()
    } else {
        Verbosity::from_config(&config.telemetry.default_verbosity)
    };
    init_tracing(verbosity);
    if !config.telemetry.color_output {
        colored::control::set_override(false);
    }

    match &args.command {
        Commands::Run { report, .. } => {
            run_workflow(config, verbosity, report.clone()).await?;
        }
        Commands::Plan { .. } => {
            show_plan(config)?;
        }
        Commands::ExtractRunId { .. } => {
            extract_run_id(&config);
        }
        Commands::CheckLoss { .. } => {
            check_loss(&config);
        }
        Commands::Clean { run_ids, dryrun, .. } => {
            clean(&config, verbosity, run_ids, *dryrun).await?;
        }
        Commands::Doctor => {
            run_doctor(&config).await;
        }
        Commands::Config => {
            show_config(&config, verbosity)?;
        }
    }

    Ok(())
}

/// Diagnostics go to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("modelcycle={}", verbosity.log_filter())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn status_display(config: &Config, verbosity: Verbosity) -> StatusDisplay {
    StatusDisplay::terminal(verbosity, config.telemetry.show_progress_bars)
}

fn process_runner(config: &Config, display: &StatusDisplay) -> ProcessRunner {
    ProcessRunner::new()
        .with_timeout(config.execution.step_timeout_sec.map(Duration::from_secs))
        .with_inherited_output(display.streams_child_output())
}

async fn run_workflow(config: Config, verbosity: Verbosity, report_path: Option<PathBuf>) -> Result<()> {
    let display = status_display(&config, verbosity);
    let runner = process_runner(&config, &display);
    let workflow = Workflow::new(config, runner)?.with_display(display);

    let report = workflow.run().await;

    TelemetryDisplay::new(workflow.telemetry().clone(), verbosity).display_summary();

    if let Some(path) = report_path {
        report
            .save(&path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
    }

    std::process::exit(report.exit_code());
}

fn show_plan(config: Config) -> Result<()> {
    let workflow = Workflow::new(config, ProcessRunner::new())?;

    println!("\n{} (project {})\n", "Workflow plan".bold(), workflow.config().project());
    for (i, planned) in workflow.plan().iter().enumerate() {
        match planned.condition {
            Some(condition) => println!(
                "{:>2}. {} {}",
                i + 1,
                planned.step.as_str().cyan(),
                format!("({})", condition).dimmed()
            ),
            None => println!("{:>2}. {}", i + 1, planned.step.as_str().cyan()),
        }
        println!("    {}", planned.action);
    }
    println!();

    Ok(())
}

fn extract_run_id(config: &Config) {
    match runlog::extract_run_id(&config.log_root(), &config.paths.run_file_extension) {
        Ok(id) => println!("{}", id),
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            std::process::exit(1);
        }
    }
}

fn check_loss(config: &Config) {
    let Some(max_loss) = config.loss_check.max_loss else {
        eprintln!("{} no loss threshold given", "Error:".red());
        std::process::exit(1);
    };

    let path = runlog::summary_path(&config.log_root());
    let checked = runlog::read_summary(&path)
        .and_then(|summary| runlog::check_loss(&summary, &config.loss_check.metric, max_loss));

    match checked {
        Ok(check) if check.passed => {
            println!("{} {} = {} < {}", "✓".green(), check.metric, check.value, check.max);
        }
        Ok(check) => {
            println!("{} {} = {} is not below {}", "✗".red(), check.metric, check.value, check.max);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            std::process::exit(1);
        }
    }
}

async fn clean(config: &Config, verbosity: Verbosity, run_ids: &[String], dryrun: bool) -> Result<()> {
    let display = status_display(config, verbosity);

    let ids = run_ids
        .iter()
        .map(|token| RunId::parse(token))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(WorkflowError::from)?;

    let local = LocalCleanup::new(config.staged_model_dir());
    display.stage(&format!("Removing {}", local.dir.display()));
    if local.run()? {
        display.success("removed");
    } else {
        display.success("already absent");
    }

    if ids.is_empty() {
        display.warning("no run ids given; remote records kept");
        return Ok(());
    }

    let cleanup = RemoteCleanup::new(
        config.tracking.entity.clone(),
        config.project(),
        &ids,
        ArtifactSelector::All,
    )
    .map_err(WorkflowError::from)?
    .verbose(config.execution.cleanup_verbose)
    .dryrun(dryrun);

    display.stage(&format!(
        "Deleting {} run(s) from {}",
        cleanup.run_ids().len(),
        cleanup.project()
    ));
    let spec = cleanup.command(config);
    display.detail(&spec.display());

    let runner = process_runner(config, &display);
    let result = runner.run("cleanup-remote", &spec).await?;
    if result.success {
        display.verdict(true, "Cleanup finished");
        Ok(())
    } else {
        display.excerpt(&result.output, 5);
        display.verdict(false, "Remote cleanup failed");
        std::process::exit(1);
    }
}

async fn run_doctor(config: &Config) {
    let runner = ProcessRunner::new().with_timeout(Some(Duration::from_secs(30)));
    let doctor = Doctor::new(config, &runner);

    let checks = doctor.run_diagnostics().await;
    Doctor::<ProcessRunner>::display_results(&checks);

    std::process::exit(if Doctor::<ProcessRunner>::overall_status(&checks) { 0 } else { 1 });
}

fn show_config(config: &Config, verbosity: Verbosity) -> Result<()> {
    println!("\n{}\n", "modelcycle Configuration".bold());

    println!("Tracking:");
    println!("  Entity:       {}", config.tracking.entity);
    println!("  Environment:  {}", config.tracking.env);
    println!("  Project:      {}", config.project());
    println!();

    println!("Paths:");
    println!("  Project root: {}", config.project_root().display());
    println!("  Log root:     {}", config.log_root().display());
    println!("  Staged model: {}", config.staged_model_dir().display());
    println!();

    println!("Loss check:");
    match config.loss_check.max_loss {
        Some(max) => println!("  {} < {}", config.loss_check.metric, max),
        None => println!("  disabled"),
    }
    println!();

    if verbosity.show_events() {
        let contents = toml::to_string_pretty(config).context("Failed to render config")?;
        println!("{}", contents);
    }

    println!("Verbosity:      {}", verbosity.as_str());
    if let Some(path) = Config::default_path() {
        println!("Default config: {}", path.display());
    }
    println!();

    Ok(())
}
