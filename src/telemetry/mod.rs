//! Telemetry for a workflow execution
//!
//! Collects step and cleanup events while the workflow runs and prints a
//! summary at the end.

use crate::workflow::report::{CleanupScope, Step, StepStatus};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    StepStarted {
        step: Step,
        timestamp: Instant,
    },
    StepCompleted {
        step: Step,
        status: StepStatus,
        duration_ms: u64,
        timestamp: Instant,
    },
    RunCaptured {
        step: Step,
        run_id: String,
        timestamp: Instant,
    },
    CleanupScoped {
        scope: CleanupScope,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub steps_started: usize,
    pub steps_passed: usize,
    pub steps_failed: usize,
    pub steps_skipped: usize,
    pub runs_captured: usize,
    pub step_time_ms: u64,
    pub cleanup_scope: Option<CleanupScope>,
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
            match &event {
                TelemetryEvent::StepStarted { .. } => {
                    stats.steps_started += 1;
                }
                TelemetryEvent::StepCompleted { status, duration_ms, .. } => {
                    stats.step_time_ms += duration_ms;
                    match status {
                        StepStatus::Passed => stats.steps_passed += 1,
                        StepStatus::Failed => stats.steps_failed += 1,
                        StepStatus::Skipped => stats.steps_skipped += 1,
                    }
                }
                TelemetryEvent::RunCaptured { .. } => {
                    stats.runs_captured += 1;
                }
                TelemetryEvent::CleanupScoped { scope, .. } => {
                    stats.cleanup_scope = Some(*scope);
                }
            }
        }

        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Share of completed, non-skipped steps that passed
    pub fn step_success_rate(&self) -> f64 {
        let stats = self.get_stats();
        let total = stats.steps_passed + stats.steps_failed;
        if total == 0 {
            1.0
        } else {
            stats.steps_passed as f64 / total as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: crate::cli::Verbosity,
}

impl TelemetryDisplay {
    pub fn new(collector: TelemetryCollector, verbosity: crate::cli::Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        if !self.verbosity.show_events() {
            return;
        }
        let stats = self.collector.get_stats();
        let scope = match stats.cleanup_scope {
            Some(scope) => scope.as_str(),
            None => "none",
        };

        println!("\nWorkflow Summary");
        println!("─────────────────────────────────────");
        println!("Duration:          {:?}", self.collector.elapsed());
        println!("Steps run:         {}", stats.steps_started);
        println!("Passed/Failed:     {}/{}", stats.steps_passed, stats.steps_failed);
        println!("Skipped:           {}", stats.steps_skipped);
        println!("Success rate:      {:.1}%", self.collector.step_success_rate() * 100.0);
        println!("Runs captured:     {}", stats.runs_captured);
        println!("Cleanup scope:     {}", scope);
        println!();
    }
}
