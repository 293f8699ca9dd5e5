//! Test double for [`BootstrapReporter`] that records lifecycle events.

use std::sync::Mutex;

use tailor_config::{Config, DirectorySet};

use crate::bootstrap::{BootstrapError, StartupReport};
use crate::error::{CoreError, ErrorKind, HookError};
use crate::health::BootstrapReporter;
use crate::hooks::{FireReport, HookPoint};
use crate::optimizer::{OptimizerOutcome, SkipReason};
use crate::version::HostVersion;

/// Lifecycle events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapEvent {
    BootstrapStarting,
    VersionChecked,
    OptimizerApplied(usize),
    OptimizerSkipped(SkipReason),
    BootstrapSucceeded,
    BootstrapFailed(ErrorKind),
    HookFired(HookPoint),
    HookFailed { point: HookPoint, callback: String },
    ErrorRecovered(ErrorKind),
    SequenceUnwound(Vec<String>),
    StartupCompleted,
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<BootstrapEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<BootstrapEvent> {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: BootstrapEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl BootstrapReporter for RecordingReporter {
    fn bootstrap_starting(&self) {
        self.record(BootstrapEvent::BootstrapStarting);
    }

    fn version_checked(&self, _current: HostVersion, _minimum: HostVersion) {
        self.record(BootstrapEvent::VersionChecked);
    }

    fn optimizer_finished(&self, outcome: &OptimizerOutcome) {
        self.record(match outcome {
            OptimizerOutcome::Skipped { reason } => BootstrapEvent::OptimizerSkipped(*reason),
            applied @ OptimizerOutcome::Applied { .. } => {
                BootstrapEvent::OptimizerApplied(applied.applied_count())
            }
        });
    }

    fn bootstrap_succeeded(&self, _config: &Config, _directories: &DirectorySet) {
        self.record(BootstrapEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(BootstrapEvent::BootstrapFailed(error.kind()));
    }

    fn hook_fired(&self, report: &FireReport) {
        if !report.already_fired() {
            self.record(BootstrapEvent::HookFired(report.point()));
        }
    }

    fn hook_failed(&self, error: &HookError) {
        self.record(BootstrapEvent::HookFailed {
            point: error.point(),
            callback: error.callback().to_owned(),
        });
    }

    fn error_recovered(&self, error: &CoreError) {
        self.record(BootstrapEvent::ErrorRecovered(error.kind()));
    }

    fn sequence_unwound(&self, restored: &[String]) {
        self.record(BootstrapEvent::SequenceUnwound(restored.to_vec()));
    }

    fn startup_completed(&self, _report: &StartupReport) {
        self.record(BootstrapEvent::StartupCompleted);
    }
}
