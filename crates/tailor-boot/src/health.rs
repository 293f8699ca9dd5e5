//! Structured reporting for bootstrap lifecycle events.

use std::sync::Arc;

use tailor_config::{Config, DirectorySet};

use crate::bootstrap::{BootstrapError, StartupReport};
use crate::error::{CoreError, HookError};
use crate::hooks::FireReport;
use crate::optimizer::OptimizerOutcome;
use crate::version::HostVersion;

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait BootstrapReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after the host version passed validation.
    fn version_checked(&self, current: HostVersion, minimum: HostVersion);

    /// Invoked after the optimizer ran or was skipped.
    fn optimizer_finished(&self, outcome: &OptimizerOutcome);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config, directories: &DirectorySet);

    /// Invoked when bootstrap or startup aborts.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a hook point fires.
    fn hook_fired(&self, report: &FireReport);

    /// Invoked when a callback fails at a hook point.
    fn hook_failed(&self, error: &HookError);

    /// Invoked when a non-fatal error is recorded and startup continues.
    fn error_recovered(&self, error: &CoreError);

    /// Invoked after pending restorations ran because startup aborted.
    fn sequence_unwound(&self, restored: &[String]);

    /// Invoked once every startup stage has run.
    fn startup_completed(&self, report: &StartupReport);
}

impl<T> BootstrapReporter for Arc<T>
where
    T: BootstrapReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn version_checked(&self, current: HostVersion, minimum: HostVersion) {
        (**self).version_checked(current, minimum);
    }

    fn optimizer_finished(&self, outcome: &OptimizerOutcome) {
        (**self).optimizer_finished(outcome);
    }

    fn bootstrap_succeeded(&self, config: &Config, directories: &DirectorySet) {
        (**self).bootstrap_succeeded(config, directories);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn hook_fired(&self, report: &FireReport) {
        (**self).hook_fired(report);
    }

    fn hook_failed(&self, error: &HookError) {
        (**self).hook_failed(error);
    }

    fn error_recovered(&self, error: &CoreError) {
        (**self).error_recovered(error);
    }

    fn sequence_unwound(&self, restored: &[String]) {
        (**self).sequence_unwound(restored);
    }

    fn startup_completed(&self, report: &StartupReport) {
        (**self).startup_completed(report);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredBootstrapReporter;

impl StructuredBootstrapReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BootstrapReporter for StructuredBootstrapReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: "tailor::health",
            event = "bootstrap_starting",
            "starting bootstrap"
        );
    }

    fn version_checked(&self, current: HostVersion, minimum: HostVersion) {
        tracing::debug!(
            target: "tailor::health",
            event = "version_checked",
            current = %current,
            minimum = %minimum,
            "host version accepted"
        );
    }

    fn optimizer_finished(&self, outcome: &OptimizerOutcome) {
        match outcome {
            OptimizerOutcome::Skipped { reason } => tracing::info!(
                target: "tailor::health",
                event = "optimizer_skipped",
                reason = %reason,
                "startup optimizer skipped"
            ),
            OptimizerOutcome::Applied {
                overrides,
                deferrals,
                skipped,
            } => tracing::info!(
                target: "tailor::health",
                event = "optimizer_applied",
                overrides = overrides.len(),
                deferrals = deferrals.len(),
                skipped = ?skipped,
                "startup optimizer applied"
            ),
        }
    }

    fn bootstrap_succeeded(&self, config: &Config, directories: &DirectorySet) {
        tracing::info!(
            target: "tailor::health",
            event = "bootstrap_succeeded",
            profile = ?directories.profile().map(ToString::to_string),
            directories = %serde_json::to_string(directories).unwrap_or_default(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "tailor::health",
            event = "bootstrap_failed",
            kind = %error.kind(),
            error = %error,
            "bootstrap failed"
        );
    }

    fn hook_fired(&self, report: &FireReport) {
        tracing::debug!(
            target: "tailor::health",
            event = "hook_fired",
            hook = %report.point(),
            executed = ?report.executed(),
            skipped = ?report.skipped(),
            restored = ?report.restored(),
            repeated = report.already_fired(),
            "hook point fired"
        );
    }

    fn hook_failed(&self, error: &HookError) {
        tracing::error!(
            target: "tailor::health",
            event = "hook_failed",
            hook = %error.point(),
            callback = error.callback(),
            fatal = error.is_fatal(),
            error = %error,
            "hook callback failed"
        );
    }

    fn error_recovered(&self, error: &CoreError) {
        tracing::warn!(
            target: "tailor::health",
            event = "error_recovered",
            kind = %error.kind(),
            error = %error,
            "continuing after error"
        );
    }

    fn sequence_unwound(&self, restored: &[String]) {
        tracing::warn!(
            target: "tailor::health",
            event = "sequence_unwound",
            restored = ?restored,
            "startup aborted; pending restorations ran"
        );
    }

    fn startup_completed(&self, report: &StartupReport) {
        tracing::info!(
            target: "tailor::health",
            event = "startup_completed",
            fired = report.fired().len(),
            errors = report.errors().len(),
            "startup completed"
        );
    }
}
