//! Bootstrap core for hosts customised by tailor.
//!
//! Before a host becomes interactive the bootstrap validates its version,
//! resolves the directory tree through [`tailor_config::paths`], probes host
//! capabilities once, and applies temporary overrides that speed up startup.
//! Every override is captured, paired with a restoration at a lifecycle hook
//! point, and only then applied, so no displaced global outlives its owner.
//!
//! [`bootstrap_with`] performs the pre-module stage and returns a
//! [`Session`]. [`Session::run`] drives the hook points in their fixed order:
//! `pre-module-init`, `post-module-init`, `pre-module-config`,
//! `post-module-config`, `post-user-config`, `post-process-init` and
//! `post-ui-ready`. Module and user-configuration work is handed to a
//! [`StartupPhases`] implementation between those points.
//!
//! Failures are classified by [`ErrorKind`]. Version and profile failures are
//! fatal and abort the sequence after running every pending restoration;
//! everything else is isolated to the hook point or module that raised it and
//! collected in the [`StartupReport`].

mod bootstrap;
pub mod error;
mod features;
mod health;
mod hooks;
mod host;
mod interceptor;
mod optimizer;
mod runtime;
mod snapshot;
mod telemetry;
mod version;

pub use bootstrap::{
    BootstrapContext, BootstrapError, ConfigLoader, NoPhases, Session, StartupPhases,
    StartupReport, StaticConfigLoader, SystemConfigLoader, bootstrap, bootstrap_with,
};
pub use error::{
    AutoloadError, CoreError, ErrorKind, HookError, ModuleError, ModulePhase, PackageError,
    ProfileError, Remediation, UserError, VersionError,
};
pub use features::{Capability, CapabilityProbe, CapabilitySet, FeatureDetector, LegacyFlags};
pub use health::{BootstrapReporter, StructuredBootstrapReporter};
pub use hooks::{
    FireReport, HookCallback, HookPoint, HookSequencer, HookState, Registration, RestoreAction,
};
pub use host::HostProbe;
pub use interceptor::{InterceptorChain, InterceptorId, InterceptorRegistry, Next};
pub use optimizer::{
    AppliedOverride, BootstrapOptimizer, COMPRESSED_FILE_HANDLER, DEFERRAL_LABEL, Deferral,
    OptimizerOutcome, Override, RestoreRule, SkipReason, SkippedOverride, TERMINAL_INITIALIZATION,
    Temporary,
};
pub use runtime::{OverrideError, OverrideRecord, OverrideState, RuntimeConfig, Value};
pub use snapshot::StateSnapshotStore;
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use version::{HOST_BINARY_ENV, HostVersion, INSTALL_GUIDE, VersionGuard};

#[cfg(test)]
mod tests;
