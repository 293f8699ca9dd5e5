//! Staged bootstrap orchestration.
//!
//! [`bootstrap_with`] performs everything that must happen before modules
//! load: configuration, telemetry, version validation, path resolution,
//! capability detection and the startup optimizer. Version and path failures
//! abort before any global is overridden. [`Session::run`] then drives the
//! lifecycle hook points in their fixed order.

use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig as _, OrthoError};
use thiserror::Error;

use tailor_config::{
    Config, DirectorySet, Environment, FsProbe, PathResolveError, PathResolver,
    ProcessEnvironment, ResolverInputs, SystemProbe,
};

use crate::error::{AutoloadError, CoreError, ErrorKind, HookError, Remediation, VersionError};
use crate::features::{CapabilitySet, FeatureDetector, LegacyFlags};
use crate::health::BootstrapReporter;
use crate::hooks::{HookPoint, HookSequencer, Registration};
use crate::host::HostProbe;
use crate::optimizer::{BootstrapOptimizer, OptimizerOutcome, SkipReason};
use crate::runtime::RuntimeConfig;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::version::{HostVersion, VersionGuard};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to `Config::load`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Fatal errors that abort bootstrap or startup.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The host version is unsupported or inconsistent with build artefacts.
    #[error(transparent)]
    Version {
        /// Underlying version failure.
        #[from]
        source: VersionError,
    },
    /// Directories could not be resolved.
    #[error(transparent)]
    Paths {
        /// Underlying resolution failure.
        #[from]
        source: PathResolveError,
    },
    /// A callback failed at a hook point designated fatal.
    #[error("startup aborted: {source}")]
    FatalHook {
        /// The failing callback.
        #[source]
        source: HookError,
    },
    /// A startup phase raised an error of a fatal kind.
    #[error("startup aborted: {source}")]
    Fatal {
        /// The fatal error.
        #[source]
        source: CoreError,
    },
}

impl BootstrapError {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::User,
            Self::Telemetry { .. } => ErrorKind::Core,
            Self::Version { .. } => ErrorKind::Version,
            Self::Paths {
                source: PathResolveError::Profile(_),
            } => ErrorKind::Profile,
            Self::Paths { .. } => ErrorKind::User,
            Self::FatalHook { source } if source.cause().is_fatal() => source.cause().kind(),
            Self::FatalHook { .. } => ErrorKind::Hook,
            Self::Fatal { source } => source.kind(),
        }
    }

    /// User-facing fix instructions, when the error carries them.
    #[must_use]
    pub fn remediation(&self) -> Option<&Remediation> {
        match self {
            Self::Version { source } => source.remediation(),
            Self::Fatal {
                source: CoreError::User(error),
            } => Some(error.remediation()),
            _ => None,
        }
    }
}

/// Collaborators consulted during bootstrap.
pub struct BootstrapContext<'a> {
    host: &'a dyn HostProbe,
    env: &'a dyn Environment,
    probe: &'a dyn FsProbe,
    working_dir: Utf8PathBuf,
    detector: &'a FeatureDetector,
    optimizer: BootstrapOptimizer,
}

impl<'a> BootstrapContext<'a> {
    /// Builds a context using the process-wide feature detector and the
    /// standard optimizer.
    #[must_use]
    pub fn new(
        host: &'a dyn HostProbe,
        env: &'a dyn Environment,
        probe: &'a dyn FsProbe,
        working_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            host,
            env,
            probe,
            working_dir: working_dir.into(),
            detector: FeatureDetector::process(),
            optimizer: BootstrapOptimizer::standard(),
        }
    }

    /// Builds a context over the real process environment and filesystem.
    #[must_use]
    pub fn system(host: &'a dyn HostProbe, working_dir: impl Into<Utf8PathBuf>) -> Self {
        Self::new(host, &ProcessEnvironment, &SystemProbe, working_dir)
    }

    /// Uses `detector` instead of the process-wide one.
    #[must_use]
    pub fn with_detector(mut self, detector: &'a FeatureDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Replaces the optimizer.
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: BootstrapOptimizer) -> Self {
        self.optimizer = optimizer;
        self
    }
}

/// Hands control to external collaborators between hook points.
///
/// Every method defaults to doing nothing.
pub trait StartupPhases {
    /// Initialises modules. Errors are isolated per module.
    fn init_modules(
        &mut self,
        _runtime: &mut RuntimeConfig,
        _hooks: &mut HookSequencer,
    ) -> Vec<CoreError> {
        Vec::new()
    }

    /// Loads module configuration. Errors are isolated per module.
    fn configure_modules(
        &mut self,
        _runtime: &mut RuntimeConfig,
        _hooks: &mut HookSequencer,
    ) -> Vec<CoreError> {
        Vec::new()
    }

    /// Loads the user's own configuration.
    fn load_user_config(
        &mut self,
        _runtime: &mut RuntimeConfig,
        _hooks: &mut HookSequencer,
    ) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Phases that do nothing, leaving only registered hooks to run.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPhases;

impl StartupPhases for NoPhases {}

/// Non-fatal outcome of [`Session::run`].
#[derive(Debug, Default)]
pub struct StartupReport {
    fired: Vec<HookPoint>,
    errors: Vec<CoreError>,
}

impl StartupReport {
    /// Hook points fired, in order.
    #[must_use]
    pub fn fired(&self) -> &[HookPoint] {
        &self.fired
    }

    /// Errors recorded while startup continued.
    #[must_use]
    pub fn errors(&self) -> &[CoreError] {
        &self.errors
    }

    /// Returns `true` when nothing went wrong.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

enum Stage {
    Fire(HookPoint),
    InitModules,
    ConfigureModules,
    LoadUserConfig,
}

const STAGES: [Stage; 10] = [
    Stage::Fire(HookPoint::PreModuleInit),
    Stage::InitModules,
    Stage::Fire(HookPoint::PostModuleInit),
    Stage::Fire(HookPoint::PreModuleConfig),
    Stage::ConfigureModules,
    Stage::Fire(HookPoint::PostModuleConfig),
    Stage::LoadUserConfig,
    Stage::Fire(HookPoint::PostUserConfig),
    Stage::Fire(HookPoint::PostProcessInit),
    Stage::Fire(HookPoint::PostUiReady),
];

/// Bootstrapped process state, ready to run the startup sequence.
pub struct Session {
    config: Config,
    directories: DirectorySet,
    host_version: HostVersion,
    capabilities: CapabilitySet,
    legacy_flags: LegacyFlags,
    runtime: RuntimeConfig,
    hooks: HookSequencer,
    optimizer: OptimizerOutcome,
    deferred: Vec<CoreError>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn BootstrapReporter>,
}

impl Session {
    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolved directories.
    #[must_use]
    pub fn directories(&self) -> &DirectorySet {
        &self.directories
    }

    /// Version of the running host.
    #[must_use]
    pub fn host_version(&self) -> HostVersion {
        self.host_version
    }

    /// Detected host capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Compatibility lookups for retired capability flags.
    #[must_use]
    pub fn legacy_flags(&self) -> &LegacyFlags {
        &self.legacy_flags
    }

    /// Host globals and override bookkeeping.
    #[must_use]
    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    /// Mutable host globals.
    pub fn runtime_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.runtime
    }

    /// Hook registry.
    #[must_use]
    pub fn hooks(&self) -> &HookSequencer {
        &self.hooks
    }

    /// What the optimizer did.
    #[must_use]
    pub fn optimizer_outcome(&self) -> &OptimizerOutcome {
        &self.optimizer
    }

    /// Non-fatal problems found during bootstrap, reported by `run`.
    #[must_use]
    pub fn deferred_errors(&self) -> &[CoreError] {
        &self.deferred
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Registers a callback at `point`.
    pub fn register<F>(
        &mut self,
        point: HookPoint,
        priority: i32,
        label: impl Into<String>,
        callback: F,
    ) -> Registration
    where
        F: FnOnce(&mut RuntimeConfig) -> Result<(), CoreError> + 'static,
    {
        self.hooks.register(point, priority, label, callback)
    }

    /// Designates `point` as fatal.
    pub fn mark_fatal(&mut self, point: HookPoint) {
        self.hooks.mark_fatal(point);
    }

    /// Runs the startup sequence, firing every hook point once.
    ///
    /// Non-fatal errors are recorded and sequencing continues. A fatal error
    /// runs every pending restoration and aborts. Calling `run` again after
    /// the sequence started does nothing.
    pub fn run(&mut self, phases: &mut dyn StartupPhases) -> Result<StartupReport, BootstrapError> {
        if self.hooks.has_fired(HookPoint::PreModuleInit) {
            tracing::warn!(
                target: "tailor::hooks",
                "startup sequence already ran; ignoring"
            );
            return Ok(StartupReport::default());
        }

        let mut report = StartupReport {
            fired: Vec::new(),
            errors: std::mem::take(&mut self.deferred),
        };
        for stage in &STAGES {
            match stage {
                Stage::Fire(point) => self.fire(*point, &mut report)?,
                Stage::InitModules => {
                    for error in phases.init_modules(&mut self.runtime, &mut self.hooks) {
                        self.recover(error, &mut report)?;
                    }
                }
                Stage::ConfigureModules => {
                    for error in phases.configure_modules(&mut self.runtime, &mut self.hooks) {
                        self.recover(error, &mut report)?;
                    }
                }
                Stage::LoadUserConfig => {
                    if let Err(error) = phases.load_user_config(&mut self.runtime, &mut self.hooks)
                    {
                        self.recover(error, &mut report)?;
                    }
                }
            }
        }

        self.reporter.startup_completed(&report);
        Ok(report)
    }

    fn fire(&mut self, point: HookPoint, report: &mut StartupReport) -> Result<(), BootstrapError> {
        let mut fired = self.hooks.fire(point, &mut self.runtime);
        self.reporter.hook_fired(&fired);
        if fired.already_fired() {
            return Ok(());
        }
        report.fired.push(point);

        let Some(error) = fired.take_error() else {
            return Ok(());
        };
        self.reporter.hook_failed(&error);
        if error.is_fatal() || error.cause().is_fatal() {
            return Err(self.abort(BootstrapError::FatalHook { source: error }));
        }
        report.errors.push(CoreError::Hook(error));
        Ok(())
    }

    fn recover(
        &mut self,
        error: CoreError,
        report: &mut StartupReport,
    ) -> Result<(), BootstrapError> {
        if error.is_fatal() {
            return Err(self.abort(BootstrapError::Fatal { source: error }));
        }
        self.reporter.error_recovered(&error);
        report.errors.push(error);
        Ok(())
    }

    fn abort(&mut self, error: BootstrapError) -> BootstrapError {
        let restored = self.hooks.unwind(&mut self.runtime);
        self.reporter.sequence_unwound(&restored);
        self.reporter.bootstrap_failed(&error);
        error
    }
}

/// Bootstraps over the real process environment with the system loader.
pub fn bootstrap(
    host: &dyn HostProbe,
    working_dir: impl Into<Utf8PathBuf>,
    reporter: Arc<dyn BootstrapReporter>,
) -> Result<Session, BootstrapError> {
    bootstrap_with(
        &SystemConfigLoader,
        BootstrapContext::system(host, working_dir),
        reporter,
    )
}

/// Bootstraps using the supplied collaborators.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    context: BootstrapContext<'_>,
    reporter: Arc<dyn BootstrapReporter>,
) -> Result<Session, BootstrapError> {
    reporter.bootstrap_starting();
    match prepare(loader, context, &reporter) {
        Ok(session) => {
            reporter.bootstrap_succeeded(&session.config, &session.directories);
            Ok(session)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn prepare(
    loader: &dyn ConfigLoader,
    context: BootstrapContext<'_>,
    reporter: &Arc<dyn BootstrapReporter>,
) -> Result<Session, BootstrapError> {
    let BootstrapContext {
        host,
        env,
        probe,
        working_dir,
        detector,
        optimizer,
    } = context;

    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let current = host.version();
    let minimum: HostVersion = config.minimum_host_version().parse()?;
    let guard = VersionGuard::new(host.binary_path(), config.sync_command());
    guard.check(current, minimum)?;
    if let Some(built_with) = host.build_version() {
        guard.check_build_consistency(built_with, current)?;
    }
    reporter.version_checked(current, minimum);

    let inputs = ResolverInputs::from_config(&config, working_dir, current.to_string());
    let directories = PathResolver::new(env, probe, &inputs).resolve()?;

    let mut deferred = Vec::new();
    if !probe.is_file(directories.autoloads_file()) {
        deferred.push(CoreError::from(AutoloadError::Missing {
            path: directories.autoloads_file().to_owned(),
            sync_command: config.sync_command().to_owned(),
        }));
    }

    let capabilities = detector.detect(host).clone();

    let mut runtime = RuntimeConfig::from_variables(host.variables());
    let mut hooks = HookSequencer::new();
    let skip = if config.debug {
        Some(SkipReason::Debug)
    } else if config.daemon || host.is_daemon() {
        Some(SkipReason::Daemon)
    } else {
        None
    };
    let outcome = optimizer.apply(skip, &mut runtime, &mut hooks);
    reporter.optimizer_finished(&outcome);

    Ok(Session {
        config,
        directories,
        host_version: current,
        legacy_flags: LegacyFlags::new(capabilities.clone()),
        capabilities,
        runtime,
        hooks,
        optimizer: outcome,
        deferred,
        telemetry,
        reporter: Arc::clone(reporter),
    })
}
