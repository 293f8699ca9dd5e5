//! Typed error taxonomy shared by every bootstrap component.
//!
//! [`CoreError`] is the root of the recoverable hierarchy. Each subkind is
//! isolated to the boundary that produced it: a [`HookError`] to its hook
//! point, a [`ModuleError`] to its module. [`VersionError`] sits beside the
//! hierarchy and is always fatal. [`ErrorKind`] classifies any error for
//! downstream tooling without matching on concrete types.

use std::error::Error as StdError;
use std::fmt;

use camino::Utf8PathBuf;
use strum::Display;
use thiserror::Error;

pub use tailor_config::ProfileError;

use crate::hooks::HookPoint;
use crate::version::HostVersion;

/// Boxed cause attached to collaborator errors.
pub type BoxedSource = Box<dyn StdError + Send + Sync>;

/// Classification of every error the bootstrap layer can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// Root kind for core failures without a more specific class.
    Core,
    /// A callback at a hook point failed.
    Hook,
    /// The generated autoloads file is missing or corrupt.
    Autoload,
    /// The user's environment or configuration is wrong.
    User,
    /// An external module failed during init or config.
    Module,
    /// Package management failed.
    Package,
    /// No profile could be resolved.
    Profile,
    /// The host version is unsupported or inconsistent with build artefacts.
    Version,
}

impl ErrorKind {
    /// Returns `true` for kinds that always abort the bootstrap sequence.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Version | Self::Profile)
    }
}

/// User-facing fix instructions rendered under a fatal error message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Remediation {
    host_location: Option<Utf8PathBuf>,
    steps: Vec<String>,
    shell_example: Option<String>,
}

impl Remediation {
    /// Starts an empty remediation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records where the running host binary lives.
    #[must_use]
    pub fn host_location(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.host_location = Some(path.into());
        self
    }

    /// Appends an instruction line.
    #[must_use]
    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Records an alternate shell invocation.
    #[must_use]
    pub fn shell_example(mut self, example: impl Into<String>) -> Self {
        self.shell_example = Some(example.into());
        self
    }

    /// Location of the running host binary, when known.
    #[must_use]
    pub fn location(&self) -> Option<&Utf8PathBuf> {
        self.host_location.as_ref()
    }

    /// Instruction lines in display order.
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Alternate shell invocation, when relevant.
    #[must_use]
    pub fn example(&self) -> Option<&str> {
        self.shell_example.as_deref()
    }
}

impl fmt::Display for Remediation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        if let Some(location) = &self.host_location {
            lines.push(format!("  host binary: {location}"));
        }
        lines.extend(self.steps.iter().map(|step| format!("  {step}")));
        if let Some(example) = &self.shell_example {
            lines.push(format!("  alternatively: {example}"));
        }
        formatter.write_str(&lines.join("\n"))
    }
}

/// Fatal host version failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VersionError {
    /// The running host is older than the supported minimum.
    #[error("host {current} is not supported; version {minimum} or newer is required\n{remediation}")]
    TooOld {
        /// Version of the running host.
        current: HostVersion,
        /// Oldest supported version.
        minimum: HostVersion,
        /// Fix instructions.
        remediation: Remediation,
    },
    /// Generated artefacts were built by a different host version.
    #[error(
        "generated files were built with host {built_with} but host {running} is running\n{remediation}"
    )]
    Mismatch {
        /// Version recorded at the last build step.
        built_with: HostVersion,
        /// Version of the running host.
        running: HostVersion,
        /// Fix instructions.
        remediation: Remediation,
    },
    /// A version string could not be parsed.
    #[error("cannot parse host version '{input}': {reason}")]
    Unparseable {
        /// Offending text.
        input: String,
        /// Why parsing failed.
        reason: &'static str,
    },
}

impl VersionError {
    /// Remediation attached to the error, if any.
    #[must_use]
    pub fn remediation(&self) -> Option<&Remediation> {
        match self {
            Self::TooOld { remediation, .. } | Self::Mismatch { remediation, .. } => {
                Some(remediation)
            }
            Self::Unparseable { .. } => None,
        }
    }
}

/// A callback registered at a hook point failed.
#[derive(Debug, Error)]
#[error("hook '{callback}' failed at {point}: {source}")]
pub struct HookError {
    point: HookPoint,
    callback: String,
    fatal: bool,
    #[source]
    source: Box<CoreError>,
}

impl HookError {
    /// Wraps the failure of `callback` at `point`.
    #[must_use]
    pub fn new(
        point: HookPoint,
        callback: impl Into<String>,
        fatal: bool,
        source: CoreError,
    ) -> Self {
        Self {
            point,
            callback: callback.into(),
            fatal,
            source: Box::new(source),
        }
    }

    /// Hook point whose callback failed.
    #[must_use]
    pub fn point(&self) -> HookPoint {
        self.point
    }

    /// Label of the failing callback.
    #[must_use]
    pub fn callback(&self) -> &str {
        self.callback.as_str()
    }

    /// Returns `true` when the hook point was designated fatal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// Error returned by the callback.
    #[must_use]
    pub fn cause(&self) -> &CoreError {
        &self.source
    }
}

/// The generated autoloads file cannot be used.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AutoloadError {
    /// The file does not exist yet.
    #[error("autoloads file '{path}' is missing; run '{sync_command}' to generate it")]
    Missing {
        /// Expected location.
        path: Utf8PathBuf,
        /// Command that regenerates the file.
        sync_command: String,
    },
    /// The file exists but could not be read as autoloads.
    ///
    /// Bootstrap only checks that the file is present. The loader that reads
    /// it raises this variant during module initialisation.
    #[error("autoloads file '{path}' is corrupt ({reason}); run '{sync_command}' to regenerate it")]
    Corrupt {
        /// Offending file.
        path: Utf8PathBuf,
        /// Description of the damage.
        reason: String,
        /// Command that regenerates the file.
        sync_command: String,
    },
}

/// Misconfiguration in the user's environment or configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}\n{remediation}")]
pub struct UserError {
    message: String,
    remediation: Remediation,
}

impl UserError {
    /// Builds an error with actionable fix instructions.
    #[must_use]
    pub fn new(message: impl Into<String>, remediation: Remediation) -> Self {
        Self {
            message: message.into(),
            remediation,
        }
    }

    /// Summary line.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Fix instructions.
    #[must_use]
    pub fn remediation(&self) -> &Remediation {
        &self.remediation
    }
}

/// Module lifecycle phase in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ModulePhase {
    /// Module initialisation.
    Init,
    /// Module configuration.
    Config,
}

/// An external module failed.
#[derive(Debug, Error)]
#[error("module '{module}' failed during {phase}: {message}")]
pub struct ModuleError {
    module: String,
    phase: ModulePhase,
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl ModuleError {
    /// Builds an error without an underlying cause.
    #[must_use]
    pub fn new(module: impl Into<String>, phase: ModulePhase, message: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            phase,
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        module: impl Into<String>,
        phase: ModulePhase,
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::new(module, phase, message)
        }
    }

    /// Name of the failing module.
    #[must_use]
    pub fn module(&self) -> &str {
        self.module.as_str()
    }

    /// Phase in which the module failed.
    #[must_use]
    pub fn phase(&self) -> ModulePhase {
        self.phase
    }
}

/// Package management failed.
#[derive(Debug, Error)]
#[error("package '{package}': {message}")]
pub struct PackageError {
    package: String,
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl PackageError {
    /// Builds an error without an underlying cause.
    #[must_use]
    pub fn new(package: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        package: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::new(package, message)
        }
    }

    /// Name of the failing package.
    #[must_use]
    pub fn package(&self) -> &str {
        self.package.as_str()
    }
}

/// Root of the recoverable error hierarchy.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Failure without a more specific kind.
    #[error("{message}")]
    Core {
        /// Description of the failure.
        message: String,
        /// Optional underlying cause.
        #[source]
        source: Option<BoxedSource>,
    },
    /// A hook callback failed.
    #[error(transparent)]
    Hook(#[from] HookError),
    /// The autoloads file is unusable.
    #[error(transparent)]
    Autoload(#[from] AutoloadError),
    /// The user's setup is wrong.
    #[error(transparent)]
    User(#[from] UserError),
    /// A module failed.
    #[error(transparent)]
    Module(#[from] ModuleError),
    /// A package operation failed.
    #[error(transparent)]
    Package(#[from] PackageError),
    /// No profile could be resolved.
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl CoreError {
    /// Builds a root-kind error from a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Core {
            message: message.into(),
            source: None,
        }
    }

    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core { .. } => ErrorKind::Core,
            Self::Hook(_) => ErrorKind::Hook,
            Self::Autoload(_) => ErrorKind::Autoload,
            Self::User(_) => ErrorKind::User,
            Self::Module(_) => ErrorKind::Module,
            Self::Package(_) => ErrorKind::Package,
            Self::Profile(_) => ErrorKind::Profile,
        }
    }

    /// Returns `true` when the error must abort the bootstrap sequence.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Hook(error) => error.is_fatal(),
            other => other.kind().is_fatal(),
        }
    }
}
