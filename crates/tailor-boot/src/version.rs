//! Host version validation.
//!
//! Comparison is numeric on `major.minor`, so `27.10` is newer than `27.9`.
//! Build consistency compares the full version, patch level included, because
//! any difference invalidates compiled artefacts.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::error::{Remediation, VersionError};

/// Where users find instructions for installing a supported host.
pub const INSTALL_GUIDE: &str = "docs/getting-started.md#installing-the-host";

/// Variable the CLI consults to select an alternate host binary.
pub const HOST_BINARY_ENV: &str = "TAILOR_HOST";

/// Parsed `major.minor[.patch]` host version.
///
/// Equality treats a missing patch level as `0`, so `29.1` equals `29.1.0`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HostVersion {
    major: u32,
    minor: u32,
    patch: Option<u32>,
}

impl HostVersion {
    /// Builds a `major.minor` version.
    #[must_use]
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            patch: None,
        }
    }

    /// Adds a patch level.
    #[must_use]
    pub fn with_patch(self, patch: u32) -> Self {
        Self {
            patch: Some(patch),
            ..self
        }
    }

    /// Major release number.
    #[must_use]
    pub fn major(&self) -> u32 {
        self.major
    }

    /// Minor release number.
    #[must_use]
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Patch level, `0` when the version omits it.
    #[must_use]
    pub fn patch(&self) -> u32 {
        self.patch.unwrap_or_default()
    }

    /// Orders two versions on `major.minor` only.
    #[must_use]
    pub fn cmp_release(&self, other: &Self) -> Ordering {
        (self.major, self.minor).cmp(&(other.major, other.minor))
    }
}

impl PartialEq for HostVersion {
    fn eq(&self, other: &Self) -> bool {
        (self.major, self.minor, self.patch()) == (other.major, other.minor, other.patch())
    }
}

impl Eq for HostVersion {}

impl Hash for HostVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.patch()).hash(state);
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}", self.major, self.minor)?;
        if let Some(patch) = self.patch {
            write!(formatter, ".{patch}")?;
        }
        Ok(())
    }
}

impl FromStr for HostVersion {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let unparseable = |reason| VersionError::Unparseable {
            input: input.to_owned(),
            reason,
        };
        let mut parts = input.trim().split('.');
        let mut number = |required: bool| -> Result<Option<u32>, VersionError> {
            match parts.next() {
                Some(part) => part
                    .parse::<u32>()
                    .map(Some)
                    .map_err(|_| unparseable("components must be non-negative integers")),
                None if required => Err(unparseable("expected at least 'major.minor'")),
                None => Ok(None),
            }
        };

        let major = number(true)?.unwrap_or_default();
        let minor = number(true)?.unwrap_or_default();
        let patch = number(false)?;
        if parts.next().is_some() {
            return Err(unparseable("expected at most 'major.minor.patch'"));
        }
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

/// Aborts startup when the running host cannot be supported.
#[derive(Debug, Clone)]
pub struct VersionGuard {
    host_binary: Utf8PathBuf,
    sync_command: String,
}

impl VersionGuard {
    /// Creates a guard reporting `host_binary` in remediation text.
    #[must_use]
    pub fn new(host_binary: impl Into<Utf8PathBuf>, sync_command: impl Into<String>) -> Self {
        Self {
            host_binary: host_binary.into(),
            sync_command: sync_command.into(),
        }
    }

    /// Fails with [`VersionError::TooOld`] when `current` predates `minimum`.
    pub fn check(&self, current: HostVersion, minimum: HostVersion) -> Result<(), VersionError> {
        if current.cmp_release(&minimum) == Ordering::Less {
            return Err(VersionError::TooOld {
                current,
                minimum,
                remediation: Remediation::new()
                    .host_location(self.host_binary.clone())
                    .step(format!("install host {minimum} or newer; see {INSTALL_GUIDE}"))
                    .step(format!("then run '{}' to recompile", self.sync_command))
                    .shell_example(format!(
                        "{HOST_BINARY_ENV}=/path/to/newer/host {}",
                        self.sync_command
                    )),
            });
        }
        Ok(())
    }

    /// Fails with [`VersionError::Mismatch`] when artefacts were built by a
    /// different host version than the one running.
    pub fn check_build_consistency(
        &self,
        build_time: HostVersion,
        run_time: HostVersion,
    ) -> Result<(), VersionError> {
        if build_time != run_time {
            return Err(VersionError::Mismatch {
                built_with: build_time,
                running: run_time,
                remediation: Remediation::new()
                    .host_location(self.host_binary.clone())
                    .step(format!(
                        "run '{}' to regenerate autoloads and recompile",
                        self.sync_command
                    ))
                    .shell_example(format!(
                        "{HOST_BINARY_ENV}={} {}",
                        self.host_binary, self.sync_command
                    )),
            });
        }
        Ok(())
    }
}
