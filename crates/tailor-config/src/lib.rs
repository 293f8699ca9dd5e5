//! Shared configuration for the tailor bootstrap layer.
//!
//! The crate owns two concerns. [`Config`] is the layered configuration
//! loaded through `ortho_config`: command-line flags override `TAILOR_*`
//! environment variables, which override configuration files, which override
//! the built-in defaults. `Config::load` and `Config::load_from_iter` come
//! from the [`OrthoConfig`] derive. The [`paths`] module derives the
//! directory tree used by a host process from environment variables and
//! read-only filesystem probes, following a fixed precedence chain.

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
pub mod paths;

pub use defaults::{
    DEFAULT_APP_NAME, DEFAULT_INSTALL_ROOT, DEFAULT_LOG_FILTER, DEFAULT_MINIMUM_HOST_VERSION,
    DEFAULT_SCRIPT_EXTENSION, DEFAULT_SYNC_COMMAND, default_app_name, default_install_root,
    default_log_filter, default_log_filter_string, default_log_format,
    default_minimum_host_version, default_script_extension, default_sync_command,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{
    DirPath, DirectorySet, Environment, FsProbe, MapEnvironment, PathResolveError, PathResolver,
    ProcessEnvironment, Profile, ProfileError, ResolverInputs, StaticProbe, SystemProbe,
};

/// Layered configuration consumed by the bootstrap sequence.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "TAILOR")]
pub struct Config {
    /// `tracing` filter expression applied by the telemetry layer.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Disables the startup optimizer so every global keeps its host value.
    #[ortho_config(default = false)]
    pub debug: bool,
    /// Marks the process as a long-lived background instance.
    #[ortho_config(default = false)]
    pub daemon: bool,
    /// Oldest host version the bootstrap accepts, as `major.minor`.
    #[ortho_config(default = default_minimum_host_version())]
    pub minimum_host_version: String,
    /// Installation root holding `profiles/` and `.local/`.
    #[ortho_config(default = default_install_root())]
    pub install_root: Utf8PathBuf,
    /// Directory name used beneath the XDG configuration home.
    #[ortho_config(default = default_app_name())]
    pub app_name: String,
    /// File extension of generated init and autoloads files.
    #[ortho_config(default = default_script_extension())]
    pub script_extension: String,
    /// Command suggested to users when generated artefacts are stale.
    #[ortho_config(default = default_sync_command())]
    pub sync_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            debug: false,
            daemon: false,
            minimum_host_version: default_minimum_host_version(),
            install_root: default_install_root(),
            app_name: default_app_name(),
            script_extension: default_script_extension(),
            sync_command: default_sync_command(),
        }
    }
}

impl Config {
    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Structured log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns `true` when the optimizer must leave global state untouched.
    #[must_use]
    pub fn optimizer_disabled(&self) -> bool {
        self.debug || self.daemon
    }

    /// Minimum supported host version as configured.
    #[must_use]
    pub fn minimum_host_version(&self) -> &str {
        self.minimum_host_version.as_str()
    }

    /// Command users run to regenerate stale build artefacts.
    #[must_use]
    pub fn sync_command(&self) -> &str {
        self.sync_command.as_str()
    }
}
