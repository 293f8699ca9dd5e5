use camino::Utf8PathBuf;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Oldest host release the bootstrap supports.
pub const DEFAULT_MINIMUM_HOST_VERSION: &str = "27.1";

/// Installation root used when none is configured; expanded against the
/// working directory during path resolution.
pub const DEFAULT_INSTALL_ROOT: &str = ".";

/// Directory name used beneath the XDG configuration home.
pub const DEFAULT_APP_NAME: &str = "tailor";

/// Extension of generated init and autoloads files.
pub const DEFAULT_SCRIPT_EXTENSION: &str = "el";

/// Command that regenerates autoloads and recompiles cached artefacts.
pub const DEFAULT_SYNC_COMMAND: &str = "tailor sync";

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Owned minimum host version.
pub fn default_minimum_host_version() -> String {
    DEFAULT_MINIMUM_HOST_VERSION.to_string()
}

/// Default installation root.
pub fn default_install_root() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_INSTALL_ROOT)
}

/// Default application directory name.
pub fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

/// Default generated-file extension.
pub fn default_script_extension() -> String {
    DEFAULT_SCRIPT_EXTENSION.to_string()
}

/// Default sync command shown in remediation text.
pub fn default_sync_command() -> String {
    DEFAULT_SYNC_COMMAND.to_string()
}
