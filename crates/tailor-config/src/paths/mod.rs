//! Precedence-based derivation of the directories used by a host process.
//!
//! Resolution is a pure function of three inputs: environment variables read
//! through [`Environment`], directory existence checks made through
//! [`FsProbe`], and the fixed [`ResolverInputs`]. Nothing is created on disk;
//! callers own directory creation. Each directory follows its own precedence
//! chain in which the first defined source wins:
//!
//! - `user_dir`: `TAILOR_CONFIG_DIR`, then `${XDG_CONFIG_HOME:-~/.config}/<app>/`
//!   when that directory exists, then the legacy `~/.<app>.d/`.
//! - profile: `TAILOR_PROFILE`, parsed as `name@generation` (or `name@latest`);
//!   when unset no profile is active and the legacy layout applies.
//! - `profiles_dir`: `TAILOR_PROFILES_DIR`, then `<install_root>/profiles/`.
//! - `profile_dir`: `<profiles_dir>/<profile or default@latest>/`.
//! - `local_dir`: `TAILOR_LOCAL_DIR`, then `profile_dir` when a profile is
//!   active, then `<install_root>/.local/`.
//! - `data_dir`/`cache_dir`: `<profile_dir>/{data,cache}/` with an active
//!   profile, else `<local_dir>/etc/` and `<local_dir>/cache/`.
//!
//! Empty variables are treated as unset. Relative values are expanded against
//! the resolver's working directory and `~` against the home directory, so
//! every produced path is absolute.

mod dir;
mod env;
mod error;
mod probe;
mod profile;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::Serialize;

pub use dir::DirPath;
pub use env::{Environment, MapEnvironment, ProcessEnvironment};
pub use error::PathResolveError;
pub use probe::{FsProbe, StaticProbe, SystemProbe};
pub use profile::{GENERATION_SEPARATOR, LATEST_GENERATION, Profile, ProfileError};

use crate::Config;

/// Selects the active profile.
pub const PROFILE_ENV: &str = "TAILOR_PROFILE";
/// Overrides the user configuration directory.
pub const CONFIG_DIR_ENV: &str = "TAILOR_CONFIG_DIR";
/// Overrides the directory holding profiles.
pub const PROFILES_DIR_ENV: &str = "TAILOR_PROFILES_DIR";
/// Overrides the local state directory.
pub const LOCAL_DIR_ENV: &str = "TAILOR_LOCAL_DIR";
/// XDG base directory for user configuration.
pub const XDG_CONFIG_HOME_ENV: &str = "XDG_CONFIG_HOME";
/// Platform variable naming the user's home directory.
#[cfg(windows)]
pub const HOME_ENV: &str = "USERPROFILE";
/// Platform variable naming the user's home directory.
#[cfg(not(windows))]
pub const HOME_ENV: &str = "HOME";
/// Directory name used for `profile_dir` when no profile is active.
// TODO: replace with a real default-profile fallback once the profile loader
// decides whether legacy installs should migrate into `default@latest`.
pub const DEFAULT_PROFILE_DIR: &str = "default@latest";

/// Fixed, non-environment inputs to path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverInputs {
    install_root: Utf8PathBuf,
    working_dir: Utf8PathBuf,
    host_version: String,
    app_name: String,
    script_extension: String,
}

impl ResolverInputs {
    /// Builds inputs with the default application name and file extension.
    ///
    /// `working_dir` should be absolute; relative installation roots and
    /// environment values are expanded against it.
    #[must_use]
    pub fn new(
        install_root: impl Into<Utf8PathBuf>,
        working_dir: impl Into<Utf8PathBuf>,
        host_version: impl Into<String>,
    ) -> Self {
        Self {
            install_root: install_root.into(),
            working_dir: working_dir.into(),
            host_version: host_version.into(),
            app_name: crate::default_app_name(),
            script_extension: crate::default_script_extension(),
        }
    }

    /// Builds inputs from the loaded configuration.
    #[must_use]
    pub fn from_config(
        config: &Config,
        working_dir: impl Into<Utf8PathBuf>,
        host_version: impl Into<String>,
    ) -> Self {
        Self::new(config.install_root.clone(), working_dir, host_version)
            .with_app_name(config.app_name.clone())
            .with_script_extension(config.script_extension.clone())
    }

    /// Overrides the directory name used under the XDG configuration home.
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Overrides the extension of generated files.
    #[must_use]
    pub fn with_script_extension(mut self, extension: impl Into<String>) -> Self {
        self.script_extension = extension.into();
        self
    }

    /// Host version embedded in the autoloads file name.
    #[must_use]
    pub fn host_version(&self) -> &str {
        self.host_version.as_str()
    }
}

/// Directories and files derived for one process.
///
/// Directory entries are absolute and separator-terminated; file entries are
/// absolute and never separator-terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectorySet {
    user_dir: DirPath,
    profiles_dir: DirPath,
    profile: Option<Profile>,
    profile_dir: DirPath,
    profile_init_file: Option<Utf8PathBuf>,
    local_dir: DirPath,
    data_dir: DirPath,
    cache_dir: DirPath,
    env_file: Utf8PathBuf,
    autoloads_file: Utf8PathBuf,
}

impl DirectorySet {
    /// User configuration directory.
    #[must_use]
    pub fn user_dir(&self) -> &DirPath {
        &self.user_dir
    }

    /// Directory holding every profile.
    #[must_use]
    pub fn profiles_dir(&self) -> &DirPath {
        &self.profiles_dir
    }

    /// Active profile, or `None` in legacy mode.
    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Returns `true` when a profile is active.
    #[must_use]
    pub fn profile_active(&self) -> bool {
        self.profile.is_some()
    }

    /// Directory of the active (or default) profile.
    #[must_use]
    pub fn profile_dir(&self) -> &DirPath {
        &self.profile_dir
    }

    /// Generated init file of the active profile.
    #[must_use]
    pub fn profile_init_file(&self) -> Option<&Utf8Path> {
        self.profile_init_file.as_deref()
    }

    /// Local state directory.
    #[must_use]
    pub fn local_dir(&self) -> &DirPath {
        &self.local_dir
    }

    /// Persistent data directory.
    #[must_use]
    pub fn data_dir(&self) -> &DirPath {
        &self.data_dir
    }

    /// Cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &DirPath {
        &self.cache_dir
    }

    /// Environment snapshot file.
    #[must_use]
    pub fn env_file(&self) -> &Utf8Path {
        self.env_file.as_path()
    }

    /// Generated autoloads file; its name embeds the host version.
    #[must_use]
    pub fn autoloads_file(&self) -> &Utf8Path {
        self.autoloads_file.as_path()
    }
}

/// Derives a [`DirectorySet`] from the environment and filesystem.
pub struct PathResolver<'a> {
    env: &'a dyn Environment,
    probe: &'a dyn FsProbe,
    inputs: &'a ResolverInputs,
}

impl<'a> PathResolver<'a> {
    /// Creates a resolver over the supplied collaborators.
    #[must_use]
    pub fn new(
        env: &'a dyn Environment,
        probe: &'a dyn FsProbe,
        inputs: &'a ResolverInputs,
    ) -> Self {
        Self { env, probe, inputs }
    }

    /// Resolves every directory and file path.
    ///
    /// Identical environment and filesystem state always yield an identical
    /// [`DirectorySet`].
    pub fn resolve(&self) -> Result<DirectorySet, PathResolveError> {
        let install_root = DirPath::new(self.absolutize(&self.inputs.install_root));
        let user_dir = self.user_dir()?;

        let profiles_dir = match self.env_path(PROFILES_DIR_ENV)? {
            Some(path) => DirPath::new(path),
            None => install_root.join_dir("profiles"),
        };

        let profile = self.selected_profile(&profiles_dir)?;
        let profile_dir = match &profile {
            Some(profile) => profiles_dir.join_dir(&profile.dir_name()),
            None => profiles_dir.join_dir(DEFAULT_PROFILE_DIR),
        };

        let local_dir = match self.env_path(LOCAL_DIR_ENV)? {
            Some(path) => DirPath::new(path),
            None if profile.is_some() => profile_dir.clone(),
            None => install_root.join_dir(".local"),
        };

        let (data_dir, cache_dir, state_dir) = if profile.is_some() {
            (
                profile_dir.join_dir("data"),
                profile_dir.join_dir("cache"),
                &profile_dir,
            )
        } else {
            (
                local_dir.join_dir("etc"),
                local_dir.join_dir("cache"),
                &local_dir,
            )
        };

        let extension = self.inputs.script_extension.as_str();
        let env_file = state_dir.join_file("env");
        let autoloads_file = state_dir.join_file(&format!(
            "autoloads.{}.{extension}",
            self.inputs.host_version
        ));
        let profile_init_file = profile
            .as_ref()
            .map(|_| profile_dir.join_file(&format!("init.{extension}")));

        Ok(DirectorySet {
            user_dir,
            profiles_dir,
            profile,
            profile_dir,
            profile_init_file,
            local_dir,
            data_dir,
            cache_dir,
            env_file,
            autoloads_file,
        })
    }

    fn user_dir(&self) -> Result<DirPath, PathResolveError> {
        if let Some(path) = self.env_path(CONFIG_DIR_ENV)? {
            return Ok(DirPath::new(path));
        }

        let xdg_base = match self.env_path(XDG_CONFIG_HOME_ENV)? {
            Some(path) => Some(path),
            None => self.home().map(|home| home.join(".config")),
        };
        if let Some(base) = xdg_base {
            let candidate = base.join(&self.inputs.app_name);
            if self.probe.is_dir(&candidate) {
                return Ok(DirPath::new(candidate));
            }
        }

        let home = self.require_home("user_dir")?;
        Ok(DirPath::new(
            home.join(format!(".{}.d", self.inputs.app_name)),
        ))
    }

    fn selected_profile(
        &self,
        profiles_dir: &DirPath,
    ) -> Result<Option<Profile>, PathResolveError> {
        let Some(selector) = self.env_var(PROFILE_ENV) else {
            return Ok(None);
        };
        let requested: Profile = selector.parse()?;

        // TODO: decide whether a pinned generation that is missing may fall
        // back to `name@latest`; until then only the exact selector resolves.
        let dir = profiles_dir.join_dir(&requested.dir_name());
        if self.probe.is_dir(dir.as_path()) {
            return Ok(Some(requested));
        }

        Err(ProfileError::NotFound {
            profile: requested.to_string(),
            profiles_dir: profiles_dir.to_string(),
            tried: vec![dir.to_string()],
        }
        .into())
    }

    fn env_var(&self, key: &str) -> Option<String> {
        self.env.var(key).filter(|value| !value.is_empty())
    }

    fn env_path(&self, key: &str) -> Result<Option<Utf8PathBuf>, PathResolveError> {
        match self.env_var(key) {
            Some(raw) => self.expand(&raw, key).map(Some),
            None => Ok(None),
        }
    }

    fn expand(&self, raw: &str, needed_for: &str) -> Result<Utf8PathBuf, PathResolveError> {
        if let Some(rest) = raw.strip_prefix('~')
            && (rest.is_empty() || rest.starts_with(['/', '\\']))
        {
            let home = self.require_home(needed_for)?;
            return Ok(home.join(rest.trim_start_matches(['/', '\\'])));
        }
        Ok(self.absolutize(Utf8Path::new(raw)))
    }

    fn absolutize(&self, path: &Utf8Path) -> Utf8PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.inputs.working_dir.join(path)
        };
        joined
            .components()
            .filter(|component| !matches!(component, Utf8Component::CurDir))
            .collect()
    }

    fn home(&self) -> Option<Utf8PathBuf> {
        self.env.home_dir().map(|home| self.absolutize(&home))
    }

    fn require_home(&self, needed_for: &str) -> Result<Utf8PathBuf, PathResolveError> {
        self.home().ok_or_else(|| PathResolveError::MissingHome {
            variable: HOME_ENV,
            config_var: CONFIG_DIR_ENV,
            needed_for: needed_for.to_owned(),
        })
    }
}
