use std::collections::BTreeMap;
use std::env;

use camino::Utf8PathBuf;

use super::HOME_ENV;

/// Read-only view of the environment variables consulted during resolution.
pub trait Environment {
    /// Returns the value of `key`, or `None` when unset or not valid UTF-8.
    fn var(&self, key: &str) -> Option<String>;

    /// Returns the user's home directory.
    fn home_dir(&self) -> Option<Utf8PathBuf> {
        self.var(HOME_ENV)
            .filter(|value| !value.is_empty())
            .map(Utf8PathBuf::from)
    }
}

/// Environment backed by the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn home_dir(&self) -> Option<Utf8PathBuf> {
        self.var(HOME_ENV)
            .filter(|value| !value.is_empty())
            .map(Utf8PathBuf::from)
            .or_else(|| dirs::home_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok()))
    }
}

/// Environment backed by an in-memory map.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MapEnvironment {
    vars: BTreeMap<String, String>,
}

impl MapEnvironment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the environment with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets `key` to `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Removes `key`.
    pub fn remove(&mut self, key: &str) {
        self.vars.remove(key);
    }
}

impl Environment for MapEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for MapEnvironment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}
