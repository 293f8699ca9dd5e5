use std::fmt;
use std::path::MAIN_SEPARATOR;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Absolute directory path that always ends in a path separator.
///
/// Path comparison in `camino` ignores trailing separators, so the
/// terminated textual form is enforced here rather than trusted to joins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(from = "Utf8PathBuf", into = "Utf8PathBuf")]
pub struct DirPath(Utf8PathBuf);

impl DirPath {
    /// Wraps `path`, appending a trailing separator when missing.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        let mut text = path.into().into_string();
        if !text.ends_with(MAIN_SEPARATOR) && !text.ends_with('/') {
            text.push(MAIN_SEPARATOR);
        }
        Self(Utf8PathBuf::from(text))
    }

    /// Returns the child directory `segment`.
    #[must_use]
    pub fn join_dir(&self, segment: &str) -> Self {
        Self::new(self.0.join(segment))
    }

    /// Returns the path of the file `name` inside this directory.
    #[must_use]
    pub fn join_file(&self, name: &str) -> Utf8PathBuf {
        self.0.join(name)
    }

    /// Borrows the underlying path.
    #[must_use]
    pub fn as_path(&self) -> &Utf8Path {
        self.0.as_path()
    }

    /// Borrows the separator-terminated text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Utf8PathBuf> for DirPath {
    fn from(path: Utf8PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<DirPath> for Utf8PathBuf {
    fn from(dir: DirPath) -> Self {
        dir.0
    }
}

impl AsRef<Utf8Path> for DirPath {
    fn as_ref(&self) -> &Utf8Path {
        self.as_path()
    }
}

impl fmt::Display for DirPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
