use std::collections::BTreeSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

/// Read-only filesystem existence checks.
///
/// Implementations must never create, modify, or remove filesystem entries.
pub trait FsProbe {
    /// Returns `true` when `path` names an existing directory.
    fn is_dir(&self, path: &Utf8Path) -> bool;

    /// Returns `true` when `path` names an existing regular file.
    fn is_file(&self, path: &Utf8Path) -> bool;
}

/// Probe that queries the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl FsProbe for SystemProbe {
    fn is_dir(&self, path: &Utf8Path) -> bool {
        fs::metadata(path).is_ok_and(|metadata| metadata.is_dir())
    }

    fn is_file(&self, path: &Utf8Path) -> bool {
        fs::metadata(path).is_ok_and(|metadata| metadata.is_file())
    }
}

/// Probe answering from a fixed set of known directories and files.
#[derive(Debug, Default, Clone)]
pub struct StaticProbe {
    dirs: BTreeSet<Utf8PathBuf>,
    files: BTreeSet<Utf8PathBuf>,
}

impl StaticProbe {
    /// Creates a probe that reports nothing as existing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `path` as an existing directory.
    #[must_use]
    pub fn with_dir(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.dirs.insert(path.into());
        self
    }

    /// Records `path` as an existing file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.files.insert(path.into());
        self
    }
}

impl FsProbe for StaticProbe {
    fn is_dir(&self, path: &Utf8Path) -> bool {
        self.dirs.contains(path)
    }

    fn is_file(&self, path: &Utf8Path) -> bool {
        self.files.contains(path)
    }
}
