//! Once-per-process capture of original global values.

use std::collections::BTreeMap;

use crate::runtime::Value;

/// Original values of overridden globals, captured at most once per name.
///
/// Capture is idempotent so a repeated or re-entrant bootstrap can never
/// record an already-overridden value as the original.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StateSnapshotStore {
    captured: BTreeMap<String, Value>,
}

impl StateSnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures `name` using `current` unless it was captured before.
    ///
    /// `current` runs only on the first capture. Returns the stored value, or
    /// `None` when `name` was never captured and `current` yields nothing.
    pub fn capture_with<F>(&mut self, name: &str, current: F) -> Option<&Value>
    where
        F: FnOnce() -> Option<Value>,
    {
        if !self.captured.contains_key(name)
            && let Some(value) = current()
        {
            self.captured.insert(name.to_owned(), value);
        }
        self.captured.get(name)
    }

    /// Returns the captured value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.captured.get(name)
    }

    /// Returns `true` once `name` has been captured.
    #[must_use]
    pub fn is_captured(&self, name: &str) -> bool {
        self.captured.contains_key(name)
    }

    /// Number of captured globals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.captured.len()
    }

    /// Returns `true` when nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.captured.is_empty()
    }
}
