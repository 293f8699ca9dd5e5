//! Explicit context standing in for the host's global variable namespace.
//!
//! Every temporary override is recorded against [`RuntimeConfig`] with the
//! hook point that owns its restoration, so a caller can always tell which
//! globals are currently displaced and who will put them back.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::hooks::HookPoint;
use crate::interceptor::InterceptorRegistry;
use crate::snapshot::StateSnapshotStore;

/// Value held by a host global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// The host's empty value.
    Nil,
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// String.
    Text(String),
    /// Ordered list of names, such as handler or suffix lists.
    List(Vec<String>),
}

impl Value {
    /// Returns the list elements when the value is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the flag when the value is boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the integer when the value is numeric.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(number) => Some(*number),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => formatter.write_str("nil"),
            Self::Bool(true) => formatter.write_str("t"),
            Self::Bool(false) => formatter.write_str("nil"),
            Self::Int(number) => write!(formatter, "{number}"),
            Self::Text(text) => write!(formatter, "{text:?}"),
            Self::List(items) => write!(formatter, "({})", items.join(" ")),
        }
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Self::Int(number)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// Whether an override still displaces its global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideState {
    /// The temporary value is in effect.
    Active,
    /// The original value has been put back.
    Restored,
}

/// Undo record for one temporary override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRecord {
    variable: String,
    restore_at: HookPoint,
    state: OverrideState,
}

impl OverrideRecord {
    /// Name of the overridden global.
    #[must_use]
    pub fn variable(&self) -> &str {
        self.variable.as_str()
    }

    /// Hook point that owns the restoration.
    #[must_use]
    pub fn restore_at(&self) -> HookPoint {
        self.restore_at
    }

    /// Current state of the override.
    #[must_use]
    pub fn state(&self) -> OverrideState {
        self.state
    }
}

/// Reasons an override is refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OverrideError {
    /// The original value was never captured, so it could not be restored.
    #[error("refusing to override '{variable}': its original value was not captured")]
    NotCaptured {
        /// Offending global.
        variable: String,
    },
    /// Another override already displaces the global.
    #[error("'{variable}' is already overridden until {restore_at}")]
    AlreadyOverridden {
        /// Offending global.
        variable: String,
        /// Restoration point of the existing override.
        restore_at: HookPoint,
    },
}

/// Host globals plus the bookkeeping that keeps overrides reversible.
#[derive(Debug, Default)]
pub struct RuntimeConfig {
    variables: BTreeMap<String, Value>,
    snapshots: StateSnapshotStore,
    overrides: Vec<OverrideRecord>,
    interceptors: InterceptorRegistry,
}

impl RuntimeConfig {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context seeded with the host's current globals.
    #[must_use]
    pub fn from_variables(variables: BTreeMap<String, Value>) -> Self {
        Self {
            variables,
            ..Self::default()
        }
    }

    /// Current value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Sets `name` directly, returning the previous value.
    ///
    /// Direct writes bypass override bookkeeping; collaborators use this for
    /// globals they own outright.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.variables.insert(name.to_owned(), value.into())
    }

    /// Captures the current value of `name` unless it was captured before.
    pub fn capture(&mut self, name: &str) -> Option<&Value> {
        let current = self.variables.get(name).cloned();
        self.snapshots.capture_with(name, || current)
    }

    /// Captured originals.
    #[must_use]
    pub fn snapshots(&self) -> &StateSnapshotStore {
        &self.snapshots
    }

    /// Replaces `name` with `value` until `restore_at` fires.
    ///
    /// The original must already be captured and no other override may be
    /// active for the same global.
    pub fn apply_override(
        &mut self,
        name: &str,
        value: Value,
        restore_at: HookPoint,
    ) -> Result<(), OverrideError> {
        if !self.snapshots.is_captured(name) {
            return Err(OverrideError::NotCaptured {
                variable: name.to_owned(),
            });
        }
        if let Some(existing) = self.active_record(name) {
            return Err(OverrideError::AlreadyOverridden {
                variable: name.to_owned(),
                restore_at: existing.restore_at,
            });
        }
        self.variables.insert(name.to_owned(), value);
        self.overrides.push(OverrideRecord {
            variable: name.to_owned(),
            restore_at,
            state: OverrideState::Active,
        });
        Ok(())
    }

    /// Writes `value` back and closes the active override on `name`.
    ///
    /// Returns `false` when no override was active.
    pub fn restore_override(&mut self, name: &str, value: Value) -> bool {
        let Some(record) = self
            .overrides
            .iter_mut()
            .find(|record| record.variable == name && record.state == OverrideState::Active)
        else {
            return false;
        };
        record.state = OverrideState::Restored;
        self.variables.insert(name.to_owned(), value);
        true
    }

    /// Returns `true` while `name` is displaced by an override.
    #[must_use]
    pub fn is_overridden(&self, name: &str) -> bool {
        self.active_record(name).is_some()
    }

    /// Overrides still in effect.
    pub fn active_overrides(&self) -> impl Iterator<Item = &OverrideRecord> {
        self.overrides
            .iter()
            .filter(|record| record.state == OverrideState::Active)
    }

    /// Every override applied during this process, in application order.
    #[must_use]
    pub fn overrides(&self) -> &[OverrideRecord] {
        &self.overrides
    }

    /// Interceptor chains wrapping host functions.
    #[must_use]
    pub fn interceptors(&self) -> &InterceptorRegistry {
        &self.interceptors
    }

    /// Mutable access to the interceptor chains.
    pub fn interceptors_mut(&mut self) -> &mut InterceptorRegistry {
        &mut self.interceptors
    }

    fn active_record(&self, name: &str) -> Option<&OverrideRecord> {
        self.active_overrides()
            .find(|record| record.variable == name)
    }
}
