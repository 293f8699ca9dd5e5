//! Temporary startup overrides with paired restorations.
//!
//! Every override follows the same triangle: capture the original, register
//! the restoration at its hook point, then apply the temporary value. The
//! restoration is registered before the override takes effect, so a
//! displaced global always has someone responsible for putting it back.

use serde::Serialize;
use strum::Display;

use crate::hooks::{HookPoint, HookSequencer};
use crate::runtime::{RuntimeConfig, Value};

/// Handler kept active while file-name handlers are narrowed.
pub const COMPRESSED_FILE_HANDLER: &str = "jka-compr-handler";

/// Host function whose work is deferred until the UI is ready.
pub const TERMINAL_INITIALIZATION: &str = "terminal-initialization";

/// Label of the interceptor that defers a host function.
pub const DEFERRAL_LABEL: &str = "tailor-deferral";

/// How the temporary value is derived from the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Temporary {
    /// Replace the global with a fixed value.
    Value(Value),
    /// Keep only the listed entries of the original list.
    Retain(Vec<String>),
}

impl Temporary {
    fn derive(&self, original: &Value) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Retain(keep) => Value::List(
                list_entries(original)
                    .unwrap_or_default()
                    .iter()
                    .filter(|entry| keep.contains(entry))
                    .cloned()
                    .collect(),
            ),
        }
    }
}

/// How the original value is put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreRule {
    /// Write the captured original back.
    Snapshot,
    /// Merge the current list into the original, current entries first,
    /// without duplicates. Falls back to the original for non-list values.
    MergeWithSnapshot,
}

impl RestoreRule {
    fn restore(self, original: Value, current: Option<&Value>) -> Value {
        let merged = match (self, list_entries(&original), current.and_then(list_entries)) {
            (Self::MergeWithSnapshot, Some(original), Some(current)) => {
                let mut merged: Vec<String> = Vec::with_capacity(current.len() + original.len());
                for entry in current.iter().chain(original.iter()) {
                    if !merged.contains(entry) {
                        merged.push(entry.clone());
                    }
                }
                Some(merged)
            }
            _ => None,
        };
        match merged {
            Some(entries) if !(entries.is_empty() && original == Value::Nil) => {
                Value::List(entries)
            }
            _ => original,
        }
    }
}

/// Reads a global as a list. The host's nil is the empty list.
fn list_entries(value: &Value) -> Option<&[String]> {
    match value {
        Value::Nil => Some(&[]),
        other => other.as_list(),
    }
}

/// One `(variable, temporary, restore point)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    variable: String,
    temporary: Temporary,
    restore: RestoreRule,
    restore_at: HookPoint,
}

impl Override {
    /// Describes an override of `variable` restored at `restore_at`.
    #[must_use]
    pub fn new(
        variable: impl Into<String>,
        temporary: Temporary,
        restore: RestoreRule,
        restore_at: HookPoint,
    ) -> Self {
        Self {
            variable: variable.into(),
            temporary,
            restore,
            restore_at,
        }
    }

    /// Overridden global.
    #[must_use]
    pub fn variable(&self) -> &str {
        self.variable.as_str()
    }

    /// Hook point owning the restoration.
    #[must_use]
    pub fn restore_at(&self) -> HookPoint {
        self.restore_at
    }
}

/// A host function suppressed until `restore_at` fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deferral {
    function: String,
    restore_at: HookPoint,
}

impl Deferral {
    /// Defers `function` until `restore_at`.
    #[must_use]
    pub fn new(function: impl Into<String>, restore_at: HookPoint) -> Self {
        Self {
            function: function.into(),
            restore_at,
        }
    }

    /// Deferred function.
    #[must_use]
    pub fn function(&self) -> &str {
        self.function.as_str()
    }

    /// Hook point at which the function is released.
    #[must_use]
    pub fn restore_at(&self) -> HookPoint {
        self.restore_at
    }
}

/// Why the optimizer left global state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Debugging was requested.
    Debug,
    /// The process is a long-lived background instance.
    Daemon,
}

/// An override that took effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedOverride {
    /// Overridden global.
    pub variable: String,
    /// Hook point owning the restoration.
    pub restore_at: HookPoint,
}

/// An override the optimizer declined to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedOverride {
    /// Global or function that was left alone.
    pub target: String,
    /// Short explanation.
    pub reason: &'static str,
}

/// Result of [`BootstrapOptimizer::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OptimizerOutcome {
    /// The optimizer ran.
    Applied {
        /// Overrides now in effect.
        overrides: Vec<AppliedOverride>,
        /// Functions now deferred.
        deferrals: Vec<Deferral>,
        /// Entries left alone.
        skipped: Vec<SkippedOverride>,
    },
    /// The optimizer did nothing at all.
    Skipped {
        /// Why it was skipped.
        reason: SkipReason,
    },
}

impl OptimizerOutcome {
    /// Number of overrides that took effect.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        match self {
            Self::Applied { overrides, .. } => overrides.len(),
            Self::Skipped { .. } => 0,
        }
    }

    /// Returns `true` when the whole optimizer was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Applies the curated startup overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOptimizer {
    overrides: Vec<Override>,
    deferrals: Vec<Deferral>,
}

impl Default for BootstrapOptimizer {
    fn default() -> Self {
        Self::standard()
    }
}

impl BootstrapOptimizer {
    /// Builds an optimizer from explicit overrides and deferrals.
    #[must_use]
    pub fn new(overrides: Vec<Override>, deferrals: Vec<Deferral>) -> Self {
        Self {
            overrides,
            deferrals,
        }
    }

    /// The default startup override set.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(
            vec![
                Override::new(
                    "gc-cons-threshold",
                    Temporary::Value(Value::Int(i64::MAX)),
                    RestoreRule::Snapshot,
                    HookPoint::PostProcessInit,
                ),
                Override::new(
                    "file-name-handler-alist",
                    Temporary::Retain(vec![COMPRESSED_FILE_HANDLER.to_owned()]),
                    RestoreRule::MergeWithSnapshot,
                    HookPoint::PostProcessInit,
                ),
                Override::new(
                    "inhibit-redisplay",
                    Temporary::Value(Value::Bool(true)),
                    RestoreRule::Snapshot,
                    HookPoint::PostUserConfig,
                ),
                Override::new(
                    "inhibit-message",
                    Temporary::Value(Value::Bool(true)),
                    RestoreRule::Snapshot,
                    HookPoint::PostUserConfig,
                ),
                Override::new(
                    "load-suffixes",
                    Temporary::Retain(vec![".elc".to_owned(), ".el".to_owned()]),
                    RestoreRule::Snapshot,
                    HookPoint::PostModuleInit,
                ),
            ],
            vec![Deferral::new(TERMINAL_INITIALIZATION, HookPoint::PostUiReady)],
        )
    }

    /// Configured overrides.
    #[must_use]
    pub fn overrides(&self) -> &[Override] {
        &self.overrides
    }

    /// Configured deferrals.
    #[must_use]
    pub fn deferrals(&self) -> &[Deferral] {
        &self.deferrals
    }

    /// Applies every override and deferral unless `skip` is set.
    ///
    /// Safe to call repeatedly: globals already displaced and functions
    /// already deferred are left alone, and originals are never recaptured.
    pub fn apply(
        &self,
        skip: Option<SkipReason>,
        runtime: &mut RuntimeConfig,
        sequencer: &mut HookSequencer,
    ) -> OptimizerOutcome {
        if let Some(reason) = skip {
            return OptimizerOutcome::Skipped { reason };
        }

        let mut applied = Vec::new();
        let mut deferrals = Vec::new();
        let mut skipped = Vec::new();
        for entry in &self.overrides {
            match Self::apply_override(entry, runtime, sequencer) {
                Ok(()) => applied.push(AppliedOverride {
                    variable: entry.variable.clone(),
                    restore_at: entry.restore_at,
                }),
                Err(reason) => skipped.push(SkippedOverride {
                    target: entry.variable.clone(),
                    reason,
                }),
            }
        }
        for deferral in &self.deferrals {
            match Self::apply_deferral(deferral, runtime, sequencer) {
                Ok(()) => deferrals.push(deferral.clone()),
                Err(reason) => skipped.push(SkippedOverride {
                    target: deferral.function.clone(),
                    reason,
                }),
            }
        }

        OptimizerOutcome::Applied {
            overrides: applied,
            deferrals,
            skipped,
        }
    }

    fn apply_override(
        entry: &Override,
        runtime: &mut RuntimeConfig,
        sequencer: &mut HookSequencer,
    ) -> Result<(), &'static str> {
        if runtime.is_overridden(&entry.variable) {
            return Err("already overridden");
        }
        if sequencer.has_fired(entry.restore_at) {
            return Err("restoration point already fired");
        }
        let original = runtime
            .capture(&entry.variable)
            .cloned()
            .ok_or("variable is undefined")?;
        let temporary = entry.temporary.derive(&original);

        let variable = entry.variable.clone();
        let rule = entry.restore;
        let registration = sequencer.register_restoration(
            entry.restore_at,
            format!("restore {variable}"),
            move |runtime: &mut RuntimeConfig| {
                let value = rule.restore(original, runtime.get(&variable));
                runtime.restore_override(&variable, value);
            },
        );
        if !registration.is_accepted() {
            return Err("restoration point already fired");
        }

        runtime
            .apply_override(&entry.variable, temporary, entry.restore_at)
            .map_err(|_| "override refused")
    }

    fn apply_deferral(
        deferral: &Deferral,
        runtime: &mut RuntimeConfig,
        sequencer: &mut HookSequencer,
    ) -> Result<(), &'static str> {
        if runtime
            .interceptors()
            .labels(&deferral.function)
            .contains(&DEFERRAL_LABEL)
        {
            return Err("already deferred");
        }
        if sequencer.has_fired(deferral.restore_at) {
            return Err("restoration point already fired");
        }

        let id = runtime
            .interceptors_mut()
            .install(&deferral.function, DEFERRAL_LABEL, |_, _| Value::Nil);
        let function = deferral.function.clone();
        let registration = sequencer.register_restoration(
            deferral.restore_at,
            format!("release {function}"),
            move |runtime: &mut RuntimeConfig| {
                runtime.interceptors_mut().uninstall(&function, id);
            },
        );
        if !registration.is_accepted() {
            runtime.interceptors_mut().uninstall(&deferral.function, id);
            return Err("restoration point already fired");
        }
        Ok(())
    }
}
