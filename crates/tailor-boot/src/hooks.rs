//! Ordered lifecycle hook points.
//!
//! Each [`HookPoint`] fires at most once. Callbacks run synchronously in
//! ascending priority, ties broken by registration order. A failing callback
//! stops its own hook point only; the error is returned to the caller, which
//! decides whether the point was fatal. Restorations registered at a point
//! always run when it fires, even if a callback failed.

use std::collections::BTreeMap;

use serde::Serialize;
use strum::{Display, EnumString};

use crate::error::{CoreError, HookError};
use crate::runtime::RuntimeConfig;

/// Named lifecycle markers, declared in firing order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum HookPoint {
    /// Before external modules initialise.
    PreModuleInit,
    /// After every module initialised.
    PostModuleInit,
    /// Before module configuration is loaded.
    PreModuleConfig,
    /// After module configuration is loaded.
    PostModuleConfig,
    /// After the user's own configuration is loaded, successfully or not.
    PostUserConfig,
    /// After the host finished its own initialisation.
    PostProcessInit,
    /// Once the host is interactive.
    PostUiReady,
}

impl HookPoint {
    /// Every hook point in firing order.
    pub const ALL: [Self; 7] = [
        Self::PreModuleInit,
        Self::PostModuleInit,
        Self::PreModuleConfig,
        Self::PostModuleConfig,
        Self::PostUserConfig,
        Self::PostProcessInit,
        Self::PostUiReady,
    ];
}

/// Lifecycle of a single hook point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookState {
    /// Nothing registered yet.
    #[default]
    Empty,
    /// Callbacks or restorations are waiting.
    Registered,
    /// The point has fired and is sealed.
    Fired,
}

/// Callback run when a hook point fires.
pub type HookCallback = Box<dyn FnOnce(&mut RuntimeConfig) -> Result<(), CoreError>>;

/// Infallible action undoing a temporary override.
pub type RestoreAction = Box<dyn FnOnce(&mut RuntimeConfig)>;

/// Outcome of a registration attempt.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The callback will run when the point fires.
    Accepted,
    /// The point already fired; the callback was dropped.
    Ignored,
}

impl Registration {
    /// Returns `true` when the registration took effect.
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

struct Callback {
    priority: i32,
    sequence: u64,
    label: String,
    run: HookCallback,
}

struct Restoration {
    label: String,
    run: RestoreAction,
}

#[derive(Default)]
struct Slot {
    state: HookState,
    fatal: bool,
    callbacks: Vec<Callback>,
    restorations: Vec<Restoration>,
}

/// What happened when a hook point fired.
#[derive(Debug)]
pub struct FireReport {
    point: HookPoint,
    executed: Vec<String>,
    skipped: Vec<String>,
    restored: Vec<String>,
    already_fired: bool,
    error: Option<HookError>,
}

impl FireReport {
    fn new(point: HookPoint) -> Self {
        Self {
            point,
            executed: Vec::new(),
            skipped: Vec::new(),
            restored: Vec::new(),
            already_fired: false,
            error: None,
        }
    }

    /// Hook point that fired.
    #[must_use]
    pub fn point(&self) -> HookPoint {
        self.point
    }

    /// Callbacks that ran, in execution order.
    #[must_use]
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Callbacks left unrun because an earlier one failed.
    #[must_use]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Restorations that ran.
    #[must_use]
    pub fn restored(&self) -> &[String] {
        &self.restored
    }

    /// Returns `true` when the call was a repeated fire and did nothing.
    #[must_use]
    pub fn already_fired(&self) -> bool {
        self.already_fired
    }

    /// Failure of the first failing callback.
    #[must_use]
    pub fn error(&self) -> Option<&HookError> {
        self.error.as_ref()
    }

    /// Moves the failure out of the report.
    pub fn take_error(&mut self) -> Option<HookError> {
        self.error.take()
    }
}

/// Registry of hook points and their pending callbacks.
#[derive(Default)]
pub struct HookSequencer {
    slots: BTreeMap<HookPoint, Slot>,
    next_sequence: u64,
}

impl std::fmt::Debug for HookSequencer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let states: BTreeMap<_, _> = self
            .slots
            .iter()
            .map(|(point, slot)| (*point, slot.state))
            .collect();
        formatter
            .debug_struct("HookSequencer")
            .field("states", &states)
            .finish_non_exhaustive()
    }
}

impl HookSequencer {
    /// Creates a sequencer with every point empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Designates `point` as fatal: a callback failure there aborts startup.
    pub fn mark_fatal(&mut self, point: HookPoint) {
        self.slots.entry(point).or_default().fatal = true;
    }

    /// Returns `true` when `point` is designated fatal.
    #[must_use]
    pub fn is_fatal(&self, point: HookPoint) -> bool {
        self.slots.get(&point).is_some_and(|slot| slot.fatal)
    }

    /// Current state of `point`.
    #[must_use]
    pub fn state(&self, point: HookPoint) -> HookState {
        self.slots
            .get(&point)
            .map_or(HookState::Empty, |slot| slot.state)
    }

    /// Returns `true` once `point` has fired.
    #[must_use]
    pub fn has_fired(&self, point: HookPoint) -> bool {
        self.state(point) == HookState::Fired
    }

    /// Registers `callback` at `point`.
    ///
    /// Lower priorities run first. Registering after the point fired is a
    /// defect in the caller: it is logged and the callback is dropped.
    pub fn register<F>(
        &mut self,
        point: HookPoint,
        priority: i32,
        label: impl Into<String>,
        callback: F,
    ) -> Registration
    where
        F: FnOnce(&mut RuntimeConfig) -> Result<(), CoreError> + 'static,
    {
        let label = label.into();
        let sequence = self.next_sequence;
        let Some(slot) = self.open_slot(point, &label) else {
            return Registration::Ignored;
        };
        slot.callbacks.push(Callback {
            priority,
            sequence,
            label,
            run: Box::new(callback),
        });
        self.next_sequence += 1;
        Registration::Accepted
    }

    /// Registers a restoration to run when `point` fires, or on unwind.
    pub fn register_restoration<F>(
        &mut self,
        point: HookPoint,
        label: impl Into<String>,
        action: F,
    ) -> Registration
    where
        F: FnOnce(&mut RuntimeConfig) + 'static,
    {
        let label = label.into();
        let Some(slot) = self.open_slot(point, &label) else {
            return Registration::Ignored;
        };
        slot.restorations.push(Restoration {
            label,
            run: Box::new(action),
        });
        Registration::Accepted
    }

    fn open_slot(&mut self, point: HookPoint, label: &str) -> Option<&mut Slot> {
        let slot = self.slots.entry(point).or_default();
        if slot.state == HookState::Fired {
            tracing::warn!(
                target: "tailor::hooks",
                hook = %point,
                callback = label,
                "registration after hook point fired; ignoring"
            );
            return None;
        }
        slot.state = HookState::Registered;
        Some(slot)
    }

    /// Restorations waiting on unfired points, as `(point, label)`.
    #[must_use]
    pub fn pending_restorations(&self) -> Vec<(HookPoint, &str)> {
        self.slots
            .iter()
            .flat_map(|(point, slot)| {
                slot.restorations
                    .iter()
                    .map(move |restoration| (*point, restoration.label.as_str()))
            })
            .collect()
    }

    /// Fires `point`, sealing it.
    ///
    /// A repeated fire executes nothing and is logged.
    pub fn fire(&mut self, point: HookPoint, runtime: &mut RuntimeConfig) -> FireReport {
        let mut report = FireReport::new(point);
        let slot = self.slots.entry(point).or_default();
        if slot.state == HookState::Fired {
            tracing::warn!(
                target: "tailor::hooks",
                hook = %point,
                "hook point fired twice; ignoring"
            );
            report.already_fired = true;
            return report;
        }
        slot.state = HookState::Fired;
        let fatal = slot.fatal;
        let mut callbacks = std::mem::take(&mut slot.callbacks);
        let restorations = std::mem::take(&mut slot.restorations);

        callbacks.sort_by_key(|callback| (callback.priority, callback.sequence));
        let mut pending = callbacks.into_iter();
        for callback in pending.by_ref() {
            let Callback { label, run, .. } = callback;
            match run(runtime) {
                Ok(()) => report.executed.push(label),
                Err(cause) => {
                    report.error = Some(HookError::new(point, label, fatal, cause));
                    break;
                }
            }
        }
        report.skipped = pending.map(|callback| callback.label).collect();

        for restoration in restorations {
            (restoration.run)(runtime);
            report.restored.push(restoration.label);
        }
        report
    }

    /// Runs every restoration still waiting on an unfired point.
    ///
    /// Used when a fatal error aborts the sequence so no override outlives
    /// it. Returns the labels of the restorations that ran, in lifecycle
    /// order.
    pub fn unwind(&mut self, runtime: &mut RuntimeConfig) -> Vec<String> {
        let mut restored = Vec::new();
        for slot in self.slots.values_mut() {
            for restoration in std::mem::take(&mut slot.restorations) {
                (restoration.run)(runtime);
                restored.push(restoration.label);
            }
        }
        restored
    }
}
