//! Scripted module and user-configuration phases.

use crate::bootstrap::StartupPhases;
use crate::error::CoreError;
use crate::hooks::HookSequencer;
use crate::runtime::{RuntimeConfig, Value};

/// Phases returning pre-arranged errors and recording what they observed.
#[derive(Default)]
pub struct ScriptedPhases {
    pub init_errors: Vec<CoreError>,
    pub config_errors: Vec<CoreError>,
    pub user_error: Option<CoreError>,
    pub calls: Vec<&'static str>,
    pub inhibit_message_during_user_config: Option<Value>,
}

impl StartupPhases for ScriptedPhases {
    fn init_modules(
        &mut self,
        _runtime: &mut RuntimeConfig,
        _hooks: &mut HookSequencer,
    ) -> Vec<CoreError> {
        self.calls.push("init_modules");
        std::mem::take(&mut self.init_errors)
    }

    fn configure_modules(
        &mut self,
        _runtime: &mut RuntimeConfig,
        _hooks: &mut HookSequencer,
    ) -> Vec<CoreError> {
        self.calls.push("configure_modules");
        std::mem::take(&mut self.config_errors)
    }

    fn load_user_config(
        &mut self,
        runtime: &mut RuntimeConfig,
        _hooks: &mut HookSequencer,
    ) -> Result<(), CoreError> {
        self.calls.push("load_user_config");
        self.inhibit_message_during_user_config = runtime.get("inhibit-message").cloned();
        self.user_error.take().map_or(Ok(()), Err)
    }
}
