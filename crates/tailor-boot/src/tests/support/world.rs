//! BDD test world holding the host, collaborators, and bootstrap outcome.

use std::cell::RefCell;
use std::sync::Arc;

use tailor_config::{Config, MapEnvironment, StaticProbe};

use crate::bootstrap::{
    BootstrapContext, BootstrapError, Session, StartupReport, StaticConfigLoader, bootstrap_with,
};
use crate::features::FeatureDetector;

use super::host::{FakeHost, context_probe, environment, test_config};
use super::phases::ScriptedPhases;
use super::reporter::RecordingReporter;

/// Working directory handed to the resolver.
const WORKING_DIR: &str = "/home/ada/work";

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub host: FakeHost,
    pub config: Config,
    pub env: MapEnvironment,
    pub probe: StaticProbe,
    pub phases: ScriptedPhases,
    pub reporter: Arc<RecordingReporter>,
    detector: FeatureDetector,
    session: Option<Session>,
    bootstrap_error: Option<BootstrapError>,
    run_result: Option<Result<StartupReport, BootstrapError>>,
}

impl TestWorld {
    /// Builds a world around a healthy 29.1 host.
    pub fn new() -> Self {
        Self {
            host: FakeHost::new(),
            config: test_config(),
            env: environment(),
            probe: context_probe(),
            phases: ScriptedPhases::default(),
            reporter: Arc::new(RecordingReporter::default()),
            detector: FeatureDetector::new(),
            session: None,
            bootstrap_error: None,
            run_result: None,
        }
    }

    /// Runs the pre-module bootstrap stage once.
    pub fn bootstrap(&mut self) {
        if self.session.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        let loader = StaticConfigLoader::new(self.config.clone());
        let context = BootstrapContext::new(&self.host, &self.env, &self.probe, WORKING_DIR)
            .with_detector(&self.detector);
        match bootstrap_with(&loader, context, self.reporter.clone()) {
            Ok(session) => self.session = Some(session),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Bootstraps if needed, then runs the startup sequence.
    pub fn run(&mut self) {
        self.bootstrap();
        if let Some(session) = self.session.as_mut() {
            self.run_result = Some(session.run(&mut self.phases));
        }
    }

    /// Bootstrapped session, if bootstrap succeeded.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Mutable session, if bootstrap succeeded.
    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Bootstrap failure, if any.
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Outcome of the startup sequence, if it ran.
    pub fn run_result(&self) -> Option<&Result<StartupReport, BootstrapError>> {
        self.run_result.as_ref()
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
