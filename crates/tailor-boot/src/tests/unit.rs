//! Unit tests for hook sequencing, the optimizer, and the bootstrap stages.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use rstest::{fixture, rstest};

use crate::bootstrap::{
    BootstrapContext, BootstrapError, NoPhases, StaticConfigLoader, bootstrap_with,
};
use crate::error::{
    AutoloadError, CoreError, ErrorKind, ModuleError, ModulePhase, ProfileError,
};
use crate::features::{Capability, FeatureDetector};
use crate::hooks::{HookPoint, HookSequencer, HookState};
use crate::optimizer::{
    BootstrapOptimizer, COMPRESSED_FILE_HANDLER, OptimizerOutcome, SkipReason,
    TERMINAL_INITIALIZATION,
};
use crate::runtime::{RuntimeConfig, Value};
use crate::version::HostVersion;

use super::support::{
    BootstrapEvent, FakeHost, RecordingReporter, TestWorld, autoloads_path, context_probe,
    environment, test_config,
};

type Log = Rc<RefCell<Vec<String>>>;

#[fixture]
fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn logging(
    log: &Log,
    label: &'static str,
) -> impl FnOnce(&mut RuntimeConfig) -> Result<(), CoreError> + 'static {
    let log = Rc::clone(log);
    move |_| {
        log.borrow_mut().push(label.to_owned());
        Ok(())
    }
}

fn host_runtime() -> RuntimeConfig {
    RuntimeConfig::from_variables(FakeHost::new().variables)
}

#[rstest]
fn callbacks_run_by_priority_then_registration_order(log: Log) {
    let mut hooks = HookSequencer::new();
    let mut runtime = RuntimeConfig::new();
    for (priority, label) in [(10, "late"), (-5, "early"), (0, "first-zero"), (0, "second-zero")] {
        assert!(
            hooks
                .register(HookPoint::PostModuleInit, priority, label, logging(&log, label))
                .is_accepted()
        );
    }

    let report = hooks.fire(HookPoint::PostModuleInit, &mut runtime);

    let expected = ["early", "first-zero", "second-zero", "late"];
    assert_eq!(*log.borrow(), expected);
    assert_eq!(report.executed(), expected);
    assert_eq!(hooks.state(HookPoint::PostModuleInit), HookState::Fired);
}

#[rstest]
fn second_fire_executes_nothing(log: Log) {
    let mut hooks = HookSequencer::new();
    let mut runtime = RuntimeConfig::new();
    let _ = hooks.register(HookPoint::PostUiReady, 0, "once", logging(&log, "once"));

    let first = hooks.fire(HookPoint::PostUiReady, &mut runtime);
    let second = hooks.fire(HookPoint::PostUiReady, &mut runtime);

    assert!(!first.already_fired());
    assert!(second.already_fired());
    assert!(second.executed().is_empty());
    assert_eq!(log.borrow().len(), 1);
}

#[rstest]
fn registration_after_fire_is_ignored(log: Log) {
    let mut hooks = HookSequencer::new();
    let mut runtime = RuntimeConfig::new();
    let _ = hooks.fire(HookPoint::PreModuleInit, &mut runtime);

    let registration = hooks.register(HookPoint::PreModuleInit, 0, "late", logging(&log, "late"));
    let _ = hooks.fire(HookPoint::PreModuleInit, &mut runtime);

    assert!(!registration.is_accepted());
    assert!(log.borrow().is_empty());
}

#[rstest]
fn failure_is_isolated_to_its_hook_point(log: Log) {
    let mut hooks = HookSequencer::new();
    let mut runtime = RuntimeConfig::new();
    let _ = hooks.register(HookPoint::PostModuleConfig, 0, "ok", logging(&log, "ok"));
    let _ = hooks.register(HookPoint::PostModuleConfig, 1, "broken", |_| {
        Err(CoreError::msg("boom"))
    });
    let _ = hooks.register(HookPoint::PostModuleConfig, 2, "after", logging(&log, "after"));
    let _ = hooks.register(HookPoint::PostUserConfig, 0, "next", logging(&log, "next"));

    let mut failed = hooks.fire(HookPoint::PostModuleConfig, &mut runtime);
    let next = hooks.fire(HookPoint::PostUserConfig, &mut runtime);

    let error = failed.take_error().expect("callback failed");
    assert_eq!(error.callback(), "broken");
    assert_eq!(error.point(), HookPoint::PostModuleConfig);
    assert!(!error.is_fatal());
    assert_eq!(failed.skipped(), ["after"]);
    assert!(next.error().is_none());
    assert_eq!(*log.borrow(), ["ok", "next"]);
}

#[rstest]
fn restorations_run_even_when_a_callback_fails() {
    let mut hooks = HookSequencer::new();
    let mut runtime = RuntimeConfig::new();
    runtime.set("inhibit-message", true);
    let _ = hooks.register(HookPoint::PostUserConfig, 0, "broken", |_| {
        Err(CoreError::msg("init file raised"))
    });
    let _ = hooks.register_restoration(
        HookPoint::PostUserConfig,
        "restore inhibit-message",
        |runtime| {
            runtime.set("inhibit-message", false);
        },
    );

    let report = hooks.fire(HookPoint::PostUserConfig, &mut runtime);

    assert!(report.error().is_some());
    assert_eq!(report.restored(), ["restore inhibit-message"]);
    assert_eq!(runtime.get("inhibit-message"), Some(&Value::Bool(false)));
}

#[rstest]
fn unwind_runs_only_pending_restorations(log: Log) {
    let mut hooks = HookSequencer::new();
    let mut runtime = RuntimeConfig::new();
    for point in [
        HookPoint::PostModuleInit,
        HookPoint::PostProcessInit,
        HookPoint::PostUiReady,
    ] {
        let log = Rc::clone(&log);
        let label = point.to_string();
        let _ = hooks.register_restoration(point, label.clone(), move |_| {
            log.borrow_mut().push(label);
        });
    }
    let _ = hooks.fire(HookPoint::PostModuleInit, &mut runtime);

    let restored = hooks.unwind(&mut runtime);

    assert_eq!(restored, ["post-process-init", "post-ui-ready"]);
    assert_eq!(*log.borrow(), ["post-module-init", "post-process-init", "post-ui-ready"]);
    assert!(hooks.pending_restorations().is_empty());
}

#[rstest]
fn every_override_has_exactly_one_pending_restoration() {
    let mut runtime = host_runtime();
    let mut hooks = HookSequencer::new();

    let outcome = BootstrapOptimizer::standard().apply(None, &mut runtime, &mut hooks);

    assert_eq!(outcome.applied_count(), 5);
    let pending = hooks.pending_restorations();
    for record in runtime.active_overrides() {
        let label = format!("restore {}", record.variable());
        let matching: Vec<_> = pending.iter().filter(|(_, name)| *name == label).collect();
        assert_eq!(matching.len(), 1, "{label} should be scheduled once");
        assert_eq!(matching[0].0, record.restore_at());
        assert!(!hooks.has_fired(record.restore_at()));
    }
}

#[rstest]
fn optimizer_is_safe_to_apply_twice() {
    let mut runtime = host_runtime();
    let mut hooks = HookSequencer::new();
    let optimizer = BootstrapOptimizer::standard();

    let _ = optimizer.apply(None, &mut runtime, &mut hooks);
    let snapshots = runtime.snapshots().clone();
    let pending = hooks.pending_restorations().len();
    let second = optimizer.apply(None, &mut runtime, &mut hooks);

    assert_eq!(second.applied_count(), 0);
    assert_eq!(runtime.snapshots(), &snapshots);
    assert_eq!(hooks.pending_restorations().len(), pending);
    assert_eq!(
        runtime.snapshots().get("gc-cons-threshold"),
        Some(&Value::Int(800_000))
    );
}

#[rstest]
fn undefined_globals_are_left_alone() {
    let mut runtime = RuntimeConfig::new();
    let mut hooks = HookSequencer::new();

    let outcome = BootstrapOptimizer::standard().apply(None, &mut runtime, &mut hooks);

    match outcome {
        OptimizerOutcome::Applied { overrides, skipped, .. } => {
            assert!(overrides.is_empty());
            assert!(skipped.iter().any(|entry| entry.reason == "variable is undefined"));
        }
        OptimizerOutcome::Skipped { .. } => panic!("optimizer should have run"),
    }
    assert!(runtime.snapshots().is_empty());
    assert!(
        hooks
            .pending_restorations()
            .iter()
            .all(|(_, label)| label.starts_with("release "))
    );
}

#[rstest]
fn bootstrap_applies_the_optimizer() {
    let mut world = TestWorld::new();
    world.bootstrap();

    let session = world.session().expect("bootstrap succeeds");
    assert_eq!(session.optimizer_outcome().applied_count(), 5);
    assert_eq!(
        session.runtime().get("gc-cons-threshold"),
        Some(&Value::Int(i64::MAX))
    );
    assert_eq!(
        session.runtime().get("file-name-handler-alist"),
        Some(&Value::List(vec![COMPRESSED_FILE_HANDLER.to_owned()]))
    );
    assert_eq!(
        session.runtime().get("load-suffixes"),
        Some(&Value::List(vec![".elc".to_owned(), ".el".to_owned()]))
    );
    assert!(session.deferred_errors().is_empty());
    let events = world.reporter.events();
    assert!(events.contains(&BootstrapEvent::OptimizerApplied(5)));
    assert!(events.contains(&BootstrapEvent::BootstrapSucceeded));
}

#[rstest]
#[case::debug_flag(true, false, false, SkipReason::Debug)]
#[case::daemon_flag(false, true, false, SkipReason::Daemon)]
#[case::daemon_host(false, false, true, SkipReason::Daemon)]
fn optimizer_is_skipped_without_side_effects(
    #[case] debug: bool,
    #[case] daemon: bool,
    #[case] host_daemon: bool,
    #[case] reason: SkipReason,
) {
    let mut world = TestWorld::new();
    world.config.debug = debug;
    world.config.daemon = daemon;
    world.host.daemon = host_daemon;

    world.bootstrap();

    let session = world.session().expect("bootstrap succeeds");
    assert_eq!(
        session.optimizer_outcome(),
        &OptimizerOutcome::Skipped { reason }
    );
    assert!(session.runtime().overrides().is_empty());
    assert!(session.runtime().snapshots().is_empty());
    assert!(session.hooks().pending_restorations().is_empty());
    assert_eq!(
        session.runtime().get("gc-cons-threshold"),
        Some(&Value::Int(800_000))
    );
}

#[rstest]
fn outdated_host_aborts_before_any_override() {
    let mut world = TestWorld::new();
    world.host.version = HostVersion::new(26, 3);

    world.bootstrap();

    let error = world.bootstrap_error().expect("bootstrap fails");
    assert_eq!(error.kind(), ErrorKind::Version);
    assert!(error.remediation().is_some());
    let events = world.reporter.events();
    assert!(events.contains(&BootstrapEvent::BootstrapFailed(ErrorKind::Version)));
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, BootstrapEvent::OptimizerApplied(_)))
    );
}

#[rstest]
fn stale_build_artefacts_abort() {
    let mut world = TestWorld::new();
    world.host.build_version = Some(HostVersion::new(29, 2));

    world.bootstrap();

    let error = world.bootstrap_error().expect("bootstrap fails");
    assert!(matches!(
        error,
        BootstrapError::Version {
            source: crate::error::VersionError::Mismatch { .. }
        }
    ));
}

#[rstest]
fn unknown_profile_aborts_bootstrap() {
    let mut world = TestWorld::new();
    world.env.set("TAILOR_PROFILE", "ghost@v1");

    world.bootstrap();

    let error = world.bootstrap_error().expect("bootstrap fails");
    assert_eq!(error.kind(), ErrorKind::Profile);
    assert!(error.kind().is_fatal());
}

#[rstest]
fn missing_autoloads_are_reported_without_aborting() {
    let mut world = TestWorld::new();
    world.host.version = HostVersion::new(30, 1);

    world.run();

    let report = world
        .run_result()
        .expect("startup ran")
        .as_ref()
        .expect("startup succeeds");
    assert_eq!(report.errors().len(), 1);
    assert_eq!(report.errors()[0].kind(), ErrorKind::Autoload);
    assert!(
        report.errors()[0]
            .to_string()
            .contains(&autoloads_path("30.1"))
    );
}

#[rstest]
fn startup_restores_every_override() {
    let mut world = TestWorld::new();

    world.run();

    let report = world
        .run_result()
        .expect("startup ran")
        .as_ref()
        .expect("startup succeeds");
    assert_eq!(report.fired(), HookPoint::ALL);
    assert!(report.is_clean());

    let runtime = world.session().expect("bootstrap succeeds").runtime();
    assert_eq!(runtime.active_overrides().count(), 0);
    let original = FakeHost::new().variables;
    for name in ["gc-cons-threshold", "inhibit-redisplay", "inhibit-message", "load-suffixes"] {
        assert_eq!(runtime.get(name), original.get(name), "{name} was not restored");
    }
    assert_eq!(
        runtime.get("file-name-handler-alist"),
        Some(&Value::List(vec![
            COMPRESSED_FILE_HANDLER.to_owned(),
            "tramp-handler".to_owned(),
            "epa-handler".to_owned(),
        ]))
    );
    assert!(!runtime.interceptors().is_intercepted(TERMINAL_INITIALIZATION));
}

#[rstest]
fn terminal_initialization_waits_for_the_ui() {
    let mut world = TestWorld::new();
    world.bootstrap();
    let observed: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));
    let seen = Rc::clone(&observed);
    let session = world.session_mut().expect("bootstrap succeeds");
    let _ = session.register(HookPoint::PostProcessInit, 0, "probe-terminal", move |runtime| {
        let result = runtime
            .interceptors()
            .invoke(TERMINAL_INITIALIZATION, &[], &|_| Value::Bool(true));
        *seen.borrow_mut() = Some(result);
        Ok(())
    });

    session.run(&mut NoPhases).expect("startup succeeds");

    assert_eq!(*observed.borrow(), Some(Value::Nil));
    assert_eq!(
        session
            .runtime()
            .interceptors()
            .invoke(TERMINAL_INITIALIZATION, &[], &|_| Value::Bool(true)),
        Value::Bool(true)
    );
}

#[rstest]
fn user_config_failure_still_restores_display_globals() {
    let mut world = TestWorld::new();
    world.phases.user_error = Some(CoreError::msg("init file raised an error"));

    world.run();

    let report = world
        .run_result()
        .expect("startup ran")
        .as_ref()
        .expect("non-fatal errors do not abort");
    assert_eq!(report.errors().len(), 1);
    assert_eq!(
        world.phases.inhibit_message_during_user_config,
        Some(Value::Bool(true))
    );
    let runtime = world.session().expect("bootstrap succeeds").runtime();
    assert_eq!(runtime.get("inhibit-message"), Some(&Value::Bool(false)));
    assert_eq!(runtime.get("inhibit-redisplay"), Some(&Value::Bool(false)));
}

#[rstest]
fn module_errors_are_isolated() {
    let mut world = TestWorld::new();
    world.phases.init_errors = vec![CoreError::from(ModuleError::new(
        "lang/rust",
        ModulePhase::Init,
        "missing toolchain",
    ))];

    world.run();

    let report = world
        .run_result()
        .expect("startup ran")
        .as_ref()
        .expect("module errors do not abort");
    assert_eq!(report.fired(), HookPoint::ALL);
    assert_eq!(report.errors()[0].kind(), ErrorKind::Module);
    assert_eq!(
        world.phases.calls,
        ["init_modules", "configure_modules", "load_user_config"]
    );
    assert!(
        world
            .reporter
            .events()
            .contains(&BootstrapEvent::ErrorRecovered(ErrorKind::Module))
    );
}

#[rstest]
fn fatal_hook_point_unwinds_pending_restorations() {
    let mut world = TestWorld::new();
    world.bootstrap();
    let session = world.session_mut().expect("bootstrap succeeds");
    session.mark_fatal(HookPoint::PostModuleInit);
    let _ = session.register(HookPoint::PostModuleInit, 0, "required-module", |_| {
        Err(CoreError::msg("required module missing"))
    });

    let error = session.run(&mut NoPhases).expect_err("fatal hook aborts");

    assert!(matches!(error, BootstrapError::FatalHook { .. }));
    assert_eq!(session.runtime().active_overrides().count(), 0);
    assert_eq!(
        session.runtime().get("gc-cons-threshold"),
        Some(&Value::Int(800_000))
    );
    let events = world.reporter.events();
    assert!(events.contains(&BootstrapEvent::HookFailed {
        point: HookPoint::PostModuleInit,
        callback: "required-module".to_owned(),
    }));
    let unwound = events
        .iter()
        .find_map(|event| match event {
            BootstrapEvent::SequenceUnwound(restored) => Some(restored.clone()),
            _ => None,
        })
        .expect("sequence unwound");
    assert!(unwound.contains(&"restore gc-cons-threshold".to_owned()));
    assert!(!unwound.contains(&"restore load-suffixes".to_owned()));
    assert!(!events.contains(&BootstrapEvent::HookFired(HookPoint::PreModuleConfig)));
}

#[rstest]
fn fatal_causes_keep_their_kind_at_ordinary_hook_points() {
    let mut world = TestWorld::new();
    world.bootstrap();
    let session = world.session_mut().expect("bootstrap succeeds");
    let _ = session.register(HookPoint::PostModuleConfig, 0, "profile-switch", |_| {
        Err(CoreError::from(ProfileError::Malformed {
            selector: "@".to_owned(),
            reason: "the profile name is empty",
        }))
    });

    let error = session.run(&mut NoPhases).expect_err("profile errors are fatal");

    assert!(matches!(error, BootstrapError::FatalHook { .. }));
    assert_eq!(error.kind(), ErrorKind::Profile);
    assert!(
        world
            .reporter
            .events()
            .contains(&BootstrapEvent::BootstrapFailed(ErrorKind::Profile))
    );
}

#[rstest]
fn fatal_hook_points_report_hook_failures() {
    let mut world = TestWorld::new();
    world.bootstrap();
    let session = world.session_mut().expect("bootstrap succeeds");
    session.mark_fatal(HookPoint::PostModuleInit);
    let _ = session.register(HookPoint::PostModuleInit, 0, "required-module", |_| {
        Err(CoreError::msg("required module missing"))
    });

    let error = session.run(&mut NoPhases).expect_err("fatal hook aborts");

    assert_eq!(error.kind(), ErrorKind::Hook);
}

#[rstest]
fn corrupt_autoloads_are_recovered() {
    let mut world = TestWorld::new();
    world.phases.init_errors = vec![CoreError::from(AutoloadError::Corrupt {
        path: autoloads_path("29.1").into(),
        reason: "truncated form".to_owned(),
        sync_command: "tailor sync".to_owned(),
    })];

    world.run();

    let report = world
        .run_result()
        .expect("startup ran")
        .as_ref()
        .expect("autoload errors are recovered");
    assert_eq!(report.errors().len(), 1);
    assert_eq!(report.errors()[0].kind(), ErrorKind::Autoload);
    assert!(report.errors()[0].to_string().contains("tailor sync"));
    assert!(world.phases.calls.contains(&"load_user_config"));
}

#[rstest]
fn fatal_phase_errors_abort_startup() {
    let mut world = TestWorld::new();
    world.phases.config_errors = vec![CoreError::from(ProfileError::Malformed {
        selector: "@".to_owned(),
        reason: "the profile name is empty",
    })];

    world.run();

    let error = world
        .run_result()
        .expect("startup ran")
        .as_ref()
        .expect_err("profile errors are fatal");
    assert_eq!(error.kind(), ErrorKind::Profile);
    assert!(!world.phases.calls.contains(&"load_user_config"));
    let runtime = world.session().expect("bootstrap succeeds").runtime();
    assert_eq!(runtime.active_overrides().count(), 0);
}

#[rstest]
fn run_is_not_repeated() {
    let mut world = TestWorld::new();
    world.run();
    let session = world.session_mut().expect("bootstrap succeeds");

    let again = session.run(&mut NoPhases).expect("second run is ignored");

    assert!(again.fired().is_empty());
}

#[rstest]
fn capabilities_are_cached_even_when_the_host_changes() {
    let host = FakeHost::new();
    let detector = FeatureDetector::new();

    let first = detector.detect(&host);
    host.withdraw("module-load");
    host.provide("json-parse-string");
    let second = detector.detect(&host);

    assert!(std::ptr::eq(first, second));
    assert!(second.has(Capability::DynamicModules));
    assert!(!second.has(Capability::NativeJson));
}

#[rstest]
fn sessions_share_the_detected_capabilities() {
    let host = FakeHost::new();
    let env = environment();
    let probe = context_probe();
    let detector = FeatureDetector::new();
    let reporter = Arc::new(RecordingReporter::default());
    let loader = StaticConfigLoader::new(test_config());

    let first = bootstrap_with(
        &loader,
        BootstrapContext::new(&host, &env, &probe, "/work").with_detector(&detector),
        reporter.clone(),
    )
    .expect("first bootstrap succeeds");
    host.provide("native-comp-available-p");
    let second = bootstrap_with(
        &loader,
        BootstrapContext::new(&host, &env, &probe, "/work").with_detector(&detector),
        reporter,
    )
    .expect("second bootstrap succeeds");

    assert_eq!(first.capabilities(), second.capabilities());
    assert!(!second.capabilities().has(Capability::NativeCompilation));
    assert_eq!(second.legacy_flags().lookup("HAS-MODULES"), Some(true));
    assert_eq!(second.legacy_flags().lookup("NATIVECOMP"), Some(false));
}

#[rstest]
fn module_error_kinds_classify_bootstrap_errors() {
    let error = BootstrapError::Fatal {
        source: CoreError::from(ModuleError::new("ui/modeline", ModulePhase::Config, "bad")),
    };

    assert_eq!(error.kind(), ErrorKind::Module);
    assert!(error.remediation().is_none());
}
