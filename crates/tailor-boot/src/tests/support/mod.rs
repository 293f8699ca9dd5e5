//! Test doubles shared by the unit and behaviour suites.

mod host;
mod phases;
mod reporter;
mod world;

pub use host::{FakeHost, autoloads_path, context_probe, environment, test_config};
pub use reporter::{BootstrapEvent, RecordingReporter};
pub use world::{TestWorld, world};
