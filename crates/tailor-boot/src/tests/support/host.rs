//! In-memory host used in place of a real application process.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use camino::Utf8PathBuf;
use tailor_config::{Config, MapEnvironment, StaticProbe};

use crate::features::CapabilityProbe;
use crate::host::HostProbe;
use crate::optimizer::COMPRESSED_FILE_HANDLER;
use crate::runtime::Value;
use crate::version::HostVersion;

/// Installation root used by every bootstrap test.
pub const INSTALL_ROOT: &str = "/opt/tailor";

/// Scriptable host whose capabilities may change mid-test.
pub struct FakeHost {
    pub version: HostVersion,
    pub build_version: Option<HostVersion>,
    pub daemon: bool,
    pub variables: BTreeMap<String, Value>,
    symbols: RefCell<BTreeSet<String>>,
}

impl FakeHost {
    /// Host 29.1 with the globals the standard optimizer touches.
    pub fn new() -> Self {
        let mut variables = BTreeMap::new();
        variables.insert("gc-cons-threshold".to_owned(), Value::Int(800_000));
        variables.insert(
            "file-name-handler-alist".to_owned(),
            Value::List(vec![
                "tramp-handler".to_owned(),
                COMPRESSED_FILE_HANDLER.to_owned(),
                "epa-handler".to_owned(),
            ]),
        );
        variables.insert("inhibit-redisplay".to_owned(), Value::Bool(false));
        variables.insert("inhibit-message".to_owned(), Value::Bool(false));
        variables.insert(
            "load-suffixes".to_owned(),
            Value::List(vec![".so".to_owned(), ".elc".to_owned(), ".el".to_owned()]),
        );
        Self {
            version: HostVersion::new(29, 1),
            build_version: None,
            daemon: false,
            variables,
            symbols: RefCell::new(BTreeSet::from(["module-load".to_owned()])),
        }
    }

    /// Makes `symbol` available from now on.
    pub fn provide(&self, symbol: &str) {
        self.symbols.borrow_mut().insert(symbol.to_owned());
    }

    /// Removes `symbol` from now on.
    pub fn withdraw(&self, symbol: &str) {
        self.symbols.borrow_mut().remove(symbol);
    }
}

impl CapabilityProbe for FakeHost {
    fn provides(&self, symbol: &str) -> bool {
        self.symbols.borrow().contains(symbol)
    }
}

impl HostProbe for FakeHost {
    fn version(&self) -> HostVersion {
        self.version
    }

    fn build_version(&self) -> Option<HostVersion> {
        self.build_version
    }

    fn binary_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from("/usr/local/bin/host")
    }

    fn is_daemon(&self) -> bool {
        self.daemon
    }

    fn variables(&self) -> BTreeMap<String, Value> {
        self.variables.clone()
    }
}

/// Configuration rooted at [`INSTALL_ROOT`].
pub fn test_config() -> Config {
    Config {
        install_root: Utf8PathBuf::from(INSTALL_ROOT),
        log_filter: "warn".to_owned(),
        ..Config::default()
    }
}

/// Environment with only a home directory set.
pub fn environment() -> MapEnvironment {
    MapEnvironment::new().with("HOME", "/home/ada")
}

/// Autoloads file generated for `version` in the legacy layout.
pub fn autoloads_path(version: &str) -> String {
    format!("{INSTALL_ROOT}/.local/autoloads.{version}.el")
}

/// Filesystem in which the autoloads file for host 29.1 exists.
pub fn context_probe() -> StaticProbe {
    StaticProbe::new().with_file(autoloads_path("29.1"))
}
