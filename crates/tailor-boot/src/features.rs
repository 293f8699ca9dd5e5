//! One-time host capability detection.
//!
//! Capabilities are probed once per [`FeatureDetector`] and cached for its
//! lifetime; a capability absent at probe time stays absent. The process-wide
//! detector behind [`FeatureDetector::process`] gives the per-process
//! guarantee.

use std::cell::RefCell;
use std::collections::BTreeSet;

use once_cell::sync::OnceCell;
use serde::Serialize;
use strum::{Display, EnumString};

/// Optional host features the bootstrap cares about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// The host can load native dynamic modules.
    DynamicModules,
    /// The host parses JSON natively.
    NativeJson,
    /// The host can compile scripts to native code.
    NativeCompilation,
}

impl Capability {
    /// Every known capability.
    pub const ALL: [Self; 3] = [
        Self::DynamicModules,
        Self::NativeJson,
        Self::NativeCompilation,
    ];

    /// Host built-in whose presence signals the capability.
    #[must_use]
    pub fn probe_symbol(self) -> &'static str {
        match self {
            Self::DynamicModules => "module-load",
            Self::NativeJson => "json-parse-string",
            Self::NativeCompilation => "native-comp-available-p",
        }
    }
}

/// Answers whether the host provides a built-in.
pub trait CapabilityProbe {
    /// Returns `true` when `symbol` is available in the host.
    fn provides(&self, symbol: &str) -> bool;
}

/// Immutable set of detected capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    present: BTreeSet<Capability>,
}

impl CapabilitySet {
    /// Probes every known capability through `probe`.
    #[must_use]
    pub fn probe(probe: &dyn CapabilityProbe) -> Self {
        Self {
            present: Capability::ALL
                .into_iter()
                .filter(|capability| probe.provides(capability.probe_symbol()))
                .collect(),
        }
    }

    /// Returns `true` when `capability` was detected.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.present.contains(&capability)
    }

    /// Detected capabilities in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.present.iter().copied()
    }
}

/// Caches the first capability probe.
#[derive(Debug, Default)]
pub struct FeatureDetector {
    cache: OnceCell<CapabilitySet>,
}

static PROCESS_DETECTOR: FeatureDetector = FeatureDetector::new();

impl FeatureDetector {
    /// Creates a detector that has not probed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cache: OnceCell::new(),
        }
    }

    /// Detector shared by the whole process.
    #[must_use]
    pub fn process() -> &'static Self {
        &PROCESS_DETECTOR
    }

    /// Returns the cached set, probing through `probe` on first use only.
    pub fn detect(&self, probe: &dyn CapabilityProbe) -> &CapabilitySet {
        self.cache.get_or_init(|| {
            let capabilities = CapabilitySet::probe(probe);
            tracing::debug!(
                target: "tailor::features",
                capabilities = ?capabilities.iter().collect::<Vec<_>>(),
                "host capabilities detected"
            );
            capabilities
        })
    }

    /// Cached set, if detection already ran.
    #[must_use]
    pub fn get(&self) -> Option<&CapabilitySet> {
        self.cache.get()
    }
}

/// Translates retired boolean flag names into capability lookups.
///
/// Each retired name logs a deprecation warning the first time it is used.
#[derive(Debug)]
pub struct LegacyFlags {
    capabilities: CapabilitySet,
    announced: RefCell<BTreeSet<&'static str>>,
}

impl LegacyFlags {
    const ALIASES: [(&'static str, Capability); 3] = [
        ("HAS-MODULES", Capability::DynamicModules),
        ("HAS-NATIVE-JSON", Capability::NativeJson),
        ("NATIVECOMP", Capability::NativeCompilation),
    ];

    /// Wraps a detected capability set.
    #[must_use]
    pub fn new(capabilities: CapabilitySet) -> Self {
        Self {
            capabilities,
            announced: RefCell::new(BTreeSet::new()),
        }
    }

    /// Looks up a retired flag, or `None` when the name is unknown.
    pub fn lookup(&self, name: &str) -> Option<bool> {
        let (alias, capability) = Self::ALIASES
            .into_iter()
            .find(|(alias, _)| *alias == name)?;
        if self.announced.borrow_mut().insert(alias) {
            tracing::warn!(
                target: "tailor::deprecation",
                flag = alias,
                replacement = %capability,
                "flag '{alias}' is deprecated; query the '{capability}' capability instead"
            );
        }
        Some(self.capabilities.has(capability))
    }

    /// Retired names that have already produced a deprecation warning.
    #[must_use]
    pub fn announced(&self) -> Vec<&'static str> {
        self.announced.borrow().iter().copied().collect()
    }
}
