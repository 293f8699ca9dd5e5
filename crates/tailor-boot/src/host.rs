//! Boundary between the bootstrap core and the host application.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;

use crate::features::CapabilityProbe;
use crate::runtime::Value;
use crate::version::HostVersion;

/// Read-only view of the running host, queried once during bootstrap.
pub trait HostProbe: CapabilityProbe {
    /// Version of the running host.
    fn version(&self) -> HostVersion;

    /// Version recorded by the last build step, if any artefacts exist.
    fn build_version(&self) -> Option<HostVersion>;

    /// Location of the running host binary.
    fn binary_path(&self) -> Utf8PathBuf;

    /// Returns `true` when the host runs as a background instance.
    fn is_daemon(&self) -> bool;

    /// Current values of the host's globals.
    fn variables(&self) -> BTreeMap<String, Value>;
}
