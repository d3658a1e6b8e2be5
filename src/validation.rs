//! Checks a module must pass before it becomes a registry entry.

use std::fmt;

use crate::error::{HostError, Result};
use crate::module::Module;

/// Entry point every plug-in module exports to describe itself.
pub const INFO_SYMBOL: &str = "get_plugin_info";

/// Default name of the interface version entry point.
pub const INTERFACE_VERSION_SYMBOL: &str = "get_plugin_interface_version";

/// Signature of interface version entry points: writes (major, minor).
pub type InterfaceVersionFn = fn(&mut u32, &mut u32);

/// Major/minor version of a plug-in family interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceVersion {
    pub major: u32,
    pub minor: u32,
}

impl InterfaceVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Same major line. Minor versions are not compared.
    pub fn is_compatible_with(&self, other: &InterfaceVersion) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for InterfaceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The version function a family resolves and the version the host was
/// compiled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceRequirement {
    pub symbol: &'static str,
    pub version: InterfaceVersion,
}

impl InterfaceRequirement {
    pub const fn new(symbol: &'static str, major: u32, minor: u32) -> Self {
        Self {
            symbol,
            version: InterfaceVersion::new(major, minor),
        }
    }
}

/// Require the module to export [`INFO_SYMBOL`].
///
/// The module must already be loaded.
pub fn basic_validation(module: &Module) -> Result<()> {
    if !module.has_symbol(INFO_SYMBOL) {
        return Err(HostError::MissingEntryPoint {
            library: module.name().to_string(),
            symbol: INFO_SYMBOL.to_string(),
        });
    }
    Ok(())
}

/// Query the module's interface version and compare its major with the
/// host's.
pub fn check_interface_version(
    module: &Module,
    requirement: &InterfaceRequirement,
) -> Result<InterfaceVersion> {
    // SAFETY: the version entry point signature is part of the plug-in
    // contract for every versioned family.
    let version_fn: InterfaceVersionFn = unsafe { module.get_function(requirement.symbol)? };

    let mut actual = InterfaceVersion::new(0, 0);
    version_fn(&mut actual.major, &mut actual.minor);

    let expected = requirement.version;
    if !expected.is_compatible_with(&actual) {
        return Err(HostError::InterfaceVersionMismatch {
            library: module.name().to_string(),
            expected_major: expected.major,
            expected_minor: expected.minor,
            actual_major: actual.major,
            actual_minor: actual.minor,
        });
    }

    if actual.minor != expected.minor {
        tracing::debug!(
            "Plug-in {} implements interface {} (host compiled against {})",
            module.name(),
            actual,
            expected
        );
    }

    Ok(actual)
}
