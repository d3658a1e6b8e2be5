//! Error types for plug-in host operations.

use thiserror::Error;

/// Boxed error returned by plug-in factories and initialisers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during plug-in host operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// Failed to open a plug-in library
    #[error("Failed to load plug-in library '{library}': {message}")]
    LoadFailed { library: String, message: String },

    /// A required entry point is not exported by the module
    #[error("Plug-in '{library}' has no entry point function named {symbol}")]
    MissingEntryPoint { library: String, symbol: String },

    /// Interface version reported by the module does not match the host
    #[error(
        "Interface version mismatch for plug-in '{library}': run-time does not match \
         compile-time plug-in setting (expected {expected_major}.x, compiled against \
         {expected_major}.{expected_minor} != {actual_major}.{actual_minor})"
    )]
    InterfaceVersionMismatch {
        library: String,
        expected_major: u32,
        expected_minor: u32,
        actual_major: u32,
        actual_minor: u32,
    },

    /// The creator exported by the module is not the one the family expects
    #[error("Creator returned by {symbol} in '{library}' does not produce {family} plug-ins")]
    CreatorTypeMismatch {
        library: String,
        symbol: String,
        family: &'static str,
    },

    /// The plug-in factory failed
    #[error("Failed to create plug-in {plugin}: {source}")]
    CreateFailed {
        plugin: String,
        #[source]
        source: BoxError,
    },

    /// The plug-in factory produced no instance
    #[error("Plug-in factory for {0} returned no instance")]
    NullInstance(String),

    /// Plug-in initialisation failed
    #[error("Plug-in initialization failed for {plugin}: {source}")]
    InitFailed {
        plugin: String,
        #[source]
        source: BoxError,
    },

    /// No registry entry matches the requested type
    #[error("No registry entry for {0} was found")]
    EntryNotFound(String),

    /// No instance matches the requested type or name
    #[error("No plug-in instance found for {0}")]
    InstanceNotFound(String),

    /// Circular dependency detected
    #[error("Circular plug-in dependency detected: {0}")]
    CircularDependency(String),

    /// Dependency not found
    #[error("Missing dependency {dependency} of {plugin}")]
    DependencyNotFound { plugin: String, dependency: String },

    /// Dependency failed to load
    #[error("Failed to satisfy dependency {dependency} of {plugin}: {source}")]
    DependencyFailed {
        plugin: String,
        dependency: String,
        #[source]
        source: Box<HostError>,
    },

    /// Signal name already taken
    #[error("Signal already registered under '{0}'")]
    SignalAlreadyRegistered(String),

    /// Signal name not known
    #[error("Unknown signal identifier {0}")]
    UnknownSignal(String),

    /// Signal exists with a different argument type
    #[error("Signal '{0}' has a different argument type")]
    SignalTypeMismatch(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    /// Whether the error means the module does not satisfy the plug-in
    /// interface contract (missing symbol, wrong version, wrong creator).
    pub fn is_interface_error(&self) -> bool {
        matches!(
            self,
            HostError::MissingEntryPoint { .. }
                | HostError::InterfaceVersionMismatch { .. }
                | HostError::CreatorTypeMismatch { .. }
        )
    }
}

/// Result type for plug-in host operations
pub type Result<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_mismatch_message() {
        let err = HostError::InterfaceVersionMismatch {
            library: "libstub.so".into(),
            expected_major: 1,
            expected_minor: 3,
            actual_major: 2,
            actual_minor: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("1.x"));
        assert!(msg.contains("1.3"));
        assert!(msg.contains("2.0"));
        assert!(msg.contains("libstub.so"));
        assert!(err.is_interface_error());
    }

    #[test]
    fn test_missing_entry_point_message() {
        let err = HostError::MissingEntryPoint {
            library: "libstub.so".into(),
            symbol: "get_plugin_info".into(),
        };
        assert_eq!(
            err.to_string(),
            "Plug-in 'libstub.so' has no entry point function named get_plugin_info"
        );
    }

    #[test]
    fn test_null_instance_is_not_interface_error() {
        assert!(!HostError::NullInstance("x:1.0.0".into()).is_interface_error());
    }
}
