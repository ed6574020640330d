//! # Fixture Errors
//!
//! Error taxonomy for the shared PostgreSQL test fixture.
//!
//! - `ConfigurationError`: packaging or configuration defects. Fatal, never
//!   retried.
//! - `StartupError`: the backing instance or its pool could not be brought
//!   up. The triggering `begin()` fails and may be retried.
//! - `LifecycleError`: unbalanced scope calls or accessors used out of
//!   order. Programming defects.
//! - `TeardownError`: best-effort cleanup failures, reported but never
//!   raised from `end()`.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the fixture crates.
pub type Result<T> = std::result::Result<T, FixtureError>;

/// Missing bundled resources and invalid configuration values
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Resource not found: {name} (searched {searched:?})")]
    ResourceNotFound { name: String, searched: Vec<PathBuf> },

    #[error("Cannot convert resource {name} to a usable path: {reason}")]
    ResourceUnusable { name: String, reason: String },

    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse {format} config: {reason}")]
    Parse { format: String, reason: String },

    #[error("Unsupported config file format: {extension}")]
    UnsupportedFormat { extension: String }
}

/// Failures bringing a provider or its connection pool to a ready state
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("External database at {host}:{port} is not reachable")]
    ProviderUnavailable { host: String, port: u16 },

    #[error("Container {image} failed to start: {reason}")]
    ContainerStart { image: String, reason: String },

    #[error("Could not resolve container endpoint: {reason}")]
    EndpointUnresolved { reason: String },

    #[error("Could not build fixture runtime: {reason}")]
    Runtime { reason: String },

    #[error("Opening pool against {host}:{port} failed: {reason}")]
    PoolOpen {
        host: String,
        port: u16,
        reason: String
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError)
}

/// Scope bookkeeping violations
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("end() called without a matching begin()")]
    UnbalancedEnd,

    #[error("{accessor} called before the first begin()")]
    NotInitialized { accessor: String },

    #[error("Ephemeral instance is not running")]
    NotRunning,

    #[error("{accessor} requires an active scope")]
    NoActiveScope { accessor: String },

    #[error("Fixture task did not complete: {reason}")]
    TaskFailed { reason: String }
}

/// Cleanup failures during the last scope exit
#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("Closing connection pool failed: {reason}")]
    PoolClose { reason: String },

    #[error("Stopping instance failed: {reason}")]
    InstanceStop { reason: String }
}

/// Statement failures raised through the query facade
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Statement `{statement}` failed: {reason}")]
    Execution { statement: String, reason: String }
}

/// Umbrella error for the fixture API
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Teardown(#[from] TeardownError),

    #[error(transparent)]
    Query(#[from] QueryError)
}

impl FixtureError {
    /// Whether a later `begin()` may succeed after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Startup(StartupError::Configuration(_)) => false,
            Self::Startup(_) => true,
            _ => false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_not_found_message_names_resource() {
        let err = ConfigurationError::ResourceNotFound {
            name: "server.crt".to_string(),
            searched: vec![PathBuf::from("/tmp/resources")]
        };
        let message = err.to_string();
        assert!(message.contains("server.crt"));
        assert!(message.contains("/tmp/resources"));
    }

    #[test]
    fn test_startup_errors_are_retryable() {
        let err: FixtureError = StartupError::ContainerStart {
            image: "postgres:latest".to_string(),
            reason: "pull failed".to_string()
        }
        .into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_configuration_errors_are_fatal() {
        let err: FixtureError = ConfigurationError::ResourceNotFound {
            name: "setup.sh".to_string(),
            searched: Vec::new()
        }
        .into();
        assert!(!err.is_retryable());

        let nested: FixtureError = StartupError::Configuration(ConfigurationError::Invalid {
            field: "host".to_string(),
            reason: "empty".to_string()
        })
        .into();
        assert!(!nested.is_retryable());
    }

    #[test]
    fn test_lifecycle_errors_are_not_retryable() {
        let err: FixtureError = LifecycleError::UnbalancedEnd.into();
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "end() called without a matching begin()");
    }
}
