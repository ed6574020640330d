//! # Configuration Structures
//!
//! This module defines the configuration structures for the shared
//! PostgreSQL test fixture.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization
//! - Use `validator` for input validation
//! - Default every field so a partial file is enough

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use validator::Validate;

/// Top-level fixture configuration.
///
/// ## Usage
/// ```rust,no_run
/// use config::FixtureConfig;
///
/// let config = FixtureConfig::default();
/// println!("Ephemeral image: {}:{}", config.ephemeral.image, config.ephemeral.tag);
/// ```
///
/// ## Fields
/// - `provider`: which backing instance to use
/// - `external`: connection facts of a pre-existing instance
/// - `ephemeral`: container image and provisioning values
/// - `pool`: connection pool sizing and driver options
/// - `resources`: additional directories searched for bundled files
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
pub struct FixtureConfig {
    /// Provider selection policy
    #[serde(default)]
    pub provider: ProviderMode,

    /// Pre-existing instance
    #[serde(default)]
    #[validate(nested)]
    pub external: ExternalConfig,

    /// Container-provisioned instance
    #[serde(default)]
    #[validate(nested)]
    pub ephemeral: EphemeralConfig,

    /// Connection pool
    #[serde(default)]
    #[validate(nested)]
    pub pool: PoolConfig,

    /// Resource search path overrides
    #[serde(default)]
    pub resources: ResourceConfig
}

/// Provider selection policy.
///
/// `Ephemeral` always provisions a container. `External` always uses the
/// pre-existing instance and fails startup if its probe fails. `Auto` probes
/// the external instance once and falls back to a container.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    #[default]
    Ephemeral,
    External,
    Auto
}

impl FromStr for ProviderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ephemeral" | "container" => Ok(Self::Ephemeral),
            "external" => Ok(Self::External),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "unknown provider mode '{other}', expected ephemeral, external or auto"
            ))
        }
    }
}

/// Connection facts of a conventionally-running local instance.
///
/// ## Fields
/// - `host`: server hostname (default: "localhost")
/// - `port`: server port (default: 5432)
/// - `database`, `username`, `password`: default "postgres"
/// - `probe_timeout_ms`: bound on the availability probe (default: 1000)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ExternalConfig {
    #[serde(default = "default_external_host")]
    #[validate(length(min = 1, max = 255))]
    pub host: String,

    #[serde(default = "default_postgres_port")]
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    #[serde(default = "default_external_credential")]
    #[validate(length(min = 1, max = 63))]
    pub database: String,

    #[serde(default = "default_external_credential")]
    #[validate(length(min = 1, max = 63))]
    pub username: String,

    #[serde(default = "default_external_credential")]
    pub password: String,

    #[serde(default = "default_probe_timeout_ms")]
    #[validate(range(min = 1, max = 60000))]
    pub probe_timeout_ms: u64
}

fn default_external_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_external_credential() -> String {
    "postgres".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            host: default_external_host(),
            port: default_postgres_port(),
            database: default_external_credential(),
            username: default_external_credential(),
            password: default_external_credential(),
            probe_timeout_ms: default_probe_timeout_ms()
        }
    }
}

/// Container image and fixed provisioning values of the ephemeral instance.
///
/// Host and port are not configured here; they are assigned by the container
/// runtime when the instance starts.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct EphemeralConfig {
    #[serde(default = "default_image")]
    #[validate(length(min = 1))]
    pub image: String,

    #[serde(default = "default_tag")]
    #[validate(length(min = 1))]
    pub tag: String,

    #[serde(default = "default_ephemeral_credential")]
    #[validate(length(min = 1, max = 63))]
    pub database: String,

    #[serde(default = "default_ephemeral_credential")]
    #[validate(length(min = 1, max = 63))]
    pub username: String,

    #[serde(default = "default_ephemeral_credential")]
    #[validate(length(min = 1))]
    pub password: String,

    #[serde(default = "default_startup_timeout")]
    #[validate(range(min = 1, max = 3600))]
    pub startup_timeout_seconds: u64,

    /// Port the engine listens on inside the container
    #[serde(default = "default_postgres_port")]
    #[validate(range(min = 1, max = 65535))]
    pub internal_port: u16
}

fn default_image() -> String {
    "postgres".to_string()
}

fn default_tag() -> String {
    "latest".to_string()
}

fn default_ephemeral_credential() -> String {
    "test".to_string()
}

fn default_startup_timeout() -> u64 {
    120
}

impl Default for EphemeralConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            tag: default_tag(),
            database: default_ephemeral_credential(),
            username: default_ephemeral_credential(),
            password: default_ephemeral_credential(),
            startup_timeout_seconds: default_startup_timeout(),
            internal_port: default_postgres_port()
        }
    }
}

/// Connection pool sizing and driver-level options.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct PoolConfig {
    #[serde(default = "default_max_connections")]
    #[validate(range(min = 1, max = 100))]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout")]
    #[validate(range(min = 1, max = 300))]
    pub acquire_timeout_seconds: u64,

    #[serde(default = "default_application_name")]
    #[validate(length(min = 1, max = 63))]
    pub application_name: String,

    #[serde(default = "default_ssl_mode")]
    #[validate(custom(function = "validate_ssl_mode"))]
    pub ssl_mode: String
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_application_name() -> String {
    "pg-fixture".to_string()
}

fn default_ssl_mode() -> String {
    "prefer".to_string()
}

/// SSL modes understood by libpq-compatible drivers.
pub const SSL_MODES: &[&str] = &[
    "disable",
    "allow",
    "prefer",
    "require",
    "verify-ca",
    "verify-full"
];

/// Rejects values outside [`SSL_MODES`].
pub fn validate_ssl_mode(value: &str) -> Result<(), validator::ValidationError> {
    if SSL_MODES.contains(&value) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("Invalid ssl mode"))
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout(),
            application_name: default_application_name(),
            ssl_mode: default_ssl_mode()
        }
    }
}

/// Extra directories searched for resources before the bundled directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResourceConfig {
    #[serde(default)]
    pub search_paths: Vec<PathBuf>
}
