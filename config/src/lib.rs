//! # Configuration System
//!
//! Configuration for the shared PostgreSQL test fixture.
//!
//! This crate provides:
//! - Configuration structures for provider selection, the external and
//!   ephemeral instances, the connection pool and resource lookup
//! - Environment variable overrides (`FX_*`)
//! - Configuration file loading (TOML/YAML)
//! - Layered loading (env > file > defaults) with validation

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod precedence;
pub mod validation;

pub use config::{
    EphemeralConfig, ExternalConfig, FixtureConfig, PoolConfig, ProviderMode, ResourceConfig,
    SSL_MODES, validate_ssl_mode,
};
pub use file_loader::{load_from_file, load_from_toml, load_from_yaml};
pub use loader::apply_env;
pub use precedence::{CONFIG_FILE_ENV, load, load_layered};
pub use validation::validate;
