//! # Configuration Precedence
//!
//! Layers configuration sources.
//!
//! # Precedence Order
//! 1. Environment variables (highest priority)
//! 2. Configuration file named by `FX_CONFIG_FILE`
//! 3. Default values (lowest priority)

use crate::config::FixtureConfig;
use crate::file_loader::load_from_file;
use crate::loader::apply_env;
use crate::validation::validate;
use errors::ConfigurationError;
use std::path::{Path, PathBuf};

/// Environment variable naming an optional configuration file.
pub const CONFIG_FILE_ENV: &str = "FX_CONFIG_FILE";

/// Load the effective configuration: defaults, then the file named by
/// `FX_CONFIG_FILE` if set, then environment overrides. The result is
/// validated.
///
/// ## Usage
/// ```rust,no_run
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = config::load()?;
///     println!("provider: {:?}", config.provider);
///     Ok(())
/// }
/// ```
pub fn load() -> Result<FixtureConfig, ConfigurationError> {
    let file = std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from);
    load_layered(file.as_deref())
}

/// Same as [`load`] with an explicit file instead of `FX_CONFIG_FILE`.
pub fn load_layered(file: Option<&Path>) -> Result<FixtureConfig, ConfigurationError> {
    let base = match file {
        Some(path) => {
            let config = load_from_file(path)?;
            tracing::debug!("Configuration loaded from file {}", path.display());
            config
        }
        None => FixtureConfig::default()
    };

    let config = apply_env(base)?;
    validate(&config)?;

    tracing::debug!(
        provider = ?config.provider,
        image = %config.ephemeral.image,
        tag = %config.ephemeral.tag,
        "Fixture configuration resolved"
    );
    Ok(config)
}
