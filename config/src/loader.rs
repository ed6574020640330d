//! # Environment Variable Loader
//!
//! Overrides configuration fields from environment variables following
//! 12-factor app principles. Unset variables leave the base value untouched.
//!
//! # Naming Convention
//! - `FX_PROVIDER`: provider mode (ephemeral/external/auto)
//! - `FX_EXTERNAL_*`: pre-existing instance
//! - `FX_EPHEMERAL_*`: container-provisioned instance
//! - `FX_POOL_*`: connection pool
//! - `FX_RESOURCE_PATH`: extra resource directories (OS path list)

use crate::config::{EphemeralConfig, ExternalConfig, FixtureConfig, PoolConfig, ProviderMode};
use errors::ConfigurationError;
use std::env;
use std::str::FromStr;

/// Apply environment overrides on top of `base`.
///
/// ## Usage
/// ```rust,no_run
/// use config::{FixtureConfig, apply_env};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = apply_env(FixtureConfig::default())?;
///     println!("provider: {:?}", config.provider);
///     Ok(())
/// }
/// ```
///
/// ## Environment Variables
/// ### External instance (`FX_EXTERNAL_*`)
/// - `FX_EXTERNAL_HOST`, `FX_EXTERNAL_PORT`, `FX_EXTERNAL_DATABASE`,
///   `FX_EXTERNAL_USERNAME`, `FX_EXTERNAL_PASSWORD`
/// - `FX_EXTERNAL_PROBE_TIMEOUT_MS`: availability probe bound
///
/// ### Ephemeral instance (`FX_EPHEMERAL_*`)
/// - `FX_EPHEMERAL_IMAGE`, `FX_EPHEMERAL_TAG`
/// - `FX_EPHEMERAL_DATABASE`, `FX_EPHEMERAL_USERNAME`, `FX_EPHEMERAL_PASSWORD`
/// - `FX_EPHEMERAL_STARTUP_TIMEOUT_SECONDS`
/// - `FX_EPHEMERAL_INTERNAL_PORT`: port the server listens on inside the
///   container
///
/// ### Pool (`FX_POOL_*`)
/// - `FX_POOL_MAX_CONNECTIONS`, `FX_POOL_ACQUIRE_TIMEOUT_SECONDS`
/// - `FX_POOL_APPLICATION_NAME`, `FX_POOL_SSL_MODE`
pub fn apply_env(base: FixtureConfig) -> Result<FixtureConfig, ConfigurationError> {
    let mut config = base;

    if let Some(mode) = parse_env::<ProviderMode>("FX_PROVIDER")? {
        config.provider = mode;
    }
    apply_external_env(&mut config.external)?;
    apply_ephemeral_env(&mut config.ephemeral)?;
    apply_pool_env(&mut config.pool)?;

    if let Some(paths) = env::var_os("FX_RESOURCE_PATH") {
        config
            .resources
            .search_paths
            .extend(env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()));
    }

    Ok(config)
}

fn apply_external_env(external: &mut ExternalConfig) -> Result<(), ConfigurationError> {
    if let Ok(host) = env::var("FX_EXTERNAL_HOST") {
        external.host = host;
    }
    if let Some(port) = parse_env("FX_EXTERNAL_PORT")? {
        external.port = port;
    }
    if let Ok(database) = env::var("FX_EXTERNAL_DATABASE") {
        external.database = database;
    }
    if let Ok(username) = env::var("FX_EXTERNAL_USERNAME") {
        external.username = username;
    }
    if let Ok(password) = env::var("FX_EXTERNAL_PASSWORD") {
        external.password = password;
    }
    if let Some(timeout) = parse_env("FX_EXTERNAL_PROBE_TIMEOUT_MS")? {
        external.probe_timeout_ms = timeout;
    }
    Ok(())
}

fn apply_ephemeral_env(ephemeral: &mut EphemeralConfig) -> Result<(), ConfigurationError> {
    if let Ok(image) = env::var("FX_EPHEMERAL_IMAGE") {
        ephemeral.image = image;
    }
    if let Ok(tag) = env::var("FX_EPHEMERAL_TAG") {
        ephemeral.tag = tag;
    }
    if let Ok(database) = env::var("FX_EPHEMERAL_DATABASE") {
        ephemeral.database = database;
    }
    if let Ok(username) = env::var("FX_EPHEMERAL_USERNAME") {
        ephemeral.username = username;
    }
    if let Ok(password) = env::var("FX_EPHEMERAL_PASSWORD") {
        ephemeral.password = password;
    }
    if let Some(timeout) = parse_env("FX_EPHEMERAL_STARTUP_TIMEOUT_SECONDS")? {
        ephemeral.startup_timeout_seconds = timeout;
    }
    if let Some(port) = parse_env("FX_EPHEMERAL_INTERNAL_PORT")? {
        ephemeral.internal_port = port;
    }
    Ok(())
}

fn apply_pool_env(pool: &mut PoolConfig) -> Result<(), ConfigurationError> {
    if let Some(max) = parse_env("FX_POOL_MAX_CONNECTIONS")? {
        pool.max_connections = max;
    }
    if let Some(timeout) = parse_env("FX_POOL_ACQUIRE_TIMEOUT_SECONDS")? {
        pool.acquire_timeout_seconds = timeout;
    }
    if let Ok(name) = env::var("FX_POOL_APPLICATION_NAME") {
        pool.application_name = name;
    }
    if let Ok(mode) = env::var("FX_POOL_SSL_MODE") {
        pool.ssl_mode = mode;
    }
    Ok(())
}

fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigurationError>
where
    T: FromStr,
    T::Err: std::fmt::Display
{
    match env::var(key) {
        Ok(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigurationError::Invalid {
                field: key.to_string(),
                reason: e.to_string()
            }),
        Err(_) => Ok(None)
    }
}
