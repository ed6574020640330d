//! # Configuration Validation
//!
//! Validates configuration structures using the `validator` crate and maps
//! failures into `ConfigurationError`.

use crate::config::FixtureConfig;
use errors::ConfigurationError;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a fixture configuration.
///
/// ## Validation Rules
/// ### External
/// - `host`: 1-255 characters
/// - `port`: 1-65535
/// - `database`, `username`: 1-63 characters
/// - `probe_timeout_ms`: 1-60000
///
/// ### Ephemeral
/// - `image`, `tag`, `password`: non-empty
/// - `startup_timeout_seconds`: 1-3600
///
/// ### Pool
/// - `max_connections`: 1-100
/// - `acquire_timeout_seconds`: 1-300
/// - `ssl_mode`: one of the libpq modes
pub fn validate(config: &FixtureConfig) -> Result<(), ConfigurationError> {
    config.validate().map_err(|errors| {
        let mut fields = Vec::new();
        collect_fields("", &errors, &mut fields);
        ConfigurationError::Invalid {
            field: fields.join(", "),
            reason: errors.to_string()
        }
    })
}

fn collect_fields(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Struct(nested) => collect_fields(&path, nested, out),
            _ => out.push(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate(&FixtureConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_invalid_external_host() {
        let mut config = FixtureConfig::default();
        config.external.host = String::new();

        match validate(&config) {
            Err(ConfigurationError::Invalid { field, .. }) => {
                assert_eq!(field, "external.host");
            }
            other => panic!("expected invalid host, got {:?}", other)
        }
    }

    #[test]
    fn test_validate_invalid_external_port() {
        let mut config = FixtureConfig::default();
        config.external.port = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_pool_size() {
        let mut config = FixtureConfig::default();
        config.pool.max_connections = 0;
        assert!(validate(&config).is_err());

        config.pool.max_connections = 101;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_empty_image() {
        let mut config = FixtureConfig::default();
        config.ephemeral.image = String::new();
        assert!(validate(&config).is_err());
    }
}
