//! # Configuration File Loading
//!
//! Loads fixture configuration from TOML or YAML files.
//!
//! Supports automatic format detection based on file extension.

use crate::config::FixtureConfig;
use errors::ConfigurationError;
use std::path::Path;

/// Load configuration from a TOML file.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_toml;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_toml(Path::new("fixture.toml"))?;
///     println!("image: {}", config.ephemeral.image);
///     Ok(())
/// }
/// ```
pub fn load_from_toml(path: &Path) -> Result<FixtureConfig, ConfigurationError> {
    let contents = read(path)?;

    toml::from_str(&contents).map_err(|e| ConfigurationError::Parse {
        format: "TOML".to_string(),
        reason: e.to_string()
    })
}

/// Load configuration from a YAML file.
pub fn load_from_yaml(path: &Path) -> Result<FixtureConfig, ConfigurationError> {
    let contents = read(path)?;

    serde_yaml::from_str(&contents).map_err(|e| ConfigurationError::Parse {
        format: "YAML".to_string(),
        reason: e.to_string()
    })
}

/// Load configuration from file, detecting the format from its extension.
///
/// ## Supported Formats
/// - `.toml`: TOML format
/// - `.yaml` / `.yml`: YAML format
pub fn load_from_file(path: &Path) -> Result<FixtureConfig, ConfigurationError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ConfigurationError::UnsupportedFormat {
            extension: String::new()
        })?;

    match extension.to_lowercase().as_str() {
        "toml" => load_from_toml(path),
        "yaml" | "yml" => load_from_yaml(path),
        other => Err(ConfigurationError::UnsupportedFormat {
            extension: other.to_string()
        })
    }
}

fn read(path: &Path) -> Result<String, ConfigurationError> {
    std::fs::read_to_string(path).map_err(|_e| ConfigurationError::FileNotFound {
        path: path.display().to_string()
    })
}
