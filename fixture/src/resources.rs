//! Lookup of bundled provisioning files.
//!
//! Resources are addressed by logical name (`server.crt`, `setup.sh`, ...) and
//! resolved against an ordered search path: configured override directories
//! first, then the `resources/` directory shipped with this crate. A missing
//! resource is a packaging defect and is reported as a fatal
//! [`ConfigurationError`].

use errors::ConfigurationError;
use std::path::{Component, Path, PathBuf};

pub const SERVER_CERTIFICATE: &str = "server.crt";
pub const SERVER_KEY: &str = "server.key";
pub const CLIENT_CERTIFICATE: &str = "client.crt";
pub const CLIENT_KEY: &str = "client.key";
pub const HBA_CONFIG: &str = "pg_hba.conf";
pub const SETUP_SCRIPT: &str = "setup.sh";
pub const INIT_SCRIPT: &str = "test-db-init-script.sql";

/// Command the ephemeral instance runs instead of the image default.
pub const LAUNCH_COMMAND: &str = "/var/setup.sh";

/// A bundled file copied into the ephemeral instance before its entrypoint
/// runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisioningInput {
    pub logical_name: &'static str,
    pub destination_path: &'static str,
    pub permission_mode: u32
}

/// Files applied to every ephemeral instance, in copy order.
pub const PROVISIONING_INPUTS: &[ProvisioningInput] = &[
    ProvisioningInput {
        logical_name: SERVER_CERTIFICATE,
        destination_path: "/var/server.crt",
        permission_mode: 0o600
    },
    ProvisioningInput {
        logical_name: SERVER_KEY,
        destination_path: "/var/server.key",
        permission_mode: 0o600
    },
    ProvisioningInput {
        logical_name: CLIENT_CERTIFICATE,
        destination_path: "/var/client.crt",
        permission_mode: 0o600
    },
    ProvisioningInput {
        logical_name: HBA_CONFIG,
        destination_path: "/var/pg_hba.conf",
        permission_mode: 0o600
    },
    ProvisioningInput {
        logical_name: SETUP_SCRIPT,
        destination_path: "/var/setup.sh",
        permission_mode: 0o755
    },
    ProvisioningInput {
        logical_name: INIT_SCRIPT,
        destination_path: "/docker-entrypoint-initdb.d/test-db-init-script.sql",
        permission_mode: 0o755
    },
];

/// A provisioning input whose logical name has been resolved on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub source: PathBuf,
    pub destination: String,
    pub mode: u32
}

/// Resolves logical resource names to absolute filesystem paths.
#[derive(Debug, Clone)]
pub struct ResourceLocator {
    search_paths: Vec<PathBuf>
}

impl Default for ResourceLocator {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ResourceLocator {
    /// Directory of resources shipped with this crate.
    pub fn bundled_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("resources")
    }

    /// Locator searching `overrides` in order, then the bundled directory.
    pub fn new(overrides: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut search_paths: Vec<PathBuf> = overrides.into_iter().collect();
        search_paths.push(Self::bundled_dir());
        Self { search_paths }
    }

    /// Locator over exactly `search_paths`, without the bundled directory.
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Absolute path of the first file named `logical_name` on the search
    /// path.
    pub fn resolve(&self, logical_name: &str) -> Result<PathBuf, ConfigurationError> {
        if !is_plain_relative(logical_name) {
            return Err(ConfigurationError::ResourceUnusable {
                name: logical_name.to_string(),
                reason: "resource names must be relative and stay inside the search path"
                    .to_string()
            });
        }

        for dir in &self.search_paths {
            let candidate = dir.join(logical_name);
            if !candidate.is_file() {
                continue;
            }
            return candidate
                .canonicalize()
                .map_err(|e| ConfigurationError::ResourceUnusable {
                    name: logical_name.to_string(),
                    reason: e.to_string()
                });
        }

        Err(ConfigurationError::ResourceNotFound {
            name: logical_name.to_string(),
            searched: self.search_paths.clone()
        })
    }

    /// Resolve every entry of `inputs`, failing on the first missing one.
    pub fn resolve_inputs(
        &self,
        inputs: &[ProvisioningInput]
    ) -> Result<Vec<ResolvedInput>, ConfigurationError> {
        inputs
            .iter()
            .map(|input| {
                Ok(ResolvedInput {
                    source: self.resolve(input.logical_name)?,
                    destination: input.destination_path.to_string(),
                    mode: input.permission_mode
                })
            })
            .collect()
    }
}

fn is_plain_relative(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_bundled_resources() {
        let locator = ResourceLocator::default();
        for input in PROVISIONING_INPUTS {
            let path = locator.resolve(input.logical_name).unwrap();
            assert!(path.is_absolute());
            assert!(path.ends_with(input.logical_name));
        }
        assert!(locator.resolve(CLIENT_KEY).is_ok());
    }

    #[test]
    fn test_resolve_nonexistent_is_configuration_error() {
        let locator = ResourceLocator::default();
        for _ in 0..2 {
            match locator.resolve("nonexistent.file") {
                Err(ConfigurationError::ResourceNotFound { name, searched }) => {
                    assert_eq!(name, "nonexistent.file");
                    assert_eq!(searched, vec![ResourceLocator::bundled_dir()]);
                }
                other => panic!("expected ResourceNotFound, got {:?}", other)
            }
        }
    }

    #[test]
    fn test_override_directory_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SERVER_CERTIFICATE), "override").unwrap();

        let locator = ResourceLocator::new(vec![dir.path().to_path_buf()]);
        let resolved = locator.resolve(SERVER_CERTIFICATE).unwrap();
        assert_eq!(resolved, dir.path().join(SERVER_CERTIFICATE).canonicalize().unwrap());

        let fallback = locator.resolve(SERVER_KEY).unwrap();
        assert!(fallback.starts_with(ResourceLocator::bundled_dir().canonicalize().unwrap()));
    }

    #[test]
    fn test_directory_is_not_a_resource() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("server.crt")).unwrap();

        let locator = ResourceLocator::with_search_paths(vec![dir.path().to_path_buf()]);
        assert!(matches!(
            locator.resolve(SERVER_CERTIFICATE),
            Err(ConfigurationError::ResourceNotFound { .. })
        ));
    }

    #[test]
    fn test_escaping_names_rejected() {
        let locator = ResourceLocator::default();
        for name in ["", "../Cargo.toml", "/etc/passwd"] {
            assert!(matches!(
                locator.resolve(name),
                Err(ConfigurationError::ResourceUnusable { .. })
            ));
        }
    }

    #[test]
    fn test_resolve_inputs_keeps_destination_and_mode() {
        let resolved = ResourceLocator::default()
            .resolve_inputs(PROVISIONING_INPUTS)
            .unwrap();
        assert_eq!(resolved.len(), PROVISIONING_INPUTS.len());

        let setup = resolved
            .iter()
            .find(|input| input.destination == LAUNCH_COMMAND)
            .unwrap();
        assert_eq!(setup.mode, 0o755);
    }

    #[test]
    fn test_resolve_inputs_fails_on_first_missing() {
        let dir = TempDir::new().unwrap();
        let locator = ResourceLocator::with_search_paths(vec![dir.path().to_path_buf()]);
        match locator.resolve_inputs(PROVISIONING_INPUTS) {
            Err(ConfigurationError::ResourceNotFound { name, .. }) => {
                assert_eq!(name, SERVER_CERTIFICATE);
            }
            other => panic!("expected ResourceNotFound, got {:?}", other)
        }
    }
}
