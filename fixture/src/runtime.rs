//! Container runtime seam.
//!
//! [`ContainerRuntime`] launches an instance from a [`LaunchSpec`];
//! [`RunningInstance`] exposes its reachable endpoint and stops it.
//! [`DockerRuntime`] is the production implementation on top of
//! `testcontainers`.

use crate::resources::ResolvedInput;
use async_trait::async_trait;
use errors::{StartupError, TeardownError};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

/// Everything needed to launch one ephemeral database instance.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub image: String,
    pub tag: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Files copied into the instance before its entrypoint executes
    pub inputs: Vec<ResolvedInput>,
    /// Replaces the image's default command
    pub command: Vec<String>,
    pub internal_port: u16,
    pub startup_timeout: Duration
}

impl LaunchSpec {
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}

/// Launches database instances.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start an instance and wait until it is ready.
    async fn start(&self, spec: &LaunchSpec) -> Result<Box<dyn RunningInstance>, StartupError>;
}

/// A launched instance.
#[async_trait]
pub trait RunningInstance: Send + Sync {
    /// Host through which the instance is reachable from this process.
    async fn reachable_host(&self) -> Result<String, StartupError>;

    /// Host port mapped to `internal_port` inside the instance.
    async fn mapped_port(&self, internal_port: u16) -> Result<u16, StartupError>;

    /// Stop and remove the instance.
    async fn stop(self: Box<Self>) -> Result<(), TeardownError>;
}

/// [`ContainerRuntime`] backed by a local Docker daemon.
#[derive(Debug, Default, Clone)]
pub struct DockerRuntime;

impl DockerRuntime {
    pub fn new() -> Self {
        Self
    }
}

struct DockerInstance {
    container: ContainerAsync<Postgres>,
    // Staged copies must outlive the container start.
    _staging: TempDir
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn start(&self, spec: &LaunchSpec) -> Result<Box<dyn RunningInstance>, StartupError> {
        let image = spec.image_ref();
        let start_error = |reason: String| StartupError::ContainerStart {
            image: image.clone(),
            reason
        };

        let staging = TempDir::new().map_err(|e| start_error(e.to_string()))?;
        let staged = stage_inputs(&staging, &spec.inputs).map_err(|e| start_error(e.to_string()))?;

        let mut request = Postgres::default()
            .with_db_name(&spec.database)
            .with_user(&spec.username)
            .with_password(&spec.password)
            .with_name(spec.image.clone())
            .with_tag(spec.tag.clone())
            .with_startup_timeout(spec.startup_timeout);

        for (path, input) in staged.into_iter().zip(&spec.inputs) {
            request = request.with_copy_to(input.destination.clone(), path);
        }
        if !spec.command.is_empty() {
            request = request.with_cmd(spec.command.clone());
        }

        tracing::debug!(image = %image, inputs = spec.inputs.len(), "Starting container");
        let container = request
            .start()
            .await
            .map_err(|e| start_error(e.to_string()))?;

        Ok(Box::new(DockerInstance {
            container,
            _staging: staging
        }))
    }
}

#[async_trait]
impl RunningInstance for DockerInstance {
    async fn reachable_host(&self) -> Result<String, StartupError> {
        self.container
            .get_host()
            .await
            .map(|host| host.to_string())
            .map_err(|e| StartupError::EndpointUnresolved {
                reason: e.to_string()
            })
    }

    async fn mapped_port(&self, internal_port: u16) -> Result<u16, StartupError> {
        self.container
            .get_host_port_ipv4(internal_port)
            .await
            .map_err(|e| StartupError::EndpointUnresolved {
                reason: e.to_string()
            })
    }

    async fn stop(self: Box<Self>) -> Result<(), TeardownError> {
        let id = self.container.id().to_string();
        self.container
            .rm()
            .await
            .map_err(|e| TeardownError::InstanceStop {
                reason: format!("container {id}: {e}")
            })
    }
}

/// Copy each input into `staging` with its permission mode applied, so the
/// archive sent to the container carries the right mode bits.
fn stage_inputs(staging: &TempDir, inputs: &[ResolvedInput]) -> std::io::Result<Vec<PathBuf>> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let file_name = input
                .source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "input".to_string());
            let staged = staging.path().join(format!("{index}-{file_name}"));
            std::fs::copy(&input.source, &staged)?;
            set_mode(&staged, input.mode)?;
            Ok(staged)
        })
        .collect()
}

#[cfg(unix)]
fn set_mode(path: &std::path::Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &std::path::Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{PROVISIONING_INPUTS, ResourceLocator};

    #[test]
    fn test_image_ref() {
        let spec = LaunchSpec {
            image: "postgres".to_string(),
            tag: "16".to_string(),
            database: "test".to_string(),
            username: "test".to_string(),
            password: "test".to_string(),
            inputs: Vec::new(),
            command: Vec::new(),
            internal_port: 5432,
            startup_timeout: Duration::from_secs(1)
        };
        assert_eq!(spec.image_ref(), "postgres:16");
    }

    #[cfg(unix)]
    #[test]
    fn test_stage_inputs_applies_modes() {
        use std::os::unix::fs::PermissionsExt;

        let inputs = ResourceLocator::default()
            .resolve_inputs(PROVISIONING_INPUTS)
            .unwrap();
        let staging = TempDir::new().unwrap();
        let staged = stage_inputs(&staging, &inputs).unwrap();

        assert_eq!(staged.len(), inputs.len());
        for (path, input) in staged.iter().zip(&inputs) {
            let mode = std::fs::metadata(path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, input.mode, "mode of {}", path.display());
            assert_eq!(
                std::fs::read(path).unwrap(),
                std::fs::read(&input.source).unwrap()
            );
        }
    }
}
