use crate::facts::ConnectionFacts;
use crate::resources::{LAUNCH_COMMAND, PROVISIONING_INPUTS, ResourceLocator};
use crate::runtime::{ContainerRuntime, LaunchSpec, RunningInstance};
use config::EphemeralConfig;
use errors::{ConfigurationError, LifecycleError, StartupError, TeardownError};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A container-provisioned instance.
///
/// Database name and credentials are fixed at construction; host and port
/// are only known while the instance runs. The provider can be started
/// again after a stop, which yields a new endpoint.
pub struct EphemeralProvider {
    runtime: Arc<dyn ContainerRuntime>,
    spec: LaunchSpec,
    instance: Mutex<Option<Box<dyn RunningInstance>>>,
    endpoint: RwLock<Option<(String, u16)>>
}

impl std::fmt::Debug for EphemeralProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralProvider")
            .field("image", &self.spec.image_ref())
            .field("endpoint", &*self.endpoint.read())
            .finish()
    }
}

impl EphemeralProvider {
    /// Resolve every provisioning input up front; a missing bundled file
    /// fails construction.
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        config: &EphemeralConfig,
        locator: &ResourceLocator
    ) -> Result<Self, ConfigurationError> {
        let inputs = locator.resolve_inputs(PROVISIONING_INPUTS)?;

        Ok(Self {
            runtime,
            spec: LaunchSpec {
                image: config.image.clone(),
                tag: config.tag.clone(),
                database: config.database.clone(),
                username: config.username.clone(),
                password: config.password.clone(),
                inputs,
                command: vec![LAUNCH_COMMAND.to_string()],
                internal_port: config.internal_port,
                startup_timeout: Duration::from_secs(config.startup_timeout_seconds)
            },
            instance: Mutex::new(None),
            endpoint: RwLock::new(None)
        })
    }

    pub fn launch_spec(&self) -> &LaunchSpec {
        &self.spec
    }

    pub fn is_running(&self) -> bool {
        self.endpoint.read().is_some()
    }

    /// Launch the instance unless it is already running.
    pub async fn start(&self) -> Result<(), StartupError> {
        let mut instance = self.instance.lock().await;
        if instance.is_some() {
            return Ok(());
        }

        let running = self.runtime.start(&self.spec).await?;
        let endpoint = match resolve_endpoint(running.as_ref(), self.spec.internal_port).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                if let Err(stop_error) = running.stop().await {
                    tracing::warn!(error = %stop_error, "Failed to stop unreachable instance");
                }
                return Err(e);
            }
        };

        tracing::info!(
            image = %self.spec.image_ref(),
            host = %endpoint.0,
            port = endpoint.1,
            "Ephemeral database started"
        );
        *self.endpoint.write() = Some(endpoint);
        *instance = Some(running);
        Ok(())
    }

    /// Stop the instance. Stopping a stopped instance is a no-op.
    pub async fn stop(&self) -> Result<(), TeardownError> {
        let mut instance = self.instance.lock().await;
        let Some(running) = instance.take() else {
            return Ok(());
        };
        *self.endpoint.write() = None;

        running.stop().await?;
        tracing::info!(image = %self.spec.image_ref(), "Ephemeral database stopped");
        Ok(())
    }

    pub fn host(&self) -> Result<String, LifecycleError> {
        self.endpoint
            .read()
            .as_ref()
            .map(|(host, _)| host.clone())
            .ok_or(LifecycleError::NotRunning)
    }

    pub fn port(&self) -> Result<u16, LifecycleError> {
        self.endpoint
            .read()
            .as_ref()
            .map(|(_, port)| *port)
            .ok_or(LifecycleError::NotRunning)
    }

    pub fn database(&self) -> &str {
        &self.spec.database
    }

    pub fn username(&self) -> &str {
        &self.spec.username
    }

    pub fn password(&self) -> &str {
        &self.spec.password
    }

    pub fn facts(&self) -> Result<ConnectionFacts, LifecycleError> {
        let endpoint = self.endpoint.read();
        let (host, port) = endpoint.as_ref().ok_or(LifecycleError::NotRunning)?;
        Ok(ConnectionFacts {
            host: host.clone(),
            port: *port,
            database: self.spec.database.clone(),
            username: self.spec.username.clone(),
            password: self.spec.password.clone()
        })
    }
}

async fn resolve_endpoint(
    instance: &dyn RunningInstance,
    internal_port: u16
) -> Result<(String, u16), StartupError> {
    let host = instance.reachable_host().await?;
    let port = instance.mapped_port(internal_port).await?;
    Ok((host, port))
}
