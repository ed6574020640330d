//! Backing instance providers.
//!
//! [`Provider`] is a closed set of two variants exposing the same
//! connection facts: [`ExternalProvider`] for a pre-existing instance and
//! [`EphemeralProvider`] for a container launched on demand.

mod ephemeral;
mod external;

pub use ephemeral::EphemeralProvider;
pub use external::ExternalProvider;

use crate::facts::ConnectionFacts;
use crate::resources::ResourceLocator;
use crate::runtime::ContainerRuntime;
use config::{FixtureConfig, ProviderMode};
use errors::{FixtureError, LifecycleError, StartupError, TeardownError};
use std::sync::Arc;

#[derive(Debug)]
pub enum Provider {
    External(ExternalProvider),
    Ephemeral(EphemeralProvider)
}

impl Provider {
    /// Pick and construct a provider according to `config.provider`.
    ///
    /// - `Ephemeral`: always a container.
    /// - `External`: the pre-existing instance; fails if its probe fails.
    /// - `Auto`: the pre-existing instance if its probe succeeds, otherwise a
    ///   container.
    pub async fn select(
        config: &FixtureConfig,
        runtime: Arc<dyn ContainerRuntime>,
        locator: &ResourceLocator
    ) -> Result<Self, FixtureError> {
        let provider = match config.provider {
            ProviderMode::Ephemeral => {
                Self::Ephemeral(EphemeralProvider::new(runtime, &config.ephemeral, locator)?)
            }
            ProviderMode::External => {
                let external = ExternalProvider::from_config(&config.external);
                if !external.is_available().await {
                    return Err(StartupError::ProviderUnavailable {
                        host: external.facts().host.clone(),
                        port: external.facts().port
                    }
                    .into());
                }
                Self::External(external)
            }
            ProviderMode::Auto => {
                let external = ExternalProvider::from_config(&config.external);
                if external.is_available().await {
                    Self::External(external)
                } else {
                    Self::Ephemeral(EphemeralProvider::new(runtime, &config.ephemeral, locator)?)
                }
            }
        };

        tracing::info!(
            mode = ?config.provider,
            provider = provider.kind(),
            "Database provider selected"
        );
        Ok(provider)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::External(_) => "external",
            Self::Ephemeral(_) => "ephemeral"
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral(_))
    }

    /// Bring the instance up if this provider has a lifecycle.
    pub async fn start(&self) -> Result<(), StartupError> {
        match self {
            Self::External(_) => Ok(()),
            Self::Ephemeral(provider) => provider.start().await
        }
    }

    /// Bring the instance down if this provider has a lifecycle.
    pub async fn stop(&self) -> Result<(), TeardownError> {
        match self {
            Self::External(_) => Ok(()),
            Self::Ephemeral(provider) => provider.stop().await
        }
    }

    pub fn host(&self) -> Result<String, LifecycleError> {
        match self {
            Self::External(provider) => Ok(provider.facts().host.clone()),
            Self::Ephemeral(provider) => provider.host()
        }
    }

    pub fn port(&self) -> Result<u16, LifecycleError> {
        match self {
            Self::External(provider) => Ok(provider.facts().port),
            Self::Ephemeral(provider) => provider.port()
        }
    }

    pub fn database(&self) -> &str {
        match self {
            Self::External(provider) => &provider.facts().database,
            Self::Ephemeral(provider) => provider.database()
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Self::External(provider) => &provider.facts().username,
            Self::Ephemeral(provider) => provider.username()
        }
    }

    pub fn password(&self) -> &str {
        match self {
            Self::External(provider) => &provider.facts().password,
            Self::Ephemeral(provider) => provider.password()
        }
    }

    pub fn facts(&self) -> Result<ConnectionFacts, LifecycleError> {
        match self {
            Self::External(provider) => Ok(provider.facts().clone()),
            Self::Ephemeral(provider) => provider.facts()
        }
    }
}
