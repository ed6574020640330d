//! Reference-counted lifecycle of the shared database.
//!
//! Nested test scopes call [`PostgresServer::begin`] and
//! [`PostgresServer::end`]. Only the outermost pair does work: the first
//! `begin()` selects the provider (once per coordinator), starts it if it is
//! ephemeral and opens a pool; the matching last `end()` closes the pool and
//! then stops the provider.

use crate::connection::{ConnectionConfiguration, ConnectionConfigurationBuilder};
use crate::facts::ConnectionFacts;
use crate::pool::{PoolConnector, PoolHandle, QueryFacade, SqlxConnector};
use crate::provider::Provider;
use crate::resources::{CLIENT_CERTIFICATE, CLIENT_KEY, ResourceLocator, SERVER_CERTIFICATE, SERVER_KEY};
use crate::runtime::{ContainerRuntime, DockerRuntime};
use config::FixtureConfig;
use errors::{ConfigurationError, FixtureError, LifecycleError, StartupError, TeardownError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Outcome of [`PostgresServer::end`].
#[derive(Debug)]
pub enum TeardownReport {
    /// Other scopes are still active; nothing was torn down.
    Retained { remaining: usize },
    /// The last scope exited. Cleanup failures are collected, not raised.
    Released { failures: Vec<TeardownError> }
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        match self {
            Self::Retained { .. } => true,
            Self::Released { failures } => failures.is_empty()
        }
    }
}

struct LifecycleState<P> {
    nesting: usize,
    pool: Option<P>
}

/// Coordinates one shared database across nested test scopes.
///
/// The pool is present exactly while `nesting() > 0`. The provider, once
/// selected, is kept for the lifetime of the coordinator; only its running
/// instance and the pool are cycled.
pub struct PostgresServer<C: PoolConnector = SqlxConnector> {
    config: FixtureConfig,
    locator: ResourceLocator,
    runtime: Arc<dyn ContainerRuntime>,
    connector: C,
    provider: OnceCell<Arc<Provider>>,
    state: Mutex<LifecycleState<C::Pool>>
}

impl PostgresServer<SqlxConnector> {
    /// Coordinator using Docker for ephemeral instances and `sqlx` pools.
    pub fn new(config: FixtureConfig) -> Self {
        Self::with_parts(config, Arc::new(DockerRuntime::new()), SqlxConnector)
    }

    /// Statement runner over the active pool.
    pub async fn query_facade(&self) -> Result<QueryFacade, LifecycleError> {
        self.active_pool("query_facade").await.map(QueryFacade::new)
    }
}

impl<C: PoolConnector> PostgresServer<C> {
    pub fn with_parts(config: FixtureConfig, runtime: Arc<dyn ContainerRuntime>, connector: C) -> Self {
        let locator = ResourceLocator::new(config.resources.search_paths.clone());
        Self {
            config,
            locator,
            runtime,
            connector,
            provider: OnceCell::new(),
            state: Mutex::new(LifecycleState {
                nesting: 0,
                pool: None
            })
        }
    }

    /// Replace the resource locator derived from the configuration.
    #[must_use]
    pub fn with_locator(mut self, locator: ResourceLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    /// Enter a scope. The outermost call provisions; nested calls only count.
    ///
    /// On failure the scope is not entered, no pool is kept and a later
    /// `begin()` starts over.
    pub async fn begin(&self) -> Result<(), FixtureError> {
        let mut state = self.state.lock().await;
        if state.nesting > 0 {
            state.nesting += 1;
            tracing::debug!(nesting = state.nesting, "Joined active database scope");
            return Ok(());
        }

        let pool = self.provision().await?;
        state.pool = Some(pool);
        state.nesting = 1;
        tracing::info!("Database scope opened");
        Ok(())
    }

    /// Leave a scope. The last exit closes the pool, then stops an ephemeral
    /// instance.
    pub async fn end(&self) -> Result<TeardownReport, LifecycleError> {
        let mut state = self.state.lock().await;
        if state.nesting == 0 {
            return Err(LifecycleError::UnbalancedEnd);
        }

        state.nesting -= 1;
        if state.nesting > 0 {
            tracing::debug!(nesting = state.nesting, "Left nested database scope");
            return Ok(TeardownReport::Retained {
                remaining: state.nesting
            });
        }

        let mut failures = Vec::new();
        if let Some(pool) = state.pool.take() {
            if let Err(e) = pool.close().await {
                tracing::warn!(error = %e, "Connection pool did not close cleanly");
                failures.push(e);
            }
        }
        if let Some(provider) = self.provider.get() {
            if let Err(e) = provider.stop().await {
                tracing::warn!(error = %e, "Database instance may have leaked");
                failures.push(e);
            }
        }

        tracing::info!(failures = failures.len(), "Database scope released");
        Ok(TeardownReport::Released { failures })
    }

    async fn provision(&self) -> Result<C::Pool, FixtureError> {
        let provider = self
            .provider
            .get_or_try_init(|| async {
                Provider::select(&self.config, self.runtime.clone(), &self.locator)
                    .await
                    .map(Arc::new)
            })
            .await?;

        provider.start().await?;

        match self.open_pool(provider).await {
            Ok(pool) => Ok(pool),
            Err(e) => {
                if let Err(stop_error) = provider.stop().await {
                    tracing::warn!(error = %stop_error, "Failed to stop instance after pool error");
                }
                Err(e)
            }
        }
    }

    async fn open_pool(&self, provider: &Provider) -> Result<C::Pool, FixtureError> {
        let facts = provider.facts()?;
        let configuration = ConnectionConfiguration::builder(&facts, &self.config.pool)
            .build()
            .map_err(StartupError::from)?;

        let pool = self.connector.open(&configuration).await?;
        tracing::info!(
            host = %configuration.host,
            port = configuration.port,
            database = %configuration.database,
            "Connection pool opened"
        );
        Ok(pool)
    }

    /// Number of currently active scopes.
    pub async fn nesting(&self) -> usize {
        self.state.lock().await.nesting
    }

    pub async fn is_active(&self) -> bool {
        self.nesting().await > 0
    }

    /// The memoized provider, once the first `begin()` has selected it.
    pub fn provider(&self) -> Option<Arc<Provider>> {
        self.provider.get().cloned()
    }

    fn selected(&self, accessor: &str) -> Result<&Provider, LifecycleError> {
        self.provider
            .get()
            .map(Arc::as_ref)
            .ok_or_else(|| LifecycleError::NotInitialized {
                accessor: accessor.to_string()
            })
    }

    pub fn host(&self) -> Result<String, LifecycleError> {
        self.selected("host")?.host()
    }

    pub fn port(&self) -> Result<u16, LifecycleError> {
        self.selected("port")?.port()
    }

    pub fn database(&self) -> Result<&str, LifecycleError> {
        Ok(self.selected("database")?.database())
    }

    pub fn username(&self) -> Result<&str, LifecycleError> {
        Ok(self.selected("username")?.username())
    }

    pub fn password(&self) -> Result<&str, LifecycleError> {
        Ok(self.selected("password")?.password())
    }

    pub fn facts(&self) -> Result<ConnectionFacts, LifecycleError> {
        self.selected("facts")?.facts()
    }

    /// Connection configuration builder pre-populated from the provider.
    pub fn config_builder(&self) -> Result<ConnectionConfigurationBuilder, FixtureError> {
        let facts = self.selected("config_builder")?.facts()?;
        Ok(ConnectionConfiguration::builder(&facts, &self.config.pool))
    }

    pub fn connection_configuration(&self) -> Result<ConnectionConfiguration, FixtureError> {
        Ok(self.config_builder()?.build()?)
    }

    pub fn client_certificate_path(&self) -> Result<PathBuf, ConfigurationError> {
        self.locator.resolve(CLIENT_CERTIFICATE)
    }

    pub fn client_key_path(&self) -> Result<PathBuf, ConfigurationError> {
        self.locator.resolve(CLIENT_KEY)
    }

    pub fn server_certificate_path(&self) -> Result<PathBuf, ConfigurationError> {
        self.locator.resolve(SERVER_CERTIFICATE)
    }

    pub fn server_key_path(&self) -> Result<PathBuf, ConfigurationError> {
        self.locator.resolve(SERVER_KEY)
    }

    /// Handle of the pool opened by the outermost active scope.
    pub async fn pool(&self) -> Result<C::Pool, LifecycleError> {
        self.active_pool("pool").await
    }

    async fn active_pool(&self, accessor: &str) -> Result<C::Pool, LifecycleError> {
        self.state
            .lock()
            .await
            .pool
            .clone()
            .ok_or_else(|| LifecycleError::NoActiveScope {
                accessor: accessor.to_string()
            })
    }
}
