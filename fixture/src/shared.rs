use crate::coordinator::{PostgresServer, TeardownReport};
use crate::pool::{PoolConnector, QueryFacade, SqlxConnector};
use errors::{FixtureError, LifecycleError, StartupError};
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::OnceCell;

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Process-unique identifier, handy for table or schema names in tests
/// sharing one database.
pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, id)
}

/// Name of the worker threads of the runtime owned by a [`SharedServer`].
pub const RUNTIME_THREAD_NAME: &str = "pg-fixture";

/// A [`PostgresServer`] whose scopes may span several Tokio runtimes.
///
/// Each `#[tokio::test]` runs on its own runtime, but a container client
/// and pool sockets stay bound to the reactor that created them. `begin()`,
/// `end()` and the statements of [`SharedServer::query_facade`] therefore
/// run on a runtime owned by this value, which lives as long as it does.
/// Synchronous accessors are reached through `Deref`.
pub struct SharedServer<C: PoolConnector = SqlxConnector> {
    server: Arc<PostgresServer<C>>,
    handle: Handle,
    // Option so Drop can shut it down without blocking an async caller.
    runtime: Option<Runtime>
}

impl<C: PoolConnector> SharedServer<C> {
    pub fn new(server: PostgresServer<C>) -> Result<Self, StartupError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name(RUNTIME_THREAD_NAME)
            .enable_all()
            .build()
            .map_err(|e| StartupError::Runtime {
                reason: e.to_string()
            })?;

        Ok(Self {
            server: Arc::new(server),
            handle: runtime.handle().clone(),
            runtime: Some(runtime)
        })
    }

    pub fn server(&self) -> &PostgresServer<C> {
        &self.server
    }

    /// See [`PostgresServer::begin`].
    pub async fn begin(&self) -> Result<(), FixtureError> {
        let server = self.server.clone();
        self.run(async move { server.begin().await }).await?
    }

    /// See [`PostgresServer::end`].
    pub async fn end(&self) -> Result<TeardownReport, LifecycleError> {
        let server = self.server.clone();
        self.run(async move { server.end().await }).await?
    }

    async fn run<F, T>(&self, task: F) -> Result<T, LifecycleError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static
    {
        self.handle
            .spawn(task)
            .await
            .map_err(|e| LifecycleError::TaskFailed {
                reason: e.to_string()
            })
    }
}

impl SharedServer<SqlxConnector> {
    /// Statement runner whose statements execute on the owned runtime.
    pub async fn query_facade(&self) -> Result<QueryFacade, LifecycleError> {
        let pool = self.server.pool().await?;
        Ok(QueryFacade::on_runtime(pool, self.handle.clone()))
    }
}

impl<C: PoolConnector> Deref for SharedServer<C> {
    type Target = PostgresServer<C>;

    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

impl<C: PoolConnector> Drop for SharedServer<C> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

static SERVER: OnceCell<SharedServer> = OnceCell::const_new();

/// The process-wide coordinator, configured from the layered configuration
/// on first use. Nothing is started until a test calls `begin()`.
pub async fn shared() -> Result<&'static SharedServer, FixtureError> {
    SERVER
        .get_or_try_init(|| async {
            let config = config::load()?;
            tracing::debug!(provider = ?config.provider, "Shared database coordinator configured");
            Ok::<_, FixtureError>(SharedServer::new(PostgresServer::new(config))?)
        })
        .await
}
