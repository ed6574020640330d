//! Connection pool seam.
//!
//! [`PoolConnector`] opens a pool against a [`ConnectionConfiguration`];
//! [`PoolHandle`] closes it. [`SqlxConnector`] opens `sqlx` Postgres pools,
//! and [`QueryFacade`] runs per-test setup and teardown statements on them.

use crate::connection::ConnectionConfiguration;
use async_trait::async_trait;
use errors::{QueryError, StartupError, TeardownError};
use sqlx::{AssertSqlSafe, PgPool};
use sqlx::postgres::PgPoolOptions;
use tokio::runtime::Handle;

/// An open pool owned by the lifecycle coordinator.
#[async_trait]
pub trait PoolHandle: Clone + Send + Sync + 'static {
    async fn close(&self) -> Result<(), TeardownError>;
}

/// Opens pools of a concrete client library.
#[async_trait]
pub trait PoolConnector: Send + Sync + 'static {
    type Pool: PoolHandle;

    async fn open(&self, config: &ConnectionConfiguration) -> Result<Self::Pool, StartupError>;
}

/// Opens `sqlx` Postgres pools.
#[derive(Debug, Default, Clone)]
pub struct SqlxConnector;

#[async_trait]
impl PoolConnector for SqlxConnector {
    type Pool = PgPool;

    async fn open(&self, config: &ConnectionConfiguration) -> Result<PgPool, StartupError> {
        let options = config.connect_options()?;

        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| StartupError::PoolOpen {
                host: config.host.clone(),
                port: config.port,
                reason: e.to_string()
            })
    }
}

#[async_trait]
impl PoolHandle for PgPool {
    async fn close(&self) -> Result<(), TeardownError> {
        PgPool::close(self).await;
        Ok(())
    }
}

/// Thin statement runner over the active pool.
///
/// A facade bound to a runtime spawns every statement there, so the pool's
/// connections stay on the reactor that owns them.
#[derive(Debug, Clone)]
pub struct QueryFacade {
    pool: PgPool,
    runtime: Option<Handle>
}

impl QueryFacade {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            runtime: None
        }
    }

    pub fn on_runtime(pool: PgPool, runtime: Handle) -> Self {
        Self {
            pool,
            runtime: Some(runtime)
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Execute one statement, returning the number of affected rows.
    pub async fn execute(&self, statement: &str) -> Result<u64, QueryError> {
        let pool = self.pool.clone();
        let owned = statement.to_string();
        self.dispatch(statement, async move {
            sqlx::query(AssertSqlSafe(owned.as_str()))
                .execute(&pool)
                .await
                .map(|result| result.rows_affected())
        })
        .await
    }

    /// Execute statements in order, stopping at the first failure.
    pub async fn execute_all<'a>(
        &self,
        statements: impl IntoIterator<Item = &'a str>
    ) -> Result<u64, QueryError> {
        let mut affected = 0;
        for statement in statements {
            affected += self.execute(statement).await?;
        }
        Ok(affected)
    }

    /// Run a query returning a single `bigint` column of a single row.
    pub async fn fetch_scalar_i64(&self, statement: &str) -> Result<i64, QueryError> {
        let pool = self.pool.clone();
        let owned = statement.to_string();
        self.dispatch(statement, async move {
            sqlx::query_scalar::<_, i64>(AssertSqlSafe(owned.as_str()))
                .fetch_one(&pool)
                .await
        })
        .await
    }

    async fn dispatch<T, F>(&self, statement: &str, task: F) -> Result<T, QueryError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send + 'static,
        T: Send + 'static
    {
        let outcome = match &self.runtime {
            Some(runtime) => runtime.spawn(task).await.map_err(|e| QueryError::Execution {
                statement: statement.to_string(),
                reason: e.to_string()
            })?,
            None => task.await
        };
        outcome.map_err(|e| query_error(statement, e))
    }
}

fn query_error(statement: &str, error: sqlx::Error) -> QueryError {
    QueryError::Execution {
        statement: statement.to_string(),
        reason: error.to_string()
    }
}
