//! Shared PostgreSQL fixture for integration tests.
//!
//! Test scopes bracket their work with [`PostgresServer::begin`] and
//! [`PostgresServer::end`]. The outermost scope provisions the database,
//! either a pre-existing instance or a TLS-enabled container started from
//! bundled certificates and scripts, and opens a connection pool. Nested
//! scopes reuse both; the last exit tears them down.
//!
//! ```no_run
//! # async fn example() -> Result<(), pg_fixture::FixtureError> {
//! let server = pg_fixture::shared().await?;
//! server.begin().await?;
//! let rows = server.query_facade().await?.fetch_scalar_i64("SELECT 1::BIGINT").await?;
//! assert_eq!(rows, 1);
//! server.end().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod coordinator;
pub mod facts;
pub mod pool;
pub mod provider;
pub mod resources;
pub mod runtime;
mod shared;

#[cfg(test)]
mod fakes;

pub use connection::{ConnectionConfiguration, ConnectionConfigurationBuilder};
pub use coordinator::{PostgresServer, TeardownReport};
pub use errors::{
    ConfigurationError, FixtureError, LifecycleError, QueryError, StartupError, TeardownError
};
pub use facts::ConnectionFacts;
pub use pool::{PoolConnector, PoolHandle, QueryFacade, SqlxConnector};
pub use provider::{EphemeralProvider, ExternalProvider, Provider};
pub use resources::{ResourceLocator, ResolvedInput};
pub use runtime::{ContainerRuntime, DockerRuntime, LaunchSpec, RunningInstance};
pub use shared::{RUNTIME_THREAD_NAME, SharedServer, shared, unique_id};
