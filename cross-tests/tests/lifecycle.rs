use pg_fixture::{
    FixtureError, LifecycleError, PostgresServer, StartupError, TeardownReport, unique_id
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}

/// Opens the outermost scope, or returns `None` when no database can be
/// provisioned on this machine.
async fn begin_or_skip() -> Option<PostgresServer> {
    init_tracing();
    let server = PostgresServer::new(config::load().unwrap());
    match server.begin().await {
        Ok(()) => Some(server),
        Err(FixtureError::Startup(
            e @ (StartupError::ContainerStart { .. } | StartupError::ProviderUnavailable { .. })
        )) => {
            eprintln!("Skipping Postgres test: {e}");
            None
        }
        Err(e) => panic!("unexpected provisioning failure: {e}")
    }
}

#[tokio::test]
async fn test_nested_scopes_share_one_database() {
    let Some(server) = begin_or_skip().await else {
        return;
    };

    let facade = server.query_facade().await.unwrap();
    assert_eq!(facade.fetch_scalar_i64("SELECT 1::BIGINT").await.unwrap(), 1);

    let port = server.port().unwrap();
    server.begin().await.unwrap();
    assert_eq!(server.nesting().await, 2);
    assert_eq!(server.port().unwrap(), port);

    let table = unique_id("lifecycle");
    let inner = server.query_facade().await.unwrap();
    inner
        .execute_all([
            format!("CREATE TABLE \"{table}\" (id BIGINT PRIMARY KEY)").as_str(),
            format!("INSERT INTO \"{table}\" VALUES (1), (2)").as_str()
        ])
        .await
        .unwrap();

    let report = server.end().await.unwrap();
    assert!(matches!(report, TeardownReport::Retained { remaining: 1 }));

    let count = facade
        .fetch_scalar_i64(&format!("SELECT COUNT(*) FROM \"{table}\""))
        .await
        .unwrap();
    assert_eq!(count, 2);

    facade.execute(&format!("DROP TABLE \"{table}\"")).await.unwrap();
    let report = server.end().await.unwrap();
    assert!(report.is_clean(), "teardown failed: {report:?}");
    assert!(matches!(
        server.pool().await,
        Err(LifecycleError::NoActiveScope { .. })
    ));
}

#[tokio::test]
async fn test_scope_can_be_reopened_after_release() {
    let Some(server) = begin_or_skip().await else {
        return;
    };
    let provider = server.provider().unwrap();
    assert!(server.end().await.unwrap().is_clean());

    server.begin().await.unwrap();
    assert!(Arc::ptr_eq(&provider, &server.provider().unwrap()));

    let facade = server.query_facade().await.unwrap();
    assert_eq!(facade.fetch_scalar_i64("SELECT 42::BIGINT").await.unwrap(), 42);

    let configuration = server.connection_configuration().unwrap();
    assert_eq!(configuration.port, server.port().unwrap());
    assert!(server.end().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_ephemeral_instance_accepts_client_certificate() {
    let Some(server) = begin_or_skip().await else {
        return;
    };
    if !server.provider().is_some_and(|p| p.is_ephemeral()) {
        eprintln!("Skipping certificate test: external database in use");
        server.end().await.unwrap();
        return;
    }

    let options = server
        .config_builder()
        .unwrap()
        .username("test-ssl-with-cert")
        .password("")
        .ssl_mode("require")
        .build()
        .unwrap()
        .connect_options()
        .unwrap()
        .ssl_client_cert(server.client_certificate_path().unwrap())
        .ssl_client_key(server.client_key_path().unwrap());

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    let user: String = sqlx::query_scalar("SELECT current_user::TEXT")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(user, "test-ssl-with-cert");

    let ssl: bool = sqlx::query_scalar("SELECT ssl FROM pg_stat_ssl WHERE pid = pg_backend_pid()")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(ssl);

    pool.close().await;
    assert!(server.end().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_shared_server_runs_statements_on_its_own_runtime() {
    init_tracing();
    let server = pg_fixture::shared().await.unwrap();
    match server.begin().await {
        Ok(()) => {}
        Err(FixtureError::Startup(
            e @ (StartupError::ContainerStart { .. } | StartupError::ProviderUnavailable { .. })
        )) => {
            eprintln!("Skipping Postgres test: {e}");
            return;
        }
        Err(e) => panic!("unexpected provisioning failure: {e}")
    }

    let facade = server.query_facade().await.unwrap();
    assert_eq!(facade.fetch_scalar_i64("SELECT 7::BIGINT").await.unwrap(), 7);
    assert!(server.end().await.unwrap().is_clean());
}
