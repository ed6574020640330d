//! Connection configuration handed to client code.
//!
//! A pure mapping from [`ConnectionFacts`] plus pool-level driver options to
//! a validated value that can be rendered as a URL or as
//! [`PgConnectOptions`].

use crate::facts::ConnectionFacts;
use config::PoolConfig;
use errors::ConfigurationError;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Everything a client needs to open connections to the provisioned
/// instance.
#[derive(Clone, PartialEq, Eq, Validate)]
pub struct ConnectionConfiguration {
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    #[validate(length(min = 1))]
    pub database: String,

    #[validate(length(min = 1))]
    pub username: String,

    pub password: String,

    #[validate(custom(function = "config::validate_ssl_mode"))]
    pub ssl_mode: String,

    pub application_name: String,

    pub max_connections: u32,

    pub acquire_timeout: Duration
}

impl fmt::Debug for ConnectionConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfiguration")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("ssl_mode", &self.ssl_mode)
            .field("application_name", &self.application_name)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl ConnectionConfiguration {
    /// Builder pre-populated from `facts` and the pool options.
    pub fn builder(facts: &ConnectionFacts, pool: &PoolConfig) -> ConnectionConfigurationBuilder {
        ConnectionConfigurationBuilder {
            host: facts.host.clone(),
            port: facts.port,
            database: facts.database.clone(),
            username: facts.username.clone(),
            password: facts.password.clone(),
            ssl_mode: pool.ssl_mode.clone(),
            application_name: pool.application_name.clone(),
            max_connections: pool.max_connections,
            acquire_timeout: Duration::from_secs(pool.acquire_timeout_seconds)
        }
    }

    /// `postgres://` URL with percent-encoded credentials.
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}&application_name={}",
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.password),
            self.host,
            self.port,
            urlencoding::encode(&self.database),
            self.ssl_mode,
            urlencoding::encode(&self.application_name)
        )
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigurationError> {
        let ssl_mode =
            PgSslMode::from_str(&self.ssl_mode).map_err(|e| ConfigurationError::Invalid {
                field: "ssl_mode".to_string(),
                reason: e.to_string()
            })?;

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
            .ssl_mode(ssl_mode)
            .application_name(&self.application_name))
    }
}

/// Adjusts a [`ConnectionConfiguration`] before it is built.
#[derive(Clone)]
pub struct ConnectionConfigurationBuilder {
    host: String,
    port: u16,
    database: String,
    username: String,
    password: String,
    ssl_mode: String,
    application_name: String,
    max_connections: u32,
    acquire_timeout: Duration
}

impl ConnectionConfigurationBuilder {
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    #[must_use]
    pub fn ssl_mode(mut self, ssl_mode: impl Into<String>) -> Self {
        self.ssl_mode = ssl_mode.into();
        self
    }

    #[must_use]
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    #[must_use]
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Validate and build. Fails on an empty host, database or username,
    /// port 0, or an unknown ssl mode.
    pub fn build(self) -> Result<ConnectionConfiguration, ConfigurationError> {
        let configuration = ConnectionConfiguration {
            host: self.host,
            port: self.port,
            database: self.database,
            username: self.username,
            password: self.password,
            ssl_mode: self.ssl_mode,
            application_name: self.application_name,
            max_connections: self.max_connections,
            acquire_timeout: self.acquire_timeout
        };

        configuration.validate().map_err(|errors| {
            let mut fields: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|field| field.to_string())
                .collect();
            fields.sort();
            ConfigurationError::Invalid {
                field: fields.join(", "),
                reason: errors.to_string()
            }
        })?;

        Ok(configuration)
    }
}
