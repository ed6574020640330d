use crate::facts::ConnectionFacts;
use config::ExternalConfig;
use std::time::Duration;
use tokio::net::TcpStream;

/// A pre-existing instance assumed to be running. Never started or stopped.
#[derive(Debug, Clone)]
pub struct ExternalProvider {
    facts: ConnectionFacts,
    probe_timeout: Duration
}

impl Default for ExternalProvider {
    fn default() -> Self {
        Self::from_config(&ExternalConfig::default())
    }
}

impl ExternalProvider {
    pub fn from_config(config: &ExternalConfig) -> Self {
        Self {
            facts: ConnectionFacts {
                host: config.host.clone(),
                port: config.port,
                database: config.database.clone(),
                username: config.username.clone(),
                password: config.password.clone()
            },
            probe_timeout: Duration::from_millis(config.probe_timeout_ms)
        }
    }

    pub fn facts(&self) -> &ConnectionFacts {
        &self.facts
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Whether a TCP connection to the instance can be opened within the
    /// probe timeout. Any failure, including the timeout, yields `false`.
    pub async fn is_available(&self) -> bool {
        probe(&self.facts.host, self.facts.port, self.probe_timeout).await
    }
}

async fn probe(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(e)) => {
            tracing::debug!(host, port, error = %e, "External database probe failed");
            false
        }
        Err(_) => {
            tracing::debug!(host, port, ?timeout, "External database probe timed out");
            false
        }
    }
}
