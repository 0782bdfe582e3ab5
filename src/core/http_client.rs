//! # HTTP Client Factory
//!
//! Centralized reqwest client construction so every gateway call shares one
//! pooled client with consistent timeout and compression settings. The client
//! is stateless across calls and safe to reuse from concurrent in-flight
//! requests.

use crate::config::Config;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// HTTP client configuration errors
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("Failed to build HTTP client: {0}")]
    BuildError(#[from] reqwest::Error),
}

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub keepalive: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            keepalive: Some(Duration::from_secs(60)),
        }
    }
}

/// HTTP client builder with configurable options.
pub struct HttpClientBuilder {
    timeout: Duration,
    connect_timeout: Duration,
    pool: PoolConfig,
    compression: bool,
}

impl HttpClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool: PoolConfig::default(),
            compression: true,
        }
    }

    /// Derive client settings from the application configuration. The total
    /// request timeout must cover a full streaming response, so it uses the
    /// upstream timeout rather than a short per-call budget.
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.upstream_timeout),
            connect_timeout: Duration::from_secs(10),
            pool: PoolConfig::default(),
            compression: true,
        }
    }

    /// Set the total request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable response compression.
    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client, HttpClientError> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(self.pool.max_idle_per_host)
            .pool_idle_timeout(self.pool.idle_timeout);

        if let Some(keepalive) = self.pool.keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        if self.compression {
            builder = builder.gzip(true).brotli(true);
        }

        builder.build().map_err(HttpClientError::from)
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_client_builds() {
        let client = HttpClientBuilder::new().build().unwrap();
        assert!(client.get("https://api.x.ai/v1/models").build().is_ok());
    }

    #[test]
    fn test_client_from_config() {
        let config = crate::config::Config::for_test();
        let client = HttpClientBuilder::from_config(&config).build().unwrap();
        assert!(client.get("http://localhost:8000/v1").build().is_ok());
    }

    #[test]
    fn test_custom_timeout() {
        let client = HttpClientBuilder::new()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .compression(false)
            .build()
            .unwrap();
        assert!(client.get("https://api.x.ai/v1/models").build().is_ok());
    }
}
