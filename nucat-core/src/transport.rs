//! Catalog transport - Abstraction over HTTP
//!
//! The reader never talks to the network directly. Every document is fetched
//! through a [`Transport`], which lets callers layer caching or retries on top
//! and lets tests substitute in-memory catalogs.

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;

/// Fetches raw catalog documents
///
/// Implementations are shared across concurrent fetches and must be safe to
/// call from many tasks at once. A call is a single GET with no retries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the body of `uri`
    async fn get(&self, uri: &Url) -> Result<Vec<u8>, TransportError>;

    /// Transport identifier for logging
    fn name(&self) -> &'static str;
}

#[cfg(feature = "http")]
pub use self::http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use anyhow::{Context, Result};
    use async_trait::async_trait;
    use std::time::Duration;
    use tracing::debug;
    use url::Url;

    use super::Transport;
    use crate::config::CatalogConfig;
    use crate::error::TransportError;

    /// Plain HTTPS GET transport backed by reqwest
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: reqwest::Client,
    }

    impl HttpTransport {
        /// Build a transport from the configured timeout and user agent
        pub fn from_config(config: &CatalogConfig) -> Result<Self> {
            let client = reqwest::Client::builder()
                .user_agent(config.user_agent.as_str())
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .context("Failed to create HTTP client")?;

            Ok(Self { client })
        }

        /// Wrap an existing client, e.g. one with a caching middleware
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn get(&self, uri: &Url) -> Result<Vec<u8>, TransportError> {
            debug!("GET {}", uri);

            let response = self
                .client
                .get(uri.clone())
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                });
            }

            let body = response.bytes().await.map_err(map_reqwest_error)?;
            Ok(body.to_vec())
        }

        fn name(&self) -> &'static str {
            "http"
        }
    }

    fn map_reqwest_error(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(err.to_string())
        }
    }
}
