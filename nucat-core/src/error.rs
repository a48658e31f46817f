//! Catalog error types
//!
//! Every failure in a catalog read is fatal to that read. Nothing here is
//! retried or skipped; callers that want resilience wrap the read themselves.

use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

/// Result alias used throughout the catalog reader
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Failure reported by a [`Transport`](crate::transport::Transport)
#[derive(Error, Debug)]
pub enum TransportError {
    /// Server answered with a non-success status
    #[error("HTTP {status}")]
    Status { status: u16 },

    /// Request did not complete in time
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS or body read failure
    #[error("{0}")]
    Network(String),
}

/// Catalog read errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Fetching a document failed
    #[error("Failed to fetch {uri}: {source}")]
    Transport {
        uri: Url,
        #[source]
        source: TransportError,
    },

    /// The catalog index document is structurally invalid
    #[error("Malformed catalog index {uri}: {reason}")]
    MalformedIndex { uri: Url, reason: String },

    /// A catalog page document is structurally invalid
    #[error("Malformed catalog page {uri}: {reason}")]
    MalformedPage { uri: Url, reason: String },

    /// A commit timestamp is not a strict RFC 3339 timestamp
    #[error("Invalid commit timestamp '{value}' in {uri}")]
    InvalidTimestamp { uri: Url, value: String },

    /// A package version could not be parsed
    #[error("Invalid package version '{value}' in {uri}: {reason}")]
    InvalidVersion {
        uri: Url,
        value: String,
        reason: String,
    },

    /// A package id or uri value could not be parsed
    #[error("Invalid {field} '{value}' in {uri}")]
    InvalidId {
        uri: Url,
        field: &'static str,
        value: String,
    },

    /// Window start lies after its end
    #[error("Invalid time window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Concurrency cap must allow at least one fetch
    #[error("Maximum concurrency must be at least 1")]
    InvalidConcurrency,

    /// The read was cancelled before it completed
    #[error("Catalog read cancelled")]
    Cancelled,
}

impl CatalogError {
    /// Whether the failure came from the network rather than catalog content
    pub fn is_transport(&self) -> bool {
        matches!(self, CatalogError::Transport { .. })
    }

    /// Page uri or index uri the error refers to, if any
    pub fn uri(&self) -> Option<&Url> {
        match self {
            CatalogError::Transport { uri, .. }
            | CatalogError::MalformedIndex { uri, .. }
            | CatalogError::MalformedPage { uri, .. }
            | CatalogError::InvalidTimestamp { uri, .. }
            | CatalogError::InvalidVersion { uri, .. }
            | CatalogError::InvalidId { uri, .. } => Some(uri),
            CatalogError::InvalidWindow { .. }
            | CatalogError::InvalidConcurrency
            | CatalogError::Cancelled => None,
        }
    }
}
