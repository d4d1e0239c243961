//! Error types for the fetch client and cache store
//!
//! Provides unified error handling using thiserror. Only [`FetchError`] is ever
//! returned to callers of a fetch; [`StoreError`] stays inside the cache path.

use thiserror::Error;

use crate::provider::DecodeError;

// == Fetch Error Enum ==
/// Error returned by [`ApiProvider::fetch`](crate::provider::ApiProvider::fetch).
#[derive(Error, Debug)]
pub enum FetchError {
    /// Response status outside the accepted range
    #[error("Unexpected status code: {0}")]
    StatusCode(u16),

    /// Accepted status but the response carried no body
    #[error("Response body was empty")]
    EmptyPayload,

    /// Connection-level failure reported by the transport
    #[error("Transport failure: {0}")]
    Transport(#[source] TransportError),

    /// Network payload could not be decoded into the requested type
    #[error("Decoding failed: {0}")]
    Decoding(#[from] DecodeError),

    /// Request could not be resolved from base URL, endpoint and query
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// Anything outside the kinds above
    #[error("Unexpected error: {0}")]
    Unexpected(anyhow::Error),
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connection(_) => FetchError::Transport(err),
            TransportError::Other(inner) => FetchError::Unexpected(inner),
        }
    }
}

// == Transport Error Enum ==
/// Failure raised by a [`Transport`](crate::provider::Transport) implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Could not connect, timed out, or the connection dropped
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Protocol-level failure that is not a connection problem
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Other(err.into())
        }
    }
}

// == Request Error Enum ==
/// Input-contract violation detected while building a request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Base URL or endpoint does not form a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Base URL cannot carry path segments (e.g. `mailto:`)
    #[error("Base URL cannot be a base: {0}")]
    CannotBeBase(String),

    /// Query value has no string representation
    #[error("Query parameter `{name}` has no string representation")]
    InvalidQueryValue { name: String },
}

// == Store Error Enum ==
/// Internal failure of the cache store. Never surfaced through a fetch.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Snapshot file could not be read or written
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Background writer is gone (runtime shut down)
    #[error("Cache writer is not running")]
    WriterClosed,

    /// Store was opened outside a tokio runtime, so no writer could be spawned
    #[error("Cache store must be opened inside a tokio runtime")]
    NoRuntime,
}

// == Result Type Aliases ==
/// Convenience Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Result type for cache store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
