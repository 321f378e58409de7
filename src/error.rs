//! Error types for the tracewire crate.

use std::io;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during request construction, execution, or
/// diagnostics.
///
/// Every variant renders a human-readable message; hosts that only forward
/// strings can call `to_string()` and lose nothing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request could not be constructed (bad method, unsupported scheme, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Multipart file descriptor or file access error.
    #[error("file error: {0}")]
    File(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// DNS resolution error.
    #[error("DNS error: {0}")]
    Dns(String),

    /// Connection error (refused, unreachable, reset).
    #[error("connection error: {0}")]
    Connection(String),

    /// TLS/SSL error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// HTTP protocol error (malformed response, bad framing).
    #[error("HTTP protocol error: {0}")]
    Protocol(String),

    /// Generic timeout error.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Connect timeout (DNS + TCP + TLS handshake).
    #[error("connect timeout after {0:?}")]
    ConnectTimeout(Duration),

    /// Total request deadline exceeded.
    #[error("total request deadline exceeded after {0:?}")]
    TotalTimeout(Duration),

    /// ICMP ping error.
    #[error("ping error: {0}")]
    Ping(String),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a file error.
    pub fn file(message: impl Into<String>) -> Self {
        Self::File(message.into())
    }

    /// Create a DNS error.
    pub fn dns(message: impl Into<String>) -> Self {
        Self::Dns(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an HTTP protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a ping error.
    pub fn ping(message: impl Into<String>) -> Self {
        Self::Ping(message.into())
    }
}
