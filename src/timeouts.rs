//! Timeout configuration for request execution.
//!
//! Two deadlines cover the phases this crate has:
//!
//! - **connect**: DNS + TCP + TLS handshake. Does not reset.
//! - **total**: absolute deadline for the entire request lifecycle.
//!
//! Cancellation is timeout-based only; there is no explicit cancel-from-
//! outside primitive.

use std::time::Duration;

/// Timeout configuration for HTTP requests.
///
/// All timeouts are optional. When `None`, no timeout is applied for that
/// phase.
#[derive(Clone, Debug, Default)]
pub struct Timeouts {
    /// Timeout for establishing the connection (DNS + TCP + TLS handshake).
    pub connect: Option<Duration>,

    /// Total request deadline: absolute time limit for connect + send + read.
    pub total: Option<Duration>,
}

impl Timeouts {
    /// Create a new Timeouts with all timeouts set to None.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensible defaults for normal API calls.
    ///
    /// - connect: 10s
    /// - total: 120s
    pub fn api_defaults() -> Self {
        Self {
            connect: Some(Duration::from_secs(10)),
            total: Some(Duration::from_secs(120)),
        }
    }

    /// Set connect timeout.
    pub fn connect(mut self, timeout: Duration) -> Self {
        self.connect = Some(timeout);
        self
    }

    /// Set total request deadline.
    pub fn total(mut self, timeout: Duration) -> Self {
        self.total = Some(timeout);
        self
    }

    /// Disable connect timeout.
    pub fn no_connect_timeout(mut self) -> Self {
        self.connect = None;
        self
    }

    /// Disable total timeout.
    pub fn no_total_timeout(mut self) -> Self {
        self.total = None;
        self
    }
}
