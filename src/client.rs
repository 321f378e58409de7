//! Request executor.
//!
//! Issues a borrowed [`Request`] over a fresh connection, reads the entire
//! response body, and produces a normalized [`Response`] while recording byte
//! and request counters into the session metrics store. No pooling, no
//! retries, no redirect following.

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metrics::{self, MetricsStore};
use crate::request::Request;
use crate::response::Response;
use crate::timeouts::Timeouts;
use crate::transport::connector::Connector;
use crate::transport::h1::Http1Conn;

/// HTTP client executor.
pub struct Client {
    connector: Connector,
    timeouts: Timeouts,
    metrics: Option<MetricsStore>,
}

impl Client {
    /// Create a client with the default API timeouts.
    pub fn new(metrics: Option<MetricsStore>) -> Self {
        Self::with_timeouts(metrics, Timeouts::api_defaults())
    }

    /// Create a client with explicit timeouts.
    pub fn with_timeouts(metrics: Option<MetricsStore>, timeouts: Timeouts) -> Self {
        Self {
            connector: Connector::new(),
            timeouts,
            metrics,
        }
    }

    /// Send the request and read the full response.
    ///
    /// The `http.req_num` counter is incremented before the send is
    /// attempted, so it counts failed sends too. On success the response
    /// body length is added to `http.receive`.
    pub async fn do_request(&self, request: &Request) -> Result<Response> {
        metrics::add(self.metrics.as_ref(), metrics::REQUESTS_ISSUED, 1.0);

        let result = match self.timeouts.total {
            Some(deadline) => timeout(deadline, self.execute(request))
                .await
                .map_err(|_| Error::TotalTimeout(deadline))?,
            None => self.execute(request).await,
        };

        if let Err(err) = &result {
            warn!(uri = %request.uri(), error = %err, "request failed");
        }
        result
    }

    async fn execute(&self, request: &Request) -> Result<Response> {
        let trace = request.trace();

        let dial = self
            .connector
            .connect(request.uri(), request.host_override(), trace.map(|t| t.as_ref()));
        let stream = match self.timeouts.connect {
            Some(deadline) => timeout(deadline, dial)
                .await
                .map_err(|_| Error::ConnectTimeout(deadline))??,
            None => dial.await?,
        };

        let mut conn = Http1Conn::new(stream, trace.cloned());
        let raw = conn.send(request).await?;

        metrics::add(
            self.metrics.as_ref(),
            metrics::BYTES_RECEIVED,
            raw.body.len() as f64,
        );
        debug!(
            uri = %request.uri(),
            status = raw.status,
            bytes = raw.body.len(),
            "request complete"
        );

        Ok(Response::from_raw(raw.status, raw.headers, raw.body))
    }
}
