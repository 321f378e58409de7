//! # tracewire
//!
//! Embeddable HTTP request toolkit with per-phase connection timing and
//! network diagnostics, designed to be driven by a host environment
//! (scripting interpreter, test harness, agent runtime).
//!
//! Three capabilities share one timeout and error-reporting discipline:
//!
//! - Request construction and execution with optional phase tracing (DNS,
//!   TCP connect, TLS handshake, first byte, request written).
//! - `multipart/form-data` bodies built from declarative file/field
//!   descriptors with strict ordering and first-failure abort.
//! - Diagnostics: DNS lookup with timeout, ICMP ping with RTT statistics.
//!
//! Cross-request byte and operation counters accumulate in an explicitly
//! passed [`MetricsStore`], one per host session.
//!
//! ```rust,ignore
//! use tracewire::{Client, MetricsStore, Request};
//!
//! let store = MetricsStore::new();
//! let client = Client::new(Some(store.clone()));
//!
//! let req = Request::new("GET", "https://example.com/", None, Some(&store))?;
//! let (req, stats) = req.attach_tracing();
//! let resp = client.do_request(&req).await?;
//!
//! println!("{} in {:.3}s", resp.status, stats.snapshot().ttfb);
//! println!("received {:?} bytes total", store.get("http.receive"));
//! ```

pub mod auth;
pub mod client;
pub mod diag;
pub mod error;
pub mod metrics;
pub mod multipart;
pub mod request;
pub mod response;
pub mod timeouts;
pub mod trace;
pub mod transport;

// Re-exports
pub use client::Client;
pub use diag::{dns_lookup, ping, PingReport};
pub use error::{Error, Result};
pub use metrics::MetricsStore;
pub use multipart::FilePart;
pub use request::Request;
pub use response::Response;
pub use timeouts::Timeouts;
pub use trace::{RequestStats, StatsSnapshot};
