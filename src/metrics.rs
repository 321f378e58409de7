//! Session-scoped counter store.
//!
//! A `MetricsStore` maps counter names to floating-point accumulators and is
//! shared across every request issued during one host session. The handle is
//! explicitly passed rather than reachable through global state, so multiple
//! independent sessions can coexist. Callers that have no store pass `None`
//! to the free functions, which then silently do nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Bytes queued to send, recorded at request construction time.
pub const BYTES_QUEUED: &str = "http.send";

/// Bytes received, recorded after the full response body is read.
pub const BYTES_RECEIVED: &str = "http.receive";

/// Requests issued, incremented once per `do_request` call regardless of
/// outcome.
pub const REQUESTS_ISSUED: &str = "http.req_num";

/// Shared counter store for one host session.
///
/// Cloning is cheap and clones observe the same counters. The map is
/// mutex-guarded so a multi-threaded host cannot corrupt it; under the
/// single-threaded usage contract the lock is never contended.
#[derive(Debug, Clone, Default)]
pub struct MetricsStore {
    counters: Arc<Mutex<HashMap<String, f64>>>,
}

impl MetricsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to the named counter, treating a missing key as zero.
    pub fn add(&self, name: &str, delta: f64) {
        if let Ok(mut counters) = self.counters.lock() {
            *counters.entry(name.to_string()).or_insert(0.0) += delta;
        }
    }

    /// Unconditionally overwrite the named counter.
    pub fn set(&self, name: &str, value: f64) {
        if let Ok(mut counters) = self.counters.lock() {
            counters.insert(name.to_string(), value);
        }
    }

    /// Read a single counter.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.counters.lock().ok()?.get(name).copied()
    }

    /// Copy out all counters for host inspection.
    pub fn snapshot(&self) -> HashMap<String, f64> {
        self.counters
            .lock()
            .map(|counters| counters.clone())
            .unwrap_or_default()
    }
}

/// Add to a counter if a store is present; no-op otherwise.
pub fn add(store: Option<&MetricsStore>, name: &str, delta: f64) {
    if let Some(store) = store {
        store.add(name, delta);
    }
}

/// Set a counter if a store is present; no-op otherwise.
pub fn set(store: Option<&MetricsStore>, name: &str, value: f64) {
    if let Some(store) = store {
        store.set(name, value);
    }
}
