//! Per-request phase timing.
//!
//! A `TraceContext` rides along in a request's execution context and is fed
//! by the transport at six lifecycle points: DNS start/done, TCP connect
//! start/done, TLS handshake start/done, first response byte, and request
//! fully written. The matching `RequestStats` handle is read by the host
//! after the send returns.
//!
//! Phases that never start report exactly zero. TTFB and request-write time
//! are measured since the trace was created, not since connect; hosts compare
//! against historical data recorded the same way, so this baseline is kept
//! deliberately.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Default)]
struct Phases {
    dns_start: Option<Instant>,
    connect_start: Option<Instant>,
    tls_start: Option<Instant>,
    dns: Duration,
    connect: Duration,
    tls: Duration,
    ttfb: Duration,
    wrote: Duration,
}

/// Mutable timing state attached to one in-flight request.
///
/// Events are dispatched synchronously by the transport. Only one send may
/// be in flight per context; the snapshot is read after that send completes,
/// so there is no cross-call race by construction.
#[derive(Debug)]
pub struct TraceContext {
    start: Instant,
    phases: Mutex<Phases>,
}

impl TraceContext {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            phases: Mutex::new(Phases::default()),
        }
    }

    pub fn dns_start(&self) {
        if let Ok(mut phases) = self.phases.lock() {
            phases.dns_start = Some(Instant::now());
        }
    }

    pub fn dns_done(&self) {
        if let Ok(mut phases) = self.phases.lock() {
            if let Some(started) = phases.dns_start {
                phases.dns = started.elapsed();
            }
        }
    }

    pub fn connect_start(&self) {
        if let Ok(mut phases) = self.phases.lock() {
            phases.connect_start = Some(Instant::now());
        }
    }

    pub fn connect_done(&self) {
        if let Ok(mut phases) = self.phases.lock() {
            if let Some(started) = phases.connect_start {
                phases.connect = started.elapsed();
            }
        }
    }

    pub fn tls_start(&self) {
        if let Ok(mut phases) = self.phases.lock() {
            phases.tls_start = Some(Instant::now());
        }
    }

    pub fn tls_done(&self) {
        if let Ok(mut phases) = self.phases.lock() {
            if let Some(started) = phases.tls_start {
                phases.tls = started.elapsed();
            }
        }
    }

    /// First response byte received. Elapsed since trace creation; fires at
    /// most once even when interim 1xx responses precede the final one.
    pub fn first_byte(&self) {
        if let Ok(mut phases) = self.phases.lock() {
            if phases.ttfb.is_zero() {
                phases.ttfb = self.start.elapsed();
            }
        }
    }

    /// Request fully written to the wire. Elapsed since trace creation.
    pub fn wrote_request(&self) {
        if let Ok(mut phases) = self.phases.lock() {
            phases.wrote = self.start.elapsed();
        }
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only handle to the timing of one traced request.
///
/// Returned by [`Request::attach_tracing`](crate::Request::attach_tracing);
/// snapshot after the send has completed.
#[derive(Debug, Clone)]
pub struct RequestStats {
    ctx: Arc<TraceContext>,
}

impl RequestStats {
    pub(crate) fn new(ctx: Arc<TraceContext>) -> Self {
        Self { ctx }
    }

    /// Snapshot the five phase durations as fractional seconds.
    pub fn snapshot(&self) -> StatsSnapshot {
        let phases = match self.ctx.phases.lock() {
            Ok(phases) => phases,
            Err(_) => return StatsSnapshot::default(),
        };
        StatsSnapshot {
            ttfb: phases.ttfb.as_secs_f64(),
            dns: phases.dns.as_secs_f64(),
            connect: phases.connect.as_secs_f64(),
            wrote: phases.wrote.as_secs_f64(),
            tls: phases.tls.as_secs_f64(),
        }
    }
}

/// Phase durations in fractional seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Time to first response byte, since trace creation.
    pub ttfb: f64,
    /// DNS resolution time.
    pub dns: f64,
    /// TCP connect time.
    pub connect: f64,
    /// Request fully written, since trace creation.
    pub wrote: f64,
    /// TLS handshake time.
    pub tls: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_untouched_phases_are_zero() {
        let ctx = Arc::new(TraceContext::new());
        let stats = RequestStats::new(ctx);
        let snap = stats.snapshot();
        assert_eq!(snap.ttfb, 0.0);
        assert_eq!(snap.dns, 0.0);
        assert_eq!(snap.connect, 0.0);
        assert_eq!(snap.wrote, 0.0);
        assert_eq!(snap.tls, 0.0);
    }

    #[test]
    fn test_done_without_start_stays_zero() {
        let ctx = Arc::new(TraceContext::new());
        ctx.dns_done();
        ctx.connect_done();
        ctx.tls_done();
        let snap = RequestStats::new(ctx).snapshot();
        assert_eq!(snap.dns, 0.0);
        assert_eq!(snap.connect, 0.0);
        assert_eq!(snap.tls, 0.0);
    }

    #[test]
    fn test_phase_duration_is_recorded() {
        let ctx = Arc::new(TraceContext::new());
        ctx.dns_start();
        sleep(Duration::from_millis(5));
        ctx.dns_done();
        let snap = RequestStats::new(ctx).snapshot();
        assert!(snap.dns >= 0.005);
        // Other phases untouched.
        assert_eq!(snap.connect, 0.0);
        assert_eq!(snap.tls, 0.0);
    }

    #[test]
    fn test_ttfb_measured_since_creation() {
        let ctx = Arc::new(TraceContext::new());
        sleep(Duration::from_millis(5));
        ctx.first_byte();
        let snap = RequestStats::new(ctx).snapshot();
        assert!(snap.ttfb >= 0.005);
    }

    #[test]
    fn test_first_byte_fires_once() {
        let ctx = Arc::new(TraceContext::new());
        ctx.first_byte();
        let first = RequestStats::new(Arc::clone(&ctx)).snapshot().ttfb;
        sleep(Duration::from_millis(5));
        ctx.first_byte();
        let second = RequestStats::new(ctx).snapshot().ttfb;
        assert_eq!(first, second);
    }

    #[test]
    fn test_wrote_measured_since_creation() {
        let ctx = Arc::new(TraceContext::new());
        sleep(Duration::from_millis(5));
        ctx.wrote_request();
        let snap = RequestStats::new(ctx).snapshot();
        assert!(snap.wrote >= 0.005);
    }
}
