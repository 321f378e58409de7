//! Network diagnostics: DNS lookup with timeout, ICMP ping with RTT
//! statistics.
//!
//! Both operations follow the executor's timeout discipline: bounded,
//! blocking from the caller's perspective, and returning either a complete
//! result or an error; partial diagnostic data is never returned.

use std::net::IpAddr;
use std::time::Duration;

use rand::random;
use surge_ping::{Client as IcmpClient, Config, PingIdentifier, PingSequence, ICMP};
use tokio::net::lookup_host;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};

/// Default deadline for `dns_lookup`.
pub const DNS_LOOKUP_TIMEOUT: Duration = Duration::from_secs(1);

/// Fixed overall budget for one `ping` run.
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Probe count bounds for `ping`.
const PING_COUNT_MIN: u32 = 1;
const PING_COUNT_MAX: u32 = 3;

/// Resolve a domain to its addresses, bounded by `timeout` (default 1s).
///
/// An empty domain fails immediately without attempting resolution. On
/// timeout or resolution failure the error is returned with no partial
/// results.
pub async fn dns_lookup(domain: &str, deadline: Option<Duration>) -> Result<Vec<String>> {
    if domain.is_empty() {
        return Err(Error::dns("no domain given"));
    }
    let deadline = deadline.unwrap_or(DNS_LOOKUP_TIMEOUT);

    let resolved = timeout(deadline, lookup_host((domain, 0)))
        .await
        .map_err(|_| Error::timeout(format!("lookup {} after {:?}", domain, deadline)))?
        .map_err(|e| Error::dns(format!("lookup {}: {}", domain, e)))?;

    let mut addrs: Vec<String> = Vec::new();
    for addr in resolved {
        let ip = addr.ip().to_string();
        if !addrs.contains(&ip) {
            addrs.push(ip);
        }
    }
    if addrs.is_empty() {
        return Err(Error::dns(format!("lookup {}: no addresses", domain)));
    }
    debug!(domain, count = addrs.len(), "resolved");
    Ok(addrs)
}

/// Result of one bounded ping run. Produced atomically at the end of the
/// run; never partially visible.
#[derive(Debug, Clone)]
pub struct PingReport {
    /// Resolved IP address probed.
    pub ip: IpAddr,
    /// Target as given by the caller.
    pub addr: String,
    pub pkt_send: u32,
    pub pkt_recv: u32,
    /// The prober resolves each sequence number at most once, so duplicate
    /// replies are not observed; the field stays for the host contract.
    pub pkt_recv_dup: u32,
    /// Packet loss as a percentage, 0-100.
    pub pkt_loss: f64,
    /// Observed round trips, in arrival order.
    pub rtts: Vec<Duration>,
    pub rtt_min: Duration,
    pub rtt_avg: Duration,
    pub rtt_max: Duration,
}

/// ICMP echo probe with round-trip statistics.
///
/// `count` is clamped to `[1, 3]`. The whole run fits a fixed 5-second
/// budget; each probe gets an equal share of it, so an unresponsive target
/// yields a full report with 100% loss rather than an error. Requires
/// raw-socket privileges.
pub async fn ping(target: &str, count: u32) -> Result<PingReport> {
    if target.is_empty() {
        return Err(Error::ping("no domain or ip given"));
    }
    let count = count.clamp(PING_COUNT_MIN, PING_COUNT_MAX);

    let ip = resolve_target(target).await?;
    let config = match ip {
        IpAddr::V4(_) => Config::default(),
        IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
    };
    let client =
        IcmpClient::new(&config).map_err(|e| Error::ping(format!("create prober: {}", e)))?;

    let mut pinger = client.pinger(ip, PingIdentifier(random())).await;
    pinger.timeout(PING_TIMEOUT / count);

    let payload = [0u8; 56];
    let mut rtts = Vec::with_capacity(count as usize);
    for seq in 0..count {
        match pinger.ping(PingSequence(seq as u16), &payload).await {
            Ok((_packet, rtt)) => rtts.push(rtt),
            Err(e) => debug!(target, seq, error = %e, "probe lost"),
        }
    }

    let pkt_recv = rtts.len() as u32;
    let pkt_loss = f64::from(count - pkt_recv) / f64::from(count) * 100.0;
    let (rtt_min, rtt_avg, rtt_max) = rtt_stats(&rtts);

    Ok(PingReport {
        ip,
        addr: target.to_string(),
        pkt_send: count,
        pkt_recv,
        pkt_recv_dup: 0,
        pkt_loss,
        rtts,
        rtt_min,
        rtt_avg,
        rtt_max,
    })
}

async fn resolve_target(target: &str) -> Result<IpAddr> {
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }
    let mut resolved = timeout(PING_TIMEOUT, lookup_host((target, 0)))
        .await
        .map_err(|_| Error::timeout(format!("lookup {} after {:?}", target, PING_TIMEOUT)))?
        .map_err(|e| Error::ping(format!("lookup {}: {}", target, e)))?;
    resolved
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| Error::ping(format!("lookup {}: no addresses", target)))
}

fn rtt_stats(rtts: &[Duration]) -> (Duration, Duration, Duration) {
    if rtts.is_empty() {
        return (Duration::ZERO, Duration::ZERO, Duration::ZERO);
    }
    let mut min = rtts[0];
    let mut max = rtts[0];
    let mut sum = Duration::ZERO;
    for rtt in rtts {
        min = min.min(*rtt);
        max = max.max(*rtt);
        sum += *rtt;
    }
    (min, sum / rtts.len() as u32, max)
}
