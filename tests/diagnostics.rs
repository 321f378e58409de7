//! DNS lookup diagnostics tests.
//!
//! ICMP probing needs raw-socket privileges, so ping coverage here sticks to
//! the argument-validation paths; the clamp and statistics logic has unit
//! tests next to the implementation.

use std::time::{Duration, Instant};

use tracewire::{dns_lookup, ping, Error};

#[tokio::test]
async fn test_empty_domain_fails_immediately() {
    let started = Instant::now();
    let err = dns_lookup("", None).await.unwrap_err();
    assert!(matches!(err, Error::Dns(_)));
    // No resolution was attempted.
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn test_localhost_resolves() {
    let addrs = dns_lookup("localhost", None).await.unwrap();
    assert!(!addrs.is_empty());
    assert!(addrs.iter().any(|a| a == "127.0.0.1" || a == "::1"));
}

#[tokio::test]
async fn test_explicit_timeout_is_honored() {
    let addrs = dns_lookup("localhost", Some(Duration::from_secs(2))).await.unwrap();
    assert!(!addrs.is_empty());
}

#[tokio::test]
async fn test_unresolvable_domain_is_error_not_partial() {
    // RFC 2606 reserves .invalid; resolution must fail or time out, and
    // either way no partial sequence comes back.
    let result = dns_lookup("does-not-exist.invalid", Some(Duration::from_secs(1))).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_ping_empty_target_is_error() {
    let err = ping("", 3).await.unwrap_err();
    assert!(matches!(err, Error::Ping(_)));
}
