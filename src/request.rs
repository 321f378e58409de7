//! Mutable HTTP request model.
//!
//! A `Request` is owned by the caller and mutated in place by the builder
//! operations; the executor borrows it for one send. The body is a cheap
//! re-readable `Bytes`, so the same request may be sent multiple times.

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Uri};

use crate::auth;
use crate::error::{Error, Result};
use crate::metrics::{self, MetricsStore};
use crate::trace::{RequestStats, TraceContext};

/// Default identification header value set on every constructed request.
pub const DEFAULT_USER_AGENT: &str = concat!("tracewire/", env!("CARGO_PKG_VERSION"));

/// A mutable HTTP request: method, URL, headers, optional body, and an
/// optional attached trace context.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
    host_override: Option<String>,
    trace: Option<Arc<TraceContext>>,
}

impl Request {
    /// Construct a request.
    ///
    /// Fails when the URL or method cannot be parsed. On success the default
    /// `User-Agent` identification header is set. When a body is supplied its
    /// byte length is added to the `http.send` counter at construction time
    /// (not at send time).
    pub fn new(
        method: &str,
        url: &str,
        body: Option<Bytes>,
        metrics: Option<&MetricsStore>,
    ) -> Result<Self> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| Error::invalid_request(format!("bad method {:?}", method)))?;

        // Validate through url first (catches relative URLs and bad hosts),
        // then convert to the Uri the transport works with.
        let parsed = url::Url::parse(url)?;
        let uri: Uri = parsed
            .as_str()
            .parse()
            .map_err(|e| Error::invalid_request(format!("bad URL {:?}: {}", url, e)))?;

        if let Some(body) = &body {
            metrics::add(metrics, metrics::BYTES_QUEUED, body.len() as f64);
        }

        let mut request = Self {
            method,
            uri,
            headers: Vec::new(),
            body,
            host_override: None,
            trace: None,
        };
        request.set_header("User-Agent", DEFAULT_USER_AGENT);
        Ok(request)
    }

    /// Set RFC 7617 Basic Auth credentials in the Authorization header.
    pub fn set_basic_auth(&mut self, username: &str, password: &str) {
        let value = auth::basic_auth(username, password);
        self.set_header("Authorization", &value);
    }

    /// Override the virtual host used for the request, distinct from the
    /// dial target. Applies to the Host header and the TLS server name.
    pub fn set_host(&mut self, host: &str) {
        self.host_override = Some(host.to_string());
    }

    /// Set a header, overwriting any existing value case-insensitively.
    pub fn set_header(&mut self, key: &str, value: &str) {
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
        {
            existing.1 = value.to_string();
        } else {
            self.headers.push((key.to_string(), value.to_string()));
        }
    }

    /// Attach phase-timing instrumentation.
    ///
    /// The original request is not mutated; the returned request shares all
    /// fields but carries the trace context, and the returned stats handle is
    /// read after the send completes.
    pub fn attach_tracing(&self) -> (Request, RequestStats) {
        let ctx = Arc::new(TraceContext::new());
        let mut traced = self.clone();
        traced.trace = Some(Arc::clone(&ctx));
        (traced, RequestStats::new(ctx))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Headers in insertion order, including the default User-Agent.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Look up a header value case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn host_override(&self) -> Option<&str> {
        self.host_override.as_deref()
    }

    pub(crate) fn trace(&self) -> Option<&Arc<TraceContext>> {
        self.trace.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricsStore, BYTES_QUEUED};

    #[test]
    fn test_new_sets_default_user_agent_only() {
        let req = Request::new("GET", "http://example.com/", None, None).unwrap();
        assert_eq!(req.header("user-agent"), Some(DEFAULT_USER_AGENT));
        assert_eq!(req.headers().len(), 1);
    }

    #[test]
    fn test_headers_are_exactly_caller_entries_plus_default() {
        let mut req = Request::new("GET", "http://example.com/", None, None).unwrap();
        req.set_header("X-One", "1");
        req.set_header("X-Two", "2");
        assert_eq!(req.headers().len(), 3);
        assert_eq!(req.header("X-One"), Some("1"));
        assert_eq!(req.header("X-Two"), Some("2"));
    }

    #[test]
    fn test_set_header_case_insensitive_overwrite() {
        let mut req = Request::new("GET", "http://example.com/", None, None).unwrap();
        req.set_header("X-Token", "first");
        req.set_header("x-token", "second");
        assert_eq!(req.header("X-TOKEN"), Some("second"));
        // One User-Agent plus one X-Token, no duplicate.
        assert_eq!(req.headers().len(), 2);
    }

    #[test]
    fn test_set_basic_auth() {
        let mut req = Request::new("GET", "http://example.com/", None, None).unwrap();
        req.set_basic_auth("Aladdin", "open sesame");
        assert_eq!(
            req.header("Authorization"),
            Some("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==")
        );
    }

    #[test]
    fn test_set_host() {
        let mut req = Request::new("GET", "http://10.0.0.1/", None, None).unwrap();
        req.set_host("internal.example.com");
        assert_eq!(req.host_override(), Some("internal.example.com"));
    }

    #[test]
    fn test_bad_url_is_construction_error() {
        assert!(Request::new("GET", "not a url", None, None).is_err());
        assert!(Request::new("GET", "/relative/only", None, None).is_err());
    }

    #[test]
    fn test_bad_method_is_construction_error() {
        assert!(Request::new("", "http://example.com/", None, None).is_err());
        assert!(Request::new("GE T", "http://example.com/", None, None).is_err());
    }

    #[test]
    fn test_body_length_queued_at_construction() {
        let store = MetricsStore::new();
        let _req = Request::new(
            "POST",
            "http://example.com/",
            Some(Bytes::from_static(b"hello")),
            Some(&store),
        )
        .unwrap();
        assert_eq!(store.get(BYTES_QUEUED), Some(5.0));
    }

    #[test]
    fn test_no_body_queues_nothing() {
        let store = MetricsStore::new();
        let _req = Request::new("GET", "http://example.com/", None, Some(&store)).unwrap();
        assert_eq!(store.get(BYTES_QUEUED), None);
    }

    #[test]
    fn test_attach_tracing_does_not_mutate_original() {
        let req = Request::new("GET", "http://example.com/", None, None).unwrap();
        let (traced, _stats) = req.attach_tracing();
        assert!(req.trace().is_none());
        assert!(traced.trace().is_some());
        assert_eq!(traced.headers(), req.headers());
    }
}
