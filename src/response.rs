//! Normalized HTTP response.

use bytes::Bytes;

use crate::error::{Error, Result};

/// Immutable response: status code, collapsed headers, full body.
///
/// Header collapsing keeps only the first value of each header name even when
/// the wire response carried several; this is a deliberate simplification of
/// the normalized view, not a protocol requirement.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Response {
    /// Build from raw wire headers, collapsing duplicates first-wins.
    pub fn from_raw(status: u16, raw_headers: Vec<(String, String)>, body: Bytes) -> Self {
        let mut headers: Vec<(String, String)> = Vec::with_capacity(raw_headers.len());
        for (name, value) in raw_headers {
            if !headers.iter().any(|(seen, _)| seen.eq_ignore_ascii_case(&name)) {
                headers.push((name, value));
            }
        }
        Self { status, headers, body }
    }

    /// Collapsed headers in wire order, one value per name.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Look up a header value case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| Error::protocol(format!("UTF-8 decode error: {}", e)))
    }

    /// Deserialize the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Error::from)
    }
}
