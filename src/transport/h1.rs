//! HTTP/1.1 wire codec.
//!
//! Uses httparse for response parsing and raw I/O for request formatting.
//! Connections are single-shot: the request carries `Connection: close`
//! unless the caller set the header, and the stream is dropped once the
//! body has been read, so no keep-alive bookkeeping exists here.

use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::error::{Error, Result};
use crate::request::Request;
use crate::trace::TraceContext;
use crate::transport::connector::MaybeTlsStream;

/// Maximum response header size (64KB).
const MAX_HEADERS_SIZE: usize = 64 * 1024;

/// Maximum number of headers to parse.
const MAX_HEADERS_COUNT: usize = 100;

/// Response as it came off the wire, duplicate headers intact.
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// Single-shot HTTP/1.1 connection.
pub struct Http1Conn {
    stream: MaybeTlsStream,
    trace: Option<Arc<TraceContext>>,
}

impl Http1Conn {
    pub fn new(stream: MaybeTlsStream, trace: Option<Arc<TraceContext>>) -> Self {
        Self { stream, trace }
    }

    /// Send the request and read the complete response.
    pub async fn send(&mut self, request: &Request) -> Result<RawResponse> {
        let head = serialize_request(request)?;
        self.stream
            .write_all(&head)
            .await
            .map_err(|e| Error::connection(format!("failed to write request: {}", e)))?;
        if let Some(body) = request.body() {
            self.stream
                .write_all(body)
                .await
                .map_err(|e| Error::connection(format!("failed to write body: {}", e)))?;
        }
        self.stream
            .flush()
            .await
            .map_err(|e| Error::connection(format!("failed to flush: {}", e)))?;
        if let Some(trace) = &self.trace {
            trace.wrote_request();
        }
        debug!(method = %request.method(), uri = %request.uri(), "request written");

        self.read_response(request.method()).await
    }

    /// Read and parse the response, skipping 1xx interim responses.
    async fn read_response(&mut self, method: &Method) -> Result<RawResponse> {
        let mut buffer: Vec<u8> = Vec::with_capacity(8192);

        loop {
            let headers_len = loop {
                if let Some(end) = find_header_end(&buffer) {
                    break end;
                }
                if buffer.len() >= MAX_HEADERS_SIZE {
                    return Err(Error::protocol("response headers too large"));
                }
                let n = self.fill(&mut buffer).await?;
                if n == 0 {
                    return Err(Error::protocol("connection closed before response complete"));
                }
            };

            let (status, headers) = parse_head(&buffer[..headers_len])?;

            // Interim responses have no body; the final response may already
            // be sitting in the buffer behind them.
            if (100..200).contains(&status) {
                buffer.drain(..headers_len);
                continue;
            }

            let initial = buffer.split_off(headers_len);
            let body = self.read_body(initial, status, method, &headers).await?;
            return Ok(RawResponse { status, headers, body });
        }
    }

    /// Read the message body according to RFC 9112 framing.
    async fn read_body(
        &mut self,
        initial: Vec<u8>,
        status: u16,
        method: &Method,
        headers: &[(String, String)],
    ) -> Result<Bytes> {
        // HEAD responses and 204/304 never carry a body.
        if matches!(status, 204 | 304) || *method == Method::HEAD {
            return Ok(Bytes::new());
        }

        let transfer_encoding = header_value(headers, "transfer-encoding");
        let is_chunked = transfer_encoding
            .map(|v| {
                v.split(',')
                    .next_back()
                    .map(|s| s.trim().eq_ignore_ascii_case("chunked"))
                    .unwrap_or(false)
            })
            .unwrap_or(false);

        if is_chunked {
            return self.read_chunked(initial).await;
        }
        // Transfer-Encoding overrides Content-Length.
        if transfer_encoding.is_some() {
            return self.read_until_close(initial).await;
        }
        if let Some(cl) = header_value(headers, "content-length") {
            let len = parse_content_length(cl)?;
            return self.read_fixed(initial, len).await;
        }
        self.read_until_close(initial).await
    }

    /// Read exactly `content_length` body bytes.
    async fn read_fixed(&mut self, initial: Vec<u8>, content_length: usize) -> Result<Bytes> {
        let mut body = initial;
        body.truncate(content_length);
        while body.len() < content_length {
            let n = self.fill(&mut body).await?;
            if n == 0 {
                return Err(Error::protocol(format!(
                    "connection closed before receiving full body (got {} of {} bytes)",
                    body.len(),
                    content_length
                )));
            }
        }
        body.truncate(content_length);
        Ok(Bytes::from(body))
    }

    /// Read until the server closes the connection.
    async fn read_until_close(&mut self, initial: Vec<u8>) -> Result<Bytes> {
        let mut body = initial;
        loop {
            let n = self.fill(&mut body).await?;
            if n == 0 {
                return Ok(Bytes::from(body));
            }
        }
    }

    /// Decode a chunked transfer-encoded body.
    async fn read_chunked(&mut self, initial: Vec<u8>) -> Result<Bytes> {
        let mut body = Vec::new();
        let mut buffer = initial;

        loop {
            let (chunk_size, line_end) = loop {
                if let Some(parsed) = find_chunk_size(&buffer) {
                    break parsed;
                }
                let n = self.fill(&mut buffer).await?;
                if n == 0 {
                    return Err(Error::protocol("connection closed while reading chunk size"));
                }
            };
            buffer.drain(..line_end);

            if chunk_size == 0 {
                // Trailer section follows; nothing in it is surfaced, it only
                // needs to be consumed up to the final empty line.
                self.consume_trailers(&mut buffer).await?;
                return Ok(Bytes::from(body));
            }

            let chunk_end = chunk_size + 2; // data + CRLF
            while buffer.len() < chunk_end {
                let n = self.fill(&mut buffer).await?;
                if n == 0 {
                    return Err(Error::protocol("connection closed while reading chunk data"));
                }
            }
            body.extend_from_slice(&buffer[..chunk_size]);
            buffer.drain(..chunk_end);
        }
    }

    async fn consume_trailers(&mut self, buffer: &mut Vec<u8>) -> Result<()> {
        loop {
            if let Some(pos) = find_crlf(buffer) {
                if pos == 0 {
                    buffer.drain(..2);
                    return Ok(());
                }
                buffer.drain(..pos + 2);
                continue;
            }
            let n = self.fill(buffer).await?;
            if n == 0 {
                // Connection closed; absent trailers are fine.
                return Ok(());
            }
        }
    }

    /// Read more bytes into `buffer`, firing the first-byte trace event on
    /// the first data that arrives.
    async fn fill(&mut self, buffer: &mut Vec<u8>) -> Result<usize> {
        let mut chunk = [0u8; 8192];
        let n = self
            .stream
            .read(&mut chunk)
            .await
            .map_err(|e| Error::connection(format!("failed to read response: {}", e)))?;
        if n > 0 {
            if let Some(trace) = &self.trace {
                trace.first_byte();
            }
            buffer.extend_from_slice(&chunk[..n]);
        }
        Ok(n)
    }
}

/// Serialize the request head (request line + headers) as bytes.
///
/// Origin-form target only; the Host header honors the virtual-host
/// override. `Connection: close` and `Content-Length` are appended unless
/// the caller set them.
pub fn serialize_request(request: &Request) -> Result<Vec<u8>> {
    for (name, value) in request.headers() {
        validate_header_name(name)?;
        validate_header_value(value)?;
    }

    let uri = request.uri();
    let mut head = Vec::with_capacity(1024);

    head.extend_from_slice(request.method().as_str().as_bytes());
    head.push(b' ');
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    head.extend_from_slice(path.as_bytes());
    head.extend_from_slice(b" HTTP/1.1\r\n");

    head.extend_from_slice(b"Host: ");
    match request.host_override() {
        Some(host) => head.extend_from_slice(host.as_bytes()),
        None => {
            if let Some(host) = uri.host() {
                head.extend_from_slice(host.as_bytes());
                if let Some(port) = uri.port() {
                    head.push(b':');
                    head.extend_from_slice(port.as_str().as_bytes());
                }
            }
        }
    }
    head.extend_from_slice(b"\r\n");

    let mut has_connection = false;
    let mut has_content_length = false;
    let mut has_transfer_encoding = false;
    for (name, value) in request.headers() {
        if name.eq_ignore_ascii_case("host") {
            continue;
        }
        has_connection |= name.eq_ignore_ascii_case("connection");
        has_content_length |= name.eq_ignore_ascii_case("content-length");
        has_transfer_encoding |= name.eq_ignore_ascii_case("transfer-encoding");
        head.extend_from_slice(name.as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }

    if !has_connection {
        head.extend_from_slice(b"Connection: close\r\n");
    }
    if let Some(body) = request.body() {
        if !has_content_length && !has_transfer_encoding {
            head.extend_from_slice(b"Content-Length: ");
            head.extend_from_slice(body.len().to_string().as_bytes());
            head.extend_from_slice(b"\r\n");
        }
    }
    head.extend_from_slice(b"\r\n");

    Ok(head)
}

/// Parse the status line and headers with httparse.
fn parse_head(head: &[u8]) -> Result<(u16, Vec<(String, String)>)> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS_COUNT];
    let mut response = httparse::Response::new(&mut headers);

    match response
        .parse(head)
        .map_err(|e| Error::protocol(format!("failed to parse response: {}", e)))?
    {
        httparse::Status::Complete(_) => {}
        httparse::Status::Partial => {
            return Err(Error::protocol("incomplete response headers"));
        }
    }

    let status = response
        .code
        .ok_or_else(|| Error::protocol("missing status code"))?;
    let headers = response
        .headers
        .iter()
        .filter(|h| !h.name.is_empty())
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    Ok((status, headers))
}

/// Find the end of HTTP headers (\r\n\r\n), returning the index past it.
fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// Find a header value by name, case-insensitively.
fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Parse a chunk-size line, returning (size, index past the CRLF).
fn find_chunk_size(buffer: &[u8]) -> Option<(usize, usize)> {
    let pos = find_crlf(buffer)?;
    let line = std::str::from_utf8(&buffer[..pos]).ok()?;
    // Chunk extensions after ';' are ignored.
    let size_part = line.split(';').next()?;
    let size = usize::from_str_radix(size_part.trim(), 16).ok()?;
    Some((size, pos + 2))
}

fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\r\n")
}

fn parse_content_length(value: &str) -> Result<usize> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::protocol(format!("invalid Content-Length: {:?}", value)));
    }
    trimmed
        .parse()
        .map_err(|_| Error::protocol(format!("invalid Content-Length: {:?}", value)))
}

/// Validate a header name per RFC 9110 Section 5.1 (token characters only).
fn validate_header_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(is_tchar) {
        return Err(Error::protocol(format!("invalid header name: {:?}", name)));
    }
    Ok(())
}

/// Reject CR/LF/NUL in header values (header injection).
fn validate_header_value(value: &str) -> Result<()> {
    if value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0) {
        return Err(Error::protocol(format!("invalid header value: {:?}", value)));
    }
    Ok(())
}

fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(method: &str, url: &str, body: Option<&'static [u8]>) -> Request {
        Request::new(method, url, body.map(Bytes::from_static), None).unwrap()
    }

    fn head_string(request: &Request) -> String {
        String::from_utf8(serialize_request(request).unwrap()).unwrap()
    }

    #[test]
    fn test_serialize_basic_get() {
        let head = head_string(&req("GET", "http://example.com/path?q=1", None));
        assert!(head.starts_with("GET /path?q=1 HTTP/1.1\r\n"));
        assert!(head.contains("Host: example.com\r\n"));
        assert!(head.contains("Connection: close\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_serialize_host_with_port() {
        let head = head_string(&req("GET", "http://example.com:8080/", None));
        assert!(head.contains("Host: example.com:8080\r\n"));
    }

    #[test]
    fn test_serialize_host_override() {
        let mut request = req("GET", "http://10.0.0.1/", None);
        request.set_host("internal.example.com");
        let head = head_string(&request);
        assert!(head.contains("Host: internal.example.com\r\n"));
        assert!(!head.contains("Host: 10.0.0.1"));
    }

    #[test]
    fn test_serialize_adds_content_length() {
        let head = head_string(&req("POST", "http://example.com/", Some(b"hello")));
        assert!(head.contains("Content-Length: 5\r\n"));
    }

    #[test]
    fn test_serialize_respects_user_connection_header() {
        let mut request = req("GET", "http://example.com/", None);
        request.set_header("Connection", "keep-alive");
        let head = head_string(&request);
        assert!(head.contains("Connection: keep-alive\r\n"));
        assert!(!head.contains("Connection: close"));
    }

    #[test]
    fn test_serialize_rejects_header_injection() {
        let mut request = req("GET", "http://example.com/", None);
        request.set_header("X-Bad", "value\r\nEvil: injected");
        assert!(serialize_request(&request).is_err());
    }

    #[test]
    fn test_find_header_end() {
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
        assert_eq!(find_header_end(data), Some(38));

        let partial = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n";
        assert_eq!(find_header_end(partial), None);
    }

    #[test]
    fn test_find_chunk_size() {
        assert_eq!(find_chunk_size(b"5\r\nhello"), Some((5, 3)));
        assert_eq!(find_chunk_size(b"a\r\n0123456789"), Some((10, 3)));
        assert_eq!(find_chunk_size(b"0\r\n"), Some((0, 3)));
        assert_eq!(find_chunk_size(b"5;ext=val\r\ndata"), Some((5, 11)));
        assert_eq!(find_chunk_size(b"5"), None);
    }

    #[test]
    fn test_parse_head_collects_headers() {
        let (status, headers) =
            parse_head(b"HTTP/1.1 404 Not Found\r\nX-A: 1\r\nX-B: 2\r\n\r\n").unwrap();
        assert_eq!(status, 404);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0], ("X-A".to_string(), "1".to_string()));
    }

    #[test]
    fn test_parse_content_length() {
        assert_eq!(parse_content_length("0").unwrap(), 0);
        assert_eq!(parse_content_length(" 42 ").unwrap(), 42);
        assert!(parse_content_length("-1").is_err());
        assert!(parse_content_length("abc").is_err());
        assert!(parse_content_length("").is_err());
    }

    #[test]
    fn test_validate_header_name() {
        assert!(validate_header_name("Content-Type").is_ok());
        assert!(validate_header_name("x-foo-123").is_ok());
        assert!(validate_header_name("").is_err());
        assert!(validate_header_name("Content Type").is_err());
        assert!(validate_header_name("Content:Type").is_err());
    }

    #[test]
    fn test_validate_header_value() {
        assert!(validate_header_value("application/json; charset=utf-8").is_ok());
        assert!(validate_header_value("").is_ok());
        assert!(validate_header_value("bad\r\nheader").is_err());
        assert!(validate_header_value("bad\x00header").is_err());
    }
}
