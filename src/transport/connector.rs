//! Connection establishment: DNS resolution, TCP connect, TLS handshake.
//!
//! Each phase reports start/done to the attached trace context. Direct-IP
//! dials skip DNS entirely, so the DNS phase stays at zero for them.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Uri;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{lookup_host, TcpStream};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::error::{Error, Result};
use crate::trace::TraceContext;

/// Dials plain TCP for `http` and rustls-wrapped TCP for `https`.
pub struct Connector {
    tls: TlsConnector,
}

impl Connector {
    /// Create a connector trusting the bundled webpki roots.
    pub fn new() -> Self {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Self {
            tls: TlsConnector::from(Arc::new(config)),
        }
    }

    /// Connect to a URI, returning either a plain TCP or TLS stream.
    ///
    /// `server_name` overrides the TLS SNI name (virtual hosting); the dial
    /// target is always the URI host.
    pub async fn connect(
        &self,
        uri: &Uri,
        server_name: Option<&str>,
        trace: Option<&TraceContext>,
    ) -> Result<MaybeTlsStream> {
        let use_tls = match uri.scheme_str() {
            Some("http") => false,
            Some("https") => true,
            other => {
                return Err(Error::invalid_request(format!(
                    "unsupported scheme {:?}",
                    other.unwrap_or("")
                )))
            }
        };
        let host = uri
            .host()
            .ok_or_else(|| Error::connection("missing host"))?;
        let port = uri.port_u16().unwrap_or(if use_tls { 443 } else { 80 });

        let addrs = self.resolve(host, port, trace).await?;

        if let Some(trace) = trace {
            trace.connect_start();
        }
        let stream = dial(&addrs, host).await?;
        if let Some(trace) = trace {
            trace.connect_done();
        }
        debug!(host, port, tls = use_tls, "connection established");

        if !use_tls {
            return Ok(MaybeTlsStream::Plain(stream));
        }

        let sni = server_name.unwrap_or(host);
        let sni = ServerName::try_from(sni.to_string())
            .map_err(|e| Error::tls(format!("invalid server name {:?}: {}", sni, e)))?;

        if let Some(trace) = trace {
            trace.tls_start();
        }
        let tls_stream = self
            .tls
            .connect(sni, stream)
            .await
            .map_err(|e| Error::tls(format!("handshake with {}: {}", host, e)))?;
        if let Some(trace) = trace {
            trace.tls_done();
        }

        Ok(MaybeTlsStream::Tls(Box::new(tls_stream)))
    }

    /// Resolve the dial addresses. IP literals bypass DNS, so the DNS phase
    /// is never entered for them.
    async fn resolve(
        &self,
        host: &str,
        port: u16,
        trace: Option<&TraceContext>,
    ) -> Result<Vec<SocketAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }

        if let Some(trace) = trace {
            trace.dns_start();
        }
        let addrs: Vec<SocketAddr> = lookup_host((host, port))
            .await
            .map_err(|e| Error::dns(format!("lookup {}: {}", host, e)))?
            .collect();
        if let Some(trace) = trace {
            trace.dns_done();
        }

        if addrs.is_empty() {
            return Err(Error::dns(format!("lookup {}: no addresses", host)));
        }
        Ok(addrs)
    }
}

impl Default for Connector {
    fn default() -> Self {
        Self::new()
    }
}

/// Try each resolved address in order; the last error wins.
async fn dial(addrs: &[SocketAddr], host: &str) -> Result<TcpStream> {
    let mut last_err: Option<io::Error> = None;
    for addr in addrs {
        match TcpStream::connect(*addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(match last_err {
        Some(e) => Error::connection(format!("connect to {}: {}", host, e)),
        None => Error::connection(format!("connect to {}: no addresses", host)),
    })
}

/// Stream that is either plain TCP or TLS-wrapped.
#[derive(Debug)]
pub enum MaybeTlsStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeTlsStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            MaybeTlsStream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}
