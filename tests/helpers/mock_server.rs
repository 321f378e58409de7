use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

/// A simple HTTP/1.1 mock server that answers every connection with one
/// canned response and captures the raw request bytes for inspection.
pub struct MockHttpServer {
    port: u16,
    captured: Arc<Mutex<Vec<u8>>>,
}

impl MockHttpServer {
    /// Bind to a random port and start serving `response` in a background
    /// task.
    pub async fn start(response: impl Into<Vec<u8>>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let response: Vec<u8> = response.into();
        let captured = Arc::new(Mutex::new(Vec::new()));

        let task_captured = Arc::clone(&captured);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let response = response.clone();
                let captured = Arc::clone(&task_captured);
                tokio::spawn(async move {
                    handle_connection(stream, response, captured).await;
                });
            }
        });

        Ok(Self { port, captured })
    }

    /// Base URL for this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// Raw bytes of the most recently received request.
    pub async fn captured_request(&self) -> Vec<u8> {
        self.captured.lock().await.clone()
    }
}

/// Read one full request (headers + Content-Length body), store it, answer
/// with the canned response, and close.
async fn handle_connection(
    mut stream: TcpStream,
    response: Vec<u8>,
    captured: Arc<Mutex<Vec<u8>>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(n) => n,
            Err(_) => return,
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(header_end) = find_header_end(&buf) {
            let body_len = content_length(&buf[..header_end]).unwrap_or(0);
            if buf.len() >= header_end + body_len {
                break;
            }
        }
    }

    *captured.lock().await = buf;
    let _ = stream.write_all(&response).await;
    let _ = stream.flush().await;
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn content_length(head: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(head).ok()?;
    for line in text.split("\r\n") {
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                return value.trim().parse().ok();
            }
        }
    }
    None
}
