//! A minimal in-process HTTP/1.1 stub server for pool and client tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;

/// Installs a test-writer subscriber so `RUST_LOG`-style debugging works.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Renders a canned HTTP/1.1 response with the given extra header lines.
pub fn http_response(status: u16, body: &str, extra_headers: &str) -> String {
    let reason = match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    format!(
        "HTTP/1.1 {status} {reason}\r\n{extra_headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// How a stub connection behaves once a full request has been read.
#[derive(Clone)]
pub enum StubBehavior {
    /// Replies with the canned response.
    Reply(String),
    /// Reads the request, then stalls without answering.
    Stall,
}

/// Spawns a stub server on an ephemeral port.
///
/// Counts every received request in `hits` and forwards the raw request
/// text to `captured` when provided.
pub async fn spawn_stub(
    behavior: StubBehavior,
    hits: Arc<AtomicUsize>,
    captured: Option<UnboundedSender<String>>,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let behavior = behavior.clone();
            let hits = Arc::clone(&hits);
            let captured = captured.clone();
            tokio::spawn(async move {
                serve_connection(socket, behavior, hits, captured).await;
            });
        }
    });
    addr
}

/// An address that refuses connections: bound, then immediately dropped.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn serve_connection(
    mut socket: TcpStream,
    behavior: StubBehavior,
    hits: Arc<AtomicUsize>,
    captured: Option<UnboundedSender<String>>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    hits.fetch_add(1, Ordering::SeqCst);
    if let Some(sender) = captured {
        let _ = sender.send(request);
    }
    match behavior {
        StubBehavior::Reply(reply) => {
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        StubBehavior::Stall => {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        }
    }
}

/// Reads one full request: headers plus any declared body.
async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut buffer = vec![0_u8; 64 * 1024];
    let mut filled = 0;
    loop {
        let read = socket.read(&mut buffer[filled..]).await.ok()?;
        if read == 0 {
            return None;
        }
        filled += read;
        let text = String::from_utf8_lossy(&buffer[..filled]).into_owned();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if filled >= header_end + 4 + content_length {
                return Some(text);
            }
        }
    }
}
