//! Embedded web dashboard for trendlens.
//!
//! A small synchronous `tiny_http` server exposes:
//! - A single-page explorer: demo cards, topic editor, cutoff slider,
//!   interactive trend chart, and streaming interpretation
//! - JSON API endpoints over one shared [`Session`]
//!
//! Launched via `trendlens serve` (default: `http://127.0.0.1:9748`).
//! Requests are handled sequentially — sufficient for a local single-user
//! tool, and it keeps the session free of locking. The one long-lived
//! response, `/api/interpret`, is fed by a worker thread through a channel
//! so increments reach the browser as they arrive upstream.

mod api;
mod frontend;

use std::io::Read;
use std::sync::mpsc::Receiver;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, ResponseBox, Server, StatusCode};

use crate::config;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard server on the given address.
///
/// Blocks the current thread. A handler error turns into a JSON error body;
/// the server itself keeps running.
pub fn serve(addr: &str) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("trendlens dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    let url = format!("http://{addr}");
    let _ = open_browser(&url);

    let cfg = config::load();
    let mut session = Session::new(cfg.classify.default_cutoff);

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        // Mutating methods carry a body; drain it before dispatching
        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            let mut buf = String::new();
            let _ = request.as_reader().read_to_string(&mut buf);
            Some(buf)
        } else {
            None
        };

        let result = dispatch(&cfg, &mut session, &method, &url, body.as_deref());

        match result {
            Ok(resp) => {
                let _ = request.respond(resp);
            }
            Err(e) => {
                let body = serde_json::json!({ "error": e.to_string() }).to_string();
                let resp = Response::from_data(body.into_bytes())
                    .with_header(content_type_json())
                    .with_status_code(StatusCode(500));
                let _ = request.respond(resp);
            }
        }

        // One-line access log
        println!(
            "{} {} {}",
            method,
            url,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Route a request to its handler by method and path.
fn dispatch(
    cfg: &config::TrendlensConfig,
    session: &mut Session,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<ResponseBox> {
    // Match on the path alone, queries are parsed by the handlers
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        // Frontend
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_frontend()),

        // API — corpus and classification
        (&Method::Get, "/api/demos") => api::get_demos(cfg),
        (&Method::Post, "/api/corpus") => api::post_corpus(cfg, session, body.unwrap_or("{}")),
        (&Method::Post, "/api/classify") => api::post_classify(cfg, session, body.unwrap_or("{}")),
        (&Method::Get, "/api/series") => api::get_series(session, url),

        // API — chart interaction
        (&Method::Post, "/api/chart/toggle") => api::post_toggle(session, body.unwrap_or("{}")),
        (&Method::Get, "/api/docs") => api::get_docs(session, url),

        // API — interpretation (streaming)
        (&Method::Post, "/api/interpret") => api::post_interpret(cfg, session, body.unwrap_or("{}")),

        // API — health
        (&Method::Get, "/api/health") => api::get_health(cfg),

        // 404
        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// The whole frontend is one embedded HTML page.
fn serve_frontend() -> ResponseBox {
    let html = frontend::INDEX_HTML;
    Response::from_data(html.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
        .boxed()
}

/// 404 response.
fn not_found() -> ResponseBox {
    let body = r#"{"error": "not found"}"#;
    Response::from_data(body.as_bytes().to_vec())
        .with_header(content_type_json())
        .with_status_code(StatusCode(404))
        .boxed()
}

/// `application/json` response header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

/// `text/html` response header.
fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap()
}

/// Build a chunked streaming response from a byte-chunk channel. With no
/// declared length, `tiny_http` uses chunked transfer and flushes as the
/// reader yields — each channel send reaches the browser promptly.
pub(crate) fn stream_response(rx: Receiver<Vec<u8>>) -> ResponseBox {
    let headers = vec![
        Header::from_bytes("Content-Type", "text/event-stream; charset=utf-8").unwrap(),
        Header::from_bytes("Cache-Control", "no-cache").unwrap(),
    ];
    Response::new(StatusCode(200), headers, ChannelReader::new(rx), None, None).boxed()
}

/// `Read` over an `mpsc` byte-chunk channel: blocks on `recv` until the
/// worker sends the next increment, EOF when the sender hangs up.
struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    offset: usize,
}

impl ChannelReader {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            offset: 0,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.offset >= self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                // Sender dropped: stream finished
                Err(_) => return Ok(0),
            }
        }
        let n = (self.pending.len() - self.offset).min(buf.len());
        buf[..n].copy_from_slice(&self.pending[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

/// Best-effort launch of the default browser at `url`.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn channel_reader_yields_chunks_in_order() {
        let (tx, rx) = mpsc::channel();
        tx.send(b"hello ".to_vec()).unwrap();
        tx.send(b"world".to_vec()).unwrap();
        drop(tx);

        let mut reader = ChannelReader::new(rx);
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn channel_reader_eof_on_hangup() {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        drop(tx);
        let mut reader = ChannelReader::new(rx);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn channel_reader_handles_small_destination_buffers() {
        let (tx, rx) = mpsc::channel();
        tx.send(b"abcdef".to_vec()).unwrap();
        drop(tx);

        let mut reader = ChannelReader::new(rx);
        let mut buf = [0u8; 2];
        let mut out = Vec::new();
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"abcdef");
    }
}
