//! Stub service speaking the NDJSON call contract over TCP.
//!
//! Used by the `token-rpc-stub` binary and the integration tests. Connections
//! are handled one at a time; each may carry any number of request lines.

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Map, Value};
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::protocol::{Request, Response};

/// Counters shared with whoever started the server.
#[derive(Debug, Default)]
pub struct StubStats {
    connections: AtomicUsize,
    requests: AtomicUsize,
}

impl StubStats {
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Stub server bound to a TCP address.
pub struct StubServer {
    listener: TcpListener,
    delay: Duration,
    stats: Arc<StubStats>,
}

impl StubServer {
    /// Bind to `addr`. Each reply is held back by `delay`.
    pub fn bind(addr: &str, delay: Duration) -> Result<Self> {
        let listener =
            TcpListener::bind(addr).with_context(|| format!("Failed to bind {}", addr))?;

        Ok(Self {
            listener,
            delay,
            stats: Arc::new(StubStats::default()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stats(&self) -> Arc<StubStats> {
        Arc::clone(&self.stats)
    }

    /// Start serving requests (blocking).
    pub fn serve(&self) -> Result<()> {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "stub listening");

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    self.stats.connections.fetch_add(1, Ordering::SeqCst);
                    if let Err(e) = self.handle_connection(stream) {
                        tracing::warn!(error = %e, "connection error");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "accept error"),
            }
        }

        Ok(())
    }

    fn handle_connection(&self, stream: TcpStream) -> Result<()> {
        let mut writer = stream.try_clone()?;
        let mut reader = BufReader::new(stream);

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Ok(());
            }
            if line.trim().is_empty() {
                continue;
            }

            self.stats.requests.fetch_add(1, Ordering::SeqCst);
            let start = Instant::now();

            let response = match serde_json::from_str::<Request>(&line) {
                Ok(request) => {
                    tracing::info!(method = %request.method, id = %request.id, "request");
                    match dispatch(&request.method, &request.params) {
                        Ok(result) => Response::success(request.id, result, elapsed_ms(start)),
                        Err(e) => {
                            Response::error(request.id, "ERROR", e.to_string(), elapsed_ms(start))
                        }
                    }
                }
                Err(e) => Response::error(
                    String::new(),
                    "INVALID_JSON",
                    e.to_string(),
                    elapsed_ms(start),
                ),
            };

            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }

            writer.write_all(response.to_ndjson_line()?.as_bytes())?;
            writer.flush()?;
        }
    }
}

/// Answer one request.
pub fn dispatch(method: &str, params: &Map<String, Value>) -> Result<Value> {
    let token = params
        .get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("missing token"))?;

    match method {
        "user_to_user_info" => Ok(json!({
            "method": method,
            "user": { "token_hint": token_hint(token) },
        })),
        "struct_to_user_attributes" => Ok(json!({
            "method": method,
            "attributes": { "token_hint": token_hint(token), "count": 0 },
        })),
        _ => Err(anyhow!("Unknown method: {}", method)),
    }
}

/// First three characters of the token.
fn token_hint(token: &str) -> String {
    token.chars().take(3).collect()
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
