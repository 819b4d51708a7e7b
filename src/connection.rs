//! TCP connection to the remote service.
//!
//! A [`Connection`] owns one socket for the whole run and shuts it down when
//! dropped. Calls go through the [`Transport`] trait so the call driver can
//! run against something other than a socket.

use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::error::{CallFailure, ClientError};
use crate::protocol::{Request, Response};

/// Port the service listens on.
pub const DEFAULT_PORT: u16 = 50051;

/// Upper bound for establishing the TCP connection to one resolved address.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest response line accepted (16 MiB).
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// One request/response exchange bounded by a deadline.
pub trait Transport {
    fn call(&mut self, request: &Request, deadline: Duration) -> Result<Response, ClientError>;
}

/// Build the service address for `host`.
pub fn endpoint(host: &str) -> String {
    format!("{}:{}", host, DEFAULT_PORT)
}

/// Connect to `addr`, blocking until the handshake completes.
pub fn connect(addr: &str) -> Result<Connection, ClientError> {
    connect_with_timeout(addr, CONNECT_TIMEOUT)
}

/// Connect to `addr`, trying each resolved address with `timeout`.
pub fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Connection, ClientError> {
    let failed = |source: io::Error| ClientError::Connection {
        addr: addr.to_string(),
        source,
    };

    let socket_addrs: Vec<SocketAddr> = addr.to_socket_addrs().map_err(failed)?.collect();

    let mut last_err = None;
    for socket_addr in socket_addrs {
        match TcpStream::connect_timeout(&socket_addr, timeout) {
            Ok(stream) => {
                tracing::debug!(%addr, peer = %socket_addr, "connected");
                return Connection::from_stream(addr, stream).map_err(failed);
            }
            Err(e) => {
                tracing::debug!(%addr, peer = %socket_addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }

    Err(failed(last_err.unwrap_or_else(|| {
        io::Error::new(ErrorKind::AddrNotAvailable, "address resolved to no endpoints")
    })))
}

/// An established connection. Closed on drop.
pub struct Connection {
    addr: String,
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Connection {
    fn from_stream(addr: &str, stream: TcpStream) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);

        Ok(Self {
            addr: addr.to_string(),
            writer: stream,
            reader,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Read one NDJSON line, giving up once `started + deadline` has passed.
    fn read_line(
        &mut self,
        method: &str,
        started: Instant,
        deadline: Duration,
    ) -> Result<Vec<u8>, ClientError> {
        let mut line = Vec::new();

        loop {
            let remaining = remaining(method, started, deadline)?;
            let socket = self.reader.get_ref();
            socket
                .set_read_timeout(Some(remaining))
                .map_err(|e| ClientError::call(method, e))?;

            let (consumed, done) = match self.reader.fill_buf() {
                Ok([]) => return Err(ClientError::call(method, CallFailure::EmptyResponse)),
                Ok(buf) => match buf.iter().position(|b| *b == b'\n') {
                    Some(pos) => {
                        line.extend_from_slice(&buf[..pos]);
                        (pos + 1, true)
                    }
                    None => {
                        line.extend_from_slice(buf);
                        (buf.len(), false)
                    }
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => return Err(deadline_exceeded(method, deadline)),
                Err(e) => return Err(ClientError::call(method, e)),
            };
            self.reader.consume(consumed);

            if line.len() > MAX_RESPONSE_BYTES {
                return Err(ClientError::call(
                    method,
                    CallFailure::TooLarge {
                        limit: MAX_RESPONSE_BYTES,
                    },
                ));
            }
            if done {
                return Ok(line);
            }
        }
    }
}

impl Transport for Connection {
    fn call(&mut self, request: &Request, deadline: Duration) -> Result<Response, ClientError> {
        let method = request.method.as_str();
        let started = Instant::now();

        let payload = request
            .to_ndjson_line()
            .map_err(|e| ClientError::call(method, CallFailure::Serialize(e)))?;

        let timeout = remaining(method, started, deadline)?;
        self.writer
            .set_write_timeout(Some(timeout))
            .map_err(|e| ClientError::call(method, e))?;
        if let Err(e) = self
            .writer
            .write_all(payload.as_bytes())
            .and_then(|_| self.writer.flush())
        {
            if is_timeout(&e) {
                return Err(deadline_exceeded(method, deadline));
            }
            return Err(ClientError::call(method, e));
        }

        let line = self.read_line(method, started, deadline)?;
        let response: Response = serde_json::from_slice(&line)
            .map_err(|e| ClientError::call(method, CallFailure::Parse(e)))?;

        tracing::debug!(
            method,
            id = %response.id,
            ok = response.ok,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "call finished"
        );

        Ok(response)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Already-closed sockets report NotConnected here.
        let _ = self.writer.shutdown(Shutdown::Both);
        tracing::debug!(addr = %self.addr, "connection closed");
    }
}

fn remaining(method: &str, started: Instant, deadline: Duration) -> Result<Duration, ClientError> {
    deadline
        .checked_sub(started.elapsed())
        .filter(|d| !d.is_zero())
        .ok_or_else(|| deadline_exceeded(method, deadline))
}

fn deadline_exceeded(method: &str, deadline: Duration) -> ClientError {
    ClientError::DeadlineExceeded {
        method: method.to_string(),
        deadline_ms: deadline.as_millis(),
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
