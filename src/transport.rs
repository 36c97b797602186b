//! Request drivers for the two transport modes.
//!
//! RAW mode writes a literal byte sequence over a fresh TCP connection and
//! reads whatever comes back within a short bound. It exists specifically
//! to exercise malformed input (missing method, empty request) that a
//! conforming client library would refuse to construct. CLIENT mode drives
//! the happy path through a real client stack and reconstructs the raw
//! response from what the client exposes.

use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::catalog::Request;
use crate::error::{Error, Result};

/// Per-request response bound for RAW mode.
const RAW_READ_TIMEOUT: Duration = Duration::from_millis(1500);

/// Per-request bound for CLIENT mode.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Driver for one run's worth of requests against a fixed test port.
#[derive(Debug)]
pub struct Driver {
    port: u16,
    client: reqwest::Client,
}

impl Driver {
    /// Build a driver for the given port.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(port: u16) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .pool_max_idle_per_host(1)
            .build()?;
        Ok(Self { port, client })
    }

    /// Send a test case's request and return the raw response bytes.
    pub async fn send(&self, request: &Request) -> Result<Vec<u8>> {
        match request {
            Request::Raw(bytes) => self.send_raw(bytes).await,
            Request::Client { path } => self.send_client(path).await,
        }
    }

    /// Transmit literal bytes verbatim over a new TCP connection and read
    /// until the peer closes or the response bound elapses.
    ///
    /// A bound that elapses after some bytes arrived returns those bytes;
    /// an empty buffer at the bound is a [`Error::Timeout`].
    pub async fn send_raw(&self, request: &[u8]) -> Result<Vec<u8>> {
        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, self.port))
            .await
            .map_err(|e| Error::transport(format!("connect to port {}: {e}", self.port)))?;
        stream
            .write_all(request)
            .await
            .map_err(|e| Error::transport(format!("write request: {e}")))?;

        let mut response = Vec::new();
        let deadline = tokio::time::Instant::now() + RAW_READ_TIMEOUT;
        let mut buf = [0u8; 4096];
        loop {
            let read = tokio::time::timeout_at(deadline, stream.read(&mut buf)).await;
            match read {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => response.extend_from_slice(&buf[..n]),
                Ok(Err(e)) => return Err(Error::transport(format!("read response: {e}"))),
                Err(_) => {
                    if response.is_empty() {
                        return Err(Error::Timeout {
                            timeout: RAW_READ_TIMEOUT,
                        });
                    }
                    debug!(bytes = response.len(), "response bound elapsed with partial data");
                    break;
                }
            }
        }
        Ok(response)
    }

    /// Issue a conforming HTTP GET and reconstruct the raw response bytes:
    /// status line, headers as the client exposes them (lowercase names,
    /// received order), blank line, body.
    ///
    /// A client-side timeout is reported as [`Error::Timeout`], the same
    /// outcome RAW mode produces, so both transports classify uniformly.
    pub async fn send_client(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("http://localhost:{}{path}", self.port);
        let response = self.client.get(&url).send().await.map_err(client_error)?;

        let mut raw = format!(
            "HTTP/1.1 {} {}\r\n",
            response.status().as_u16(),
            response.status().canonical_reason().unwrap_or("")
        )
        .into_bytes();
        for (name, value) in response.headers() {
            raw.extend_from_slice(name.as_str().as_bytes());
            raw.extend_from_slice(b": ");
            raw.extend_from_slice(value.as_bytes());
            raw.extend_from_slice(b"\r\n");
        }
        raw.extend_from_slice(b"\r\n");
        raw.extend_from_slice(&response.bytes().await.map_err(client_error)?);
        Ok(raw)
    }
}

fn client_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            timeout: CLIENT_TIMEOUT,
        }
    } else {
        Error::Client(e)
    }
}
