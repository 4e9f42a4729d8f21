//! Blocking TCP transport with wall-clock deadlines.
//!
//! The transport owns the byte stream exclusively: one session, one
//! socket, no sharing. Reads accumulate until exactly the requested
//! length is available; the deadline covers the whole operation rather
//! than each syscall, so a peer trickling one byte at a time cannot
//! stretch an operation past the configured timeout.

use crate::errors::RfbError;
use bytes::{Buf, Bytes, BytesMut};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Exclusive owner of the connection to the server.
#[derive(Debug)]
pub struct TransportSession {
    stream: TcpStream,
    timeout: Duration,
}

impl TransportSession {
    /// Connect to `host:port`, bounded by `timeout`.
    ///
    /// TCP_NODELAY is enabled; the protocol is chatty with small messages
    /// and input events are latency-sensitive.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, RfbError> {
        let addr = format!("{host}:{port}");
        let mut addrs = addr.to_socket_addrs().map_err(|e| {
            RfbError::ConnectionFailed(format!("failed to resolve {addr}: {e}"))
        })?;

        let mut last_err = None;
        let mut stream = None;
        for candidate in addrs.by_ref() {
            match TcpStream::connect_timeout(&candidate, timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        let stream = stream.ok_or_else(|| {
            let detail = last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no addresses resolved".to_string());
            RfbError::ConnectionFailed(format!("failed to connect to {addr}: {detail}"))
        })?;

        stream.set_nodelay(true).map_err(|e| {
            RfbError::ConnectionFailed(format!("failed to set TCP_NODELAY: {e}"))
        })?;

        if let (Ok(local), Ok(peer)) = (stream.local_addr(), stream.peer_addr()) {
            tracing::info!("connected via TCP: local={} -> remote={}", local, peer);
        } else {
            tracing::info!("connected to {}", addr);
        }

        Ok(Self { stream, timeout })
    }

    /// The per-operation deadline this transport applies.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Read exactly `n` bytes, or fail.
    ///
    /// A zero-length read means the peer closed the stream
    /// ([`RfbError::ConnectionClosed`]); running past the deadline yields
    /// [`RfbError::Timeout`]. Both carry `operation` for diagnostics.
    pub fn read_exact(&mut self, n: usize, operation: &'static str) -> Result<Bytes, RfbError> {
        let deadline = Instant::now() + self.timeout;
        let mut buf = BytesMut::zeroed(n);
        let mut filled = 0;

        while filled < n {
            let now = Instant::now();
            if now >= deadline {
                return Err(RfbError::Timeout {
                    operation,
                    after: self.timeout,
                });
            }
            self.stream
                .set_read_timeout(Some(deadline - now))
                .map_err(|source| RfbError::Transport { operation, source })?;

            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => return Err(RfbError::ConnectionClosed { operation }),
                Ok(read) => filled += read,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    // Re-check the wall clock and keep accumulating.
                }
                Err(source) => return Err(RfbError::Transport { operation, source }),
            }
        }

        Ok(buf.freeze())
    }

    /// Read a single byte.
    pub fn read_u8(&mut self, operation: &'static str) -> Result<u8, RfbError> {
        Ok(self.read_exact(1, operation)?.get_u8())
    }

    /// Read a 16-bit unsigned integer in network byte order.
    pub fn read_u16(&mut self, operation: &'static str) -> Result<u16, RfbError> {
        Ok(self.read_exact(2, operation)?.get_u16())
    }

    /// Read a 32-bit unsigned integer in network byte order.
    pub fn read_u32(&mut self, operation: &'static str) -> Result<u32, RfbError> {
        Ok(self.read_exact(4, operation)?.get_u32())
    }

    /// Write the full buffer, or fail.
    pub fn send(&mut self, bytes: &[u8], operation: &'static str) -> Result<(), RfbError> {
        self.stream
            .write_all(bytes)
            .and_then(|()| self.stream.flush())
            .map_err(|source| match source.kind() {
                ErrorKind::BrokenPipe
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::WriteZero => RfbError::ConnectionClosed { operation },
                _ => RfbError::Transport { operation, source },
            })
    }

    /// Shut the connection down. Errors are ignored; the peer may already
    /// be gone.
    pub fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
