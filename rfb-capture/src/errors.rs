//! Error types for the capture client.

use rfb_wire::WireError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a VNC capture session.
///
/// Every variant is terminal for the session: after a protocol violation,
/// a timeout, or a closed connection the position in the byte stream is
/// unknown and callers must reconnect rather than retry in place. Only the
/// all-black capture heuristic retries, and it does so internally without
/// consuming any of these.
#[derive(Debug, Error)]
pub enum RfbError {
    /// The peer sent bytes that violate the protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] WireError),

    /// The handshake could not produce an authenticated session.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// A read or write exceeded the configured wall-clock deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The peer closed the stream mid-operation.
    #[error("connection closed by peer during {operation}")]
    ConnectionClosed { operation: &'static str },

    /// TCP connection establishment failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// An I/O error that is neither a timeout nor a clean close.
    #[error("transport error during {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation was attempted outside the Active session state.
    #[error("operation requires an active session (state is {0:?})")]
    NotActive(crate::session::SessionState),

    /// Writing the framebuffer to an image file failed.
    #[error("failed to write framebuffer image: {0}")]
    ImageWrite(String),
}

/// Authentication and security-negotiation failures.
///
/// These occur only during the handshake; the session never reaches the
/// Active state when one is returned.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The server offered neither "None" nor "VNC Authentication".
    #[error("no supported security type offered by server (got {offered:?})")]
    Unsupported { offered: Vec<u8> },

    /// The server requires VNC authentication but no password is configured.
    #[error("VNC authentication required but no password provided")]
    PasswordRequired,

    /// The server rejected the challenge response.
    #[error("server rejected the supplied credentials")]
    Rejected,

    /// The server refused the connection outright, with a reason string.
    #[error("server refused the connection: {0}")]
    ServerRejected(String),
}

impl RfbError {
    /// The operation label attached to transport-level failures, when one
    /// exists. Protocol and authentication errors identify themselves.
    #[must_use]
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { operation, .. }
            | Self::ConnectionClosed { operation }
            | Self::Transport { operation, .. } => Some(operation),
            _ => None,
        }
    }
}
