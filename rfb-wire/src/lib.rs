//! Wire-level types for the RFB (Remote Framebuffer) protocol.
//!
//! This crate is the I/O-free protocol layer of the VNC capture client:
//! - [`messages`] - message encoders/decoders and the [`PixelFormat`] record
//! - [`pixels`] - raw-encoding pixel decoding into RGB buffers
//! - [`auth`] - the legacy VNC DES challenge-response primitive
//! - [`geometry`] - rectangle math shared by clipping and merging
//!
//! Everything here operates on in-memory byte buffers ([`bytes::Buf`] /
//! [`bytes::BufMut`]); sockets, deadlines, and session state live in the
//! `rfb-capture` crate.
//!
//! All multi-byte integers use big-endian (network byte order) per the RFB
//! specification.

#![forbid(unsafe_code)]

pub mod auth;
pub mod geometry;
pub mod messages;
pub mod pixels;

pub use geometry::Rect;
pub use messages::types::{PixelFormat, Rectangle};
pub use pixels::{decode_raw, RgbBuffer};

use thiserror::Error;

/// Protocol-level violations detected while encoding or decoding wire data.
///
/// These are always fatal to the operation that produced them: once a peer
/// has sent malformed or unsupported bytes, the position in the stream is
/// unknown and the session cannot be trusted.
#[derive(Debug, Error)]
pub enum WireError {
    /// The 12-byte greeting did not start with the "RFB" magic.
    #[error("invalid RFB greeting: {0:?}")]
    BadMagic(String),

    /// A server message carried an unexpected message-type byte.
    #[error("unexpected message type: expected {expected}, got {got}")]
    UnexpectedMessage { expected: u8, got: u8 },

    /// A rectangle announced an encoding this client did not negotiate.
    #[error("unsupported encoding {0} (only raw is negotiated)")]
    UnsupportedEncoding(i32),

    /// A pixel byte-width the raw decoder has no layout for.
    #[error("unsupported pixel width: {0} bytes per pixel")]
    UnsupportedPixelFormat(u8),

    /// A rectangle extends past the negotiated screen bounds.
    #[error(
        "rectangle at ({x},{y}) sized {width}x{height} exceeds the {screen_width}x{screen_height} screen"
    )]
    RectangleOutOfBounds {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        screen_width: u16,
        screen_height: u16,
    },

    /// A decode ran out of bytes before the record was complete.
    #[error("truncated {what}: need {needed} bytes, have {available}")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// A structurally complete record carried invalid field values.
    #[error("malformed {what}: {detail}")]
    Malformed {
        what: &'static str,
        detail: String,
    },
}
