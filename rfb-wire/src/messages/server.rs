//! Server-to-client messages.
//!
//! Decoders take a [`bytes::Buf`] of the exact-length record the transport
//! already read; variable-length trailers (the server name, failure
//! reasons) are read separately by the handshake driver.

use super::types::{PixelFormat, MSG_FRAMEBUFFER_UPDATE};
use crate::WireError;
use bytes::Buf;

/// Fixed-length head of the ServerInit message.
///
/// # Wire Format
///
/// 24 bytes: 2-byte width, 2-byte height, 16-byte [`PixelFormat`], 4-byte
/// name length. The name itself follows on the wire and must be read with
/// the returned `name_length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInit {
    pub width: u16,
    pub height: u16,
    pub pixel_format: PixelFormat,
    pub name_length: u32,
}

impl ServerInit {
    /// Size of the fixed-length head on the wire.
    pub const WIRE_LEN: usize = 24;

    /// Decode the 24-byte ServerInit head.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, WireError> {
        if buf.remaining() < Self::WIRE_LEN {
            return Err(WireError::Truncated {
                what: "server init",
                needed: Self::WIRE_LEN,
                available: buf.remaining(),
            });
        }
        let width = buf.get_u16();
        let height = buf.get_u16();
        let pixel_format = PixelFormat::decode(buf)?;
        let name_length = buf.get_u32();
        Ok(Self {
            width,
            height,
            pixel_format,
            name_length,
        })
    }
}

/// Head of a FramebufferUpdate message: message type, padding, rectangle
/// count. The rectangles follow on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateHeader {
    pub rect_count: u16,
}

impl UpdateHeader {
    /// Size of the head on the wire.
    pub const WIRE_LEN: usize = 4;

    /// Decode the 4-byte update head, rejecting any other message type.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, WireError> {
        if buf.remaining() < Self::WIRE_LEN {
            return Err(WireError::Truncated {
                what: "framebuffer update header",
                needed: Self::WIRE_LEN,
                available: buf.remaining(),
            });
        }
        let message_type = buf.get_u8();
        if message_type != MSG_FRAMEBUFFER_UPDATE {
            return Err(WireError::UnexpectedMessage {
                expected: MSG_FRAMEBUFFER_UPDATE,
                got: message_type,
            });
        }
        buf.advance(1); // padding
        let rect_count = buf.get_u16();
        Ok(Self { rect_count })
    }
}
