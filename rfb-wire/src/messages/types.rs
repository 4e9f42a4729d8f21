//! Core RFB protocol types and constants.

use crate::WireError;
use bytes::{Buf, BufMut};

/// Version string this client always sends, regardless of what the server
/// greeted with.
pub const CLIENT_VERSION: &[u8; 12] = b"RFB 003.008\n";

/// Magic prefix every RFB greeting must carry.
pub const RFB_MAGIC: &[u8; 3] = b"RFB";

//
// Security type constants
//

/// No authentication required.
pub const SECURITY_TYPE_NONE: u8 = 1;

/// VNC authentication - DES challenge-response with a password.
pub const SECURITY_TYPE_VNC_AUTH: u8 = 2;

//
// Client-to-server message types
//

pub const MSG_SET_ENCODINGS: u8 = 2;
pub const MSG_FRAMEBUFFER_UPDATE_REQUEST: u8 = 3;
pub const MSG_KEY_EVENT: u8 = 4;
pub const MSG_POINTER_EVENT: u8 = 5;

//
// Server-to-client message types
//

pub const MSG_FRAMEBUFFER_UPDATE: u8 = 0;
pub const MSG_SET_COLOUR_MAP_ENTRIES: u8 = 1;
pub const MSG_BELL: u8 = 2;
pub const MSG_SERVER_CUT_TEXT: u8 = 3;

//
// Encoding type constants
//
// Only raw is negotiated; the others are recognized so that a
// non-conformant server's choice shows up by name in diagnostics.
//

/// Raw encoding - uncompressed pixel data.
pub const ENCODING_RAW: i32 = 0;

/// CopyRect encoding - copy from another screen region.
pub const ENCODING_COPYRECT: i32 = 1;

/// RRE (Rise-and-Run-length Encoding).
pub const ENCODING_RRE: i32 = 2;

/// Hextile encoding - 16x16 tile-based compression.
pub const ENCODING_HEXTILE: i32 = 5;

/// Tight encoding - JPEG and zlib compression.
pub const ENCODING_TIGHT: i32 = 7;

/// ZRLE (Zlib Run-Length Encoding).
pub const ENCODING_ZRLE: i32 = 16;

/// RFB pixel format specification.
///
/// Describes how a pixel word on the wire maps to color channels. The
/// format is fixed for the lifetime of a session: it is decoded once from
/// ServerInit and never renegotiated by this client.
///
/// # Wire Format
///
/// 16 bytes:
/// - 1 byte: bits_per_pixel
/// - 1 byte: depth
/// - 1 byte: big_endian (0 or 1)
/// - 1 byte: true_color (0 or 1)
/// - 2 bytes: red_max
/// - 2 bytes: green_max
/// - 2 bytes: blue_max
/// - 1 byte: red_shift
/// - 1 byte: green_shift
/// - 1 byte: blue_shift
/// - 3 bytes: padding (written as zero, ignored on decode)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub big_endian: u8, // Boolean: must be 0 or 1
    pub true_color: u8, // Boolean: must be 0 or 1
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl PixelFormat {
    /// Size of the record on the wire.
    pub const WIRE_LEN: usize = 16;

    /// Calculate bytes per pixel (1, 2, 3, or 4).
    pub fn bytes_per_pixel(&self) -> u8 {
        self.bits_per_pixel.div_ceil(8)
    }

    /// Validate the structural invariants of the record.
    ///
    /// bits_per_pixel must be one of 8/16/24/32, depth must fit inside it,
    /// the boolean flags must be 0 or 1, and each channel's shift plus the
    /// bit width of its max value must fit within the pixel word.
    pub fn validate(&self) -> Result<(), WireError> {
        let malformed = |detail: String| WireError::Malformed {
            what: "pixel format",
            detail,
        };

        if !matches!(self.bits_per_pixel, 8 | 16 | 24 | 32) {
            return Err(malformed(format!(
                "bits_per_pixel must be 8, 16, 24 or 32, got {}",
                self.bits_per_pixel
            )));
        }
        if self.depth > self.bits_per_pixel {
            return Err(malformed(format!(
                "depth {} exceeds bits_per_pixel {}",
                self.depth, self.bits_per_pixel
            )));
        }
        if self.big_endian > 1 {
            return Err(malformed(format!(
                "big_endian must be 0 or 1, got {}",
                self.big_endian
            )));
        }
        if self.true_color > 1 {
            return Err(malformed(format!(
                "true_color must be 0 or 1, got {}",
                self.true_color
            )));
        }

        for (name, max, shift) in [
            ("red", self.red_max, self.red_shift),
            ("green", self.green_max, self.green_shift),
            ("blue", self.blue_max, self.blue_shift),
        ] {
            let width = 16 - max.leading_zeros();
            if shift as u32 + width > self.bits_per_pixel as u32 {
                return Err(malformed(format!(
                    "{name} channel (shift {shift}, {width} bits) does not fit in {} bits",
                    self.bits_per_pixel
                )));
            }
        }

        Ok(())
    }

    /// Decode a PixelFormat from its 16-byte wire record.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, WireError> {
        if buf.remaining() < Self::WIRE_LEN {
            return Err(WireError::Truncated {
                what: "pixel format",
                needed: Self::WIRE_LEN,
                available: buf.remaining(),
            });
        }

        let format = Self {
            bits_per_pixel: buf.get_u8(),
            depth: buf.get_u8(),
            big_endian: buf.get_u8(),
            true_color: buf.get_u8(),
            red_max: buf.get_u16(),
            green_max: buf.get_u16(),
            blue_max: buf.get_u16(),
            red_shift: buf.get_u8(),
            green_shift: buf.get_u8(),
            blue_shift: buf.get_u8(),
        };
        buf.advance(3); // padding

        format.validate()?;
        Ok(format)
    }

    /// Encode this PixelFormat into its 16-byte wire record.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.bits_per_pixel);
        dst.put_u8(self.depth);
        dst.put_u8(self.big_endian);
        dst.put_u8(self.true_color);
        dst.put_u16(self.red_max);
        dst.put_u16(self.green_max);
        dst.put_u16(self.blue_max);
        dst.put_u8(self.red_shift);
        dst.put_u8(self.green_shift);
        dst.put_u8(self.blue_shift);
        dst.put_bytes(0, 3); // padding
    }
}

/// Rectangle header for framebuffer updates.
///
/// Describes a rectangular region of the screen along with the encoding
/// used for the payload that follows it on the wire.
///
/// # Wire Format
///
/// 12 bytes: 2-byte x, 2-byte y, 2-byte width, 2-byte height, 4-byte
/// signed encoding id. Only the header is parsed here; the payload is
/// encoding-specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub encoding: i32,
}

impl Rectangle {
    /// Size of the header on the wire.
    pub const WIRE_LEN: usize = 12;

    /// Decode a rectangle header.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, WireError> {
        if buf.remaining() < Self::WIRE_LEN {
            return Err(WireError::Truncated {
                what: "rectangle header",
                needed: Self::WIRE_LEN,
                available: buf.remaining(),
            });
        }
        Ok(Self {
            x: buf.get_u16(),
            y: buf.get_u16(),
            width: buf.get_u16(),
            height: buf.get_u16(),
            encoding: buf.get_i32(),
        })
    }

    /// Encode a rectangle header.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16(self.x);
        dst.put_u16(self.y);
        dst.put_u16(self.width);
        dst.put_u16(self.height);
        dst.put_i32(self.encoding);
    }

    /// Check that the rectangle lies within a `screen_width` x
    /// `screen_height` screen. Servers that violate this are
    /// non-conformant and the stream cannot be trusted afterwards.
    pub fn check_bounds(&self, screen_width: u16, screen_height: u16) -> Result<(), WireError> {
        let fits_x = self.x as u32 + self.width as u32 <= screen_width as u32;
        let fits_y = self.y as u32 + self.height as u32 <= screen_height as u32;
        if fits_x && fits_y {
            Ok(())
        } else {
            Err(WireError::RectangleOutOfBounds {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                screen_width,
                screen_height,
            })
        }
    }
}
