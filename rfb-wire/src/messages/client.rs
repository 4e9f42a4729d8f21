//! Client-to-server messages.
//!
//! Every message knows how to serialize itself into a [`BytesMut`]; the
//! transport sends the frozen bytes in a single write. Layouts follow the
//! tables in RFC 6143 §7.5 with all integers big-endian.

use super::types::{
    MSG_FRAMEBUFFER_UPDATE_REQUEST, MSG_KEY_EVENT, MSG_POINTER_EVENT, MSG_SET_ENCODINGS,
};
use bytes::{BufMut, Bytes, BytesMut};

/// ClientInit: one byte, the shared-session flag.
#[derive(Debug, Clone, Copy)]
pub struct ClientInit {
    pub shared: bool,
}

impl ClientInit {
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(u8::from(self.shared));
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1);
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// SetEncodings: declares which rectangle encodings the client accepts.
#[derive(Debug, Clone)]
pub struct SetEncodings {
    pub encodings: Vec<i32>,
}

impl SetEncodings {
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(MSG_SET_ENCODINGS);
        dst.put_u8(0); // padding
        dst.put_u16(self.encodings.len() as u16);
        for &encoding in &self.encodings {
            dst.put_i32(encoding);
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + 4 * self.encodings.len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// FramebufferUpdateRequest: ask the server for the contents of a region.
///
/// With `incremental` set the server may answer with only the parts that
/// changed since the last update; cleared, it must resend the whole region.
#[derive(Debug, Clone, Copy)]
pub struct FramebufferUpdateRequest {
    pub incremental: bool,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl FramebufferUpdateRequest {
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(MSG_FRAMEBUFFER_UPDATE_REQUEST);
        dst.put_u8(u8::from(self.incremental));
        dst.put_u16(self.x);
        dst.put_u16(self.y);
        dst.put_u16(self.width);
        dst.put_u16(self.height);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(10);
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// PointerEvent: pointer position plus the state of all buttons as a mask.
#[derive(Debug, Clone, Copy)]
pub struct PointerEvent {
    pub button_mask: u8,
    pub x: u16,
    pub y: u16,
}

impl PointerEvent {
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(MSG_POINTER_EVENT);
        dst.put_u8(self.button_mask);
        dst.put_u16(self.x);
        dst.put_u16(self.y);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(6);
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// KeyEvent: a key press or release identified by X11 keysym.
#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    pub down: bool,
    pub keysym: u32,
}

impl KeyEvent {
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(MSG_KEY_EVENT);
        dst.put_u8(u8::from(self.down));
        dst.put_bytes(0, 2); // padding
        dst.put_u32(self.keysym);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(8);
        self.encode(&mut buf);
        buf.freeze()
    }
}
