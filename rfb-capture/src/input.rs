//! Synthetic pointer and keyboard input.
//!
//! Pointer events on the wire always carry a position, but callers think
//! in terms of "press button 1 where the cursor is". The encoder tracks
//! the last position sent so that button-only operations can be
//! reconstructed into full events.

use crate::errors::RfbError;
use crate::transport::TransportSession;
use rfb_wire::messages::client::{KeyEvent, PointerEvent};
use std::time::Duration;

/// X11 keysym for the left Shift key; pressed-and-released as a harmless
/// redraw nudge.
pub const XK_SHIFT_L: u32 = 0xFFE1;

/// Pointer button bit masks as used in the PointerEvent button byte.
pub const BUTTON_LEFT: u8 = 1;
pub const BUTTON_MIDDLE: u8 = 2;
pub const BUTTON_RIGHT: u8 = 4;
pub const BUTTON_SCROLL_UP: u8 = 8;
pub const BUTTON_SCROLL_DOWN: u8 = 16;

/// Encodes input events and tracks the cursor position.
#[derive(Debug)]
pub struct InputEncoder {
    cursor: (u16, u16),
}

impl InputEncoder {
    pub fn new() -> Self {
        Self { cursor: (0, 0) }
    }

    /// The last pointer position sent.
    pub fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    /// Send a raw pointer event and remember its position.
    pub fn pointer_event(
        &mut self,
        transport: &mut TransportSession,
        button_mask: u8,
        x: u16,
        y: u16,
    ) -> Result<(), RfbError> {
        self.cursor = (x, y);
        transport.send(
            &PointerEvent { button_mask, x, y }.to_bytes(),
            "pointer event",
        )
    }

    /// Move the pointer with no buttons held.
    pub fn move_to(
        &mut self,
        transport: &mut TransportSession,
        x: u16,
        y: u16,
    ) -> Result<(), RfbError> {
        self.pointer_event(transport, 0, x, y)
    }

    /// Press `button` at the current cursor position.
    pub fn button_down(
        &mut self,
        transport: &mut TransportSession,
        button: u8,
    ) -> Result<(), RfbError> {
        let (x, y) = self.cursor;
        self.pointer_event(transport, button, x, y)
    }

    /// Release all buttons at the current cursor position.
    pub fn button_up(&mut self, transport: &mut TransportSession) -> Result<(), RfbError> {
        let (x, y) = self.cursor;
        self.pointer_event(transport, 0, x, y)
    }

    /// Press, hold for `hold`, then release `button`.
    pub fn click(
        &mut self,
        transport: &mut TransportSession,
        button: u8,
        hold: Duration,
    ) -> Result<(), RfbError> {
        self.button_down(transport, button)?;
        std::thread::sleep(hold);
        self.button_up(transport)
    }

    /// One scroll-wheel notch up (button 8 down+up).
    pub fn scroll_up(&mut self, transport: &mut TransportSession) -> Result<(), RfbError> {
        self.button_down(transport, BUTTON_SCROLL_UP)?;
        self.button_up(transport)
    }

    /// One scroll-wheel notch down (button 16 down+up).
    pub fn scroll_down(&mut self, transport: &mut TransportSession) -> Result<(), RfbError> {
        self.button_down(transport, BUTTON_SCROLL_DOWN)?;
        self.button_up(transport)
    }

    /// Send a key press or release for an X11 keysym.
    pub fn key_event(
        &mut self,
        transport: &mut TransportSession,
        down: bool,
        keysym: u32,
    ) -> Result<(), RfbError> {
        transport.send(&KeyEvent { down, keysym }.to_bytes(), "key event")
    }

    /// Press and immediately release a key.
    pub fn key_press(
        &mut self,
        transport: &mut TransportSession,
        keysym: u32,
    ) -> Result<(), RfbError> {
        self.key_event(transport, true, keysym)?;
        self.key_event(transport, false, keysym)
    }
}

impl Default for InputEncoder {
    fn default() -> Self {
        Self::new()
    }
}
