//! The capture session: one connection, one framebuffer, one owner.
//!
//! [`VncSession`] ties the transport, the negotiated parameters, the
//! frame store, and the input encoder into a single exclusively-owned
//! object. Everything is synchronous and blocking; every method that
//! touches the network may block up to the configured per-operation
//! deadline. After a timeout or connection error the session must be
//! treated as terminal - reconnect, don't retry in place.

use crate::config::Config;
use crate::errors::RfbError;
use crate::framestore::FrameStore;
use crate::handshake::{self, HandshakeOutcome};
use crate::input::{InputEncoder, XK_SHIFT_L};
use crate::transport::TransportSession;
use rfb_wire::messages::client::FramebufferUpdateRequest;
use rfb_wire::messages::server::UpdateHeader;
use rfb_wire::messages::types::ENCODING_RAW;
use rfb_wire::{decode_raw, PixelFormat, Rectangle, RgbBuffer, WireError};
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Lifecycle of a session. Transitions only move forward:
/// Connecting -> Negotiating -> Active -> Closed. The constructor walks
/// the first three internally; a constructed session is always Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Negotiating,
    Active,
    Closed,
}

/// A connected VNC capture session.
#[derive(Debug)]
pub struct VncSession {
    transport: TransportSession,
    config: Config,
    state: SessionState,
    pixel_format: PixelFormat,
    server_name: String,
    store: FrameStore,
    input: InputEncoder,
}

impl VncSession {
    /// Connect and run the full handshake.
    ///
    /// On success the session is Active, the framebuffer is allocated at
    /// the negotiated size, and one best-effort priming update has been
    /// drained. Handshake failures propagate immediately with no retry.
    pub fn connect(config: Config) -> Result<Self, RfbError> {
        config.validate()?;
        tracing::info!(
            "connecting to {}:{}",
            config.connection.host,
            config.connection.port
        );

        let mut transport = TransportSession::connect(
            &config.connection.host,
            config.connection.port,
            config.timeout(),
        )?;

        let outcome =
            match handshake::establish(&mut transport, config.connection.password.as_deref()) {
                Ok(outcome) => outcome,
                Err(e) => {
                    transport.close();
                    return Err(e);
                }
            };
        handshake::prime_first_frame(&mut transport, &outcome);

        let HandshakeOutcome {
            width,
            height,
            pixel_format,
            server_name,
        } = outcome;

        Ok(Self {
            transport,
            config,
            state: SessionState::Active,
            pixel_format,
            server_name,
            store: FrameStore::new(width, height),
            input: InputEncoder::new(),
        })
    }

    /// Negotiated screen width in pixels.
    pub fn width(&self) -> u16 {
        self.store.width()
    }

    /// Negotiated screen height in pixels.
    pub fn height(&self) -> u16 {
        self.store.height()
    }

    /// The pixel format announced by the server in ServerInit.
    pub fn pixel_format(&self) -> &PixelFormat {
        &self.pixel_format
    }

    /// The desktop name announced by the server.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The authoritative framebuffer as last merged.
    pub fn framebuffer(&self) -> &RgbBuffer {
        self.store.frame()
    }

    /// True once any non-black pixel data has been received.
    pub fn has_valid_frame(&self) -> bool {
        self.store.has_valid_frame()
    }

    /// Issue one framebuffer update request and parse the response.
    ///
    /// Returns the decoded pixels for the requested region; rectangles
    /// that extend past the viewport are clipped into it. Each rectangle
    /// is also forwarded to the frame store as it is decoded, so a
    /// protocol failure partway through keeps whatever was already
    /// applied - there is no rollback.
    pub fn request_update(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        incremental: bool,
    ) -> Result<RgbBuffer, RfbError> {
        self.ensure_active()?;

        let request = FramebufferUpdateRequest {
            incremental,
            x,
            y,
            width,
            height,
        };
        self.transport
            .send(&request.to_bytes(), "framebuffer update request")?;

        let mut head = self
            .transport
            .read_exact(UpdateHeader::WIRE_LEN, "framebuffer update header")?;
        let header = UpdateHeader::decode(&mut head)?;
        tracing::debug!("update response: {} rectangle(s)", header.rect_count);

        let bytes_per_pixel = self.pixel_format.bytes_per_pixel() as usize;
        let mut region = RgbBuffer::black(width, height);

        for _ in 0..header.rect_count {
            let mut raw = self
                .transport
                .read_exact(Rectangle::WIRE_LEN, "rectangle header")?;
            let rect = Rectangle::decode(&mut raw)?;
            tracing::debug!(
                "rect: x={} y={} {}x{} encoding={}",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                rect.encoding
            );

            if rect.encoding != ENCODING_RAW {
                return Err(WireError::UnsupportedEncoding(rect.encoding).into());
            }
            rect.check_bounds(self.width(), self.height())?;

            let payload_len = rect.width as usize * rect.height as usize * bytes_per_pixel;
            let payload = self.transport.read_exact(payload_len, "raw pixel data")?;
            let pixels = decode_raw(&payload, rect.width, rect.height, bytes_per_pixel)?;

            region.blit(&pixels, rect.x as i32 - x as i32, rect.y as i32 - y as i32);
            self.store.apply_region(rect.x, rect.y, &pixels);
        }

        Ok(region)
    }

    /// Capture a region, retrying through the black-frame heuristic.
    ///
    /// All-black results are retried per the configured [`RetryPolicy`]:
    /// sleep with linearly increasing backoff, provoke the server with a
    /// harmless input event (alternating a pointer nudge and a Shift
    /// tap), and request again. Protocol, timeout, and connection errors
    /// are never retried. After exhausting attempts the last-known-good
    /// frame is returned when one exists, else the current buffer.
    ///
    /// [`RetryPolicy`]: crate::config::RetryPolicy
    pub fn capture_region(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> Result<RgbBuffer, RfbError> {
        self.ensure_active()?;
        let policy = self.config.retry.clone();

        for attempt in 0..policy.max_attempts {
            let region = self.request_update(x, y, width, height, true)?;
            if !region.is_all_black() {
                return Ok(region);
            }
            if attempt + 1 == policy.max_attempts {
                break;
            }

            let backoff = Duration::from_millis(policy.backoff_step_ms * u64::from(attempt + 1));
            tracing::debug!(
                "all-black region, retrying in {:?} (attempt {}/{})",
                backoff,
                attempt + 1,
                policy.max_attempts
            );
            thread::sleep(backoff);
            if policy.send_nudges {
                self.nudge(attempt)?;
            }
        }

        if self.store.has_valid_frame() {
            tracing::debug!("retries exhausted; falling back to cached frame");
            Ok(self.store.cached_region(x, y, width, height))
        } else {
            Ok(self.store.current_region(x, y, width, height))
        }
    }

    /// Capture the whole screen through the retry loop.
    pub fn capture_full_screen(&mut self) -> Result<RgbBuffer, RfbError> {
        let (width, height) = (self.width(), self.height());
        self.capture_region(0, 0, width, height)
    }

    /// Write the current framebuffer to `path` as a PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), RfbError> {
        let frame = self.store.frame();
        let img = image::RgbImage::from_raw(
            u32::from(frame.width()),
            u32::from(frame.height()),
            frame.as_bytes().to_vec(),
        )
        .ok_or_else(|| RfbError::ImageWrite("framebuffer size mismatch".to_string()))?;
        img.save(path.as_ref())
            .map_err(|e| RfbError::ImageWrite(e.to_string()))
    }

    /// Move the pointer with no buttons held.
    pub fn move_to(&mut self, x: u16, y: u16) -> Result<(), RfbError> {
        self.ensure_active()?;
        self.input.move_to(&mut self.transport, x, y)
    }

    /// Press `button` at the current cursor position.
    pub fn button_down(&mut self, button: u8) -> Result<(), RfbError> {
        self.ensure_active()?;
        self.input.button_down(&mut self.transport, button)
    }

    /// Release all buttons at the current cursor position.
    pub fn button_up(&mut self) -> Result<(), RfbError> {
        self.ensure_active()?;
        self.input.button_up(&mut self.transport)
    }

    /// Press, hold for `hold`, then release `button`.
    pub fn click(&mut self, button: u8, hold: Duration) -> Result<(), RfbError> {
        self.ensure_active()?;
        self.input.click(&mut self.transport, button, hold)
    }

    /// One scroll-wheel notch up.
    pub fn scroll_up(&mut self) -> Result<(), RfbError> {
        self.ensure_active()?;
        self.input.scroll_up(&mut self.transport)
    }

    /// One scroll-wheel notch down.
    pub fn scroll_down(&mut self) -> Result<(), RfbError> {
        self.ensure_active()?;
        self.input.scroll_down(&mut self.transport)
    }

    /// Send a key press or release for an X11 keysym.
    pub fn key_event(&mut self, down: bool, keysym: u32) -> Result<(), RfbError> {
        self.ensure_active()?;
        self.input.key_event(&mut self.transport, down, keysym)
    }

    /// Press and immediately release a key.
    pub fn key_press(&mut self, keysym: u32) -> Result<(), RfbError> {
        self.ensure_active()?;
        self.input.key_press(&mut self.transport, keysym)
    }

    /// Close the session. Safe to call more than once.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            tracing::info!("closing session to {}", self.server_name);
            self.transport.close();
            self.state = SessionState::Closed;
        }
    }

    fn ensure_active(&self) -> Result<(), RfbError> {
        if self.state == SessionState::Active {
            Ok(())
        } else {
            Err(RfbError::NotActive(self.state))
        }
    }

    fn nudge(&mut self, attempt: u32) -> Result<(), RfbError> {
        if attempt % 2 == 0 {
            let offset = 10 + attempt as u16 * 5;
            let x = offset.min(self.width().saturating_sub(1));
            let y = offset.min(self.height().saturating_sub(1));
            self.input.move_to(&mut self.transport, x, y)
        } else {
            self.input.key_press(&mut self.transport, XK_SHIFT_L)
        }
    }
}
