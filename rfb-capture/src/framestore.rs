//! Persistent framebuffer state: the authoritative screen image, a
//! last-known-good cache, and the merge policy that feeds them.

use rfb_wire::RgbBuffer;

/// Owner of the client-side framebuffer.
///
/// Allocated once at handshake completion, sized to the negotiated screen,
/// and mutated in place by every update until the session closes.
///
/// # Merge policy
///
/// A decoded region that exactly covers the screen replaces the buffer
/// wholesale and refreshes the cache (full trust). Anything smaller is
/// merged pixel-by-pixel, and only non-black incoming pixels are applied:
/// some servers emit spurious all-black partial updates during cold-start,
/// and tolerating them costs the ability to ever clear a legitimately
/// black region through a partial update. That trade-off is deliberate
/// and documented rather than hidden.
#[derive(Debug)]
pub struct FrameStore {
    frame: RgbBuffer,
    cache: RgbBuffer,
    has_content: bool,
}

impl FrameStore {
    /// Create a store for a `width` x `height` screen, all black.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            frame: RgbBuffer::black(width, height),
            cache: RgbBuffer::black(width, height),
            has_content: false,
        }
    }

    pub fn width(&self) -> u16 {
        self.frame.width()
    }

    pub fn height(&self) -> u16 {
        self.frame.height()
    }

    /// The authoritative framebuffer.
    pub fn frame(&self) -> &RgbBuffer {
        &self.frame
    }

    /// Apply one decoded region at absolute screen coordinates.
    pub fn apply_region(&mut self, x: u16, y: u16, region: &RgbBuffer) {
        let full_screen = x == 0
            && y == 0
            && region.width() == self.frame.width()
            && region.height() == self.frame.height();

        if full_screen {
            tracing::debug!("full-screen update: replacing framebuffer");
            self.frame = region.clone();
            // The cache stays last-known-GOOD: an all-black full frame
            // replaces the buffer but is never worth remembering.
            if !region.is_all_black() {
                self.cache = region.clone();
                self.has_content = true;
            }
        } else {
            let merged = self.frame.merge_non_black(region, x as i32, y as i32);
            self.cache.merge_non_black(region, x as i32, y as i32);
            tracing::debug!(
                "partial update at ({x},{y}) {}x{}: merged {merged} non-black pixels",
                region.width(),
                region.height()
            );
            if merged > 0 {
                self.has_content = true;
            }
        }
    }

    /// True once any non-black pixel data has arrived.
    pub fn has_valid_frame(&self) -> bool {
        self.has_content && !self.cache.is_all_black()
    }

    /// A window into the last-known-good frame.
    pub fn cached_region(&self, x: u16, y: u16, width: u16, height: u16) -> RgbBuffer {
        self.cache.crop(x, y, width, height)
    }

    /// A window into the current (possibly black) authoritative frame.
    pub fn current_region(&self, x: u16, y: u16, width: u16, height: u16) -> RgbBuffer {
        self.frame.crop(x, y, width, height)
    }
}
