//! Synchronous VNC client for headless framebuffer capture.
//!
//! This crate drives the RFB protocol over a single blocking TCP
//! connection: handshake and authentication, framebuffer update requests
//! with raw-encoding decode, a persistent client-side framebuffer with
//! black-frame mitigation, and synthetic pointer/keyboard input.
//!
//! # Quick Start
//!
//! ```no_run
//! use rfb_capture::{Config, VncSession};
//!
//! # fn main() -> Result<(), rfb_capture::RfbError> {
//! let config = Config::builder()
//!     .host("localhost")
//!     .port(5900)
//!     .build()?;
//!
//! let mut session = VncSession::connect(config)?;
//! println!(
//!     "connected to {} ({}x{})",
//!     session.server_name(),
//!     session.width(),
//!     session.height()
//! );
//!
//! let frame = session.capture_full_screen()?;
//! assert_eq!(frame.as_bytes().len() % 3, 0);
//! session.save_png("screen.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency model
//!
//! There is none, deliberately: one thread, one socket, one owner. Every
//! operation may block on network I/O bounded by the configured
//! per-operation deadline. A session that times out is unusable and must
//! be reconnected.
//!
//! # Error Handling
//!
//! Failures are typed ([`RfbError`]) and fail fast. Only the all-black
//! capture heuristic retries, and only internally; protocol, auth,
//! timeout, and connection errors always propagate to the caller.

#![forbid(unsafe_code)]

// Public modules
pub mod config;
pub mod errors;
pub mod framestore;
pub mod input;
pub mod session;
pub mod transport;

// Private implementation modules
mod handshake;

// Re-exports
pub use config::{Config, RetryPolicy};
pub use errors::{AuthError, RfbError};
pub use rfb_wire::{PixelFormat, RgbBuffer};
pub use session::{SessionState, VncSession};
