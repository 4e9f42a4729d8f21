//! RFB message codecs.
//!
//! Split by direction, mirroring the protocol tables in RFC 6143:
//! - [`types`] - shared records ([`types::PixelFormat`], [`types::Rectangle`])
//!   and the protocol constants
//! - [`client`] - client-to-server messages (encode only)
//! - [`server`] - server-to-client messages (decode only)

pub mod client;
pub mod server;
pub mod types;

#[cfg(test)]
mod proptest_codec;
