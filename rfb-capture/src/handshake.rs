//! RFB handshake: version exchange, security negotiation, initialization.
//!
//! The phases run in a fixed order; branching happens once, when the
//! server's security-type list is reduced to a [`SecurityChoice`]:
//!
//! 1. Version exchange - read the 12-byte greeting, require the "RFB"
//!    magic, answer with the fixed client version 3.8.
//! 2. Security selection - prefer "None" over "VNC Authentication"; a
//!    zero-length list carries a refusal reason instead.
//! 3. VNC authentication (only when chosen) - DES challenge-response,
//!    then the 4-byte SecurityResult.
//! 4. ClientInit/ServerInit - always request shared access; learn the
//!    screen geometry, pixel format, and desktop name.
//!
//! Failures propagate immediately with no retry; the session constructor
//! itself fails and never reaches the Active state.

use crate::errors::{AuthError, RfbError};
use crate::transport::TransportSession;
use rfb_wire::messages::client::{ClientInit, FramebufferUpdateRequest, SetEncodings};
use rfb_wire::messages::server::{ServerInit, UpdateHeader};
use rfb_wire::messages::types::{
    CLIENT_VERSION, ENCODING_RAW, RFB_MAGIC, SECURITY_TYPE_NONE, SECURITY_TYPE_VNC_AUTH,
};
use rfb_wire::{PixelFormat, Rectangle, WireError};

/// Everything the handshake negotiates; immutable for the session's life.
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    pub width: u16,
    pub height: u16,
    pub pixel_format: PixelFormat,
    pub server_name: String,
}

/// The security type this client agreed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SecurityChoice {
    None,
    VncAuth,
}

/// Drive the full handshake on a fresh transport.
pub fn establish(
    transport: &mut TransportSession,
    password: Option<&str>,
) -> Result<HandshakeOutcome, RfbError> {
    exchange_version(transport)?;

    match select_security(transport)? {
        SecurityChoice::None => {
            transport.send(&[SECURITY_TYPE_NONE], "security selection")?;
        }
        SecurityChoice::VncAuth => {
            // Fail before touching the challenge when no password exists.
            let password = password
                .filter(|p| !p.is_empty())
                .ok_or(AuthError::PasswordRequired)?;
            transport.send(&[SECURITY_TYPE_VNC_AUTH], "security selection")?;
            authenticate(transport, password)?;
        }
    }

    let outcome = exchange_init(transport)?;
    tracing::info!(
        "handshake complete: {} ({}x{}, {} bpp)",
        outcome.server_name,
        outcome.width,
        outcome.height,
        outcome.pixel_format.bits_per_pixel
    );

    transport.send(
        &SetEncodings {
            encodings: vec![ENCODING_RAW],
        }
        .to_bytes(),
        "set encodings",
    )?;

    Ok(outcome)
}

fn exchange_version(transport: &mut TransportSession) -> Result<(), RfbError> {
    let greeting = transport.read_exact(12, "version handshake")?;
    if !greeting.starts_with(RFB_MAGIC) {
        return Err(WireError::BadMagic(
            String::from_utf8_lossy(&greeting).into_owned(),
        )
        .into());
    }
    tracing::debug!("server greeting: {:?}", String::from_utf8_lossy(&greeting));
    transport.send(CLIENT_VERSION, "client version")
}

fn select_security(transport: &mut TransportSession) -> Result<SecurityChoice, RfbError> {
    let count = transport.read_u8("security type count")?;
    if count == 0 {
        // The server is refusing the connection; a reason string follows.
        let reason_len = transport.read_u32("failure reason length")? as usize;
        let reason = transport.read_exact(reason_len, "failure reason")?;
        return Err(AuthError::ServerRejected(
            String::from_utf8_lossy(&reason).into_owned(),
        )
        .into());
    }

    let offered = transport.read_exact(count as usize, "security types")?;
    tracing::debug!("server offered security types {:?}", &offered[..]);

    if offered.contains(&SECURITY_TYPE_NONE) {
        Ok(SecurityChoice::None)
    } else if offered.contains(&SECURITY_TYPE_VNC_AUTH) {
        Ok(SecurityChoice::VncAuth)
    } else {
        Err(AuthError::Unsupported {
            offered: offered.to_vec(),
        }
        .into())
    }
}

fn authenticate(transport: &mut TransportSession, password: &str) -> Result<(), RfbError> {
    let raw = transport.read_exact(16, "authentication challenge")?;
    let mut challenge = [0u8; 16];
    challenge.copy_from_slice(&raw);

    let response = rfb_wire::auth::encrypt_challenge(password, &challenge);
    transport.send(&response, "authentication response")?;

    let result = transport.read_u32("security result")?;
    if result != 0 {
        return Err(AuthError::Rejected.into());
    }
    Ok(())
}

fn exchange_init(transport: &mut TransportSession) -> Result<HandshakeOutcome, RfbError> {
    transport.send(&ClientInit { shared: true }.to_bytes(), "client init")?;

    let mut head = transport.read_exact(ServerInit::WIRE_LEN, "server init")?;
    let init = ServerInit::decode(&mut head)?;
    let name = transport.read_exact(init.name_length as usize, "server name")?;

    Ok(HandshakeOutcome {
        width: init.width,
        height: init.height,
        pixel_format: init.pixel_format,
        server_name: String::from_utf8_lossy(&name).into_owned(),
    })
}

/// Best-effort priming request issued right after the handshake.
///
/// Some servers only start rendering once a non-incremental request
/// arrives, so one is sent for the full screen and its response drained
/// without decoding. Failures here are logged and swallowed - the session
/// is still usable, the first real capture just starts colder.
pub fn prime_first_frame(transport: &mut TransportSession, outcome: &HandshakeOutcome) {
    if let Err(e) = drain_full_update(transport, outcome) {
        tracing::warn!("priming update failed (continuing): {e}");
    }
}

fn drain_full_update(
    transport: &mut TransportSession,
    outcome: &HandshakeOutcome,
) -> Result<(), RfbError> {
    let request = FramebufferUpdateRequest {
        incremental: false,
        x: 0,
        y: 0,
        width: outcome.width,
        height: outcome.height,
    };
    transport.send(&request.to_bytes(), "priming update request")?;

    let mut head = transport.read_exact(UpdateHeader::WIRE_LEN, "priming update header")?;
    let header = UpdateHeader::decode(&mut head)?;

    let bytes_per_pixel = outcome.pixel_format.bytes_per_pixel() as usize;
    for _ in 0..header.rect_count {
        let mut raw = transport.read_exact(Rectangle::WIRE_LEN, "priming rectangle header")?;
        let rect = Rectangle::decode(&mut raw)?;
        if rect.encoding != ENCODING_RAW {
            return Err(WireError::UnsupportedEncoding(rect.encoding).into());
        }
        let payload = rect.width as usize * rect.height as usize * bytes_per_pixel;
        transport.read_exact(payload, "priming pixel data")?;
    }
    Ok(())
}
