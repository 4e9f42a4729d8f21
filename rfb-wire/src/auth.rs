//! Legacy VNC authentication (security type 2).
//!
//! The server sends a 16-byte random challenge; the client encrypts it with
//! DES in electronic-codebook mode and returns the ciphertext. The DES key
//! is derived from the password by VNC's peculiar convention: take at most
//! the first 8 bytes, zero-pad to exactly 8, then reverse the *bit order
//! within each byte* (not the byte order). The two 8-byte blocks of the
//! challenge are encrypted independently - no chaining, no padding.
//!
//! This scheme authenticates but does not protect the session; it is kept
//! for compatibility with servers that offer nothing else.

use des::cipher::{BlockEncrypt, KeyInit};
use des::Des;

/// Derive the 8-byte DES key from a password, VNC style.
pub fn vnc_key(password: &str) -> [u8; 8] {
    let mut key = [0u8; 8];
    for (slot, &byte) in key.iter_mut().zip(password.as_bytes().iter().take(8)) {
        *slot = byte.reverse_bits();
    }
    key
}

/// Encrypt a 16-byte challenge with the key derived from `password`.
pub fn encrypt_challenge(password: &str, challenge: &[u8; 16]) -> [u8; 16] {
    let cipher = Des::new(&vnc_key(password).into());

    let mut first = [0u8; 8];
    let mut second = [0u8; 8];
    first.copy_from_slice(&challenge[..8]);
    second.copy_from_slice(&challenge[8..]);
    cipher.encrypt_block((&mut first).into());
    cipher.encrypt_block((&mut second).into());

    let mut response = [0u8; 16];
    response[..8].copy_from_slice(&first);
    response[8..].copy_from_slice(&second);
    response
}
