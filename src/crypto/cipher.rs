//! Authenticated encryption primitive for community content.
//!
//! # Algorithm
//!
//! ChaCha20-Poly1305 with a fresh random 96-bit nonce per seal. The sealed
//! form is `nonce || ciphertext || tag`, so a payload is self-contained and
//! the key row never stores nonces.

use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::types::{RefugeError, Result};

/// Symmetric key length (32 bytes)
pub const KEY_LEN: usize = 32;

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_LEN: usize = 12;

/// Poly1305 auth tag length (16 bytes)
pub const AUTH_TAG_LEN: usize = 16;

/// Generate cryptographically secure random bytes.
pub fn generate_random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Seal a plaintext under a community key.
///
/// Every call draws a fresh nonce; sealing the same plaintext twice produces
/// different bytes.
///
/// # Returns
///
/// `nonce || ciphertext || tag`.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce: [u8; NONCE_LEN] = generate_random_bytes();

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| RefugeError::Encryption("seal failed".into()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open a sealed payload under a community key.
///
/// The auth tag is verified before any plaintext is returned. All failure
/// modes (truncated payload, tampered bytes, wrong key) collapse into the
/// same error - callers learn nothing about which check failed.
pub fn open(key: &[u8; KEY_LEN], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + AUTH_TAG_LEN {
        return Err(RefugeError::Encryption("ciphertext too short".into()));
    }

    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| RefugeError::Encryption("authentication failed".into()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bytes() {
        let a: [u8; KEY_LEN] = generate_random_bytes();
        let b: [u8; KEY_LEN] = generate_random_bytes();
        assert_ne!(a, b);
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key: [u8; KEY_LEN] = generate_random_bytes();
        let plaintext = b"Hello world, great day!";

        let sealed = seal(&key, plaintext).unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + plaintext.len() + AUTH_TAG_LEN);

        let opened = open(&key, &sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_seal_draws_fresh_nonce() {
        let key: [u8; KEY_LEN] = generate_random_bytes();
        let a = seal(&key, b"same text").unwrap();
        let b = seal(&key, b"same text").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_open_rejects_every_single_byte_tamper() {
        let key: [u8; KEY_LEN] = generate_random_bytes();
        let sealed = seal(&key, b"integrity matters").unwrap();

        for i in 0..sealed.len() {
            let mut tampered = sealed.clone();
            tampered[i] ^= 0x01;
            assert!(open(&key, &tampered).is_err(), "byte {} accepted", i);
        }
    }

    #[test]
    fn test_open_rejects_wrong_key() {
        let key: [u8; KEY_LEN] = generate_random_bytes();
        let other: [u8; KEY_LEN] = generate_random_bytes();

        let sealed = seal(&key, b"secret").unwrap();
        assert!(open(&other, &sealed).is_err());
    }

    #[test]
    fn test_open_rejects_truncated_payload() {
        let key: [u8; KEY_LEN] = generate_random_bytes();
        assert!(open(&key, &[0u8; NONCE_LEN]).is_err());
        assert!(open(&key, b"").is_err());
    }
}
