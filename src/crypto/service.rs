//! Encryption Service
//!
//! Composes the key store and the cipher into the string-in/string-out
//! contract the rest of the pipeline uses. Ciphertext fields everywhere else
//! in the crate are opaque base64 produced here.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use uuid::Uuid;

use crate::crypto::{cipher, keystore::KeyStore};
use crate::types::{RefugeError, Result};

/// Service for encrypting and decrypting community content.
pub struct EncryptionService {
    keystore: KeyStore,
}

impl EncryptionService {
    /// Create a new encryption service over a key store.
    pub fn new(keystore: KeyStore) -> Self {
        Self { keystore }
    }

    /// Encrypt plaintext under the community's key.
    ///
    /// Creates and persists the key on the community's first use. Each call
    /// seals under a fresh nonce.
    pub async fn encrypt(&self, community_id: Uuid, plaintext: &str) -> Result<String> {
        let key = self.keystore.get_or_create(community_id).await?;
        let sealed = cipher::seal(&key, plaintext.as_bytes())?;
        Ok(BASE64.encode(sealed))
    }

    /// Decrypt ciphertext under the community's key.
    ///
    /// Fails on malformed encoding, truncated payloads, or an authentication
    /// tag mismatch - never returns partial or corrupted plaintext.
    pub async fn decrypt(&self, community_id: Uuid, encoded: &str) -> Result<String> {
        let key = self.keystore.get_or_create(community_id).await?;

        let sealed = BASE64
            .decode(encoded)
            .map_err(|_| RefugeError::Encryption("invalid ciphertext encoding".into()))?;

        let plaintext = cipher::open(&key, &sealed)?;

        String::from_utf8(plaintext)
            .map_err(|_| RefugeError::Encryption("decrypted payload is not UTF-8".into()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> EncryptionService {
        EncryptionService::new(KeyStore::memory_only())
    }

    #[tokio::test]
    async fn test_encrypt_decrypt_roundtrip() {
        let svc = service();
        let community = Uuid::new_v4();

        let ciphertext = svc.encrypt(community, "Hello world, great day!").await.unwrap();
        assert_ne!(ciphertext, "Hello world, great day!");

        let plaintext = svc.decrypt(community, &ciphertext).await.unwrap();
        assert_eq!(plaintext, "Hello world, great day!");
    }

    #[tokio::test]
    async fn test_cross_community_decrypt_fails() {
        let svc = service();
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();

        let ciphertext = svc.encrypt(c1, "scoped to one community").await.unwrap();
        assert!(svc.decrypt(c2, &ciphertext).await.is_err());
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_fails() {
        let svc = service();
        let community = Uuid::new_v4();

        let ciphertext = svc.encrypt(community, "integrity").await.unwrap();
        let mut raw = BASE64.decode(&ciphertext).unwrap();
        let mid = raw.len() / 2;
        raw[mid] ^= 0x01;
        let tampered = BASE64.encode(raw);

        assert!(svc.decrypt(community, &tampered).await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_encoding_fails() {
        let svc = service();
        let community = Uuid::new_v4();

        assert!(svc.decrypt(community, "%%not base64%%").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_plaintext_roundtrips() {
        let svc = service();
        let community = Uuid::new_v4();

        let ciphertext = svc.encrypt(community, "").await.unwrap();
        assert_eq!(svc.decrypt(community, &ciphertext).await.unwrap(), "");
    }
}
