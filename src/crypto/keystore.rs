//! Per-community key ownership.
//!
//! Keys are created lazily on first use, persisted exactly once, and never
//! re-generated. Decoded key material is cached in memory and zeroized on
//! eviction or shutdown.
//!
//! # First-use race
//!
//! Two submissions can hit a fresh community at the same time. Both generate
//! a candidate key and race the insert; the unique index on `community_id`
//! lets exactly one win. The loser treats the duplicate-key error as "someone
//! else already created it" and re-reads. One community's race never blocks
//! another's.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bson::doc;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroize;

use crate::crypto::cipher::{generate_random_bytes, KEY_LEN};
use crate::db::schemas::CommunityKeyDoc;
use crate::db::MongoCollection;
use crate::types::{RefugeError, Result};

/// A cached community key. Zeroized when dropped.
struct CachedKey {
    bytes: [u8; KEY_LEN],
}

impl CachedKey {
    fn material(&self) -> [u8; KEY_LEN] {
        self.bytes
    }
}

impl Drop for CachedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Store of per-community symmetric keys.
///
/// Backed by the `encryption_keys` collection, fronted by an in-memory cache.
/// A memory-only store (no collection) backs unit tests; keys then live only
/// as long as the process.
pub struct KeyStore {
    cache: DashMap<Uuid, CachedKey>,
    collection: Option<MongoCollection<CommunityKeyDoc>>,
}

impl KeyStore {
    /// Create a key store over the persisted key collection.
    pub fn new(collection: MongoCollection<CommunityKeyDoc>) -> Self {
        Self {
            cache: DashMap::new(),
            collection: Some(collection),
        }
    }

    /// Create a memory-only key store (tests; keys are not persisted).
    pub fn memory_only() -> Self {
        Self {
            cache: DashMap::new(),
            collection: None,
        }
    }

    /// Get the community's key, creating and persisting it on first use.
    pub async fn get_or_create(&self, community_id: Uuid) -> Result<[u8; KEY_LEN]> {
        if let Some(cached) = self.cache.get(&community_id) {
            return Ok(cached.material());
        }

        let Some(collection) = &self.collection else {
            // Memory-only: the entry shard lock makes first-use atomic
            let entry = self.cache.entry(community_id).or_insert_with(|| CachedKey {
                bytes: generate_random_bytes(),
            });
            return Ok(entry.material());
        };

        let filter = doc! { "community_id": community_id.to_string() };

        if let Some(existing) = collection.find_one(filter.clone()).await? {
            let key = decode_key_material(&existing.key_material)?;
            self.cache.insert(community_id, CachedKey { bytes: key });
            return Ok(key);
        }

        // First use: generate and race the insert
        let key: [u8; KEY_LEN] = generate_random_bytes();
        let key_doc = CommunityKeyDoc::new(community_id, BASE64.encode(key));

        match collection.inner().insert_one(key_doc).await {
            Ok(_) => {
                debug!(community_id = %community_id, "Created community encryption key");
                self.cache.insert(community_id, CachedKey { bytes: key });
                Ok(key)
            }
            Err(e) if is_duplicate_key(&e) => {
                // Lost the race - another task persisted first. Use theirs.
                let winner = collection.find_one(filter).await?.ok_or_else(|| {
                    RefugeError::Database("key row vanished after duplicate insert".into())
                })?;
                let key = decode_key_material(&winner.key_material)?;
                self.cache.insert(community_id, CachedKey { bytes: key });
                Ok(key)
            }
            Err(e) => Err(RefugeError::Database(format!(
                "failed inserting encryption key: {}",
                e
            ))),
        }
    }

    /// Number of cached keys
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

/// Decode stored key material, verifying the key length.
fn decode_key_material(encoded: &str) -> Result<[u8; KEY_LEN]> {
    let raw = BASE64
        .decode(encoded)
        .map_err(|_| RefugeError::Encryption("invalid key encoding".into()))?;

    raw.as_slice()
        .try_into()
        .map_err(|_| RefugeError::Encryption(format!("invalid key length: {}", raw.len())))
}

/// Whether a MongoDB write failed on the unique index (code 11000)
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // Persistence-backed paths (find/insert/duplicate-key re-read) require a
    // running MongoDB instance and live in integration territory.

    #[tokio::test]
    async fn test_memory_store_is_stable_per_community() {
        let store = KeyStore::memory_only();
        let community = Uuid::new_v4();

        let first = store.get_or_create(community).await.unwrap();
        let second = store.get_or_create(community).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.cached_len(), 1);
    }

    #[tokio::test]
    async fn test_communities_never_share_a_key() {
        let store = KeyStore::memory_only();

        let a = store.get_or_create(Uuid::new_v4()).await.unwrap();
        let b = store.get_or_create(Uuid::new_v4()).await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_decode_key_material_rejects_bad_length() {
        let short = BASE64.encode([0u8; 16]);
        assert!(decode_key_material(&short).is_err());
    }

    #[test]
    fn test_decode_key_material_rejects_bad_encoding() {
        assert!(decode_key_material("not-base64!!!").is_err());
    }
}
