//! Community encryption key document schema
//!
//! One row per community, created lazily on first use and immutable after.
//! The unique index on `community_id` is what arbitrates concurrent first-use:
//! the losing writer sees a duplicate-key error and re-reads.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for community encryption keys
pub const KEY_COLLECTION: &str = "encryption_keys";

/// Community encryption key stored in MongoDB
///
/// `key_material` never leaves the crypto module; no other component reads
/// this collection.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommunityKeyDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Community this key belongs to (canonical UUID text form)
    pub community_id: String,

    /// 32-byte symmetric key, base64 encoded
    pub key_material: String,

    /// Key version, 1 until rotation exists
    pub key_version: i32,

    /// Set when the key is rotated out. Rotation is not implemented; the
    /// field keeps the schema from precluding it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotated_at: Option<bson::DateTime>,
}

impl CommunityKeyDoc {
    /// Create a new key document for a community
    pub fn new(community_id: Uuid, key_material: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            community_id: community_id.to_string(),
            key_material,
            key_version: 1,
            rotated_at: None,
        }
    }
}

impl IntoIndexes for CommunityKeyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on community_id - exactly one active key per community
            (
                doc! { "community_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("community_id_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for CommunityKeyDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
