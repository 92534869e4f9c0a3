//! Post document schema and public views
//!
//! Title and body are stored ciphertext-only; they are opaque to every
//! component except the encryption service. Removal is a soft flag.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for posts
pub const POST_COLLECTION: &str = "posts";

/// Post document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Community scope (canonical UUID text form)
    pub community_id: String,

    /// Author identity as supplied by the upstream gateway
    pub author_id: String,

    /// Encrypted title (base64 nonce-ciphertext-tag)
    pub encrypted_title: String,

    /// Encrypted body (base64 nonce-ciphertext-tag)
    pub encrypted_body: String,

    /// Content type: text, image or link
    pub content_type: String,

    /// Optional media URL (not encrypted, carries no authored text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Like counter, maintained outside this pipeline
    #[serde(default)]
    pub like_count: i64,

    /// Comment counter
    #[serde(default)]
    pub comment_count: i64,

    /// Whether the post has been edited
    #[serde(default)]
    pub is_edited: bool,

    /// Soft removal flag - removed posts are never physically deleted
    #[serde(default)]
    pub is_removed: bool,
}

impl PostDoc {
    /// Create a new post document with zeroed counters
    pub fn new(
        community_id: Uuid,
        author_id: Uuid,
        encrypted_title: String,
        encrypted_body: String,
        content_type: String,
        image_url: Option<String>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            community_id: community_id.to_string(),
            author_id: author_id.to_string(),
            encrypted_title,
            encrypted_body,
            content_type,
            image_url,
            like_count: 0,
            comment_count: 0,
            is_edited: false,
            is_removed: false,
        }
    }
}

impl IntoIndexes for PostDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Community feed queries sort newest-first
            (
                doc! { "community_id": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("community_created_index".to_string())
                        .build(),
                ),
            ),
            // Author filter within a community
            (
                doc! { "author_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("author_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PostDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

// =============================================================================
// Requests and views
// =============================================================================

/// Incoming payload for post creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub content_type: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Incoming payload for a post edit. An empty title keeps the existing one.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Public moderation status derived from the highest-severity flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationStatus {
    pub is_flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub severity_level: i32,
}

/// Decrypted public view of a post
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    /// Post id (ObjectId hex)
    pub id: String,
    pub community_id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_edited: bool,
    pub is_removed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation: Option<ModerationStatus>,
}
