//! Comment document schema and public view
//!
//! Comments thread up to a fixed depth under a post. The body is
//! ciphertext-only, scoped to the post's community key.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for comments
pub const COMMENT_COLLECTION: &str = "comments";

/// Maximum reply nesting depth
pub const MAX_COMMENT_DEPTH: i32 = 5;

/// Comment document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommentDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Community scope (canonical UUID text form)
    pub community_id: String,

    /// Post this comment belongs to
    pub post_id: ObjectId,

    /// Author identity as supplied by the upstream gateway
    pub author_id: String,

    /// Parent comment for replies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ObjectId>,

    /// Encrypted body (base64 nonce-ciphertext-tag)
    pub encrypted_body: String,

    /// Nesting depth, 0 for top-level comments
    pub depth: i32,

    /// Like counter, maintained outside this pipeline
    #[serde(default)]
    pub like_count: i64,

    /// Direct reply counter
    #[serde(default)]
    pub reply_count: i64,

    /// Soft removal flag
    #[serde(default)]
    pub is_removed: bool,
}

impl CommentDoc {
    /// Create a new comment document
    pub fn new(
        community_id: Uuid,
        post_id: ObjectId,
        author_id: Uuid,
        parent_id: Option<ObjectId>,
        encrypted_body: String,
        depth: i32,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            community_id: community_id.to_string(),
            post_id,
            author_id: author_id.to_string(),
            parent_id,
            encrypted_body,
            depth,
            like_count: 0,
            reply_count: 0,
            is_removed: false,
        }
    }
}

impl IntoIndexes for CommentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Comment listing is per-post, oldest-first
            (
                doc! { "post_id": 1, "metadata.created_at": 1 },
                Some(
                    IndexOptions::builder()
                        .name("post_created_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for CommentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

// =============================================================================
// Requests and views
// =============================================================================

/// Incoming payload for comment creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    /// Parent comment id (ObjectId hex) when replying
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Decrypted public view of a comment
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    /// Comment id (ObjectId hex)
    pub id: String,
    pub community_id: String,
    pub post_id: String,
    pub author_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub content: String,
    pub depth: i32,
    pub like_count: i64,
    pub reply_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_flagged: bool,
}
