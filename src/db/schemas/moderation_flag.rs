//! Moderation flag document schema
//!
//! Append-only: a content item accumulates flags from the light gate, the
//! heavy worker and user reports. Nothing in this pipeline mutates or deletes
//! a flag once written; the highest severity determines the public status.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for moderation flags
pub const FLAG_COLLECTION: &str = "moderation_flags";

/// Which check produced a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckedBy {
    /// Synchronous lexical gate, pre-persistence
    LightModel,
    /// Asynchronous classifier, post-persistence
    HeavyModel,
    /// A user report against existing content
    UserReport,
}

/// Action recorded alongside a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagAction {
    /// Content stays visible, flagged for moderators
    Marked,
    /// Content reported by a user, pending review
    Reported,
}

/// Moderation flag stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FlagDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Flagged post
    pub post_id: ObjectId,

    /// Flagged comment, when the flag targets a comment rather than the post
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<ObjectId>,

    /// Human-readable reason (category or matched phrase)
    pub reason: String,

    /// Which check produced this flag
    pub checked_by: CheckedBy,

    /// Action taken
    pub action: FlagAction,

    /// Severity, 1 (lowest) to 5 (highest)
    pub severity_level: i32,

    /// Confidence of the producing check, 0.0 to 1.0
    pub confidence_score: f64,

    /// Whether a moderator has been notified (always false at write time)
    #[serde(default)]
    pub notified_moderator: bool,

    /// When the flag was raised
    pub flagged_at: DateTime,
}

impl FlagDoc {
    /// Create a flag against a post
    pub fn for_post(
        post_id: ObjectId,
        reason: String,
        checked_by: CheckedBy,
        action: FlagAction,
        severity_level: i32,
        confidence_score: f64,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            post_id,
            comment_id: None,
            reason,
            checked_by,
            action,
            severity_level,
            confidence_score,
            notified_moderator: false,
            flagged_at: DateTime::now(),
        }
    }

    /// Create a flag against a comment
    pub fn for_comment(
        post_id: ObjectId,
        comment_id: ObjectId,
        reason: String,
        checked_by: CheckedBy,
        action: FlagAction,
        severity_level: i32,
        confidence_score: f64,
    ) -> Self {
        Self {
            comment_id: Some(comment_id),
            ..Self::for_post(
                post_id,
                reason,
                checked_by,
                action,
                severity_level,
                confidence_score,
            )
        }
    }
}

impl IntoIndexes for FlagDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Highest-severity lookup per post
            (
                doc! { "post_id": 1, "severity_level": -1 },
                Some(
                    IndexOptions::builder()
                        .name("post_severity_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for FlagDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
