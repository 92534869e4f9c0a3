//! Moderation flag persistence
//!
//! Append-only writes plus the one read the public surface needs: the
//! highest-severity flag for a content item.

use bson::{doc, oid::ObjectId};
use tracing::info;

use crate::db::schemas::{FlagDoc, ModerationStatus};
use crate::db::MongoCollection;
use crate::types::Result;

/// Store for moderation flags.
pub struct FlagStore {
    collection: MongoCollection<FlagDoc>,
}

impl FlagStore {
    /// Create a flag store over the flag collection.
    pub fn new(collection: MongoCollection<FlagDoc>) -> Self {
        Self { collection }
    }

    /// Append a flag. Flags are never mutated or deleted by this pipeline.
    pub async fn record(&self, flag: FlagDoc) -> Result<()> {
        let post_id = flag.post_id;
        let checked_by = flag.checked_by;
        let severity = flag.severity_level;

        self.collection.insert_one(flag).await?;

        info!(
            post_id = %post_id,
            checked_by = ?checked_by,
            severity = severity,
            "Recorded moderation flag"
        );
        Ok(())
    }

    /// Public moderation status for a post: its highest-severity flag.
    pub async fn status_for_post(&self, post_id: ObjectId) -> Result<Option<ModerationStatus>> {
        let flag = self
            .collection
            .find_one_sorted(
                doc! { "post_id": post_id, "comment_id": { "$exists": false } },
                doc! { "severity_level": -1 },
            )
            .await?;

        Ok(flag.map(|f| ModerationStatus {
            is_flagged: true,
            reason: Some(f.reason),
            severity_level: f.severity_level,
        }))
    }

    /// Whether any flag targets the given comment.
    pub async fn comment_flagged(&self, comment_id: ObjectId) -> Result<bool> {
        let flag = self
            .collection
            .find_one(doc! { "comment_id": comment_id })
            .await?;
        Ok(flag.is_some())
    }
}

#[cfg(test)]
mod tests {
    // Flag reads and writes go straight to MongoDB; covered by integration
    // tests against a running instance.
}
