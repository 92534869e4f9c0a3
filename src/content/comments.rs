//! Comment submission pipeline
//!
//! Comments run the same gate -> encrypt -> persist -> flag sequence as
//! posts, scoped to the parent post's community key, plus thread bookkeeping:
//! reply depth resolution and post/parent counter bumps. Comments are not
//! broadcast and not heavy-checked.

use bson::{doc, oid::ObjectId};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::crypto::EncryptionService;
use crate::db::schemas::{
    CheckedBy, CommentDoc, CommentView, CreateCommentRequest, FlagAction, FlagDoc, PostDoc,
    MAX_COMMENT_DEPTH,
};
use crate::db::MongoCollection;
use crate::moderation::gate;
use crate::moderation::FlagStore;
use crate::types::{RefugeError, Result};

/// Comment submission service.
pub struct CommentService {
    comments: MongoCollection<CommentDoc>,
    posts: MongoCollection<PostDoc>,
    encryption: Arc<EncryptionService>,
    flags: Arc<FlagStore>,
}

impl CommentService {
    /// Create a comment service.
    pub fn new(
        comments: MongoCollection<CommentDoc>,
        posts: MongoCollection<PostDoc>,
        encryption: Arc<EncryptionService>,
        flags: Arc<FlagStore>,
    ) -> Self {
        Self {
            comments,
            posts,
            encryption,
            flags,
        }
    }

    /// Submit a comment under a post.
    pub async fn create_comment(
        &self,
        post_id: ObjectId,
        author_id: Uuid,
        req: CreateCommentRequest,
    ) -> Result<CommentView> {
        if req.content.trim().is_empty() {
            return Err(RefugeError::Validation("content must not be empty".into()));
        }

        // 1. Light gate over the body
        let verdict = gate::check(&req.content);
        if verdict.should_block {
            return Err(RefugeError::ContentBlocked(
                verdict.reason.clone().unwrap_or_else(|| "violations detected".into()),
            ));
        }

        // 2. The parent post anchors the community scope
        let post = self
            .posts
            .find_one(doc! { "_id": post_id })
            .await?
            .ok_or_else(|| RefugeError::NotFound("post not found".into()))?;
        if post.is_removed {
            return Err(RefugeError::NotFound("post has been removed".into()));
        }
        let community_id = Uuid::parse_str(&post.community_id)
            .map_err(|_| RefugeError::Internal("malformed community id".into()))?;

        // 3. Resolve reply depth
        let (parent_id, depth) = match &req.parent_id {
            None => (None, 0),
            Some(raw) => {
                let parent_oid = ObjectId::parse_str(raw)
                    .map_err(|_| RefugeError::Validation("invalid parent comment id".into()))?;
                let parent = self
                    .comments
                    .find_one(doc! { "_id": parent_oid, "post_id": post_id })
                    .await?
                    .ok_or_else(|| RefugeError::NotFound("parent comment not found".into()))?;

                let depth = parent.depth + 1;
                if depth > MAX_COMMENT_DEPTH {
                    return Err(RefugeError::Validation("reply depth limit reached".into()));
                }
                (Some(parent_oid), depth)
            }
        };

        // 4. Encrypt and persist
        let encrypted_body = self.encryption.encrypt(community_id, &req.content).await?;

        let comment_id = self
            .comments
            .insert_one(CommentDoc::new(
                community_id,
                post_id,
                author_id,
                parent_id,
                encrypted_body,
                depth,
            ))
            .await?;

        let comment = self
            .comments
            .find_one(doc! { "_id": comment_id })
            .await?
            .ok_or_else(|| RefugeError::Internal("comment vanished after insert".into()))?;

        // 5. Counters and flags are best-effort once the row is stored
        if let Err(e) = self
            .posts
            .update_one(doc! { "_id": post_id }, doc! { "$inc": { "comment_count": 1 } })
            .await
        {
            warn!(post_id = %post_id, error = %e, "Failed to bump comment count");
        }

        if let Some(parent_oid) = parent_id {
            if let Err(e) = self
                .comments
                .update_one(doc! { "_id": parent_oid }, doc! { "$inc": { "reply_count": 1 } })
                .await
            {
                warn!(parent_id = %parent_oid, error = %e, "Failed to bump reply count");
            }
        }

        if verdict.flagged {
            let flag = FlagDoc::for_comment(
                post_id,
                comment_id,
                verdict.reason.clone().unwrap_or_else(|| "flagged".into()),
                CheckedBy::LightModel,
                FlagAction::Marked,
                verdict.severity_level,
                verdict.confidence_score,
            );
            if let Err(e) = self.flags.record(flag).await {
                warn!(comment_id = %comment_id, error = %e, "Failed to record light moderation flag");
            }
        }

        self.view_of(&comment, verdict.flagged).await
    }

    /// List a post's comments, oldest first.
    pub async fn list_comments(&self, post_id: ObjectId) -> Result<Vec<CommentView>> {
        let comments = self
            .comments
            .find_many_sorted(
                doc! { "post_id": post_id, "is_removed": false },
                doc! { "metadata.created_at": 1 },
                1000,
            )
            .await?;

        let mut views = Vec::with_capacity(comments.len());
        for comment in &comments {
            // TODO: batch the per-comment flag lookup into one query
            let flagged = match comment._id {
                Some(id) => self.flags.comment_flagged(id).await.unwrap_or(false),
                None => false,
            };
            views.push(self.view_of(comment, flagged).await?);
        }
        Ok(views)
    }

    /// Decrypt a stored comment into its public view.
    async fn view_of(&self, comment: &CommentDoc, is_flagged: bool) -> Result<CommentView> {
        let comment_id = comment
            ._id
            .ok_or_else(|| RefugeError::Internal("comment row missing id".into()))?;
        let community_id = Uuid::parse_str(&comment.community_id)
            .map_err(|_| RefugeError::Internal("malformed community id".into()))?;

        let content = self
            .encryption
            .decrypt(community_id, &comment.encrypted_body)
            .await?;

        Ok(CommentView {
            id: comment_id.to_hex(),
            community_id: comment.community_id.clone(),
            post_id: comment.post_id.to_hex(),
            author_id: comment.author_id.clone(),
            parent_id: comment.parent_id.map(|p| p.to_hex()),
            content,
            depth: comment.depth,
            like_count: comment.like_count,
            reply_count: comment.reply_count,
            created_at: comment.metadata.created_at.map(|d| d.to_chrono()),
            is_flagged,
        })
    }
}

#[cfg(test)]
mod tests {
    // Comment persistence paths require a running MongoDB instance; the gate
    // and crypto stages carry their own unit tests.
}
