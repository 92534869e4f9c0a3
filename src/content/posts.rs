//! Post submission pipeline
//!
//! The orchestrator for creating and editing posts. Within one submission
//! the stages run strictly in order:
//!
//! gate -> encrypt -> persist -> record flag -> broadcast -> enqueue heavy
//!
//! A blocking gate verdict aborts before anything is stored. Everything
//! after the persist stage is best-effort: the row is already durably and
//! safely stored, so flag-write, broadcast and enqueue failures are logged
//! and never surfaced to the caller.

use bson::{doc, oid::ObjectId};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::crypto::EncryptionService;
use crate::db::schemas::{
    CheckedBy, CreatePostRequest, FlagAction, FlagDoc, PostDoc, PostView, UpdatePostRequest,
};
use crate::db::MongoCollection;
use crate::moderation::gate::{self, Verdict};
use crate::moderation::{FlagStore, HeavyQueue};
use crate::stream::{StreamRegistry, EVENT_POST_CREATED, EVENT_POST_UPDATED};
use crate::types::{RefugeError, Result};

/// Accepted content types for a post
const CONTENT_TYPES: &[&str] = &["text", "image", "link"];

/// Query parameters for listing a community's posts
#[derive(Debug, Default)]
pub struct ListPostsQuery {
    pub limit: i64,
    pub before: Option<chrono::DateTime<chrono::Utc>>,
    pub author_id: Option<Uuid>,
    pub content_type: Option<String>,
}

/// Post submission service.
pub struct PostService {
    posts: MongoCollection<PostDoc>,
    encryption: Arc<EncryptionService>,
    flags: Arc<FlagStore>,
    stream: StreamRegistry,
    heavy: HeavyQueue,
}

impl PostService {
    /// Create a post service.
    ///
    /// The heavy queue is constructed independently and injected here; the
    /// worker pool behind it holds the encryption service directly.
    pub fn new(
        posts: MongoCollection<PostDoc>,
        encryption: Arc<EncryptionService>,
        flags: Arc<FlagStore>,
        stream: StreamRegistry,
        heavy: HeavyQueue,
    ) -> Self {
        Self {
            posts,
            encryption,
            flags,
            stream,
            heavy,
        }
    }

    /// Submit a new post to a community.
    pub async fn create_post(
        &self,
        community_id: Uuid,
        author_id: Uuid,
        req: CreatePostRequest,
    ) -> Result<PostView> {
        if req.content.trim().is_empty() {
            return Err(RefugeError::Validation("content must not be empty".into()));
        }
        if !CONTENT_TYPES.contains(&req.content_type.as_str()) {
            return Err(RefugeError::Validation(format!(
                "unknown content type '{}'",
                req.content_type
            )));
        }

        // 1. Light gate over title and body together
        let verdict = gate::check(&format!("{} {}", req.title, req.content));
        if verdict.should_block {
            return Err(blocked(&verdict));
        }

        // 2. Encrypt each field independently under the community key
        let encrypted_title = self.encryption.encrypt(community_id, &req.title).await?;
        let encrypted_body = self.encryption.encrypt(community_id, &req.content).await?;

        // 3. Persist
        let post_id = self
            .posts
            .insert_one(PostDoc::new(
                community_id,
                author_id,
                encrypted_title,
                encrypted_body,
                req.content_type,
                req.image_url,
            ))
            .await?;

        let post = self
            .posts
            .find_one(doc! { "_id": post_id })
            .await?
            .ok_or_else(|| RefugeError::Internal("post vanished after insert".into()))?;

        // 4. Record the light flag - the row is stored, failures only log
        self.record_light_flag(post_id, &verdict).await;

        // 5. Broadcast the decrypted view to live viewers
        let view = self.view_of(&post).await?;
        match serde_json::to_value(&view) {
            Ok(payload) => self.stream.broadcast(community_id, EVENT_POST_CREATED, payload),
            Err(e) => warn!(post_id = %post_id, error = %e, "Failed to serialize broadcast payload"),
        }

        // 6. Queue deep re-screening
        self.heavy.enqueue(post_id);

        Ok(view)
    }

    /// Edit an existing post. Only the author may edit, and removed posts
    /// reject edits.
    pub async fn update_post(
        &self,
        post_id: ObjectId,
        author_id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<PostView> {
        let post = self
            .posts
            .find_one(doc! { "_id": post_id })
            .await?
            .ok_or_else(|| RefugeError::NotFound("post not found".into()))?;

        if post.author_id != author_id.to_string() {
            return Err(RefugeError::Unauthorized(
                "only the author may edit a post".into(),
            ));
        }
        if post.is_removed {
            return Err(RefugeError::NotFound("post has been removed".into()));
        }
        if req.content.trim().is_empty() {
            return Err(RefugeError::Validation("content must not be empty".into()));
        }

        let community_id = parse_community(&post.community_id)?;

        // Edits can introduce toxicity: gate the new text before anything
        let check_text = if req.title.is_empty() {
            req.content.clone()
        } else {
            format!("{} {}", req.title, req.content)
        };
        let verdict = gate::check(&check_text);
        if verdict.should_block {
            return Err(blocked(&verdict));
        }

        // Empty title keeps the existing ciphertext
        let encrypted_title = if req.title.is_empty() {
            post.encrypted_title.clone()
        } else {
            self.encryption.encrypt(community_id, &req.title).await?
        };
        let encrypted_body = self.encryption.encrypt(community_id, &req.content).await?;

        let mut set = doc! {
            "encrypted_title": encrypted_title,
            "encrypted_body": encrypted_body,
            "is_edited": true,
        };
        if let Some(url) = &req.image_url {
            set.insert("image_url", url.clone());
        }

        self.posts
            .update_one(doc! { "_id": post_id }, doc! { "$set": set })
            .await?;

        let post = self
            .posts
            .find_one(doc! { "_id": post_id })
            .await?
            .ok_or_else(|| RefugeError::Internal("post vanished after update".into()))?;

        self.record_light_flag(post_id, &verdict).await;

        let view = self.view_of(&post).await?;
        match serde_json::to_value(&view) {
            Ok(payload) => self.stream.broadcast(community_id, EVENT_POST_UPDATED, payload),
            Err(e) => warn!(post_id = %post_id, error = %e, "Failed to serialize broadcast payload"),
        }

        self.heavy.enqueue(post_id);

        Ok(view)
    }

    /// Soft-delete a post. The row is never physically deleted.
    pub async fn delete_post(&self, post_id: ObjectId, author_id: Uuid) -> Result<()> {
        let result = self
            .posts
            .update_one(
                doc! {
                    "_id": post_id,
                    "author_id": author_id.to_string(),
                    "is_removed": false,
                },
                doc! { "$set": { "is_removed": true } },
            )
            .await?;

        if result.matched_count > 0 {
            return Ok(());
        }

        // Tell the caller which precondition failed
        match self.posts.find_one(doc! { "_id": post_id }).await? {
            None => Err(RefugeError::NotFound("post not found".into())),
            Some(post) if post.is_removed => {
                Err(RefugeError::NotFound("post has been removed".into()))
            }
            Some(_) => Err(RefugeError::Unauthorized(
                "only the author may remove a post".into(),
            )),
        }
    }

    /// Record a user report against a post.
    pub async fn report_post(&self, post_id: ObjectId, reason: &str) -> Result<()> {
        self.posts
            .find_one(doc! { "_id": post_id })
            .await?
            .ok_or_else(|| RefugeError::NotFound("post not found".into()))?;

        self.flags
            .record(FlagDoc::for_post(
                post_id,
                format!("report: {}", reason),
                CheckedBy::UserReport,
                FlagAction::Reported,
                1,
                1.0,
            ))
            .await
    }

    /// Fetch one post as its decrypted public view.
    pub async fn get_post(&self, post_id: ObjectId) -> Result<PostView> {
        let post = self
            .posts
            .find_one(doc! { "_id": post_id })
            .await?
            .ok_or_else(|| RefugeError::NotFound("post not found".into()))?;

        self.view_of(&post).await
    }

    /// List a community's posts, newest first.
    pub async fn list_posts(
        &self,
        community_id: Uuid,
        query: ListPostsQuery,
    ) -> Result<Vec<PostView>> {
        let limit = if query.limit <= 0 || query.limit > 50 {
            20
        } else {
            query.limit
        };

        let mut filter = doc! { "community_id": community_id.to_string() };
        if let Some(before) = query.before {
            filter.insert(
                "metadata.created_at",
                doc! { "$lt": bson::DateTime::from_chrono(before) },
            );
        }
        if let Some(author) = query.author_id {
            filter.insert("author_id", author.to_string());
        }
        if let Some(content_type) = &query.content_type {
            filter.insert("content_type", content_type.clone());
        }

        let posts = self
            .posts
            .find_many_sorted(filter, doc! { "metadata.created_at": -1 }, limit)
            .await?;

        let mut views = Vec::with_capacity(posts.len());
        for post in &posts {
            views.push(self.view_of(post).await?);
        }
        Ok(views)
    }

    /// Write the light-gate flag if the verdict asked for one. Best-effort.
    async fn record_light_flag(&self, post_id: ObjectId, verdict: &Verdict) {
        if !verdict.flagged {
            return;
        }

        let reason = verdict.reason.clone().unwrap_or_else(|| "flagged".into());
        let flag = FlagDoc::for_post(
            post_id,
            reason,
            CheckedBy::LightModel,
            FlagAction::Marked,
            verdict.severity_level,
            verdict.confidence_score,
        );

        if let Err(e) = self.flags.record(flag).await {
            warn!(post_id = %post_id, error = %e, "Failed to record light moderation flag");
        }
    }

    /// Decrypt a stored row into its public view, attaching the
    /// highest-severity moderation status.
    async fn view_of(&self, post: &PostDoc) -> Result<PostView> {
        let post_id = post
            ._id
            .ok_or_else(|| RefugeError::Internal("post row missing id".into()))?;
        let community_id = parse_community(&post.community_id)?;

        // Legacy rows may carry an empty or undecryptable title; the body is
        // the content contract and must decrypt
        let title = self
            .encryption
            .decrypt(community_id, &post.encrypted_title)
            .await
            .unwrap_or_default();
        let content = self
            .encryption
            .decrypt(community_id, &post.encrypted_body)
            .await?;

        let moderation = match self.flags.status_for_post(post_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(post_id = %post_id, error = %e, "Failed to fetch moderation flags");
                None
            }
        };

        Ok(PostView {
            id: post_id.to_hex(),
            community_id: post.community_id.clone(),
            author_id: post.author_id.clone(),
            title,
            content,
            content_type: post.content_type.clone(),
            image_url: post.image_url.clone(),
            like_count: post.like_count,
            comment_count: post.comment_count,
            created_at: post.metadata.created_at.map(|d| d.to_chrono()),
            updated_at: post.metadata.updated_at.map(|d| d.to_chrono()),
            is_edited: post.is_edited,
            is_removed: post.is_removed,
            moderation,
        })
    }
}

fn parse_community(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| RefugeError::Internal(format!("malformed community id '{}'", raw)))
}

fn blocked(verdict: &Verdict) -> RefugeError {
    RefugeError::ContentBlocked(
        verdict
            .reason
            .clone()
            .unwrap_or_else(|| "violations detected".into()),
    )
}

#[cfg(test)]
mod tests {
    // The submission pipeline reads and writes MongoDB at every stage; it is
    // covered by integration tests against a running instance. The gate,
    // crypto, fan-out and queue stages it composes each carry their own unit
    // tests.
}
