//! Heavy moderation worker pool
//!
//! A bounded queue of post ids drained by a small fixed pool of worker
//! tasks. Each task re-reads the stored row, decrypts it, asks the external
//! classifier for a verdict, and appends a flag if the content is abusive.
//!
//! Heavy moderation is defense-in-depth, not a gate: enqueue never blocks a
//! submitter (a full queue drops the task with a warning), and every failure
//! inside a worker is swallowed and logged. With the classifier completely
//! unreachable the pipeline stays available and the light gate stands alone.

use bson::{doc, oid::ObjectId};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::crypto::EncryptionService;
use crate::db::schemas::{CheckedBy, FlagAction, FlagDoc, PostDoc};
use crate::db::MongoCollection;
use crate::moderation::classifier::ClassifierClient;
use crate::moderation::flags::FlagStore;

/// Severity recorded for classifier-produced flags
const HEAVY_SEVERITY: i32 = 3;

/// Everything a worker needs to process one task.
///
/// The pool takes the encryption service directly rather than going through
/// the submission service - sharing the leaf dependency is what breaks the
/// orchestrator/pool construction cycle.
pub struct HeavyWorkerDeps {
    pub posts: MongoCollection<PostDoc>,
    pub encryption: Arc<EncryptionService>,
    pub classifier: Arc<ClassifierClient>,
    pub flags: Arc<FlagStore>,
}

/// Enqueue handle for heavy-check tasks.
///
/// Cloneable; held by the submission service. The queue is the only coupling
/// between the synchronous pipeline and the worker pool.
#[derive(Clone)]
pub struct HeavyQueue {
    tx: mpsc::Sender<ObjectId>,
}

impl HeavyQueue {
    /// Create a bounded queue, returning the receiver for the worker pool.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<ObjectId>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueue a post for deep re-screening. Non-blocking, best-effort: a
    /// full queue drops the task and the submitter never learns about it.
    pub fn enqueue(&self, post_id: ObjectId) {
        match self.tx.try_send(post_id) {
            Ok(()) => debug!(post_id = %post_id, "Queued post for heavy analysis"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(post_id = %post_id, "Heavy-check queue full, skipping heavy moderation");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(post_id = %post_id, "Heavy-check workers stopped, skipping heavy moderation");
            }
        }
    }
}

/// Spawn the fixed pool of worker tasks over a shared receiver.
pub fn spawn_workers(
    worker_count: usize,
    rx: mpsc::Receiver<ObjectId>,
    deps: HeavyWorkerDeps,
) {
    let rx = Arc::new(Mutex::new(rx));
    let deps = Arc::new(deps);

    info!("Starting heavy moderation pool with {} workers", worker_count);

    for i in 0..worker_count {
        let rx = Arc::clone(&rx);
        let deps = Arc::clone(&deps);

        tokio::spawn(async move {
            worker_task(i, rx, deps).await;
        });
    }
}

/// Worker task: drain the shared queue until it closes.
async fn worker_task(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<ObjectId>>>,
    deps: Arc<HeavyWorkerDeps>,
) {
    info!("Heavy worker {} waiting for tasks", worker_id);

    loop {
        // Hold the lock only for the dequeue so a slow classifier call on
        // this task never blocks the other workers.
        let post_id = {
            let mut rx = rx.lock().await;
            match rx.recv().await {
                Some(id) => id,
                None => {
                    info!("Heavy worker {} shutting down (queue closed)", worker_id);
                    return;
                }
            }
        };

        process_post(worker_id, &deps, post_id).await;
    }
}

/// Process one queued post. Every failure mode logs and abandons the task -
/// the content stays unflagged by the heavy path and light-gate coverage
/// stands.
async fn process_post(worker_id: usize, deps: &HeavyWorkerDeps, post_id: ObjectId) {
    debug!(worker = worker_id, post_id = %post_id, "Processing heavy check");

    // 1. Re-read the stored row; it may have been hard-deleted externally
    let post = match deps.posts.find_one(doc! { "_id": post_id }).await {
        Ok(Some(post)) => post,
        Ok(None) => {
            warn!(worker = worker_id, post_id = %post_id, "Post not found, abandoning heavy check");
            return;
        }
        Err(e) => {
            warn!(worker = worker_id, post_id = %post_id, error = %e, "Failed to fetch post");
            return;
        }
    };

    let community_id = match Uuid::parse_str(&post.community_id) {
        Ok(id) => id,
        Err(_) => {
            warn!(worker = worker_id, post_id = %post_id, "Post has malformed community id");
            return;
        }
    };

    // 2. Decrypt
    let content = match deps
        .encryption
        .decrypt(community_id, &post.encrypted_body)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            warn!(worker = worker_id, post_id = %post_id, error = %e, "Decrypt failed");
            return;
        }
    };

    // 3. Classify under the client's bounded timeout. No retry here.
    let analysis = match deps.classifier.analyze(&content).await {
        Ok(a) => a,
        Err(e) => {
            warn!(worker = worker_id, post_id = %post_id, error = %e, "Classifier unavailable");
            return;
        }
    };

    debug!(
        worker = worker_id,
        post_id = %post_id,
        abusive = analysis.is_abusive,
        confidence = analysis.confidence_score,
        "Heavy analysis complete"
    );

    // 4. Flag if abusive
    if analysis.is_abusive {
        let reason = match analysis.top_label() {
            Some(label) => format!("classifier: {}", label),
            None => "classifier: toxic content".to_string(),
        };

        let flag = FlagDoc::for_post(
            post_id,
            reason.clone(),
            CheckedBy::HeavyModel,
            FlagAction::Marked,
            HEAVY_SEVERITY,
            analysis.confidence_score,
        );

        if let Err(e) = deps.flags.record(flag).await {
            warn!(worker = worker_id, post_id = %post_id, error = %e, "Failed to record heavy flag");
        } else {
            info!(worker = worker_id, post_id = %post_id, reason = %reason, "Flagged post");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_is_nonblocking_past_capacity() {
        // No workers draining: the channel fills to capacity and every
        // further enqueue must return immediately without erroring.
        let (queue, _rx) = HeavyQueue::bounded(4);

        for _ in 0..20 {
            queue.enqueue(ObjectId::new());
        }
    }

    #[tokio::test]
    async fn test_enqueue_after_workers_stopped() {
        let (queue, rx) = HeavyQueue::bounded(4);
        drop(rx);

        // Closed channel: dropped with a warning, no panic, no error
        queue.enqueue(ObjectId::new());
    }

    #[tokio::test]
    async fn test_queue_preserves_capacity_worth_of_tasks() {
        let (queue, mut rx) = HeavyQueue::bounded(2);

        queue.enqueue(ObjectId::new());
        queue.enqueue(ObjectId::new());
        queue.enqueue(ObjectId::new()); // dropped

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }
}
