//! Refuge - encrypted content gateway for peer-support communities
//!
//! "The eternal God is thy refuge" - Deuteronomy 33:27

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refuge::{
    config::Args,
    content::{CommentService, PostService},
    crypto::{EncryptionService, KeyStore},
    db::schemas::{COMMENT_COLLECTION, FLAG_COLLECTION, KEY_COLLECTION, POST_COLLECTION},
    db::MongoClient,
    moderation::{worker, ClassifierClient, FlagStore, HeavyQueue, HeavyWorkerDeps},
    server,
    stream::StreamRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("refuge={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Refuge - Community Content Gateway");
    info!("  \"The eternal God is thy refuge\"");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Classifier: {}", args.classifier_url);
    info!("Heavy workers: {}", args.worker_count);
    info!("Heavy queue: {}", args.heavy_queue_size);
    info!("======================================");

    // Connect to MongoDB. The pipeline cannot run without its store.
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let key_collection = mongo.collection(KEY_COLLECTION).await?;
    let post_collection = mongo.collection(POST_COLLECTION).await?;
    let comment_collection = mongo.collection(COMMENT_COLLECTION).await?;
    let flag_collection = mongo.collection(FLAG_COLLECTION).await?;

    // Leaf services
    let encryption = Arc::new(EncryptionService::new(KeyStore::new(key_collection)));
    let classifier = Arc::new(ClassifierClient::new(
        &args.classifier_url,
        Duration::from_millis(args.classifier_timeout_ms),
    ));
    let flags = Arc::new(FlagStore::new(flag_collection));
    let stream = StreamRegistry::new(args.stream_buffer);

    // The queue exists before the submission service so the service can hold
    // the enqueue handle while the worker pool holds the encryption service -
    // neither side needs the other.
    let (heavy_queue, heavy_rx) = HeavyQueue::bounded(args.heavy_queue_size);
    worker::spawn_workers(
        args.worker_count,
        heavy_rx,
        HeavyWorkerDeps {
            posts: post_collection.clone(),
            encryption: Arc::clone(&encryption),
            classifier: Arc::clone(&classifier),
            flags: Arc::clone(&flags),
        },
    );

    // Submission services
    let posts = PostService::new(
        post_collection.clone(),
        Arc::clone(&encryption),
        Arc::clone(&flags),
        stream.clone(),
        heavy_queue,
    );
    let comments = CommentService::new(
        comment_collection,
        post_collection,
        Arc::clone(&encryption),
        Arc::clone(&flags),
    );

    let state = Arc::new(server::AppState {
        args,
        mongo,
        posts,
        comments,
        stream,
    });

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
