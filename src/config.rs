//! Configuration for Refuge
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Refuge - encrypted content gateway for peer-support communities
///
/// "The eternal God is thy refuge" - Deuteronomy 33:27
#[derive(Parser, Debug, Clone)]
#[command(name = "refuge")]
#[command(about = "Encrypted content gateway for peer-support communities")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "refuge")]
    pub mongodb_db: String,

    /// Base URL of the external content classifier service
    #[arg(long, env = "CLASSIFIER_URL", default_value = "http://localhost:5001")]
    pub classifier_url: String,

    /// Classifier request timeout in milliseconds.
    /// The heavy path abandons the task past this bound; light-gate coverage stands.
    #[arg(long, env = "CLASSIFIER_TIMEOUT_MS", default_value = "5000")]
    pub classifier_timeout_ms: u64,

    /// Number of heavy moderation worker tasks
    #[arg(long, env = "WORKER_COUNT", default_value = "3")]
    pub worker_count: usize,

    /// Maximum queued heavy-check tasks. Excess enqueues are dropped with a
    /// warning, never surfaced to the submitter.
    #[arg(long, env = "HEAVY_QUEUE_SIZE", default_value = "100")]
    pub heavy_queue_size: usize,

    /// Per-subscriber live stream buffer (events). A full buffer drops events
    /// for that subscriber only.
    #[arg(long, env = "STREAM_BUFFER", default_value = "10")]
    pub stream_buffer: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("WORKER_COUNT must be at least 1".to_string());
        }
        if self.heavy_queue_size == 0 {
            return Err("HEAVY_QUEUE_SIZE must be at least 1".to_string());
        }
        if self.stream_buffer == 0 {
            return Err("STREAM_BUFFER must be at least 1".to_string());
        }
        if self.classifier_timeout_ms == 0 || self.classifier_timeout_ms > 9_000 {
            return Err("CLASSIFIER_TIMEOUT_MS must be between 1 and 9000".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["refuge"])
    }

    #[test]
    fn test_defaults_are_valid() {
        let args = base_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.worker_count, 3);
        assert_eq!(args.heavy_queue_size, 100);
        assert_eq!(args.stream_buffer, 10);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut args = base_args();
        args.worker_count = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_rejects_unbounded_classifier_timeout() {
        let mut args = base_args();
        args.classifier_timeout_ms = 30_000;
        assert!(args.validate().is_err());
    }
}
