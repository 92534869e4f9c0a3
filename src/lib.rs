//! Refuge - encrypted content gateway for peer-support communities
//!
//! "The eternal God is thy refuge" - Deuteronomy 33:27
//!
//! Refuge ingests posts and comments for topic-scoped communities without
//! ever persisting plaintext, screens content before and after storage, and
//! pushes new content to live viewers.
//!
//! ## Services
//!
//! - **Crypto**: per-community authenticated encryption with lazily created,
//!   write-once keys
//! - **Moderation**: a synchronous lexical gate ahead of storage plus an
//!   asynchronous classifier-backed worker pool behind it
//! - **Stream**: per-community fan-out of new content over SSE
//! - **Content**: the submission orchestrators sequencing gate, encryption,
//!   persistence, flagging, broadcast and re-screening

pub mod config;
pub mod content;
pub mod crypto;
pub mod db;
pub mod moderation;
pub mod routes;
pub mod server;
pub mod stream;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{RefugeError, Result};
