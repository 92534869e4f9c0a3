//! Content submission services
//!
//! The orchestrators of the pipeline: they sequence the gate, encryption,
//! persistence, flag-recording, fan-out and heavy-enqueue stages for posts
//! and comments.

pub mod comments;
pub mod posts;

pub use comments::CommentService;
pub use posts::{ListPostsQuery, PostService};
