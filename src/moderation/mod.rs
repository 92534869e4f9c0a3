//! Content moderation
//!
//! Two layers with different contracts. The light gate is synchronous and
//! lexical, runs before persistence, and is the only check that can refuse a
//! submission. The heavy pool is asynchronous, classifier-backed, runs after
//! persistence, and can only add flags.

pub mod classifier;
pub mod flags;
pub mod gate;
pub mod lexicon;
pub mod worker;

pub use classifier::ClassifierClient;
pub use flags::FlagStore;
pub use gate::Verdict;
pub use worker::{HeavyQueue, HeavyWorkerDeps};
