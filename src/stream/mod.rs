//! Real-time fan-out of newly created content to live community viewers.
//!
//! No replay: a subscriber sees events broadcast while it is connected,
//! nothing before, nothing after.

pub mod registry;

pub use registry::{
    StreamEvent, StreamRegistry, Subscription, EVENT_CONNECTED, EVENT_POST_CREATED,
    EVENT_POST_UPDATED,
};
