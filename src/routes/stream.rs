//! Live stream route
//!
//! `GET /api/v1/communities/{community}/stream` - Server-Sent Events feed of
//! newly created content in one community.
//!
//! ## Protocol
//!
//! The client receives one `connected` acknowledgment immediately, then zero
//! or more `post_created` / `post_updated` events carrying the decrypted
//! public view, each as a `data: {json}` frame. There is no replay: events
//! broadcast before the subscription or dropped while the client was slow are
//! gone.
//!
//! The subscription is owned by the response body; when the client
//! disconnects hyper drops the body, the subscription drops with it, and the
//! registry slot is released.

use bytes::Bytes;
use futures_util::stream;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use hyper::{Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

use crate::server::AppState;
use crate::stream::{StreamEvent, Subscription};

use super::{error_response, parse_uuid, BoxBody};

/// Handle GET /api/v1/communities/{community}/stream
pub async fn live(state: Arc<AppState>, community: &str) -> Response<BoxBody> {
    let community_id = match parse_uuid(community, "community") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let subscription = state.stream.subscribe(community_id);
    debug!(community_id = %community_id, subscriber_id = subscription.id(), "Stream opened");

    let frames = stream::unfold(subscription, |mut sub: Subscription| async move {
        match sub.recv().await {
            Some(event) => Some((Ok::<_, Infallible>(sse_frame(&event)), sub)),
            // Unsubscribed elsewhere: end the body so the client sees EOF
            None => None,
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/event-stream")
        .header("Cache-Control", "no-cache")
        .header("Connection", "keep-alive")
        .header("Access-Control-Allow-Origin", "*")
        .body(StreamBody::new(frames).boxed_unsync())
        .unwrap_or_else(|_| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to open stream",
                "INTERNAL",
            )
        })
}

/// Encode one event as an SSE data frame
fn sse_frame(event: &StreamEvent) -> Frame<Bytes> {
    let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Frame::data(Bytes::from(format!("data: {}\n\n", json)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_frame_layout() {
        let event = StreamEvent {
            event_type: "post_created".to_string(),
            payload: serde_json::json!({ "id": "abc" }),
        };

        let frame = sse_frame(&event);
        let data = frame.into_data().unwrap();
        let text = std::str::from_utf8(&data).unwrap();

        assert!(text.starts_with("data: "));
        assert!(text.ends_with("\n\n"));
        assert!(text.contains(r#""type":"post_created""#));
    }
}
