//! Comment routes
//!
//! - `POST /api/v1/posts/{id}/comments` - submit a comment
//! - `GET  /api/v1/posts/{id}/comments` - list a post's comments

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use crate::db::schemas::CreateCommentRequest;
use crate::server::AppState;

use super::{
    author_from_headers, error_response, json_response, parse_object_id, pipeline_error_response,
    read_json, BoxBody,
};

/// Handle POST /api/v1/posts/{id}/comments
pub async fn create(state: Arc<AppState>, id: &str, req: Request<Incoming>) -> Response<BoxBody> {
    let post_id = match parse_object_id(id, "post") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let author_id = match author_from_headers(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body: CreateCommentRequest = match read_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    // Detached so a persisted comment always finishes its counter and flag
    // stages even if the client disconnects mid-request.
    let submission =
        tokio::spawn(async move { state.comments.create_comment(post_id, author_id, body).await });

    match submission.await {
        Ok(Ok(view)) => json_response(StatusCode::CREATED, &view),
        Ok(Err(e)) => pipeline_error_response(&e),
        Err(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error",
            "INTERNAL",
        ),
    }
}

/// Handle GET /api/v1/posts/{id}/comments
pub async fn list(state: Arc<AppState>, id: &str) -> Response<BoxBody> {
    let post_id = match parse_object_id(id, "post") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.comments.list_comments(post_id).await {
        Ok(views) => json_response(StatusCode::OK, &views),
        Err(e) => pipeline_error_response(&e),
    }
}
