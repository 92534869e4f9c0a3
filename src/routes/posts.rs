//! Post routes
//!
//! - `POST   /api/v1/communities/{community}/posts` - submit a post
//! - `GET    /api/v1/communities/{community}/posts` - list posts
//! - `GET    /api/v1/posts/{id}`                    - fetch one post
//! - `PUT    /api/v1/posts/{id}`                    - edit a post
//! - `DELETE /api/v1/posts/{id}`                    - soft-remove a post
//! - `POST   /api/v1/posts/{id}/report`             - report a post

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::content::ListPostsQuery;
use crate::db::schemas::{CreatePostRequest, UpdatePostRequest};
use crate::server::AppState;

use super::{
    author_from_headers, error_response, json_response, parse_object_id, parse_query_params,
    parse_uuid, pipeline_error_response, read_json, BoxBody,
};

#[derive(Debug, Deserialize)]
struct ReportRequest {
    reason: String,
}

/// Handle POST /api/v1/communities/{community}/posts
pub async fn create(
    state: Arc<AppState>,
    community: &str,
    req: Request<Incoming>,
) -> Response<BoxBody> {
    let community_id = match parse_uuid(community, "community") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let author_id = match author_from_headers(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body: CreatePostRequest = match read_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    // The pipeline runs on its own task: once the row is persisted the
    // remaining stages complete even if the client disconnects mid-request.
    let submission =
        tokio::spawn(async move { state.posts.create_post(community_id, author_id, body).await });

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

/// Handle GET /api/v1/communities/{community}/posts
pub async fn list(
    state: Arc<AppState>,
    community: &str,
    query: Option<&str>,
) -> Response<BoxBody> {
    let community_id = match parse_uuid(community, "community") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let params = parse_query_params(query.unwrap_or(""));
    let list_query = ListPostsQuery {
        limit: params
            .get("limit")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(20),
        before: params
            .get("before")
            .and_then(|v| chrono::DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc)),
        author_id: params
            .get("author_id")
            .and_then(|v| uuid::Uuid::parse_str(v).ok()),
        content_type: params.get("content_type").cloned(),
    };

    match state.posts.list_posts(community_id, list_query).await {
        Ok(views) => json_response(StatusCode::OK, &views),
        Err(e) => pipeline_error_response(&e),
    }
}

/// Handle GET /api/v1/posts/{id}
pub async fn get(state: Arc<AppState>, id: &str) -> Response<BoxBody> {
    let post_id = match parse_object_id(id, "post") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.posts.get_post(post_id).await {
        Ok(view) => json_response(StatusCode::OK, &view),
        Err(e) => pipeline_error_response(&e),
    }
}

/// Handle PUT /api/v1/posts/{id}
pub async fn update(state: Arc<AppState>, id: &str, req: Request<Incoming>) -> Response<BoxBody> {
    let post_id = match parse_object_id(id, "post") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let author_id = match author_from_headers(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body: UpdatePostRequest = match read_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    // Detached for the same reason as create: persisted edits always finish
    // their flag, broadcast and re-screening stages.
    let submission =
        tokio::spawn(async move { state.posts.update_post(post_id, author_id, body).await });

    match submission.await {
        Ok(Ok(view)) => json_response(StatusCode::OK, &view),
        Ok(Err(e)) => pipeline_error_response(&e),
        Err(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error",
            "INTERNAL",
        ),
    }
}

/// Handle DELETE /api/v1/posts/{id}
pub async fn delete(state: Arc<AppState>, id: &str, req: Request<Incoming>) -> Response<BoxBody> {
    let post_id = match parse_object_id(id, "post") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let author_id = match author_from_headers(&req) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.posts.delete_post(post_id, author_id).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "removed": true })),
        Err(e) => pipeline_error_response(&e),
    }
}

/// Handle POST /api/v1/posts/{id}/report
pub async fn report(state: Arc<AppState>, id: &str, req: Request<Incoming>) -> Response<BoxBody> {
    let post_id = match parse_object_id(id, "post") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(resp) = author_from_headers(&req) {
        return resp;
    }
    let body: ReportRequest = match read_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    match state.posts.report_post(post_id, &body.reason).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "reported": true })),
        Err(e) => pipeline_error_response(&e),
    }
}
