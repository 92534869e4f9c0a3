//! HTTP route handlers
//!
//! Thin JSON surface over the submission services. Handlers parse, delegate
//! and translate errors; every pipeline contract lives in the services.

pub mod comments;
pub mod health;
pub mod posts;
pub mod stream;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::types::RefugeError;

/// Response body type shared by all handlers (JSON and SSE streams)
pub type BoxBody = http_body_util::combinators::UnsyncBoxBody<Bytes, std::convert::Infallible>;

/// API error response
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    code: &'static str,
}

/// Build a JSON error response
pub fn error_response(status: StatusCode, message: &str, code: &'static str) -> Response<BoxBody> {
    let error = ApiError {
        error: message.to_string(),
        code,
    };
    let body = serde_json::to_vec(&error).unwrap_or_default();

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-cache")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)).boxed_unsync())
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from(r#"{"error":"Internal error"}"#)).boxed_unsync())
                .unwrap()
        })
}

/// Build a successful JSON response
pub fn json_response<T: Serialize>(status: StatusCode, data: &T) -> Response<BoxBody> {
    let body = serde_json::to_vec(data).unwrap_or_default();

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-cache")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)).boxed_unsync())
        .unwrap_or_else(|_| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to build response",
                "INTERNAL",
            )
        })
}

/// Translate a pipeline error into an HTTP response.
///
/// Internal detail (cipher, database, classifier) never reaches the client.
pub fn pipeline_error_response(err: &RefugeError) -> Response<BoxBody> {
    match err {
        RefugeError::Validation(msg) => error_response(StatusCode::BAD_REQUEST, msg, "VALIDATION"),
        RefugeError::ContentBlocked(msg) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, msg, "CONTENT_BLOCKED")
        }
        RefugeError::Unauthorized(msg) => error_response(StatusCode::FORBIDDEN, msg, "FORBIDDEN"),
        RefugeError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
        RefugeError::Encryption(_)
        | RefugeError::Upstream(_)
        | RefugeError::Database(_)
        | RefugeError::Internal(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error",
            "INTERNAL",
        ),
    }
}

/// Author identity supplied by the upstream gateway.
///
/// Token validation happens before requests reach this service; here the
/// identity arrives as an opaque UUID header.
pub fn author_from_headers(req: &Request<Incoming>) -> Result<Uuid, Response<BoxBody>> {
    let raw = req
        .headers()
        .get("X-Author-Id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            error_response(
                StatusCode::UNAUTHORIZED,
                "Missing X-Author-Id header",
                "AUTH_REQUIRED",
            )
        })?;

    Uuid::parse_str(raw)
        .map_err(|_| error_response(StatusCode::UNAUTHORIZED, "Invalid author id", "AUTH_REQUIRED"))
}

/// Read and decode a JSON request body
pub async fn read_json<T: DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, Response<BoxBody>> {
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Failed to read body", "BAD_BODY"))?
        .to_bytes();

    serde_json::from_slice(&bytes).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid JSON body: {}", e),
            "BAD_BODY",
        )
    })
}

/// Parse a path segment as a UUID (community and author ids)
pub fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, Response<BoxBody>> {
    Uuid::parse_str(raw).map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid {} id", what),
            "VALIDATION",
        )
    })
}

/// Parse a path segment as an ObjectId (post and comment ids)
pub fn parse_object_id(raw: &str, what: &str) -> Result<bson::oid::ObjectId, Response<BoxBody>> {
    bson::oid::ObjectId::parse_str(raw).map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid {} id", what),
            "VALIDATION",
        )
    })
}

/// Parse a query string into a key-value map
pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    if query.is_empty() {
        return HashMap::new();
    }

    query
        .split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_params() {
        let params = parse_query_params("limit=50&content_type=text");
        assert_eq!(params.get("limit"), Some(&"50".to_string()));
        assert_eq!(params.get("content_type"), Some(&"text".to_string()));
    }

    #[test]
    fn test_parse_query_params_empty() {
        assert!(parse_query_params("").is_empty());
    }

    #[test]
    fn test_parse_uuid_rejects_garbage() {
        assert!(parse_uuid("not-a-uuid", "community").is_err());
    }

    #[test]
    fn test_error_mapping() {
        let resp = pipeline_error_response(&RefugeError::ContentBlocked("x".into()));
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = pipeline_error_response(&RefugeError::NotFound("x".into()));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = pipeline_error_response(&RefugeError::Unauthorized("x".into()));
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // Internal detail is masked
        let resp = pipeline_error_response(&RefugeError::Encryption("tag mismatch".into()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
