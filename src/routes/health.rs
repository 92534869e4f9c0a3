//! Health endpoint
//!
//! `GET /health` - liveness plus a component snapshot. The database is
//! actively pinged; the fan-out registry reports live subscriber pressure.

use bson::doc;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

use super::{json_response, BoxBody};

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    commit: &'static str,
    database: &'static str,
    live_communities: usize,
}

/// Handle GET /health
pub async fn check(state: Arc<AppState>) -> Response<BoxBody> {
    let database = match state
        .mongo
        .inner()
        .database(state.mongo.db_name())
        .run_command(doc! { "ping": 1 })
        .await
    {
        Ok(_) => "ok",
        Err(_) => "unreachable",
    };

    let healthy = database == "ok";

    let body = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_SHORT"),
        database,
        live_communities: state.stream.community_count(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    json_response(status, &body)
}
