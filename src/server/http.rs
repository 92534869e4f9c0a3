//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection. Routing is a
//! plain match over path segments - the surface is small enough that a
//! framework would be more code than this.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::Args;
use crate::content::{CommentService, PostService};
use crate::db::MongoClient;
use crate::routes::{self, BoxBody};
use crate::stream::StreamRegistry;
use crate::types::{RefugeError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: MongoClient,
    pub posts: PostService,
    pub comments: CommentService,
    pub stream: StreamRegistry,
}

/// Run the HTTP server until ctrl-c.
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen)
        .await
        .map_err(|e| RefugeError::Internal(format!("Failed to bind {}: {}", state.args.listen, e)))?;

    info!("Listening on {}", state.args.listen);

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                return Ok(());
            }
        };

        let (stream, remote_addr) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Accept failed: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(route(state, req).await) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(remote = %remote_addr, error = %e, "Connection ended");
            }
        });
    }
}

/// Dispatch one request to its handler
async fn route(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    debug!(method = %method, path = %path, "Request");

    match (&method, segments.as_slice()) {
        (&Method::GET, ["health"]) => routes::health::check(state).await,

        (&Method::POST, ["api", "v1", "communities", community, "posts"]) => {
            routes::posts::create(state, community, req).await
        }
        (&Method::GET, ["api", "v1", "communities", community, "posts"]) => {
            routes::posts::list(state, community, query.as_deref()).await
        }
        (&Method::GET, ["api", "v1", "communities", community, "stream"]) => {
            routes::stream::live(state, community).await
        }

        (&Method::GET, ["api", "v1", "posts", id]) => routes::posts::get(state, id).await,
        (&Method::PUT, ["api", "v1", "posts", id]) => routes::posts::update(state, id, req).await,
        (&Method::DELETE, ["api", "v1", "posts", id]) => {
            routes::posts::delete(state, id, req).await
        }
        (&Method::POST, ["api", "v1", "posts", id, "report"]) => {
            routes::posts::report(state, id, req).await
        }

        (&Method::POST, ["api", "v1", "posts", id, "comments"]) => {
            routes::comments::create(state, id, req).await
        }
        (&Method::GET, ["api", "v1", "posts", id, "comments"]) => {
            routes::comments::list(state, id).await
        }

        (&Method::OPTIONS, _) => preflight(),

        _ => routes::error_response(StatusCode::NOT_FOUND, "Not found", "NOT_FOUND"),
    }
}

/// CORS preflight response
fn preflight() -> Response<BoxBody> {
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};

    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, X-Author-Id")
        .body(Full::new(Bytes::new()).boxed_unsync())
        .unwrap_or_else(|_| {
            routes::error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error", "INTERNAL")
        })
}
