//! HTTP transport for the MCP server.
//!
//! One endpoint, served at both `/` and `/mcp`:
//!
//! - `GET`: discovery document describing the server and its tools
//! - `POST`: a JSON-RPC message or batch in the body
//! - `OPTIONS`: CORS preflight, empty body
//! - anything else: `405` with a JSON error body
//!
//! Every response carries permissive CORS headers so browser-based clients
//! can call the endpoint from any origin.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ServerError;
use crate::mcp::server::{DispatchOutcome, McpServer};

/// Builds the HTTP router around a shared server.
#[must_use]
pub fn router(server: Arc<McpServer>) -> Router {
    let endpoint: MethodRouter<Arc<McpServer>> = get(discovery)
        .post(rpc)
        .options(preflight)
        .fallback(method_not_allowed);

    Router::new()
        .route("/", endpoint.clone())
        .route("/mcp", endpoint)
        .fallback(not_found)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// CORS policy: any origin, the three endpoint methods and the headers
/// browser clients of the hosted data API send.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

async fn discovery() -> Response {
    Json(McpServer::discovery_document()).into_response()
}

async fn rpc(State(server): State<Arc<McpServer>>, body: Bytes) -> Response {
    match server.handle_body(&body).await {
        DispatchOutcome::Single(response) => Json(response).into_response(),
        DispatchOutcome::Batch(responses) => Json(responses).into_response(),
        DispatchOutcome::NoContent => StatusCode::NO_CONTENT.into_response(),
        DispatchOutcome::ParseError(response) => {
            (StatusCode::BAD_REQUEST, Json(response)).into_response()
        }
    }
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

/// Binds the listening socket.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is unavailable.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serves the endpoint on `listener` until SIGINT/SIGTERM (Ctrl+C on
/// Windows), then drains in-flight requests.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the accept loop fails.
pub async fn serve(listener: TcpListener, server: Arc<McpServer>) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "MCP endpoint listening");
    }

    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

/// Resolves when the process is asked to stop.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        tracing::warn!("Failed to install signal handlers, graceful shutdown disabled");
        return std::future::pending().await;
    };

    tokio::select! {
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }

        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

/// Resolves when the process is asked to stop.
#[cfg(windows)]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    } else {
        tracing::warn!("Failed to listen for Ctrl+C, graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
}
