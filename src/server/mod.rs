//! HTTP API for the concert assistant
//!
//! | route | purpose |
//! |---|---|
//! | `POST /api/chat` | multipart chat turn (message, file, session_id) |
//! | `GET /api/health` | liveness |
//! | `GET /api/sessions` | known sessions |
//! | `DELETE /api/sessions/{id}` | forget a session |
//! | `GET /metrics` | Prometheus exposition |
//! | `/static/*` | generated PDFs and uploads |

pub mod chat;
pub mod error;
pub mod rate_limit;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, request::Parts, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::agent::{AgentController, SessionSummary};
use crate::metrics;

pub use error::ApiError;
pub use rate_limit::{RateLimitError, RateLimiter};

pub const SERVICE_NAME: &str = "Recital Concert Assistant";

// Room for the text fields and multipart framing on top of the file itself
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AgentController>,
    pub limiter: Arc<RateLimiter>,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

/// Build the application router
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let static_files = ServeDir::new(&state.static_dir);
    let body_limit = state.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/health", get(health))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{id}", delete(clear_session))
        .route("/metrics", get(metrics_text))
        .nest_service("/static", static_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.agent.sessions().list().await)
}

async fn clear_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.agent.sessions().clear(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn metrics_text() -> Result<impl IntoResponse, ApiError> {
    let body = metrics::gather_text().map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let configured: Vec<String> = allowed_origins.to_vec();
    let allow = AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
        origin
            .to_str()
            .map(|o| origin_allowed(o, &configured))
            .unwrap_or(false)
    });

    CorsLayer::new()
        .allow_origin(allow)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Configured origins, plus any port on localhost, 127.0.0.1 or a Cloud Run
/// (`*.run.app`) host.
pub fn origin_allowed(origin: &str, configured: &[String]) -> bool {
    let origin = origin.trim_end_matches('/');
    if configured.iter().any(|c| c == origin) {
        return true;
    }

    let Some(authority) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };
    if let Some(port) = port {
        if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    }

    let host = host.to_ascii_lowercase();
    host == "localhost"
        || host == "127.0.0.1"
        || (host.ends_with(".run.app") && host.len() > ".run.app".len())
}
