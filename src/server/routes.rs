//! HTTP API for the chat relay.
//!
//! - POST /chat: buffered reply
//! - POST /chat/stream: fragment-by-fragment reply, plain text
//! - GET  /health
//! - GET  /

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::message::{assemble, Message};
use crate::relay::aggregate::aggregate;
use crate::relay::forward::relay_body;
use crate::relay::orchestrator::Orchestrator;

/// Application state shared across handlers. Read-only after startup.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub config: Arc<Config>,
    pub start_time: Instant,
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config)?;

    Ok(Router::new()
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .route("/health", get(health))
        .route("/", get(root))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// CORS policy: permissive by default, or one allow-listed origin.
fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    Ok(match &config.server.cors_allow_origin {
        Some(origin) => {
            let origin: HeaderValue = origin
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid CORS origin: {origin}"))?;
            layer.allow_origin(origin)
        }
        None => layer.allow_origin(Any),
    })
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Chat request: prior turns plus the user's latest prompt.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Existing conversation history; can be empty.
    #[serde(default)]
    pub history: Vec<Message>,

    /// The user's latest prompt.
    pub user_input: String,
}

/// Buffered chat response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub assistant_reply: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

/// Root banner.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorBody>)> {
    let request_id = Uuid::new_v4().to_string();

    info!(
        request_id,
        history_len = req.history.len(),
        "Chat request (buffered)"
    );

    let history = assemble(req.history, &req.user_input);
    let rx = state.orchestrator.run(history);

    match aggregate(rx).await {
        Ok(assistant_reply) => Ok(Json(ChatResponse { assistant_reply })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )),
    }
}

async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4().to_string();

    info!(
        request_id,
        history_len = req.history.len(),
        "Chat request (streamed)"
    );

    let history = assemble(req.history, &req.user_input);
    let rx = state.orchestrator.run(history);

    // Raw concatenated fragments, no framing; clients concatenate the
    // byte stream as one continuous text.
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        relay_body(rx),
    )
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "agent-relay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}
