use crate::config::AppConfig;
use crate::error::{RelayError, Result};
use crate::prompt::SERVICE_NAME;
use crate::relay;
use crate::translate::chat_types::{ChatRequest, StreamFrame};

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }
}

/// Outbound client. Idle connections are not kept, so every backend call
/// opens its own connection and releases it when the request is done.
pub fn build_client(config: &AppConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .connect_timeout(config.timeout())
        .pool_max_idle_per_host(0)
        .build()?;
    Ok(client)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/api/chat", post(handle_chat))
        .route("/api/clear", post(handle_clear))
        .nest_service("/static", static_files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_chat(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    async move {
        let req: ChatRequest = match serde_json::from_slice(&body) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse request");
                return RelayError::invalid_request(e.to_string()).into_response();
            }
        };

        tracing::info!(
            backend = %state.config.backend.kind,
            streaming = req.is_streaming(),
            messages = req.messages.len(),
            "Chat request"
        );

        if req.is_streaming() {
            handle_streaming(&state, &req)
        } else {
            handle_non_streaming(&state, &req).await
        }
    }
    .instrument(span)
    .await
}

async fn handle_non_streaming(state: &AppState, req: &ChatRequest) -> Response {
    match relay::relay_non_streaming(&req.messages, &state.config, &state.client).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Relay error");
            e.into_response()
        }
    }
}

fn handle_streaming(state: &AppState, req: &ChatRequest) -> Response {
    let frames = match relay::relay_streaming(&req.messages, &state.config, &state.client) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Streaming setup error");
            return e.into_response();
        }
    };

    let events = frames.map(|frame| -> std::result::Result<Event, Infallible> {
        Ok(frame_event(&frame))
    });

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn frame_event(frame: &StreamFrame) -> Event {
    Event::default().data(frame.data())
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    let path = state.config.static_dir.join("index.html");
    let page = tokio::fs::read_to_string(&path).await.map_err(|e| {
        RelayError::other(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Ok(Html(page))
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
    }))
}

/// Conversation history lives in the page; there is nothing to clear here.
async fn handle_clear() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "success",
        "message": "Conversation cleared",
    }))
}
