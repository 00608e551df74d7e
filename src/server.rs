//! HTTP storage backend for interview events and summaries.
//!
//! This module provides an HTTP server that:
//! - Accepts mirrored events via POST /api/events
//! - Accepts interview summaries via POST /api/interviews
//! - Serves an interview's events and summary for review
//!
//! # Architecture
//!
//! ```text
//! Proctor Agent ──→ POST /api/events ─────→ ┌───────────┐
//!               ──→ POST /api/interviews ─→ │   Store   │ ──→ GET /api/interviews/{id}
//!                                           └───────────┘
//! ```

use crate::core::events::EventRecord;
use crate::session::InterviewSummary;
use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// In-memory storage of events and interview summaries.
#[derive(Default)]
pub struct ServerState {
    events: RwLock<Vec<StoredEvent>>,
    interviews: RwLock<HashMap<String, InterviewSummary>>,
}

/// Event with its parsed timestamp for ordering.
#[derive(Debug, Clone)]
struct StoredEvent {
    at: DateTime<Utc>,
    record: EventRecord,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    async fn events_for(&self, interview_id: &str) -> Vec<EventRecord> {
        let mut events: Vec<StoredEvent> = self
            .events
            .read()
            .await
            .iter()
            .filter(|e| e.record.interview_id == interview_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.at);
        events.into_iter().map(|e| e.record).collect()
    }
}

/// Acknowledgement body
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Interview with its events
#[derive(Serialize)]
pub struct InterviewResponse {
    pub interview: InterviewSummary,
    pub events: Vec<EventRecord>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /api/events
async fn create_event(
    State(state): State<Arc<ServerState>>,
    Json(record): Json<EventRecord>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let at = DateTime::parse_from_rfc3339(&record.timestamp)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid timestamp: {e}")))?
        .with_timezone(&Utc);

    state.events.write().await.push(StoredEvent { at, record });

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Event logged successfully".to_string(),
        }),
    ))
}

/// GET /api/events/{interview_id}
async fn list_events(
    State(state): State<Arc<ServerState>>,
    Path(interview_id): Path<String>,
) -> Json<Vec<EventRecord>> {
    Json(state.events_for(&interview_id).await)
}

/// POST /api/interviews
async fn create_interview(
    State(state): State<Arc<ServerState>>,
    Json(summary): Json<InterviewSummary>,
) -> (StatusCode, Json<MessageResponse>) {
    tracing::info!(
        interview_id = %summary.interview_id,
        integrity_score = summary.integrity_score,
        "interview saved"
    );
    state
        .interviews
        .write()
        .await
        .insert(summary.interview_id.clone(), summary);

    (
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Interview saved successfully".to_string(),
        }),
    )
}

/// GET /api/interviews/{interview_id}
async fn get_interview(
    State(state): State<Arc<ServerState>>,
    Path(interview_id): Path<String>,
) -> Result<Json<InterviewResponse>, ApiError> {
    let interview = state
        .interviews
        .read()
        .await
        .get(&interview_id)
        .cloned()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Interview not found"))?;

    let events = state.events_for(&interview_id).await;
    Ok(Json(InterviewResponse { interview, events }))
}

/// Build the router over the given state.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/events", post(create_event))
        .route("/api/events/:interview_id", get(list_events))
        .route("/api/interviews", post(create_interview))
        .route("/api/interviews/:interview_id", get(get_interview))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(Arc::new(ServerState::new()));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Storage server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
