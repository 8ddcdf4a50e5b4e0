//! HTTP surface
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /<stage>` | Run the stage on the raw body |
//! | `POST /ingest` | Wrap the body in an envelope, publish to the ingest topic |
//! | `GET`/`POST /refreshCache` | Publish the control message to the ingest topic |
//! | `GET /health` | Liveness and rule generation |
//! | `GET /metrics` | Stage, table writer and producer counters |
//!
//! Errors are returned as `{"error": "<CODE>", "message": "..."}`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use rtdl_config::Config;
use rtdl_pipeline::{Envelope, FORWARD_KEY, PipelineError, StageFunction, StageMetricsSnapshot};
use rtdl_sinks::MetricsSnapshot;
use rtdl_sinks::forwarder::{ForwardError, Producer};
use serde::Serialize;
use serde_json::json;

/// Paths the stage route must not shadow
pub const RESERVED_PATHS: [&str; 4] = ["ingest", "refreshCache", "health", "metrics"];

/// Whether a stage named `stage` can be mounted at `/<stage>`
pub fn is_routable_stage(stage: &str) -> bool {
    !RESERVED_PATHS.contains(&stage) && !stage.contains(['{', '}'])
}

// =============================================================================
// State
// =============================================================================

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    stage: Arc<StageFunction>,
    producer: Option<Arc<dyn Producer>>,
    ingest_topic: Arc<str>,
    send_timeout: Duration,
    started: Instant,
}

impl AppState {
    /// Create state for `stage`, publishing ingested messages through `producer`
    pub fn new(stage: Arc<StageFunction>, producer: Option<Arc<dyn Producer>>, config: &Config) -> Self {
        Self {
            stage,
            producer,
            ingest_topic: Arc::from(config.server.ingest_topic.as_str()),
            send_timeout: config.messaging.send_timeout,
            started: Instant::now(),
        }
    }

    async fn publish(&self, body: Bytes) -> Result<(), ForwardError> {
        let producer = self.producer.as_ref().ok_or(ForwardError::MissingEndpoint)?;
        producer
            .send(&self.ingest_topic, FORWARD_KEY, body, self.send_timeout)
            .await
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    stage: String,
    uptime_secs: u64,
    rules: usize,
    rules_generation: u64,
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    uptime_secs: u64,
    stage: StageMetricsSnapshot,
    table_writer: MetricsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    producer: Option<MetricsSnapshot>,
}

#[derive(Debug, Serialize)]
struct PublishResponse {
    status: &'static str,
    topic: String,
}

fn error_response(status: StatusCode, code: &str, message: impl std::fmt::Display) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.to_string(),
        })),
    )
        .into_response()
}

// =============================================================================
// Routes
// =============================================================================

/// Build the router for `state`
///
/// The stage name must pass [`is_routable_stage`]. Bodies larger than
/// `max_payload_size` are rejected with 413.
pub fn build_router(state: AppState, max_payload_size: usize) -> Router {
    let stage_path = format!("/{}", state.stage.stage());

    Router::new()
        .route(&stage_path, post(invoke_handler))
        .route("/ingest", post(ingest_handler))
        .route("/refreshCache", get(refresh_handler).post(refresh_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(max_payload_size))
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /<stage>
async fn invoke_handler(State(state): State<AppState>, body: Bytes) -> Response {
    match state.stage.invoke(&body).await {
        Ok(report) => Json(report).into_response(),
        Err(e @ PipelineError::Parse(_)) => error_response(StatusCode::BAD_REQUEST, "PARSE_ERROR", e),
        Err(e @ PipelineError::NotAnObject(_)) => {
            error_response(StatusCode::BAD_REQUEST, "INVALID_EVENT", e)
        }
    }
}

/// POST /ingest
async fn ingest_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let envelope = match Envelope::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "rejecting ingest request");
            return error_response(StatusCode::BAD_REQUEST, "INVALID_BODY", e);
        }
    };

    let bytes = match envelope.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "ENCODE_ERROR", e),
    };
    publish_response(&state, bytes).await
}

/// GET|POST /refreshCache
async fn refresh_handler(State(state): State<AppState>) -> Response {
    let code = state.stage.control().code();
    let bytes = match Envelope::control(code).to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, "ENCODE_ERROR", e),
    };
    tracing::info!(code = %code, topic = %state.ingest_topic, "publishing rule refresh request");
    publish_response(&state, bytes).await
}

async fn publish_response(state: &AppState, bytes: Bytes) -> Response {
    match state.publish(bytes).await {
        Ok(()) => Json(PublishResponse {
            status: "accepted",
            topic: state.ingest_topic.to_string(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(topic = %state.ingest_topic, kind = e.kind(), error = %e, "publish failed");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "PUBLISH_FAILED", e)
        }
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let rules = state.stage.control().store();
    Json(HealthResponse {
        status: "ok",
        stage: state.stage.stage().to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        rules: rules.snapshot().len(),
        rules_generation: rules.generation(),
    })
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        uptime_secs: state.started.elapsed().as_secs(),
        stage: state.stage.metrics().snapshot(),
        table_writer: state.stage.writer().metrics().snapshot(),
        producer: state.producer.as_ref().map(|p| p.snapshot()),
    })
}

#[cfg(test)]
#[path = "server_test.rs"]
mod server_test;
