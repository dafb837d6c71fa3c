//! Northbound HTTP API.
//!
//! | Method | Path               | Purpose                                   |
//! |--------|--------------------|-------------------------------------------|
//! | POST   | `/routing/mode`    | switch mode, recompute and reinstall      |
//! | GET    | `/routing/status`  | current mode and last computed routes     |
//! | GET    | `/topology`        | switches, directed links and hosts        |
//! | POST   | `/topology/events` | enqueue one event or an array of events   |

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::controller::Controller;
use crate::events::{EventSender, TopologyEvent};

#[derive(Clone)]
pub struct ApiState {
    pub controller: Arc<Controller>,
    pub events: EventSender,
}

/// Failures reported to API clients
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid mode")]
    InvalidMode,
    #[error("invalid event payload: {0}")]
    InvalidEvents(String),
    /// `accepted` events were queued before the queue closed
    #[error("event ingestion is not running")]
    IngestionStopped { accepted: usize },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::InvalidMode | Self::InvalidEvents(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            Self::IngestionStopped { accepted } => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": self.to_string(), "accepted": accepted }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ModeRequest {
    mode: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventBatch {
    Many(Vec<TopologyEvent>),
    One(TopologyEvent),
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/routing/mode", post(set_mode))
        .route("/routing/status", get(get_status))
        .route("/topology", get(get_topology))
        .route("/topology/events", post(post_events))
        .with_state(state)
}

async fn set_mode(State(state): State<ApiState>, body: Bytes) -> Result<Response, ApiError> {
    let request: ModeRequest = serde_json::from_slice(&body).map_err(|err| {
        warn!("Rejected mode change: {}", err);
        ApiError::InvalidMode
    })?;

    let report = state
        .controller
        .set_mode_named(&request.mode)
        .await
        .map_err(|err| {
            warn!("Rejected mode change: {}", err);
            ApiError::InvalidMode
        })?;

    let message = format!("mode set to {}", request.mode);
    info!("{} ({} rules sent)", message, report.rules_sent);
    Ok((
        StatusCode::OK,
        Json(json!({ "message": message, "install": report })),
    )
        .into_response())
}

async fn get_status(State(state): State<ApiState>) -> Response {
    Json(state.controller.status().await).into_response()
}

async fn get_topology(State(state): State<ApiState>) -> Response {
    let summary = state.controller.topology().lock().await.summary();
    Json(summary).into_response()
}

async fn post_events(State(state): State<ApiState>, body: Bytes) -> Result<Response, ApiError> {
    let batch: EventBatch =
        serde_json::from_slice(&body).map_err(|err| ApiError::InvalidEvents(err.to_string()))?;
    let events = match batch {
        EventBatch::Many(events) => events,
        EventBatch::One(event) => vec![event],
    };

    if state.events.is_closed() {
        return Err(ApiError::IngestionStopped { accepted: 0 });
    }

    let accepted = events.len();
    for (sent, event) in events.into_iter().enumerate() {
        if state.events.send(event).await.is_err() {
            warn!("Event queue closed after {} of {} events", sent, accepted);
            return Err(ApiError::IngestionStopped { accepted: sent });
        }
    }

    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": accepted }))).into_response())
}
