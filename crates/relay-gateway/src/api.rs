use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relay_metrics::MetricsHistory;
use relay_plugins::PluginResult;
use serde::Serialize;
use tracing::error;

use crate::state::SharedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Alive,
    Error,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: AgentStatus,
    pub data: Vec<PluginResult>,
    pub history: MetricsHistory,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: AgentStatus,
    pub error: String,
}

/// GET /api/status: run every plugin and attach the metrics history.
pub async fn status(State(state): State<SharedState>) -> Response {
    match state.runner.run().await {
        Ok(data) => Json(StatusResponse {
            status: AgentStatus::Alive,
            data,
            history: state.sampler.history(),
        })
        .into_response(),
        Err(e) => {
            error!("status request failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    status: AgentStatus::Error,
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health: unauthenticated liveness check.
pub async fn health() -> &'static str {
    "ok"
}
