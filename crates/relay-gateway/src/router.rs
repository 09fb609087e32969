use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::middleware::{rate_limit, require_secret};
use crate::state::SharedState;

/// Build the main application router with all routes.
///
/// `/api/status` is rate limited first and authenticated second, so clients
/// guessing the secret still consume quota.
pub fn build_router(state: SharedState) -> Router {
    let protected = Router::new()
        .route("/api/status", get(api::status))
        .layer(from_fn_with_state(state.clone(), require_secret))
        .layer(from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(api::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
