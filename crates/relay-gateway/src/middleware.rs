use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use relay_security::RateDecision;
use tracing::warn;

use crate::state::SharedState;

/// Header carrying the shared agent secret.
pub const SECRET_HEADER: &str = "x-agent-secret";

/// Reject clients that exceed the sliding-window request quota.
pub async fn rate_limit(State(state): State<SharedState>, req: Request, next: Next) -> Response {
    let client = client_ip(&req);

    match state.limiter.check(&client) {
        RateDecision::Allowed { .. } => next.run(req).await,
        RateDecision::Limited { retry_after } => {
            warn!(client = %client, "rate limit exceeded");
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, secs.max(1).to_string())],
                Json(serde_json::json!({ "error": "Too many requests" })),
            )
                .into_response()
        }
    }
}

/// Reject requests without the correct `x-agent-secret` header.
pub async fn require_secret(State(state): State<SharedState>, req: Request, next: Next) -> Response {
    let authorized = req
        .headers()
        .get(SECRET_HEADER)
        .is_some_and(|value| state.verifier.verify(value.as_bytes()));

    if !authorized {
        warn!(client = %client_ip(&req), path = %req.uri().path(), "rejected unauthenticated request");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Unauthorized" })),
        )
            .into_response();
    }

    next.run(req).await
}

/// Peer address from the connection, or loopback when the router is driven
/// without connection info (in-process tests).
fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
