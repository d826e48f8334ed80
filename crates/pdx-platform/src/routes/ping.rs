//! Liveness endpoint.

/// GET /ping — always `pong`, served as `text/plain`.
pub async fn ping() -> &'static str {
    "pong"
}
