//! Route definitions and router builders.

pub mod actuator;
pub mod ping;

use std::sync::Arc;

use axum::Router;
use axum::http::{Method, Uri};
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::security::{self, SecurityGate};
use crate::state::AppState;

/// Build the full router: liveness, actuator endpoints and the security gate.
pub fn build_router(state: AppState) -> Router {
    let gate = SecurityGate::from_config(&state.config.security);

    let app = Router::new()
        .route("/ping", get(ping::ping))
        .route("/actuator/health", get(actuator::health))
        .route("/actuator/info", get(actuator::info))
        .with_state(state);

    secure(app, gate)
}

/// HTTP layer only: `/ping` behind the gate, no state and no datasource.
pub fn web_slice(gate: SecurityGate) -> Router {
    secure(Router::new().route("/ping", get(ping::ping)), gate)
}

fn secure(router: Router, gate: SecurityGate) -> Router {
    router
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(axum::middleware::from_fn_with_state(
            Arc::new(gate),
            security::authorize,
        ))
        .layer(TraceLayer::new_for_http())
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}

async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::config::PlatformConfig;

    fn app() -> Router {
        build_router(AppState::default())
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn ping_returns_pong() {
        let response = app()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));
        assert_eq!(body_string(response).await, "pong");
    }

    #[tokio::test]
    async fn post_ping_is_method_not_allowed() {
        let response = app()
            .oneshot(Request::post("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = app()
            .oneshot(Request::get("/unknown").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], 404);
    }

    #[tokio::test]
    async fn health_without_datasource_is_up() {
        let response = app()
            .oneshot(Request::get("/actuator/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "UP");
        assert_eq!(json["components"]["ping"]["status"], "UP");
        assert!(json["components"].get("db").is_none());
    }

    #[tokio::test]
    async fn unreachable_database_is_down_without_detail() {
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .username("pokedex")
            .password("hunter2");
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(2))
            .connect_lazy_with(options);
        let response = build_router(AppState::with_pool(PlatformConfig::default(), pool))
            .oneshot(Request::get("/actuator/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(!body.contains("127.0.0.1"));
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "DOWN");
        assert_eq!(json["components"]["db"]["status"], "DOWN");
        assert_eq!(json["components"]["db"]["error"], actuator::DB_UNAVAILABLE);
    }

    #[tokio::test]
    async fn info_reports_name_and_profile() {
        let config = PlatformConfig {
            profile: Some("test".into()),
            ..PlatformConfig::default()
        };
        let response = build_router(AppState::without_datasource(config))
            .oneshot(Request::get("/actuator/info").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["app"]["name"], "pokedex-platform");
        assert_eq!(json["profile"], "test");
    }

    #[tokio::test]
    async fn slice_serves_ping_only() {
        let slice = web_slice(SecurityGate::permit_all());

        let response = slice
            .clone()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "pong");

        let response = slice
            .oneshot(Request::get("/actuator/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
