//! Shared request helpers for the smoke tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use figment::Figment;
use figment::providers::Serialized;
use http_body_util::BodyExt;
use tower::ServiceExt;

use pdx_platform::config::ConfigLoader;
use pdx_platform::context::{ApplicationContext, ContextError};
use pdx_testinfra::harness::{TEST_PROFILE, platform_config_dir};

/// Exclusions that let the full context boot with no database present.
pub const NO_DATABASE: &str = "datasource,orm,migration";

/// A collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Send a request through `router` with `tower::oneshot`.
pub async fn send(router: &Router, method: Method, uri: &str) -> TestResponse {
    send_request(
        router,
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn send_request(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse {
        status,
        content_type,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    send(router, Method::GET, uri).await
}

/// Full context under the `test` profile with `properties` as overrides.
pub async fn try_full_context(
    properties: &[(&str, &str)],
) -> Result<ApplicationContext, ContextError> {
    let overrides = properties
        .iter()
        .fold(Figment::new(), |figment, (key, value)| {
            figment.merge(Serialized::default(key, value))
        });
    let loader = ConfigLoader::new(platform_config_dir())
        .with_profile(TEST_PROFILE)
        .with_env(false);
    ApplicationContext::initialize(&loader, overrides).await
}

pub async fn full_context(properties: &[(&str, &str)]) -> ApplicationContext {
    try_full_context(properties).await.unwrap()
}
