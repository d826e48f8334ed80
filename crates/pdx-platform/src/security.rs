//! Authorization gate applied in front of every route.
//!
//! The active default admits every request and performs no CSRF check. The
//! strict policy (public liveness and actuator endpoints, HTTP Basic elsewhere) and the CSRF
//! double-submit check are switched on through configuration only.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{Method, header};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subtle::ConstantTimeEq;

use crate::config::{Credentials, SecurityConfig, SecurityPolicy};
use crate::error::{ApiError, ApiResult};

/// Paths reachable anonymously with `GET` under the strict policy.
pub const PUBLIC_PATHS: &[&str] = &["/ping", "/actuator/health", "/actuator/info"];

pub const CSRF_HEADER: &str = "x-xsrf-token";
pub const CSRF_COOKIE: &str = "XSRF-TOKEN";

#[derive(Debug, Clone, Default)]
pub struct SecurityGate {
    policy: SecurityPolicy,
    csrf_enabled: bool,
    user: Option<Credentials>,
}

impl SecurityGate {
    /// Admit everything, CSRF disabled.
    pub fn permit_all() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            policy: config.policy,
            csrf_enabled: config.csrf.enabled,
            user: config.user.clone(),
        }
    }

    /// Decide whether a request may proceed.
    pub fn check(&self, request: &Request) -> ApiResult<()> {
        if self.csrf_enabled && !is_safe_method(request.method()) {
            check_csrf(request)?;
        }

        match self.policy {
            SecurityPolicy::PermitAll => Ok(()),
            SecurityPolicy::Strict => {
                if is_public(request) {
                    return Ok(());
                }
                self.check_basic(request)
            }
        }
    }

    fn check_basic(&self, request: &Request) -> ApiResult<()> {
        let Some(expected) = &self.user else {
            return Err(ApiError::Unauthorized("no users configured".into()));
        };
        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(decode_basic)
            .ok_or_else(|| ApiError::Unauthorized("missing or malformed credentials".into()))?;

        if credentials_match(&presented, expected) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized("bad credentials".into()))
        }
    }
}

/// Middleware entry point for `axum::middleware::from_fn_with_state`.
pub async fn authorize(
    State(gate): State<Arc<SecurityGate>>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if let Err(e) = gate.check(&request) {
        tracing::debug!(
            method = %request.method(),
            path = request.uri().path(),
            error = %e,
            "request rejected"
        );
        return Err(e);
    }
    Ok(next.run(request).await)
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn is_public(request: &Request) -> bool {
    request.method() == Method::GET && PUBLIC_PATHS.contains(&request.uri().path())
}

fn decode_basic(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Both fields are always compared, in constant time.
fn credentials_match(presented: &(String, String), expected: &Credentials) -> bool {
    let username = presented.0.as_bytes().ct_eq(expected.username.as_bytes());
    let password = presented.1.as_bytes().ct_eq(expected.password.as_bytes());
    (username & password).into()
}

fn check_csrf(request: &Request) -> ApiResult<()> {
    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|token| !token.is_empty());
    let cookie_token = request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CSRF_COOKIE)
        .map(|(_, value)| value);

    match (header_token, cookie_token) {
        (Some(h), Some(c)) if h == c => Ok(()),
        _ => Err(ApiError::Forbidden("invalid CSRF token".into())),
    }
}
