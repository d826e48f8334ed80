//! Actuator-style health and info endpoints.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::db;
use crate::state::AppState;

/// Reported for a DOWN database, whatever the cause.
pub const DB_UNAVAILABLE: &str = "database unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Up,
    Down,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated health report.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: Status,
    pub components: BTreeMap<&'static str, ComponentHealth>,
}

/// GET /actuator/health — always 200; the body carries the aggregate.
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let mut components = BTreeMap::new();
    components.insert(
        "ping",
        ComponentHealth {
            status: Status::Up,
            error: None,
        },
    );

    if let Some(pool) = &state.pool {
        components.insert("db", db_component(db::ping(pool).await));
    }

    let status = if components.values().all(|c| c.status == Status::Up) {
        Status::Up
    } else {
        Status::Down
    };

    Json(HealthReport { status, components })
}

/// The cause is logged, never returned; health is readable anonymously.
fn db_component(result: Result<(), sqlx::Error>) -> ComponentHealth {
    match result {
        Ok(()) => ComponentHealth {
            status: Status::Up,
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "database health check failed");
            ComponentHealth {
                status: Status::Down,
                error: Some(DB_UNAVAILABLE.to_string()),
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AppInfo {
    pub name: String,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct InfoReport {
    pub app: AppInfo,
    pub profile: Option<String>,
}

/// GET /actuator/info — application name, version and active profile.
pub async fn info(State(state): State<AppState>) -> Json<InfoReport> {
    Json(InfoReport {
        app: AppInfo {
            name: state.config.app.name.clone(),
            version: env!("CARGO_PKG_VERSION"),
        },
        profile: state.config.profile.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_failure_detail_is_not_exposed() {
        let cause =
            sqlx::Error::Configuration("password authentication failed for user pokedex".into());
        let component = db_component(Err(cause));
        assert_eq!(component.status, Status::Down);
        assert_eq!(component.error.as_deref(), Some(DB_UNAVAILABLE));

        let body = serde_json::to_string(&component).unwrap();
        assert!(!body.contains("pokedex"));
    }

    #[test]
    fn healthy_db_has_no_error() {
        let component = db_component(Ok(()));
        assert_eq!(component.status, Status::Up);
        assert!(component.error.is_none());
    }
}
