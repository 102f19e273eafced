//! Health endpoints.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health[?action=unhealthy\|healthy]` | Evaluate (after applying the directive); 200 or 503 |
//! | POST | `/health/control` | Form toggle (`make_unhealthy` / `make_healthy`), redirects with a flash |

use std::str::FromStr;
use std::time::Duration;

use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::{Form, Json};
use serde::Deserialize;
use thiserror::Error;

use crate::health::HealthStatus;
use crate::http::response::{Flash, HealthReport, ServiceStatuses};
use crate::http::server::AppState;

/// Query string of `GET /health`.
#[derive(Debug, Default, Deserialize)]
pub struct HealthQuery {
    pub action: Option<String>,
}

/// Directive accepted by `GET /health`. Unknown values are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthDirective {
    Unhealthy,
    Healthy,
}

impl HealthDirective {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "unhealthy" => Some(HealthDirective::Unhealthy),
            "healthy" => Some(HealthDirective::Healthy),
            _ => None,
        }
    }
}

/// Form body of `POST /health/control`.
#[derive(Debug, Default, Deserialize)]
pub struct ControlForm {
    #[serde(default)]
    pub action: Option<String>,
}

/// Administrative toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    MakeUnhealthy,
    MakeHealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlActionError {
    #[error("invalid control action: {0:?}")]
    Invalid(String),
}

impl FromStr for ControlAction {
    type Err = ControlActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "make_unhealthy" => Ok(ControlAction::MakeUnhealthy),
            "make_healthy" => Ok(ControlAction::MakeHealthy),
            other => Err(ControlActionError::Invalid(other.to_string())),
        }
    }
}

/// GET /health
pub async fn health_check(
    State(state): State<AppState>,
    Query(query): Query<HealthQuery>,
) -> (StatusCode, Json<HealthReport>) {
    let config = state.config();

    if let Some(raw) = query.action.as_deref() {
        match HealthDirective::parse(raw) {
            Some(HealthDirective::Unhealthy) => {
                state
                    .health
                    .set_unhealthy(config.health.unhealthy_duration_secs)
                    .await;
            }
            Some(HealthDirective::Healthy) => {
                state.health.set_healthy().await;
            }
            None => tracing::debug!(action = %raw, "Ignoring unknown health action"),
        }
    }

    let evaluation = state.health.evaluate().await;

    // storage mirrors the verdict unless a live probe says otherwise
    let mut healthy = evaluation.healthy;
    if healthy {
        let timeout = Duration::from_millis(config.health.probe_timeout_ms);
        if state.probe.check(timeout).await.is_err() {
            healthy = false;
        }
    }

    let status = HealthStatus::from_healthy(healthy);
    let report = HealthReport {
        status,
        timestamp: state.health.store().clock().now(),
        services: ServiceStatuses {
            storage: status,
            application: status,
        },
        blob_data: evaluation.record,
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

/// POST /health/control
pub async fn control_health(
    State(state): State<AppState>,
    form: Result<Form<ControlForm>, FormRejection>,
) -> Redirect {
    let raw = match form {
        Ok(Form(form)) => form.action.unwrap_or_default(),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable control form");
            String::new()
        }
    };

    let flash = match raw.parse::<ControlAction>() {
        Ok(ControlAction::MakeUnhealthy) => {
            let duration = state.config().health.unhealthy_duration_secs;
            if state.health.set_unhealthy(duration).await {
                Flash::success(format!("Health set to unhealthy for {duration} seconds"))
            } else {
                Flash::error("Failed to update health")
            }
        }
        Ok(ControlAction::MakeHealthy) => {
            if state.health.set_healthy().await {
                Flash::success("Health set to healthy")
            } else {
                Flash::error("Failed to update health")
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected health control request");
            Flash::error("Invalid action")
        }
    };

    flash.redirect("/")
}
