//! Response bodies and redirects.
//!
//! # Responsibilities
//! - Machine-readable health report for `/health`
//! - Flash-message redirects for form posts (`/health/control`, `/upload`)
//!
//! Flash messages travel in the redirect's query string; the index page
//! echoes them back.

use axum::response::Redirect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::health::record::iso8601;
use crate::health::{HealthRecord, HealthStatus};

/// Per-subsystem statuses in a health report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatuses {
    pub storage: HealthStatus,
    pub application: HealthStatus,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    pub services: ServiceStatuses,
    /// Raw stored record, when one existed at evaluation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_data: Option<HealthRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Error,
}

impl FlashCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashCategory::Success => "success",
            FlashCategory::Error => "error",
        }
    }
}

/// One-shot user-facing message carried through a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub message: String,
    pub category: FlashCategory,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: FlashCategory::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: FlashCategory::Error,
        }
    }

    /// Location of `path` with this message attached.
    pub fn location(&self, path: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("message", &self.message)
            .append_pair("category", self.category.as_str())
            .finish();
        format!("{path}?{query}")
    }

    /// `303 See Other` to `path` carrying this message.
    pub fn redirect(self, path: &str) -> Redirect {
        Redirect::to(&self.location(path))
    }
}

/// Flash fields as they arrive back on the index page.
#[derive(Debug, Default, Deserialize)]
pub struct FlashQuery {
    pub message: Option<String>,
    pub category: Option<String>,
}

impl FlashQuery {
    pub fn into_flash(self) -> Option<Flash> {
        let message = self.message.filter(|m| !m.is_empty())?;
        let category = match self.category.as_deref() {
            Some("success") => FlashCategory::Success,
            _ => FlashCategory::Error,
        };
        Some(Flash { message, category })
    }
}
