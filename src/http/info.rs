//! Instance information for operators checking which region answered.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::health::HealthStatus;
use crate::http::response::{Flash, FlashQuery};
use crate::http::server::AppState;

const FRONT_DOOR_HEADER: &str = "x-azure-fdid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub region: String,
    pub region_suffix: String,
    pub hostname: String,
}

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPage {
    pub region_info: RegionInfo,
    pub health_status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

/// Body of `GET /info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub application: String,
    pub version: String,
    pub region: String,
    pub region_suffix: String,
    pub environment: String,
    pub hostname: String,
    pub storage_backend: String,
    pub storage_endpoint: String,
    pub container_name: String,
    pub front_door_id: String,
    pub request_headers: BTreeMap<String, String>,
}

/// GET /
pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(flash): Query<FlashQuery>,
) -> Json<IndexPage> {
    let config = state.config();
    let evaluation = state.health.evaluate().await;

    let hostname = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    Json(IndexPage {
        region_info: RegionInfo {
            region: config.region.region.clone(),
            region_suffix: config.region.region_suffix.clone(),
            hostname,
        },
        health_status: evaluation.status(),
        flash: flash.into_flash(),
    })
}

/// GET /info
pub async fn app_info(State(state): State<AppState>, headers: HeaderMap) -> Json<AppInfo> {
    let config = state.config();

    let front_door_id = headers
        .get(FRONT_DOOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("direct-access")
        .to_string();

    let request_headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    Json(AppInfo {
        application: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        region: config.region.region.clone(),
        region_suffix: config.region.region_suffix.clone(),
        environment: config.region.environment.clone(),
        hostname: config.region.hostname.clone(),
        storage_backend: state.blobs.name().to_string(),
        storage_endpoint: config.storage.blob_endpoint.clone(),
        container_name: config.storage.files_container.clone(),
        front_door_id,
        request_headers,
    })
}
