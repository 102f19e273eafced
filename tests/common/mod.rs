//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use failover_files::config::{AppConfig, StorageBackend};
use failover_files::health::Clock;
use failover_files::lifecycle::{provision_containers, Shutdown};
use failover_files::storage::{BlobStore, ContainerProperties, MemoryBlobStore, StoreError, StoreResult};
use failover_files::HttpServer;

/// Config for a server backed by an in-process store.
pub fn memory_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.backend = StorageBackend::Memory;
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config
}

/// A running server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger("test finished");
    }
}

/// Start the full server after provisioning its containers, as startup does.
pub async fn spawn_server(config: AppConfig, blobs: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> TestServer {
    provision_containers(blobs.as_ref(), &config.storage).await;
    spawn_unprovisioned_server(config, blobs, clock).await
}

/// Start the full server against the store as given.
pub async fn spawn_unprovisioned_server(
    config: AppConfig,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (_, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config, blobs, clock);
    let signal = shutdown.signal();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, signal).await;
    });

    TestServer { addr, shutdown }
}

/// Client that leaves redirects for the test to inspect.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// How the wrapped store's container properties lookup misbehaves.
#[derive(Debug, Clone, Copy)]
pub enum PropertiesFault {
    Fail,
    Hang(Duration),
}

/// Memory store whose `container_properties` fails or hangs while every
/// other operation works.
pub struct FaultyPropertiesStore {
    pub inner: MemoryBlobStore,
    pub fault: PropertiesFault,
}

impl FaultyPropertiesStore {
    pub fn new(fault: PropertiesFault) -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            fault,
        }
    }
}

#[async_trait]
impl BlobStore for FaultyPropertiesStore {
    fn name(&self) -> &'static str {
        "faulty"
    }

    async fn container_exists(&self, container: &str) -> StoreResult<bool> {
        self.inner.container_exists(container).await
    }

    async fn create_container(&self, container: &str) -> StoreResult<()> {
        self.inner.create_container(container).await
    }

    async fn container_properties(&self, container: &str) -> StoreResult<ContainerProperties> {
        match self.fault {
            PropertiesFault::Fail => Err(StoreError::Unavailable("properties refused".to_string())),
            PropertiesFault::Hang(delay) => {
                tokio::time::sleep(delay).await;
                self.inner.container_properties(container).await
            }
        }
    }

    async fn get_object(&self, container: &str, key: &str) -> StoreResult<Vec<u8>> {
        self.inner.get_object(container, key).await
    }

    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> StoreResult<()> {
        self.inner.put_object(container, key, body).await
    }

    async fn list_objects(&self, container: &str) -> StoreResult<Vec<String>> {
        self.inner.list_objects(container).await
    }
}

/// Blob service double speaking the subset of the REST API the client uses.
///
/// Requests must carry `sig=<sas>`; listings return `page_size` names per
/// page with a numeric `NextMarker`. Every request is logged as
/// `"<METHOD> <path>?<query>"`.
#[derive(Clone)]
pub struct MockBlobService {
    pub containers: Arc<Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>>,
    pub sig: String,
    pub page_size: usize,
    pub requests: Arc<Mutex<Vec<String>>>,
}

const LAST_MODIFIED: &str = "Mon, 19 Oct 2026 12:00:00 GMT";

impl MockBlobService {
    pub fn new(sig: &str, page_size: usize) -> Self {
        Self {
            containers: Arc::default(),
            sig: sig.to_string(),
            page_size,
            requests: Arc::default(),
        }
    }

    /// Serve on an ephemeral port; returns the endpoint URL.
    pub async fn start(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/{container}", any(container_handler))
            .route("/{container}/{blob}", any(blob_handler))
            .with_state(self.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    /// Logged requests whose line contains `needle`.
    pub fn count_requests(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    fn authorize(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        query: &HashMap<String, String>,
    ) -> Option<Response> {
        self.requests.lock().unwrap().push(format!("{method} {uri}"));
        if headers.get("x-ms-version").is_none() {
            return Some(error(StatusCode::BAD_REQUEST, "MissingRequiredHeader"));
        }
        if query.get("sig") != Some(&self.sig) {
            return Some(error(StatusCode::FORBIDDEN, "AuthenticationFailed"));
        }
        None
    }
}

fn error(status: StatusCode, code: &'static str) -> Response {
    (status, [("x-ms-error-code", code)]).into_response()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn etag(bytes: &[u8]) -> String {
    format!("\"0x{:X}\"", bytes.iter().fold(bytes.len() as u64, |h, b| h.wrapping_mul(31) ^ u64::from(*b)))
}

async fn container_handler(
    State(svc): State<MockBlobService>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(container): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(rejected) = svc.authorize(&method, &uri, &headers, &query) {
        return rejected;
    }
    if query.get("restype").map(String::as_str) != Some("container") {
        return error(StatusCode::BAD_REQUEST, "InvalidQueryParameterValue");
    }

    let mut containers = svc.containers.lock().unwrap();
    match (method, query.get("comp").map(String::as_str)) {
        (Method::PUT, None) => {
            if containers.contains_key(&container) {
                return error(StatusCode::CONFLICT, "ContainerAlreadyExists");
            }
            containers.insert(container, BTreeMap::new());
            StatusCode::CREATED.into_response()
        }
        (Method::HEAD, None) | (Method::GET, None) => {
            if !containers.contains_key(&container) {
                return error(StatusCode::NOT_FOUND, "ContainerNotFound");
            }
            (StatusCode::OK, [("etag", "\"0x8D\""), ("last-modified", LAST_MODIFIED)]).into_response()
        }
        (Method::GET, Some("list")) => {
            let Some(objects) = containers.get(&container) else {
                return error(StatusCode::NOT_FOUND, "ContainerNotFound");
            };
            let start: usize = query.get("marker").and_then(|m| m.parse().ok()).unwrap_or(0);
            let page: Vec<(&String, &Vec<u8>)> = objects.iter().skip(start).take(svc.page_size).collect();
            let next = start + page.len();
            let marker = if next < objects.len() {
                format!("<NextMarker>{next}</NextMarker>")
            } else {
                String::new()
            };

            let blobs: String = page
                .iter()
                .map(|(name, bytes)| {
                    format!(
                        "<Blob><Name>{}</Name><Properties><Last-Modified>{LAST_MODIFIED}</Last-Modified>\
                         <Etag>{}</Etag><Content-Length>{}</Content-Length>\
                         <Content-Type>application/octet-stream</Content-Type></Properties></Blob>",
                        escape(name),
                        escape(&etag(bytes)),
                        bytes.len()
                    )
                })
                .collect();
            let body = format!(
                r#"<?xml version="1.0" encoding="utf-8"?><EnumerationResults ContainerName="{container}"><Blobs>{blobs}</Blobs>{marker}</EnumerationResults>"#
            );
            (StatusCode::OK, [("content-type", "application/xml")], body).into_response()
        }
        _ => error(StatusCode::BAD_REQUEST, "UnsupportedHttpVerb"),
    }
}

async fn blob_handler(
    State(svc): State<MockBlobService>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path((container, blob)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    if let Some(rejected) = svc.authorize(&method, &uri, &headers, &query) {
        return rejected;
    }

    let mut containers = svc.containers.lock().unwrap();
    let Some(objects) = containers.get_mut(&container) else {
        return error(StatusCode::NOT_FOUND, "ContainerNotFound");
    };
    match method {
        Method::PUT => {
            if headers.get("x-ms-blob-type").and_then(|v| v.to_str().ok()) != Some("BlockBlob") {
                return error(StatusCode::BAD_REQUEST, "MissingRequiredHeader");
            }
            let tag = etag(&body);
            objects.insert(blob, body.to_vec());
            (StatusCode::CREATED, [("etag", tag.as_str()), ("last-modified", LAST_MODIFIED)]).into_response()
        }
        Method::GET => match objects.get(&blob) {
            Some(bytes) => (
                StatusCode::OK,
                [
                    ("etag", etag(bytes)),
                    ("last-modified", LAST_MODIFIED.to_string()),
                    ("content-type", "application/octet-stream".to_string()),
                ],
                bytes.clone(),
            )
                .into_response(),
            None => error(StatusCode::NOT_FOUND, "BlobNotFound"),
        },
        _ => error(StatusCode::BAD_REQUEST, "UnsupportedHttpVerb"),
    }
}
