//! Azure backend tests against a local blob service double.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use failover_files::config::StorageBackend;
use failover_files::health::{HealthStateMachine, HealthStatus, HealthStatusStore, SystemClock};
use failover_files::lifecycle::{build_blob_store, provision_containers};
use failover_files::storage::{AzureAuth, AzureBlobStore, BlobStore, StoreError};

mod common;

use common::MockBlobService;

const SAS: &str = "sv=2021-08-06&ss=b&sp=rwlc&sig=s3cret";

fn sas(token: &str) -> AzureAuth {
    AzureAuth::Sas(url::form_urlencoded::parse(token.as_bytes()).into_owned().collect())
}

async fn store(page_size: usize) -> (MockBlobService, AzureBlobStore) {
    let service = MockBlobService::new("s3cret", page_size);
    let endpoint = service.start().await;
    let store = AzureBlobStore::new(&endpoint, sas(SAS), Duration::from_secs(5)).unwrap();
    (service, store)
}

#[tokio::test]
async fn container_lifecycle() {
    let (_, store) = store(100).await;

    assert!(!store.container_exists("files").await.unwrap());
    assert!(matches!(
        store.container_properties("files").await,
        Err(StoreError::ContainerNotFound(_))
    ));

    store.ensure_container("files").await.unwrap();
    store.ensure_container("files").await.unwrap();
    // a racing creator gets 409, which still counts as created
    store.create_container("files").await.unwrap();

    let props = store.container_properties("files").await.unwrap();
    assert_eq!(props.etag.as_deref(), Some("\"0x8D\""));
    assert!(props.last_modified.is_some());
}

#[tokio::test]
async fn put_get_and_not_found_classification() {
    let (_, store) = store(100).await;

    assert!(matches!(
        store.get_object("status", "health-status.json").await,
        Err(StoreError::ContainerNotFound(_))
    ));

    store.create_container("status").await.unwrap();
    assert!(matches!(
        store.get_object("status", "health-status.json").await,
        Err(StoreError::BlobNotFound { .. })
    ));

    store
        .put_object("status", "health-status.json", b"{}".to_vec())
        .await
        .unwrap();
    store
        .put_object("status", "health-status.json", b"{\"v\":2}".to_vec())
        .await
        .unwrap();
    assert_eq!(
        store.get_object("status", "health-status.json").await.unwrap(),
        b"{\"v\":2}"
    );
}

#[tokio::test]
async fn listing_follows_markers() {
    let (service, store) = store(2).await;
    store.create_container("files").await.unwrap();
    for name in ["e.txt", "a.txt", "R&D <draft>.txt", "c.txt", "b.txt"] {
        store.put_object("files", name, b"x".to_vec()).await.unwrap();
    }

    let before = service.count_requests("comp=list");
    let names = store.list_objects("files").await.unwrap();
    assert_eq!(names, vec!["R&D <draft>.txt", "a.txt", "b.txt", "c.txt", "e.txt"]);
    assert_eq!(service.count_requests("comp=list") - before, 3);
    assert_eq!(
        store.get_object("files", "R&D <draft>.txt").await.unwrap(),
        b"x"
    );

    assert!(matches!(
        store.list_objects("missing").await,
        Err(StoreError::ContainerNotFound(_))
    ));
}

#[tokio::test]
async fn wrong_sas_is_unauthorized() {
    let service = MockBlobService::new("s3cret", 100);
    let endpoint = service.start().await;
    let store = AzureBlobStore::new(&endpoint, sas("sig=wrong"), Duration::from_secs(5)).unwrap();

    assert!(matches!(
        store.container_properties("files").await,
        Err(StoreError::Unauthorized(403))
    ));
    let err = store.get_object("files", "notes.txt").await.unwrap_err();
    assert!(!err.is_not_found(), "{err:?}");
}

#[tokio::test]
async fn unreachable_endpoint_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = AzureBlobStore::new(&format!("http://{addr}"), sas(SAS), Duration::from_secs(2)).unwrap();
    assert!(matches!(
        store.container_exists("files").await,
        Err(StoreError::Transport(_))
    ));
}

#[tokio::test]
async fn health_state_round_trips_through_rest_api() {
    let (service, store) = store(100).await;
    let store: Arc<dyn BlobStore> = Arc::new(store);
    let machine = HealthStateMachine::new(HealthStatusStore::new(
        store.clone(),
        Arc::new(SystemClock),
        "status",
        "health-status.json",
    ));

    assert!(machine.evaluate().await.healthy);
    assert!(machine.set_unhealthy(60).await);

    let evaluation = machine.evaluate().await;
    assert!(!evaluation.healthy);
    assert_eq!(evaluation.record.unwrap().status(), HealthStatus::Unhealthy);

    let raw = service.containers.lock().unwrap()["status"]["health-status.json"].clone();
    let raw: Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(raw["status"], "unhealthy");
    assert!(raw["unhealthy_until"].as_str().unwrap().ends_with('Z'));

    assert!(machine.set_healthy().await);
    assert!(machine.evaluate().await.healthy);
}

#[tokio::test]
async fn server_on_azure_backend() {
    let service = MockBlobService::new("s3cret", 100);
    let endpoint = service.start().await;

    let mut config = common::memory_config();
    config.storage.backend = StorageBackend::Azure;
    config.storage.blob_endpoint = endpoint;
    config.storage.sas_token = Some(SAS.to_string());
    let blobs = build_blob_store(&config.storage).unwrap();
    assert_eq!(provision_containers(blobs.as_ref(), &config.storage).await, 2);

    let server = common::spawn_unprovisioned_server(config, blobs, Arc::new(SystemClock)).await;
    let client = common::client();

    let res = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = client.get(server.url("/health?action=unhealthy")).send().await.unwrap();
    assert_eq!(res.status(), 503);

    let res = client
        .post(server.url("/upload"))
        .form(&[("filename", "notes.txt"), ("file_content", "hello from eastus")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 303);
    let listing: Value = client.get(server.url("/files")).send().await.unwrap().json().await.unwrap();
    assert_eq!(listing["files"], serde_json::json!(["notes.txt"]));
    assert_eq!(service.containers.lock().unwrap()["files"]["notes.txt"], b"hello from eastus");

    let info: Value = client.get(server.url("/info")).send().await.unwrap().json().await.unwrap();
    assert_eq!(info["storage_backend"], "azure");
    assert_eq!(info["front_door_id"], "direct-access");
}
