//! In-memory blob store.
//!
//! Backs local development runs (`storage.backend = "memory"`) and tests.
//! Containers map to ordered key sets so listings come back sorted, the
//! same as the Azure listing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{validate_key, BlobStore, ContainerProperties, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Container {
    objects: BTreeMap<String, Vec<u8>>,
    last_modified: String,
}

/// Thread-safe in-process blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    containers: DashMap<String, Container>,
    offline: AtomicBool,
    puts: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a storage outage: every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful puts since creation.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

fn now_http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn container_exists(&self, container: &str) -> StoreResult<bool> {
        self.check_online()?;
        Ok(self.containers.contains_key(container))
    }

    async fn create_container(&self, container: &str) -> StoreResult<()> {
        self.check_online()?;
        self.containers
            .entry(container.to_string())
            .or_insert_with(|| Container {
                objects: BTreeMap::new(),
                last_modified: now_http_date(),
            });
        Ok(())
    }

    async fn container_properties(&self, container: &str) -> StoreResult<ContainerProperties> {
        self.check_online()?;
        let entry = self
            .containers
            .get(container)
            .ok_or_else(|| StoreError::ContainerNotFound(container.to_string()))?;
        Ok(ContainerProperties {
            etag: Some(format!("\"{}\"", entry.objects.len())),
            last_modified: Some(entry.last_modified.clone()),
        })
    }

    async fn get_object(&self, container: &str, key: &str) -> StoreResult<Vec<u8>> {
        self.check_online()?;
        validate_key(key)?;
        let entry = self
            .containers
            .get(container)
            .ok_or_else(|| StoreError::ContainerNotFound(container.to_string()))?;
        entry
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound {
                container: container.to_string(),
                key: key.to_string(),
            })
    }

    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> StoreResult<()> {
        self.check_online()?;
        validate_key(key)?;
        let mut entry = self
            .containers
            .get_mut(container)
            .ok_or_else(|| StoreError::ContainerNotFound(container.to_string()))?;
        entry.objects.insert(key.to_string(), body);
        entry.last_modified = now_http_date();
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_objects(&self, container: &str) -> StoreResult<Vec<String>> {
        self.check_online()?;
        let entry = self
            .containers
            .get(container)
            .ok_or_else(|| StoreError::ContainerNotFound(container.to_string()))?;
        Ok(entry.objects.keys().cloned().collect())
    }
}
