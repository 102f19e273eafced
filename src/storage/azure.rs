//! Azure Blob Storage backend.
//!
//! # Responsibilities
//! - Objects (get, put, list) through `object_store`'s Azure client, one
//!   client per container
//! - Container create and properties through the Blob REST API, which
//!   `object_store` does not cover
//! - Translate both error sources into `StoreError` variants
//!
//! # Authentication
//! A configured SAS token is sent with every request. Without one, the
//! credential chain falls back to workload identity (client id, tenant id
//! and federated token file all set) or the instance's managed identity.
//! REST calls reuse the object client's credential provider, so tokens are
//! cached in one place.
//!
//! # Design Decisions
//! - Every request has a client-level timeout and at most one retry; a hung
//!   storage account must not stall a health check
//! - 409 on container create is success (another instance got there first)

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use futures_util::TryStreamExt;
use object_store::azure::{AzureCredential, MicrosoftAzure, MicrosoftAzureBuilder};
use object_store::path::Path as ObjectPath;
use object_store::{
    ClientOptions, CredentialProvider, ObjectMeta, ObjectStore, PutPayload, RetryConfig,
};
use reqwest::{header, Client, Method, Response, StatusCode};
use url::{form_urlencoded, Url};

use super::{validate_key, BlobStore, ContainerProperties, StoreError, StoreResult};
use crate::config::StorageConfig;

/// REST API version sent in `x-ms-version`.
pub const API_VERSION: &str = "2021-08-06";

const ERROR_CODE_HEADER: &str = "x-ms-error-code";

/// How requests to the storage account are authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum AzureAuth {
    /// Decoded SAS query pairs.
    Sas(Vec<(String, String)>),
    /// Managed identity, or workload identity when all three fields are set.
    Identity {
        client_id: Option<String>,
        tenant_id: Option<String>,
        federated_token_file: Option<String>,
    },
}

impl AzureAuth {
    /// SAS when a token is configured, identity otherwise.
    pub fn from_config(config: &StorageConfig) -> Self {
        match config.sas_token.as_deref().map(|t| t.trim().trim_start_matches('?')) {
            Some(token) if !token.is_empty() => AzureAuth::Sas(
                form_urlencoded::parse(token.as_bytes())
                    .into_owned()
                    .collect(),
            ),
            _ => AzureAuth::Identity {
                client_id: config.client_id.clone(),
                tenant_id: config.tenant_id.clone(),
                federated_token_file: config.federated_token_file.clone(),
            },
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            AzureAuth::Sas(_) => "sas",
            AzureAuth::Identity {
                federated_token_file: Some(_),
                ..
            } => "workload_identity",
            AzureAuth::Identity { .. } => "managed_identity",
        }
    }
}

impl fmt::Debug for AzureAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mode())
    }
}

/// Blob store backed by an Azure storage account.
pub struct AzureBlobStore {
    http: Client,
    endpoint: Url,
    account: String,
    auth: AzureAuth,
    timeout: Duration,
    containers: DashMap<String, Arc<MicrosoftAzure>>,
}

impl fmt::Debug for AzureBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureBlobStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("account", &self.account)
            .field("auth", &self.auth)
            .finish()
    }
}

impl AzureBlobStore {
    /// Build a store for `endpoint` (e.g. `https://acct.blob.core.windows.net`).
    ///
    /// The account name is the first label of the endpoint host.
    pub fn new(endpoint: &str, auth: AzureAuth, timeout: Duration) -> StoreResult<Self> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| StoreError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if endpoint.cannot_be_a_base() || !matches!(endpoint.scheme(), "http" | "https") {
            return Err(StoreError::InvalidEndpoint(endpoint.to_string()));
        }
        let account = endpoint
            .host_str()
            .and_then(|host| host.split('.').next())
            .filter(|label| !label.is_empty())
            .ok_or_else(|| StoreError::InvalidEndpoint(endpoint.to_string()))?
            .to_string();

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("failover-files/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            account,
            auth,
            timeout,
            containers: DashMap::new(),
        })
    }

    pub fn from_config(config: &StorageConfig) -> StoreResult<Self> {
        Self::new(
            &config.blob_endpoint,
            AzureAuth::from_config(config),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn auth(&self) -> &AzureAuth {
        &self.auth
    }

    /// Object client for `container`, built on first use.
    fn client(&self, container: &str) -> StoreResult<Arc<MicrosoftAzure>> {
        if let Some(client) = self.containers.get(container) {
            return Ok(client.clone());
        }

        let options = ClientOptions::new()
            .with_timeout(self.timeout)
            .with_allow_http(self.endpoint.scheme() == "http");
        let retry = RetryConfig {
            max_retries: 1,
            retry_timeout: self.timeout,
            ..RetryConfig::default()
        };

        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(&self.account)
            .with_container_name(container)
            .with_endpoint(self.endpoint.as_str().trim_end_matches('/').to_string())
            .with_client_options(options)
            .with_retry(retry);

        builder = match &self.auth {
            AzureAuth::Sas(pairs) => builder.with_sas_authorization(pairs.clone()),
            AzureAuth::Identity {
                client_id,
                tenant_id,
                federated_token_file,
            } => {
                if let Some(id) = client_id {
                    builder = builder.with_client_id(id);
                }
                if let Some(tenant) = tenant_id {
                    builder = builder.with_tenant_id(tenant);
                }
                if let Some(file) = federated_token_file {
                    builder = builder.with_federated_token_file(file);
                }
                builder
            }
        };

        let client = Arc::new(
            builder
                .build()
                .map_err(|e| StoreError::InvalidEndpoint(format!("Azure: {e}")))?,
        );
        self.containers
            .insert(container.to_string(), client.clone());
        Ok(client)
    }

    fn container_url(&self, container: &str) -> StoreResult<Url> {
        let mut url = self.endpoint.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(container);
        url.query_pairs_mut().append_pair("restype", "container");
        Ok(url)
    }

    /// Container-level REST call, authorized with the object client's
    /// current credential.
    async fn container_request(&self, method: Method, container: &str) -> StoreResult<Response> {
        let credential = self
            .client(container)?
            .credentials()
            .get_credential()
            .await
            .map_err(|e| StoreError::Credential(e.to_string()))?;

        let mut url = self.container_url(container)?;
        let mut bearer = None;
        match credential.as_ref() {
            AzureCredential::SASToken(pairs) => {
                url.query_pairs_mut().extend_pairs(pairs);
            }
            AzureCredential::BearerToken(token) => bearer = Some(token.clone()),
            _ => {
                return Err(StoreError::Credential(
                    "shared key credentials are not supported".to_string(),
                ))
            }
        }

        let mut request = self
            .http
            .request(method, url)
            .header("x-ms-version", API_VERSION)
            .header(
                "x-ms-date",
                Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            );
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        tracing::trace!(container, status = %response.status(), "Blob service response");
        Ok(response)
    }

    /// Map an object client error, splitting "not found" into container
    /// and blob cases with a follow-up existence check. Everything else
    /// stays a `Backend` error carrying the client's own message.
    async fn object_error(
        &self,
        error: object_store::Error,
        container: &str,
        key: Option<&str>,
    ) -> StoreError {
        let mapped = map_object_error(error, container, key);
        if matches!(mapped, StoreError::Backend(_) | StoreError::BlobNotFound { .. })
            && matches!(self.container_exists(container).await, Ok(false))
        {
            return StoreError::ContainerNotFound(container.to_string());
        }
        mapped
    }
}

fn map_object_error(error: object_store::Error, container: &str, key: Option<&str>) -> StoreError {
    match error {
        object_store::Error::NotFound { .. } => match key {
            Some(key) => StoreError::BlobNotFound {
                container: container.to_string(),
                key: key.to_string(),
            },
            None => StoreError::ContainerNotFound(container.to_string()),
        },
        other => StoreError::Backend(other),
    }
}

/// Translate a non-success container response into a store error.
fn status_error(operation: &'static str, response: &Response, container: &str) -> StoreError {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::Unauthorized(status.as_u16())
        }
        StatusCode::NOT_FOUND => StoreError::ContainerNotFound(container.to_string()),
        _ => {
            let code = response
                .headers()
                .get(ERROR_CODE_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::debug!(
                operation,
                %status,
                error_code = code,
                "Unexpected blob service status"
            );
            StoreError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            }
        }
    }
}

fn header_string(response: &Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn object_path(key: &str) -> StoreResult<ObjectPath> {
    validate_key(key)?;
    ObjectPath::parse(key).map_err(|_| StoreError::InvalidName(key.to_string()))
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn container_exists(&self, container: &str) -> StoreResult<bool> {
        match self.container_properties(container).await {
            Ok(_) => Ok(true),
            Err(StoreError::ContainerNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_container(&self, container: &str) -> StoreResult<()> {
        let response = self.container_request(Method::PUT, container).await?;
        match response.status() {
            StatusCode::CREATED | StatusCode::CONFLICT => Ok(()),
            _ => Err(status_error("create_container", &response, container)),
        }
    }

    async fn container_properties(&self, container: &str) -> StoreResult<ContainerProperties> {
        let response = self.container_request(Method::HEAD, container).await?;
        if response.status() != StatusCode::OK {
            return Err(status_error("container_properties", &response, container));
        }
        Ok(ContainerProperties {
            etag: header_string(&response, header::ETAG),
            last_modified: header_string(&response, header::LAST_MODIFIED),
        })
    }

    async fn get_object(&self, container: &str, key: &str) -> StoreResult<Vec<u8>> {
        let path = object_path(key)?;
        let client = self.client(container)?;
        let result = match client.get(&path).await {
            Ok(result) => result.bytes().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => Err(self.object_error(e, container, Some(key)).await),
        }
    }

    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> StoreResult<()> {
        let path = object_path(key)?;
        let client = self.client(container)?;
        match client.put(&path, PutPayload::from(body)).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.object_error(e, container, Some(key)).await),
        }
    }

    async fn list_objects(&self, container: &str) -> StoreResult<Vec<String>> {
        let client = self.client(container)?;
        let listed: Result<Vec<ObjectMeta>, _> = client.list(None).try_collect().await;
        match listed {
            Ok(objects) => {
                let mut names: Vec<String> = objects
                    .into_iter()
                    .map(|meta| meta.location.to_string())
                    .collect();
                names.sort();
                Ok(names)
            }
            Err(e) => Err(self.object_error(e, container, None).await),
        }
    }
}
