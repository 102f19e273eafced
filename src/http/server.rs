//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, timeouts, request ID)
//! - Bind server to listener
//! - Apply configuration reloads while serving

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::health::{Clock, HealthStateMachine, HealthStatusStore, LivenessProbe};
use crate::http::request::{make_span, RequestUuid};
use crate::http::{files, health, info};
use crate::lifecycle::ShutdownSignal;
use crate::storage::BlobStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<AppConfig>>,
    pub blobs: Arc<dyn BlobStore>,
    pub health: HealthStateMachine,
    pub probe: LivenessProbe,
}

impl AppState {
    pub fn new(config: AppConfig, blobs: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Self {
        let store = HealthStatusStore::new(
            blobs.clone(),
            clock,
            config.storage.status_container.clone(),
            config.storage.status_blob.clone(),
        );
        let probe = LivenessProbe::new(blobs.clone(), config.storage.status_container.clone());

        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            blobs,
            health: HealthStateMachine::new(store),
            probe,
        }
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.load_full()
    }

    /// Swap in a reloaded configuration.
    ///
    /// Settings baked into the storage client at startup are carried over
    /// from the running config.
    pub fn apply_config(&self, mut new_config: AppConfig) {
        let current = self.config.load_full();

        let storage_changed = {
            let (old, new) = (&current.storage, &new_config.storage);
            old.backend != new.backend
                || old.blob_endpoint != new.blob_endpoint
                || old.sas_token != new.sas_token
                || old.client_id != new.client_id
                || old.tenant_id != new.tenant_id
                || old.federated_token_file != new.federated_token_file
                || old.status_container != new.status_container
                || old.status_blob != new.status_blob
                || old.request_timeout_secs != new.request_timeout_secs
        };
        if storage_changed {
            tracing::warn!("Storage connection settings changed; restart to apply them");
        }
        if current.listener != new_config.listener
            || current.limits != new_config.limits
            || current.timeouts != new_config.timeouts
        {
            tracing::warn!("Listener, limit or timeout settings changed; restart to apply them");
        }

        new_config.storage = crate::config::StorageConfig {
            files_container: new_config.storage.files_container.clone(),
            ..current.storage.clone()
        };

        tracing::info!(
            unhealthy_duration_secs = new_config.health.unhealthy_duration_secs,
            probe_timeout_ms = new_config.health.probe_timeout_ms,
            files_container = %new_config.storage.files_container,
            "Configuration reloaded"
        );
        self.config.store(Arc::new(new_config));
    }
}

/// HTTP server for the file front end and health endpoints.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and store.
    pub fn new(config: AppConfig, blobs: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Self {
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let max_body = config.limits.max_upload_bytes;

        let state = AppState::new(config, blobs, clock);
        let router = Self::build_router(state.clone(), request_timeout, max_body);
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration, max_body: usize) -> Router {
        Router::new()
            .route("/", get(info::index))
            .route("/info", get(info::app_info))
            .route("/health", get(health::health_check))
            .route("/health/control", post(health::control_health))
            .route("/upload", post(files::upload_file))
            .route("/files", get(files::list_files))
            .route("/files/{filename}", get(files::view_file))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(RequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(make_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(DefaultBodyLimit::disable())
                    .layer(RequestBodyLimitLayer::new(max_body))
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    /// A clone of the router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                state.apply_config(new_config);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        // Serve with graceful shutdown
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
                tracing::info!("Draining connections");
            })
            .await;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        result
    }
}
