use axum::routing::get;
use axum::{middleware, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::admission::{AdmissionController, ReclaimTask};
use crate::config::Config;
use crate::domains::SearchService;
use crate::error::ConfigError;
use crate::handlers::{health_check, list_events, list_idols, list_tags, AppState, DocumentStore};
use crate::middleware::{admission_middleware, logging_middleware};
use crate::query::{CatalogSeed, MemoryStore, QueryEngine};

/// Build the router. Admission control covers the listings; `/health`
/// stays reachable for probes regardless of client budget.
pub fn create_app(state: AppState, enable_tracing: bool) -> Router {
    let api = Router::new()
        .route("/api/v1/idols", get(list_idols))
        .route("/api/v1/events", get(list_events))
        .route("/api/v1/tags", get(list_tags))
        .route_layer(middleware::from_fn_with_state(state.clone(), admission_middleware));

    let app = Router::new()
        .merge(api)
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(logging_middleware)),
        );

    if enable_tracing {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}

/// Assemble shared state from configuration, loading the seed file if set.
pub fn build_state(config: &Config) -> Result<AppState, ConfigError> {
    let seed = match config.seed_path() {
        Some(path) => {
            let seed = CatalogSeed::from_file(path)?;
            info!(
                target: "catalog::server",
                path = %path.display(),
                idols = seed.idols.len(),
                events = seed.events.len(),
                tags = seed.tags.len(),
                "Loaded seed data"
            );
            seed
        }
        None => CatalogSeed::default(),
    };

    let limits = config.search_limits();
    let deadline = config.search_deadline();
    let engine = |documents| {
        let store: DocumentStore = Arc::new(MemoryStore::new(documents));
        QueryEngine::new(store).with_deadline(deadline)
    };

    Ok(AppState {
        admission: Arc::new(AdmissionController::new(config.admission_settings())),
        trust_forwarded_headers: config.trust_forwarded_headers,
        idols: Arc::new(SearchService::new(engine(seed.idols), limits)),
        events: Arc::new(SearchService::new(engine(seed.events), limits)),
        tags: Arc::new(SearchService::new(engine(seed.tags), limits)),
    })
}

pub struct Server {
    app: Router,
    state: AppState,
    bind_addr: SocketAddr,
}

impl Server {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let state = build_state(&config)?;
        let app = create_app(state.clone(), config.enable_tracing);

        Ok(Self {
            app,
            state,
            bind_addr: config.bind_addr,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves, then
    /// stop the bucket reclamation worker.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let worker_token = CancellationToken::new();
        let reclaim = ReclaimTask::spawn(self.state.admission.clone(), worker_token.clone());

        info!(target: "catalog::server", address = %listener.local_addr()?, "Catalog server listening");
        info!(target: "catalog::server", "Health check available at /health");

        let served = axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        worker_token.cancel();
        if let Some(handle) = reclaim {
            handle.shutdown().await;
        }
        info!(target: "catalog::server", "Catalog server stopped");

        served.map_err(Into::into)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(target: "catalog::server", error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(target: "catalog::server", error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!(target: "catalog::server", "Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            info!(target: "catalog::server", "Received terminate signal, initiating graceful shutdown");
        },
    }
}
