//! ContractForge API Gateway
//!
//! The HTTP entry point for the contract workspace.
//! Handles:
//! - Batch PDF uploads
//! - Document and analysis lookup
//! - Side-by-side comparison
//! - Chat over the uploaded contracts
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use contractforge_common::{
    analysis::comparison::ComparisonService,
    chat::ChatService,
    config::{AppConfig, ObservabilityConfig},
    db::{ContractStore, DbPool, MemoryStore, Repository},
    embeddings::{create_embedder, Embedder},
    llm::{create_chat_model, ChatModel},
    metrics as app_metrics,
    storage::{create_object_store, ObjectStore},
    ContractAnalyzer,
};
use contractforge_ingestion::UploadProcessor;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Database URL prefix that selects the in-process store
const MEMORY_DATABASE_PREFIX: &str = "memory";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ContractStore>,
    pub processor: Arc<UploadProcessor>,
    pub comparison: ComparisonService,
    pub chat: Arc<ChatService>,
}

impl AppState {
    /// Wire the services over shared handles
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn ContractStore>,
        objects: Arc<dyn ObjectStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        let analyzer = Arc::new(ContractAnalyzer::from_config(&config.analysis));

        let processor = UploadProcessor::new(
            store.clone(),
            objects,
            embedder.clone(),
            analyzer,
            config.upload.clone(),
        );
        let comparison = ComparisonService::new(store.clone(), config.comparison.clone());
        let chat = ChatService::new(store.clone(), embedder, model, &config.chat);

        Self {
            config,
            store,
            processor: Arc::new(processor),
            comparison,
            chat: Arc::new(chat),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting ContractForge API Gateway v{}",
        contractforge_common::VERSION
    );

    let config = Arc::new(config);

    // Initialize metrics
    install_metrics_exporter(&config.observability)?;
    app_metrics::register_metrics();

    let store = connect_store(&config).await?;
    let objects = create_object_store(&config.storage);
    let embedder = create_embedder(&config.embedding)?;
    let model = create_chat_model(&config.llm)?;

    info!(
        storage = %config.storage.backend,
        embedding_model = embedder.model_name(),
        chat_model = model.model_name(),
        "Services initialised"
    );

    let state = AppState::new(config.clone(), store, objects, embedder, model);

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Prometheus scrape endpoint; port 0 disables it
fn install_metrics_exporter(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port == 0 {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], config.metrics_port)))
        .set_buckets(app_metrics::LATENCY_BUCKETS)?
        .install()?;

    info!(port = config.metrics_port, "Prometheus exporter listening");
    Ok(())
}

async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ContractStore>> {
    if config.database.url.starts_with(MEMORY_DATABASE_PREFIX) {
        warn!("Using the in-memory contract store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    info!("Connecting to database...");
    let pool = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        pool.run_migrations().await?;
    }
    Ok(Arc::new(Repository::new(pool)))
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Upload endpoint
        .route("/uploads", post(handlers::uploads::upload))
        // Document endpoints
        .route("/documents", get(handlers::documents::list_documents))
        .route("/documents/{id}", get(handlers::documents::get_document))
        .route(
            "/documents/{id}/analysis",
            get(handlers::documents::get_analysis),
        )
        .route(
            "/documents/{id}/reprocess",
            post(handlers::documents::reprocess_document),
        )
        // Comparison endpoints
        .route(
            "/comparison",
            get(handlers::comparison::recent_comparison).post(handlers::comparison::compare),
        )
        // Chat endpoints
        .route("/chat", post(handlers::chat::ask))
        .route("/chat/messages", get(handlers::chat::history));

    let mut router = Router::new()
        .nest("/v1", api_routes)
        .layer(DefaultBodyLimit::max(state.config.max_upload_body()))
        .layer(from_fn(middleware::metrics::track_metrics));

    let limits = &state.config.rate_limit;
    if limits.enabled {
        let limiter =
            middleware::rate_limit::create_rate_limiter(limits.requests_per_second, limits.burst);
        router = router.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Compose the app
    router
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(ConcurrencyLimitLayer::new(
            state.config.server.max_concurrent_requests.max(1),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
