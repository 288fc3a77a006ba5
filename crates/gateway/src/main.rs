//! Gazette Registry API Gateway
//!
//! The entry point for all external API requests.
//! Handles:
//! - Gazette extraction, ingestion and search
//! - People and ingestion job lookups
//! - The search assistant
//! - Rate limiting, payload limits and observability

mod extractors;
mod handlers;
mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use gazette_common::{
    assistant::Assistant,
    config::AppConfig,
    db::DbPool,
    errors::AppError,
    metrics::{self, INGESTION_BUCKETS, LATENCY_BUCKETS},
    Repository, VERSION,
};
use gazette_extractor::GazetteProcessor;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: Repository,
    pub processor: Arc<GazetteProcessor>,
    pub assistant: Arc<Assistant>,
}

impl AppState {
    pub fn new(config: AppConfig, repository: Repository) -> Result<Self, AppError> {
        let processor =
            GazetteProcessor::new(config.extraction.clone(), Arc::new(repository.clone()));
        let assistant = Assistant::new(config.assistant.clone(), repository.clone())?;

        Ok(Self {
            config: Arc::new(config),
            repository,
            processor: Arc::new(processor),
            assistant: Arc::new(assistant),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config);

    info!("Starting Gazette Registry API Gateway v{}", VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    if !config.assistant_enabled() {
        info!("No assistant API key configured, chat answers will be templated");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, Repository::new(db))?;

    // Build the router
    let app = create_router(state);

    // Start the server
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serve Prometheus metrics on their own port
fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("search_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("ingestion_duration_seconds".to_string()),
            INGESTION_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("assistant_duration_seconds".to_string()),
            INGESTION_BUCKETS,
        )?
        .install()?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

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

        // Gazette endpoints
        .route("/gazettes", get(handlers::gazettes::list_gazettes))
        .route("/gazettes/extract", post(handlers::gazettes::extract_gazette))
        .route("/gazettes/ingest", post(handlers::gazettes::ingest_gazette))
        .route("/gazettes/{id}", get(handlers::gazettes::get_gazette))

        // People endpoints
        .route("/people", get(handlers::people::list_people))
        .route("/people/{id}", get(handlers::people::get_person))

        // Job endpoints
        .route("/jobs/{id}", get(handlers::jobs::get_job))

        // Assistant endpoints
        .route("/assistant/chat", post(handlers::assistant::chat));

    let mut app = Router::new()
        .nest("/v1", api_routes)
        .layer(DefaultBodyLimit::max(config.extraction.max_document_bytes))
        .layer(from_fn_with_state(state.clone(), middleware::content_length_limit))
        .layer(TimeoutLayer::new(config.request_timeout()));

    if config.rate_limit.enabled {
        let limit = middleware::RateLimit::new(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );
        app = app.layer(from_fn_with_state(limit, middleware::rate_limit));
    }

    // Compose the app
    app.layer(from_fn(middleware::track_metrics))
        .layer(CompressionLayer::new())
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
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
