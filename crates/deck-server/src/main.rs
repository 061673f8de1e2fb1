//! Deck RS Server
//!
//! HTTP server for card attachments.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deck_api::AppState;
use deck_attachments::{
    AttachmentConfig, AttachmentService, Cache, LocalStorage, MemoryAttachmentMapper, MemoryCache,
    Storage,
};
use deck_auth::MemoryAcl;
use deck_core::config::AppConfig;
use deck_l10n::{Catalogs, Locale};

mod health;

use health::{HealthChecker, HealthConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    init_tracing();

    dotenvy::dotenv().ok();
    let config_path = std::env::var_os("DECK_CONFIG").map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        data_dir = %config.storage.data_dir,
        "Starting Deck RS"
    );

    match config.l10n.default_locale.parse::<Locale>() {
        Ok(locale) => info!(
            default_locale = %locale,
            available = ?Catalogs::bundled().locales(),
            "Translations loaded"
        ),
        Err(e) => warn!(error = %e, "Ignoring invalid default locale"),
    }

    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(&config.storage.data_dir));
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(config.cache.namespace.clone()));
    let acl = Arc::new(MemoryAcl::from_config(&config.acl));
    info!(boards = config.acl.boards.len(), "Board permissions loaded");
    let mapper = Arc::new(
        MemoryAttachmentMapper::open(config.records_path(), config.undo_window()).await?,
    );

    let service = Arc::new(AttachmentService::new(
        mapper,
        acl,
        cache.clone(),
        storage.clone(),
        AttachmentConfig {
            max_upload_size: config.storage.max_upload_size,
            count_ttl: config.count_ttl(),
        },
    ));
    info!(types = ?service.handlers().types(), "Attachment handlers registered");

    if let Some(interval) = config.purge_interval() {
        spawn_purge_job(service.clone(), interval);
    }

    let health = Arc::new(HealthChecker::new(HealthConfig::default(), storage, cache));
    let app = build_router(AppState::new(service), health, config.server.max_body_size_bytes);

    let addr = config.server_addr();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,deck_server=debug,deck_api=debug,tower_http=debug".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Periodically purge attachments whose undo window has passed
fn spawn_purge_job(service: Arc<AttachmentService>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = service.purge_deleted().await {
                warn!(error = %e, "Attachment purge failed");
            }
        }
    });
}

/// Build the application router
fn build_router(state: AppState, health: Arc<HealthChecker>, max_body_size: usize) -> Router {
    // Health check routes (no auth required)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(health);

    Router::new()
        .merge(health_routes)
        .merge(deck_api::router().with_state(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .layer(DefaultBodyLimit::max(max_body_size))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
