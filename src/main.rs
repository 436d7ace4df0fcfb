//! Mega Monitor Server — extension platform host.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use megamon_api::{AppState, build_router};
use megamon_core::config::AppConfig;
use megamon_core::error::AppError;
use megamon_core::events::EventBus;
use megamon_database::repositories::{
    ExtensionRepository, LocalePackRepository, SchemaRepository,
};
use megamon_database::{DatabasePool, migration};
use megamon_extension::components::ComponentLoader;
use megamon_extension::entry::DynamicEntryLoader;
use megamon_extension::lifecycle::LifecycleController;
use megamon_extension::mounter::RouteMounter;
use megamon_extension::registry::{ExtensionRegistry, LocalePackStore, SchemaStore};
use megamon_extension::relationships::RelationshipResolver;

#[tokio::main]
async fn main() {
    let env = std::env::var("MEGAMON_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Mega Monitor v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Create data directories ──────────────────────────
    create_data_directories(&config).await?;

    // ── Step 2: Database connection + migrations ─────────────────
    let pool = DatabasePool::connect(&config.database).await?;
    migration::run_migrations(pool.pool()).await?;

    // ── Step 3: Stores ───────────────────────────────────────────
    let registry: Arc<dyn ExtensionRegistry> =
        Arc::new(ExtensionRepository::new(pool.pool().clone()));
    let locale_store: Arc<dyn LocalePackStore> =
        Arc::new(LocalePackRepository::new(pool.pool().clone()));
    let schema_store: Arc<dyn SchemaStore> =
        Arc::new(SchemaRepository::new(pool.pool().clone()));

    // ── Step 4: Extension subsystem ──────────────────────────────
    let events = EventBus::new();
    let entry_loader = Arc::new(DynamicEntryLoader::new());
    let mounter = Arc::new(RouteMounter::new(
        entry_loader,
        config.extensions.backend_root.clone(),
    ));
    let components = Arc::new(ComponentLoader::new(config.extensions.frontend_root.clone()));
    let lifecycle = Arc::new(LifecycleController::new(
        config.extensions.clone(),
        Arc::clone(&registry),
        Arc::clone(&locale_store),
        Arc::clone(&schema_store),
        Arc::clone(&mounter),
        Arc::clone(&components),
        events.clone(),
    ));
    let resolver = Arc::new(RelationshipResolver::new(
        Arc::clone(&registry),
        Arc::clone(&components),
        Arc::clone(&locale_store),
    ));

    // ── Step 5: Mount enabled extensions ─────────────────────────
    if config.extensions.auto_mount {
        lifecycle.mount_enabled().await?;
        tracing::info!(
            mounted = mounter.mounted().await.len(),
            "Enabled extensions mounted"
        );
    }

    // ── Step 6: Build and start HTTP server ──────────────────────
    let state = AppState {
        config: Arc::new(config.clone()),
        registry,
        locale_store,
        mounter,
        lifecycle,
        components,
        resolver,
        events,
    };

    let app = build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Mega Monitor server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    pool.close().await;
    Ok(())
}

async fn create_data_directories(config: &AppConfig) -> Result<(), AppError> {
    let dirs = [
        &config.extensions.backend_root,
        &config.extensions.frontend_root,
        &config.extensions.uploads_root,
        &config.extensions.staging_root,
    ];

    for dir in dirs {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            AppError::internal(format!("Failed to create dir '{}': {e}", dir.display()))
        })?;
    }

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
