//! UI Schema Sync - Dynamic UI Configuration Engine
//!
//! Derives form, table and menu structure from the portal's JSX templates,
//! lets administrators reorder, rename and hide elements, and synchronizes
//! newly introduced form fields into the backing PostgreSQL tables and back
//! into the template source.
//!
//! WRITE PATH: override record → column DDL → template patch. Each step is
//! independently failable; only the override write aborts a save.

mod auth;
mod catalog;
mod config;
mod error;
mod merge;
mod models;
mod overrides;
mod routes;
mod schema;
mod state;
mod sync;
mod template;

use crate::config::{DatabaseConfig, Settings};
use crate::error::AppError;
use crate::routes::create_router;
use crate::schema::PostgresCatalog;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting UI Schema Sync...");

    // Load configuration
    let settings = Settings::load().map_err(|e| AppError::Config(e.to_string()))?;
    info!("📋 Configuration loaded successfully");
    info!("   Templates: {}", settings.ui.templates_dir.display());
    info!("   Overrides: {}", settings.ui.overrides_dir.display());

    // The migrator needs a live catalog; refuse to start without one
    let pool = match init_database_pool(&settings.database).await {
        Ok(pool) => {
            info!("✅ Database pool created successfully");
            pool
        }
        Err(e) => {
            error!("❌ FATAL: Failed to initialize database pool: {}", e);
            error!("Set DATABASE_URL (or DB_HOST/DB_PORT/DB_USER/DB_PASSWORD/DB_NAME)");
            return Err(e);
        }
    };

    let catalog = Arc::new(PostgresCatalog::new(pool));
    let state = Arc::new(AppState::new(
        catalog,
        &settings.ui,
        settings.auth.jwt_secret.clone(),
    ));

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints (admin token required):");
    info!("   ─── UI Configuration ───");
    info!("   GET  /configuration/forms                       - List configurable components");
    info!("   GET  /configuration/form-schema?form=<id>       - Effective (merged) schema");
    info!("   POST /configuration/form-schema                 - Save schema and synchronize");
    info!("   GET  /configuration/overrides                   - All stored overrides");
    info!("");
    info!("   ─── Schema Migration ───");
    info!("   GET  /schema-migration/check/{{table}}/{{column}}   - Does a column exist");
    info!("   POST /schema-migration/add-column               - Add one column");
    info!("   POST /schema-migration/sync-form                - Add columns for a form's fields");
    info!("   GET  /schema-migration/tables                   - List tables");
    info!("   GET  /schema-migration/tables/{{table}}/columns   - List columns");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ui_schema_sync=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Build the connection pool and verify it with a round trip
async fn init_database_pool(db: &DatabaseConfig) -> anyhow::Result<deadpool_postgres::Pool> {
    use deadpool_postgres::{Config, ManagerConfig, PoolConfig, RecyclingMethod, Runtime};

    let mut cfg = Config::new();
    cfg.host = Some(db.host.clone());
    cfg.port = Some(db.port);
    cfg.user = Some(db.user.clone());
    cfg.password = Some(db.password.clone());
    cfg.dbname = Some(db.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(db.max_pool_size));

    // Create pool with TLS support if needed
    let pool = if db.require_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| anyhow::anyhow!("Failed to create TLS pool: {}", e))?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), tokio_postgres::NoTls)
            .map_err(|e| anyhow::anyhow!("Failed to create pool: {}", e))?
    };

    // Test the connection
    let client = pool
        .get()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get pool connection: {}", e))?;

    client
        .query_one("SELECT 1 as ok", &[])
        .await
        .map_err(|e| anyhow::anyhow!("Failed to verify database connection: {}", e))?;

    info!(
        "✅ Database connection successful ({}:{}/{}, TLS: {})",
        db.host, db.port, db.database, db.require_tls
    );
    Ok(pool)
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
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
