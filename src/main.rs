//! Himalia API server
//!
//! Main entry point.

use himalia_api::{
    db::Database,
    state::{AppConfig, AppState, DEFAULT_API_KEY},
    web_api,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "himalia_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Himalia API v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        database_url = %config.database_url,
        auth_enabled = config.auth_enabled(),
        openapi_enabled = config.openapi_enabled,
        migrations_on_startup = config.migrations_on_startup,
        "Configuration loaded"
    );
    if !config.auth_enabled() {
        tracing::warn!("HIMALIA_API_KEY is empty, API authentication disabled");
    } else if config.api_key == DEFAULT_API_KEY {
        tracing::warn!("HIMALIA_API_KEY not set, using the placeholder key");
    }

    let db = Database::connect(&config.database_url).await?;

    // A failed migration does not stop the server; /health reports the DB state.
    if config.migrations_on_startup {
        if let Err(e) = db.migrate().await {
            tracing::warn!(error = %e, "Database migration step failed");
        }
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(db.clone(), config);

    let app = web_api::create_router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
