//! Rides App Service - HTTP API for ride booking and seat sharing
//!
//! This is the main entry point for the ridesapp service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ridesapp_service::{create_router, AppState, ServiceConfig};
use ridesapp_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ridesapp=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Rides App Service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        postgres_configured = %config.database_url.is_some(),
        jwt_expiration_hours = config.jwt_expiration_hours,
        "Service configuration loaded"
    );

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            tracing::info!(max_connections = config.db_max_connections, "Connecting to PostgreSQL");
            let store = PgStore::connect(url, config.db_max_connections).await?;
            store.migrate().await?;
            tracing::info!("Database migrations applied");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set - using in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, config.clone());

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
