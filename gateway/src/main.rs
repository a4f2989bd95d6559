use anyhow::Result;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tourist_registry::{JsonFileStore, Registry, SystemClock};

mod api;
mod auth;
mod config;
mod routes;

use config::GatewayConfig;

#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "suraksha_gateway=debug,tourist_registry=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env();

    let store = JsonFileStore::new(&config.data_file, config.on_corrupt);
    let registry = Registry::new(store, Arc::new(SystemClock));
    let counters = registry.open().await?;
    tracing::info!("   Block height {}", counters.block_height);

    let state = AppState { registry };

    // Static frontend (if present) answers everything the API doesn't
    let app = if config.frontend_dir.exists() {
        tracing::info!("   Serving frontend from {}", config.frontend_dir.display());
        routes::router(state).fallback_service(ServeDir::new(&config.frontend_dir))
    } else {
        tracing::warn!(
            "   Frontend directory {} not found, static assets will not be served",
            config.frontend_dir.display()
        );
        routes::router(state)
    };
    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr();
    tracing::info!("Suraksha gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
