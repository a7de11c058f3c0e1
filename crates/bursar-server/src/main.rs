//! Bursar server binary.

use std::sync::Arc;

use bursar_gateway::PayMongoClient;
use bursar_server::{create_router, db, AppConfig, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let gateway = config
        .paymongo
        .clone()
        .map(|gateway_config| Arc::new(PayMongoClient::new(gateway_config)));
    match &gateway {
        Some(_) => tracing::info!("payment gateway enabled"),
        None => tracing::warn!("payment gateway not configured; running with mock checkouts"),
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        pool,
        config: Arc::new(config),
        gateway,
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
