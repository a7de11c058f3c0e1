//! API routes for the Bursar server.

pub mod billing;
pub mod payments;
pub mod webhooks;

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use bursar_gateway::PayMongoClient;

use crate::config::AppConfig;

/// Shared state injected into every handler.
///
/// Components receive their store/gateway dependencies from here
/// rather than from module-level globals.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    /// `None` runs the checkout manager in mock/offline mode.
    pub gateway: Option<Arc<PayMongoClient>>,
}

impl AppState {
    /// State for integration tests: no gateway, local URLs.
    pub fn for_tests(pool: PgPool) -> Self {
        Self {
            pool,
            config: Arc::new(AppConfig::for_tests("http://localhost:3000")),
            gateway: None,
        }
    }
}

/// Creates the main API router with all routes mounted.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Creates the v1 API routes.
fn api_v1_routes(state: AppState) -> Router {
    let billing_routes = billing::router(state.clone())
        .merge(payments::router(state.clone()))
        .merge(webhooks::router(state));

    Router::new().nest("/billing", billing_routes)
}
