//! Environment-driven server configuration.

use bursar_gateway::PayMongoConfig;

/// Server configuration assembled from environment variables.
#[derive(Clone)]
pub struct AppConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Address the server binds to.
    pub bind_addr: String,
    /// Public base URL of this server, used to build gateway callback
    /// URLs (success/cancel/mock endpoints).
    pub base_url: String,
    /// Frontend base URL the redirect callbacks send payers to.
    pub frontend_url: String,
    /// Gateway configuration; `None` runs the checkout manager in
    /// mock/offline mode.
    pub paymongo: Option<PayMongoConfig>,
}

impl AppConfig {
    /// Reads configuration from the environment.
    ///
    /// `PAYMONGO_ENABLED` gates the real gateway: unless it is set to a
    /// truthy value and `PAYMONGO_SECRET_KEY` is present, checkouts are
    /// mocked locally and webhook signature verification is skipped.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let gateway_enabled = std::env::var("PAYMONGO_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let paymongo = if gateway_enabled {
            PayMongoConfig::from_env()
        } else {
            None
        };
        if gateway_enabled && paymongo.is_none() {
            tracing::warn!(
                "PAYMONGO_ENABLED is set but PAYMONGO_SECRET_KEY is missing; \
                 falling back to mock checkout mode"
            );
        }

        Ok(Self {
            database_url,
            bind_addr,
            base_url,
            frontend_url,
            paymongo,
        })
    }

    /// Configuration for tests and the mock/offline mode.
    pub fn for_tests(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            database_url: String::new(),
            bind_addr: String::new(),
            frontend_url: base_url.clone(),
            base_url,
            paymongo: None,
        }
    }
}
