//! PayMongo API configuration.

use secrecy::SecretString;

/// Configuration for the PayMongo client.
///
/// The secret key authenticates API calls; the webhook secret signs
/// inbound callbacks. When no webhook secret is configured, signature
/// verification is skipped (offline/dev relaxation, not a production
/// default).
#[derive(Clone)]
pub struct PayMongoConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    pub secret_key: SecretString,
    /// Webhook signing secret, if webhooks are configured.
    pub webhook_secret: Option<SecretString>,
    /// Base URL for the PayMongo API.
    pub api_base_url: String,
}

impl PayMongoConfig {
    /// Create a new configuration with the default API base URL.
    pub fn new(secret_key: impl Into<String>, webhook_secret: Option<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            webhook_secret: webhook_secret.map(SecretString::new),
            api_base_url: "https://api.paymongo.com".to_string(),
        }
    }

    /// Override the API base URL (used to point tests at a stub server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Build from environment variables.
    ///
    /// Reads `PAYMONGO_SECRET_KEY`, `PAYMONGO_WEBHOOK_SECRET` (optional)
    /// and `PAYMONGO_API_URL` (optional). Returns `None` when no secret
    /// key is set, which the server treats as mock/offline mode.
    pub fn from_env() -> Option<Self> {
        let secret_key = std::env::var("PAYMONGO_SECRET_KEY").ok()?;
        if secret_key.is_empty() {
            return None;
        }
        let webhook_secret = std::env::var("PAYMONGO_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let mut config = Self::new(secret_key, webhook_secret);
        if let Ok(url) = std::env::var("PAYMONGO_API_URL") {
            if !url.is_empty() {
                config.api_base_url = url;
            }
        }
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_default_base_url() {
        let config = PayMongoConfig::new("sk_test_abc", None);
        assert_eq!(config.api_base_url, "https://api.paymongo.com");
        assert!(config.webhook_secret.is_none());
    }

    #[test]
    fn test_with_base_url() {
        let config =
            PayMongoConfig::new("sk_test_abc", None).with_base_url("http://localhost:9090");
        assert_eq!(config.api_base_url, "http://localhost:9090");
    }

    #[test]
    fn test_webhook_secret_carried() {
        let config = PayMongoConfig::new("sk_test_abc", Some("whsk_123".to_string()));
        assert!(config.webhook_secret.is_some());
    }
}
