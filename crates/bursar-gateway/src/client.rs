//! PayMongo HTTP client.
//!
//! Wraps the hosted checkout session API. The client owns a
//! `reqwest::Client` and authenticates with the secret key over basic
//! auth, which is how PayMongo expects server-side calls.

use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::PayMongoConfig;
use crate::events::CheckoutMetadata;
use crate::GatewayError;

/// Hosted checkout sessions expire after 24 hours.
const CHECKOUT_EXPIRY_HOURS: i64 = 24;

/// One line item on a hosted checkout page.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutLineItem {
    pub name: String,
    /// Amount in minor currency units (centavos).
    pub amount: i64,
    pub currency: String,
    pub quantity: u32,
}

impl CheckoutLineItem {
    /// Single-quantity PHP line item.
    pub fn php(name: impl Into<String>, amount_centavos: i64) -> Self {
        Self {
            name: name.into(),
            amount: amount_centavos,
            currency: "PHP".to_string(),
            quantity: 1,
        }
    }
}

/// Request to open a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub description: String,
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: CheckoutMetadata,
}

/// A created checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// Gateway checkout id (cs_...).
    pub id: String,
    /// Hosted page the payer is redirected to.
    pub checkout_url: String,
    /// When the session stops accepting payment.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    data: CheckoutSessionData,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionData {
    id: String,
    attributes: CheckoutSessionAttributes,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionAttributes {
    checkout_url: String,
}

/// PayMongo API client.
pub struct PayMongoClient {
    config: PayMongoConfig,
    http_client: reqwest::Client,
}

impl PayMongoClient {
    pub fn new(config: PayMongoConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Whether webhook signature verification is configured.
    pub fn webhook_secret(&self) -> Option<&secrecy::SecretString> {
        self.config.webhook_secret.as_ref()
    }

    /// Creates a hosted checkout session.
    ///
    /// A failed call leaves no gateway-side state worth keeping; the
    /// caller's pending payment row stays retryable with a fresh
    /// checkout.
    pub async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let url = format!("{}/v1/checkout_sessions", self.config.api_base_url);

        let body = json!({
            "data": {
                "attributes": {
                    "line_items": request.line_items,
                    "payment_method_types": ["card", "gcash", "paymaya"],
                    "description": request.description,
                    "success_url": request.success_url,
                    "cancel_url": request.cancel_url,
                    "metadata": request.metadata,
                }
            }
        });

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.secret_key.expose_secret(), Option::<&str>::None)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, detail = %detail, "checkout session creation failed");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let session: CheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(CheckoutSession {
            id: session.data.id,
            checkout_url: session.data.attributes.checkout_url,
            expires_at: Utc::now() + Duration::hours(CHECKOUT_EXPIRY_HOURS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_php_line_item() {
        let item = CheckoutLineItem::php("Downpayment", 100_000);
        assert_eq!(item.currency, "PHP");
        assert_eq!(item.quantity, 1);
        assert_eq!(item.amount, 100_000);
    }

    #[test]
    fn test_line_item_serialization() {
        let item = CheckoutLineItem::php("Tuition Installment 1", 200_000);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["name"], "Tuition Installment 1");
        assert_eq!(value["amount"], 200_000);
        assert_eq!(value["currency"], "PHP");
    }

    #[test]
    fn test_checkout_response_deserialization() {
        let payload = r#"{
            "data": {
                "id": "cs_abc123",
                "attributes": {
                    "checkout_url": "https://checkout.paymongo.com/cs_abc123",
                    "status": "active"
                }
            }
        }"#;
        let response: CheckoutSessionResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.data.id, "cs_abc123");
        assert_eq!(
            response.data.attributes.checkout_url,
            "https://checkout.paymongo.com/cs_abc123"
        );
    }
}
