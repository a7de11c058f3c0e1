//! PayMongo webhook endpoint.
//!
//! The handler takes the raw body bytes and verifies the signature
//! before any JSON parsing; re-serializing the payload first would
//! invalidate the signature.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use bursar_gateway::{verify_signature, SignatureHeader, WebhookEnvelope};

use crate::completion;
use crate::error::AppError;
use crate::routes::AppState;

/// Header carrying the webhook signature.
const SIGNATURE_HEADER: &str = "Paymongo-Signature";

/// Creates the webhook router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook/paymongo", post(handle_paymongo_webhook))
        .with_state(state)
}

/// Response for webhook processing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_processed: Option<bool>,
}

/// POST /api/v1/billing/webhook/paymongo
///
/// Handles gateway payment events:
/// 1. Verifies the signature over the raw request body
/// 2. Parses the event envelope
/// 3. Routes paid events into the completion engine and failed events
///    into the failure path
///
/// The gateway may redeliver events; the completion engine's
/// idempotency guard makes redelivery harmless.
async fn handle_paymongo_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    // Step 1: Verify the signature against the untouched raw bytes.
    match state.gateway.as_ref().and_then(|g| g.webhook_secret()) {
        Some(secret) => {
            let header_value = headers
                .get(SIGNATURE_HEADER)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| {
                    AppError::Signature(format!("Missing {} header", SIGNATURE_HEADER))
                })?;
            let header = SignatureHeader::parse(header_value)
                .map_err(|e| AppError::Signature(e.to_string()))?;
            verify_signature(&body, &header, secret)
                .map_err(|e| AppError::Signature(e.to_string()))?;
        }
        // Explicit dev/offline relaxation, never a production default.
        None => tracing::warn!("webhook signature verification skipped: no secret configured"),
    }

    // Step 2: Parse the event envelope.
    let envelope: WebhookEnvelope = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    // Step 3: Route by event type.
    match envelope.event_type() {
        "checkout_session.payment.paid" | "payment.paid" => {
            let payment_id = extract_payment_id(&envelope)?;
            let category = envelope
                .metadata()
                .and_then(|m| m.payment_category.as_deref())
                .unwrap_or("tuition");

            let outcome = completion::complete_payment(
                &state.pool,
                payment_id,
                envelope.payment_method(),
                envelope.payment_reference(),
            )
            .await?;

            tracing::info!(
                payment_id = %payment_id,
                category = category,
                checkout_id = envelope.resource_id(),
                already_processed = outcome.already_processed,
                "webhook payment event processed"
            );

            Ok(Json(WebhookResponse {
                success: true,
                message: Some("Payment completed".to_string()),
                payment_id: Some(payment_id),
                already_processed: Some(outcome.already_processed),
            }))
        }
        "payment.failed" | "checkout_session.expired" => {
            let payment_id = extract_payment_id(&envelope)?;
            completion::fail_payment(&state.pool, payment_id).await?;

            Ok(Json(WebhookResponse {
                success: true,
                message: Some("Payment marked as failed".to_string()),
                payment_id: Some(payment_id),
                already_processed: None,
            }))
        }
        other => {
            tracing::info!(event_type = other, "ignoring unhandled webhook event");
            Ok(Json(WebhookResponse {
                success: true,
                message: Some(format!("Ignored event type: {}", other)),
                payment_id: None,
                already_processed: None,
            }))
        }
    }
}

/// Extracts our payment id from the checkout metadata.
fn extract_payment_id(envelope: &WebhookEnvelope) -> Result<Uuid, AppError> {
    envelope
        .metadata()
        .and_then(|metadata| metadata.payment_id.as_deref())
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| {
            AppError::BadRequest("Could not extract payment id from webhook metadata".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_payment_id() {
        let payload = r#"{
            "data": {
                "attributes": {
                    "type": "checkout_session.payment.paid",
                    "data": {
                        "id": "cs_123",
                        "attributes": {
                            "metadata": {
                                "payment_id": "6f46bd3e-8c5d-4a6a-9fd3-0a1f5f0f8a11",
                                "payment_category": "tuition"
                            }
                        }
                    }
                }
            }
        }"#;
        let envelope: WebhookEnvelope = serde_json::from_str(payload).unwrap();
        let payment_id = extract_payment_id(&envelope).unwrap();
        assert_eq!(
            payment_id,
            Uuid::parse_str("6f46bd3e-8c5d-4a6a-9fd3-0a1f5f0f8a11").unwrap()
        );
    }

    #[test]
    fn test_extract_payment_id_missing_metadata() {
        let payload = r#"{
            "data": {
                "attributes": {
                    "type": "checkout_session.payment.paid",
                    "data": { "id": "cs_123", "attributes": {} }
                }
            }
        }"#;
        let envelope: WebhookEnvelope = serde_json::from_str(payload).unwrap();
        assert!(extract_payment_id(&envelope).is_err());
    }

    #[test]
    fn test_extract_payment_id_rejects_garbage() {
        let payload = r#"{
            "data": {
                "attributes": {
                    "type": "checkout_session.payment.paid",
                    "data": {
                        "id": "cs_123",
                        "attributes": { "metadata": { "payment_id": "not-a-uuid" } }
                    }
                }
            }
        }"#;
        let envelope: WebhookEnvelope = serde_json::from_str(payload).unwrap();
        assert!(extract_payment_id(&envelope).is_err());
    }
}
