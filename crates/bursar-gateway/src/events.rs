//! Webhook event envelope types.
//!
//! PayMongo wraps webhook deliveries in a nested resource envelope:
//! `{ data: { attributes: { type, data: { id, attributes: { ... } } } } }`.
//! The inner resource attributes carry the metadata we attached at
//! checkout creation plus the gateway-side payment records.

use serde::{Deserialize, Serialize};

/// Top-level webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub data: WebhookEvent,
}

/// The webhook event object.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event id (evt_...).
    #[serde(default)]
    pub id: Option<String>,
    pub attributes: WebhookEventAttributes,
}

/// Event attributes: the event type plus the affected resource.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventAttributes {
    /// Event type, e.g. `checkout_session.payment.paid`.
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookResource,
}

/// The resource the event refers to (a checkout session or payment).
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookResource {
    /// Resource id (cs_... for checkout sessions, pay_... for payments).
    pub id: String,
    pub attributes: WebhookResourceAttributes,
}

/// Attributes of the affected resource.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookResourceAttributes {
    /// Metadata attached when the checkout session was created.
    #[serde(default)]
    pub metadata: Option<CheckoutMetadata>,
    /// Gateway-side payment records for the session.
    #[serde(default)]
    pub payments: Vec<GatewayPayment>,
    /// Resource status reported by the gateway.
    #[serde(default)]
    pub status: Option<String>,
}

/// One gateway-side payment record inside a checkout session resource.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    #[serde(default)]
    pub attributes: Option<GatewayPaymentAttributes>,
}

/// Attributes of a gateway-side payment record.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPaymentAttributes {
    #[serde(default)]
    pub status: Option<String>,
    /// Amount in minor currency units (centavos).
    #[serde(default)]
    pub amount: Option<i64>,
    /// Payment method used (card, gcash, ...).
    #[serde(default)]
    pub source_type: Option<String>,
}

/// Metadata attached to every checkout session we create.
///
/// All values are strings because gateway metadata is free-form.
/// `payment_category` discriminates enrollment-qualifying payments
/// (`enrollment`) from ordinary tuition payments (`tuition`) so webhook
/// handling can be routed without re-deriving checkout details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub enrollment_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub scheme_id: Option<String>,
    #[serde(default)]
    pub payment_category: Option<String>,
}

impl WebhookEnvelope {
    /// Event type string, e.g. `checkout_session.payment.paid`.
    pub fn event_type(&self) -> &str {
        &self.data.attributes.event_type
    }

    /// Checkout/payment resource id the event refers to.
    pub fn resource_id(&self) -> &str {
        &self.data.attributes.data.id
    }

    /// Metadata attached at checkout creation, if present.
    pub fn metadata(&self) -> Option<&CheckoutMetadata> {
        self.data.attributes.data.attributes.metadata.as_ref()
    }

    /// Gateway payment reference for the completed session, if any.
    pub fn payment_reference(&self) -> Option<&str> {
        self.data
            .attributes
            .data
            .attributes
            .payments
            .first()
            .map(|p| p.id.as_str())
    }

    /// Payment method reported by the gateway, if any.
    pub fn payment_method(&self) -> Option<&str> {
        self.data
            .attributes
            .data
            .attributes
            .payments
            .first()
            .and_then(|p| p.attributes.as_ref())
            .and_then(|a| a.source_type.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "data": {
            "id": "evt_abc123",
            "attributes": {
                "type": "checkout_session.payment.paid",
                "data": {
                    "id": "cs_xyz789",
                    "attributes": {
                        "status": "paid",
                        "metadata": {
                            "payment_id": "0d1f9f45-8a41-4a4a-b1c0-1a2b3c4d5e6f",
                            "enrollment_id": "7b8c9dab-0000-4000-8000-000000000001",
                            "payment_type": "downpayment",
                            "payment_category": "enrollment"
                        },
                        "payments": [
                            {
                                "id": "pay_111",
                                "attributes": {
                                    "status": "paid",
                                    "amount": 100000,
                                    "source_type": "gcash"
                                }
                            }
                        ]
                    }
                }
            }
        }
    }"#;

    #[test]
    fn test_deserialize_full_envelope() {
        let envelope: WebhookEnvelope = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(envelope.event_type(), "checkout_session.payment.paid");
        assert_eq!(envelope.resource_id(), "cs_xyz789");
        assert_eq!(envelope.payment_reference(), Some("pay_111"));
        assert_eq!(envelope.payment_method(), Some("gcash"));

        let metadata = envelope.metadata().unwrap();
        assert_eq!(metadata.payment_type.as_deref(), Some("downpayment"));
        assert_eq!(metadata.payment_category.as_deref(), Some("enrollment"));
    }

    #[test]
    fn test_deserialize_without_metadata_or_payments() {
        let payload = r#"{
            "data": {
                "attributes": {
                    "type": "payment.failed",
                    "data": { "id": "pay_222", "attributes": {} }
                }
            }
        }"#;
        let envelope: WebhookEnvelope = serde_json::from_str(payload).unwrap();
        assert_eq!(envelope.event_type(), "payment.failed");
        assert!(envelope.metadata().is_none());
        assert!(envelope.payment_reference().is_none());
    }
}
