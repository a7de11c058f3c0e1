//! Payment transaction model: the gateway-side mirror of a payment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One-to-one gateway mirror of a payment.
///
/// Exists so gateway callbacks can be matched without re-deriving
/// checkout details.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub payment_id: Uuid,
    /// Gateway checkout id (cs_..., or cs_mock_... offline).
    pub checkout_id: String,
    pub checkout_url: String,
    /// Status last reported by the gateway.
    pub gateway_status: String,
    pub paid_at: Option<DateTime<Utc>>,
    /// When the checkout session stops accepting payment.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new transaction mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaymentTransaction {
    pub payment_id: Uuid,
    pub checkout_id: String,
    pub checkout_url: String,
    pub expires_at: DateTime<Utc>,
}
