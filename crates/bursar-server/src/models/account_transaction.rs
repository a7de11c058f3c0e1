//! Account transaction model: append-only audit log of balance moves.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One immutable audit row per account mutation.
///
/// Written whenever billing generation or payment completion touches an
/// account; never updated or deleted. `balance_before == balance_after`
/// for fee/installment settlements, which do not move the balance.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccountTransaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub balance_before: BigDecimal,
    pub balance_after: BigDecimal,
    pub description: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Data required to append a new audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccountTransaction {
    pub account_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub balance_before: BigDecimal,
    pub balance_after: BigDecimal,
    pub description: String,
    pub created_by: Uuid,
}
