//! Payment installment model: scheduled charges under an installment
//! scheme.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "installment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Pending,
    Paid,
}

/// One of N scheduled charges for an installment scheme.
///
/// Installment numbers are 1..N, unique per enrollment, and settle
/// strictly in ascending order: the completion engine always pays the
/// lowest pending number.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentInstallment {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub installment_number: i32,
    pub amount: BigDecimal,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    /// The payment that settled this installment.
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new installment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaymentInstallment {
    pub enrollment_id: Uuid,
    pub installment_number: i32,
    pub amount: BigDecimal,
    pub due_date: NaiveDate,
}

impl PaymentInstallment {
    pub fn is_pending(&self) -> bool {
        self.status == InstallmentStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installment_status_serialization() {
        assert_eq!(
            serde_json::to_string(&InstallmentStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&InstallmentStatus::Paid).unwrap(),
            "\"paid\""
        );
    }

    #[test]
    fn test_installment_status_deserialization() {
        assert_eq!(
            serde_json::from_str::<InstallmentStatus>("\"pending\"").unwrap(),
            InstallmentStatus::Pending
        );
    }
}
