//! Enrollment fee model: one-off charges tied to an enrollment.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Kind of one-off charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "fee_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    /// The single fee of a full-payment scheme.
    FullPayment,
    /// The upfront fee of an installment scheme.
    Downpayment,
}

/// A one-off charge created at billing generation.
///
/// `is_paid` flips true exactly once, by the completion engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnrollmentFee {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub fee_type: FeeType,
    pub description: String,
    pub amount: BigDecimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new fee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrollmentFee {
    pub enrollment_id: Uuid,
    pub fee_type: FeeType,
    pub description: String,
    pub amount: BigDecimal,
}

impl NewEnrollmentFee {
    pub fn full_payment(enrollment_id: Uuid, amount: BigDecimal) -> Self {
        Self {
            enrollment_id,
            fee_type: FeeType::FullPayment,
            description: "Full Payment".to_string(),
            amount,
        }
    }

    pub fn downpayment(enrollment_id: Uuid, amount: BigDecimal) -> Self {
        Self {
            enrollment_id,
            fee_type: FeeType::Downpayment,
            description: "Downpayment".to_string(),
            amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_fee_type_serialization() {
        assert_eq!(
            serde_json::to_string(&FeeType::FullPayment).unwrap(),
            "\"full_payment\""
        );
        assert_eq!(
            serde_json::to_string(&FeeType::Downpayment).unwrap(),
            "\"downpayment\""
        );
    }

    #[test]
    fn test_downpayment_constructor() {
        let enrollment_id = Uuid::new_v4();
        let fee = NewEnrollmentFee::downpayment(
            enrollment_id,
            BigDecimal::from_str("1000.00").unwrap(),
        );
        assert_eq!(fee.fee_type, FeeType::Downpayment);
        assert_eq!(fee.description, "Downpayment");
        assert_eq!(fee.enrollment_id, enrollment_id);
    }
}
