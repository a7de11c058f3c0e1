//! Payment model: one attempted charge against a student account.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Lifecycle states of a payment.
///
/// `Pending` is the only non-terminal state. A payment moves to exactly
/// one of `Completed`, `Failed`, or `Cancelled` and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Checkout opened, money not confirmed.
    Pending,
    /// Money confirmed; ledger effects applied exactly once.
    Completed,
    /// Gateway reported failure.
    Failed,
    /// Abandoned or administratively cancelled while pending.
    Cancelled,
}

/// What the payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Full-payment-scheme tuition fee.
    FullPayment,
    /// Installment-scheme downpayment fee.
    Downpayment,
    /// One scheduled installment.
    Installment,
    /// Direct reduction of the outstanding account balance.
    Balance,
    /// Legacy alias for installment payments arriving via the generic
    /// tuition webhook path.
    Monthly,
    /// Enrollment fee arriving via the enrollment webhook path.
    Enrollment,
}

impl PaymentType {
    /// Stable string form used in idempotency keys and gateway metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::FullPayment => "full_payment",
            PaymentType::Downpayment => "downpayment",
            PaymentType::Installment => "installment",
            PaymentType::Balance => "balance",
            PaymentType::Monthly => "monthly",
            PaymentType::Enrollment => "enrollment",
        }
    }

    /// Whether completing a payment of this type can qualify the
    /// enrollment (flip it to `enrolled`).
    pub fn qualifies_enrollment(&self) -> bool {
        matches!(
            self,
            PaymentType::FullPayment | PaymentType::Downpayment | PaymentType::Enrollment
        )
    }

    /// Gateway metadata discriminator used to route webhook handling.
    pub fn category(&self) -> &'static str {
        if self.qualifies_enrollment() {
            "enrollment"
        } else {
            "tuition"
        }
    }
}

/// One attempted charge.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Absent for pure balance payments with no enrollment context.
    pub enrollment_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
    /// Payment method reported by the gateway (card, gcash, ...).
    pub method: Option<String>,
    /// Gateway-side payment reference (pay_...).
    pub reference_number: Option<String>,
    /// Caller-generated de-duplication token.
    pub idempotency_key: String,
    pub created_by: Uuid,
    /// When the payment completed.
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new pending payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub account_id: Uuid,
    pub enrollment_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub payment_type: PaymentType,
    pub idempotency_key: String,
    pub created_by: Uuid,
}

impl NewPayment {
    /// Builds the idempotency key the checkout manager stamps on every
    /// payment: `{enrollment_id}-{payment_type}-{unix_ts}`.
    pub fn idempotency_key_for(
        enrollment_id: Uuid,
        payment_type: PaymentType,
        at: DateTime<Utc>,
    ) -> String {
        format!(
            "{}-{}-{}",
            enrollment_id,
            payment_type.as_str(),
            at.timestamp()
        )
    }
}

impl Payment {
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    /// Terminal payments never transition again.
    pub fn is_terminal(&self) -> bool {
        self.status != PaymentStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_payment_status_serialization() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Failed).unwrap(),
            "\"failed\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_payment_type_serialization() {
        assert_eq!(
            serde_json::to_string(&PaymentType::FullPayment).unwrap(),
            "\"full_payment\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentType::Downpayment).unwrap(),
            "\"downpayment\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentType::Balance).unwrap(),
            "\"balance\""
        );
    }

    #[test]
    fn test_payment_type_as_str_round_trip() {
        for pt in [
            PaymentType::FullPayment,
            PaymentType::Downpayment,
            PaymentType::Installment,
            PaymentType::Balance,
            PaymentType::Monthly,
            PaymentType::Enrollment,
        ] {
            let json = format!("\"{}\"", pt.as_str());
            assert_eq!(serde_json::from_str::<PaymentType>(&json).unwrap(), pt);
        }
    }

    #[test]
    fn test_qualifying_types() {
        assert!(PaymentType::FullPayment.qualifies_enrollment());
        assert!(PaymentType::Downpayment.qualifies_enrollment());
        assert!(PaymentType::Enrollment.qualifies_enrollment());
        assert!(!PaymentType::Installment.qualifies_enrollment());
        assert!(!PaymentType::Balance.qualifies_enrollment());
        assert!(!PaymentType::Monthly.qualifies_enrollment());
    }

    #[test]
    fn test_payment_category() {
        assert_eq!(PaymentType::Downpayment.category(), "enrollment");
        assert_eq!(PaymentType::Installment.category(), "tuition");
        assert_eq!(PaymentType::Balance.category(), "tuition");
    }

    #[test]
    fn test_idempotency_key_format() {
        let enrollment_id = Uuid::nil();
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let key = NewPayment::idempotency_key_for(enrollment_id, PaymentType::Downpayment, at);
        assert_eq!(
            key,
            format!("{}-downpayment-{}", enrollment_id, at.timestamp())
        );
    }

    #[test]
    fn test_terminal_states() {
        let mut payment = Payment {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            enrollment_id: None,
            amount: BigDecimal::from(100),
            status: PaymentStatus::Pending,
            payment_type: PaymentType::Balance,
            method: None,
            reference_number: None,
            idempotency_key: "k".to_string(),
            created_by: Uuid::new_v4(),
            payment_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(payment.is_pending());
        assert!(!payment.is_terminal());

        payment.status = PaymentStatus::Completed;
        assert!(payment.is_terminal());
        payment.status = PaymentStatus::Cancelled;
        assert!(payment.is_terminal());
    }
}
