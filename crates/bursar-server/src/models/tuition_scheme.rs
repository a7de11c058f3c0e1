//! Tuition scheme model: priced payment plan templates.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// How a scheme is paid off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "scheme_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SchemeType {
    /// Entire tuition settled in a single payment.
    FullPayment,
    /// Downpayment followed by N monthly installments.
    Installment,
}

/// A priced payment plan template. Immutable reference data for
/// billing calculations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TuitionScheme {
    pub id: Uuid,
    pub name: String,
    pub scheme_type: SchemeType,
    /// Base tuition amount before discount.
    pub amount: BigDecimal,
    pub discount: BigDecimal,
    /// Upfront charge for installment schemes.
    pub downpayment: BigDecimal,
    /// Per-installment charge for installment schemes.
    pub monthly_payment: BigDecimal,
    /// Number of installments for installment schemes.
    pub months: i32,
    pub created_at: DateTime<Utc>,
}

impl TuitionScheme {
    /// Total billed amount: base amount minus discount.
    pub fn total_amount(&self) -> BigDecimal {
        &self.amount - &self.discount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_scheme_type_serialization() {
        assert_eq!(
            serde_json::to_string(&SchemeType::FullPayment).unwrap(),
            "\"full_payment\""
        );
        assert_eq!(
            serde_json::to_string(&SchemeType::Installment).unwrap(),
            "\"installment\""
        );
    }

    #[test]
    fn test_scheme_type_deserialization() {
        assert_eq!(
            serde_json::from_str::<SchemeType>("\"installment\"").unwrap(),
            SchemeType::Installment
        );
    }

    #[test]
    fn test_total_amount_applies_discount() {
        let scheme = TuitionScheme {
            id: Uuid::new_v4(),
            name: "Installment Plan A".to_string(),
            scheme_type: SchemeType::Installment,
            amount: BigDecimal::from_str("10000.00").unwrap(),
            discount: BigDecimal::from_str("1000.00").unwrap(),
            downpayment: BigDecimal::from_str("1000.00").unwrap(),
            monthly_payment: BigDecimal::from_str("2000.00").unwrap(),
            months: 4,
            created_at: Utc::now(),
        };
        assert_eq!(
            scheme.total_amount(),
            BigDecimal::from_str("9000.00").unwrap()
        );
    }
}
