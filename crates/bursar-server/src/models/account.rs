//! Student ledger account model.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One ledger account per student.
///
/// `total_balance` tracks total billed minus completed balance-type
/// payments and is clamped at zero; the `balance_non_negative` check
/// constraint enforces the floor at the store level.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    /// Owning student; unique per account.
    pub student_id: Uuid,
    pub total_balance: BigDecimal,
    pub created_at: DateTime<Utc>,
    /// Last balance mutation.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether the student still owes anything.
    pub fn has_outstanding_balance(&self) -> bool {
        self.total_balance > BigDecimal::from(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_has_outstanding_balance() {
        let account = Account {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            total_balance: BigDecimal::from_str("9000.00").unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(account.has_outstanding_balance());
    }

    #[test]
    fn test_zero_balance_not_outstanding() {
        let account = Account {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            total_balance: BigDecimal::from(0),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!account.has_outstanding_balance());
    }
}
