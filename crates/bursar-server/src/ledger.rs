//! Shared ledger access helpers.
//!
//! Filtered reads and the audit-log append used by more than one
//! component. Callers pass any Postgres executor so the same helper
//! works against the pool or inside a transaction.

use bigdecimal::{BigDecimal, RoundingMode};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Account, AccountTransaction, Enrollment, EnrollmentFee, NewAccountTransaction, Payment,
    PaymentInstallment, TuitionScheme,
};

/// Rounds a money amount to two decimal places.
pub fn round2(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

/// Loads an enrollment by id.
pub async fn load_enrollment(
    executor: impl PgExecutor<'_>,
    enrollment_id: Uuid,
) -> Result<Enrollment, AppError> {
    let enrollment: Option<Enrollment> = sqlx::query_as(
        r#"
        SELECT id, student_id, program_id, semester_id, year_level, scheme_id,
               status, payment_status, created_at, updated_at
        FROM enrollments
        WHERE id = $1
        "#,
    )
    .bind(enrollment_id)
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to load enrollment: {}", e)))?;

    enrollment.ok_or_else(|| AppError::NotFound(format!("Enrollment not found: {}", enrollment_id)))
}

/// Loads a tuition scheme by id.
pub async fn load_scheme(
    executor: impl PgExecutor<'_>,
    scheme_id: Uuid,
) -> Result<TuitionScheme, AppError> {
    let scheme: Option<TuitionScheme> = sqlx::query_as(
        r#"
        SELECT id, name, scheme_type, amount, discount, downpayment,
               monthly_payment, months, created_at
        FROM tuition_schemes
        WHERE id = $1
        "#,
    )
    .bind(scheme_id)
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to load tuition scheme: {}", e)))?;

    scheme.ok_or_else(|| AppError::NotFound(format!("Tuition scheme not found: {}", scheme_id)))
}

/// Finds the ledger account for a student, if billing was ever
/// generated for them.
pub async fn find_account_by_student(
    executor: impl PgExecutor<'_>,
    student_id: Uuid,
) -> Result<Option<Account>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, student_id, total_balance, created_at, updated_at
        FROM accounts
        WHERE student_id = $1
        "#,
    )
    .bind(student_id)
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to load account: {}", e)))
}

/// Loads a payment by id.
pub async fn load_payment(
    executor: impl PgExecutor<'_>,
    payment_id: Uuid,
) -> Result<Payment, AppError> {
    let payment: Option<Payment> = sqlx::query_as(
        r#"
        SELECT id, account_id, enrollment_id, amount, status, payment_type,
               method, reference_number, idempotency_key, created_by,
               payment_date, created_at, updated_at
        FROM payments
        WHERE id = $1
        "#,
    )
    .bind(payment_id)
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to load payment: {}", e)))?;

    payment.ok_or_else(|| AppError::NotFound(format!("Payment not found: {}", payment_id)))
}

/// Unpaid one-off fees for an enrollment.
pub async fn unpaid_fees(
    executor: impl PgExecutor<'_>,
    enrollment_id: Uuid,
) -> Result<Vec<EnrollmentFee>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, enrollment_id, fee_type, description, amount, is_paid, paid_at, created_at
        FROM enrollment_fees
        WHERE enrollment_id = $1 AND is_paid = FALSE
        ORDER BY created_at ASC
        "#,
    )
    .bind(enrollment_id)
    .fetch_all(executor)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to load unpaid fees: {}", e)))
}

/// The downpayment fee of an installment-scheme enrollment, if any.
pub async fn downpayment_fee(
    executor: impl PgExecutor<'_>,
    enrollment_id: Uuid,
) -> Result<Option<EnrollmentFee>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, enrollment_id, fee_type, description, amount, is_paid, paid_at, created_at
        FROM enrollment_fees
        WHERE enrollment_id = $1 AND fee_type = 'downpayment'
        "#,
    )
    .bind(enrollment_id)
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to load downpayment fee: {}", e)))
}

/// The next installment due for an enrollment.
///
/// Ordering contract: installments settle FIFO by ascending
/// `installment_number` among `pending` rows, never an arbitrary
/// pending row. Every caller that needs "the next installment" goes
/// through this query.
pub async fn next_pending_installment(
    executor: impl PgExecutor<'_>,
    enrollment_id: Uuid,
) -> Result<Option<PaymentInstallment>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, enrollment_id, installment_number, amount, due_date,
               status, paid_at, payment_id, created_at
        FROM payment_installments
        WHERE enrollment_id = $1 AND status = 'pending'
        ORDER BY installment_number ASC
        LIMIT 1
        "#,
    )
    .bind(enrollment_id)
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to load next installment: {}", e)))
}

/// Whether any billing rows (fees or installments) exist for an
/// enrollment. Billing generation is not idempotent and refuses to run
/// twice.
pub async fn has_billing_rows(
    executor: impl PgExecutor<'_>,
    enrollment_id: Uuid,
) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(SELECT 1 FROM enrollment_fees WHERE enrollment_id = $1)
            OR EXISTS(SELECT 1 FROM payment_installments WHERE enrollment_id = $1)
        "#,
    )
    .bind(enrollment_id)
    .fetch_one(executor)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to check billing rows: {}", e)))?;

    Ok(exists)
}

/// Count of unpaid fees plus pending installments for an enrollment.
pub async fn outstanding_billing_count(
    executor: impl PgExecutor<'_>,
    enrollment_id: Uuid,
) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT
            (SELECT COUNT(*) FROM enrollment_fees
             WHERE enrollment_id = $1 AND is_paid = FALSE)
          + (SELECT COUNT(*) FROM payment_installments
             WHERE enrollment_id = $1 AND status = 'pending')
        "#,
    )
    .bind(enrollment_id)
    .fetch_one(executor)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to count outstanding billing: {}", e)))?;

    Ok(count)
}

/// Appends one immutable audit row for an account mutation.
pub async fn append_account_transaction(
    executor: impl PgExecutor<'_>,
    entry: &NewAccountTransaction,
) -> Result<Uuid, AppError> {
    sqlx::query_scalar(
        r#"
        INSERT INTO account_transactions
            (account_id, payment_id, amount, balance_before, balance_after, description, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(entry.account_id)
    .bind(entry.payment_id)
    .bind(&entry.amount)
    .bind(&entry.balance_before)
    .bind(&entry.balance_after)
    .bind(&entry.description)
    .bind(entry.created_by)
    .fetch_one(executor)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to append account transaction: {}", e)))
}

/// Most recent audit rows for an account.
pub async fn recent_account_transactions(
    executor: impl PgExecutor<'_>,
    account_id: Uuid,
    limit: i64,
) -> Result<Vec<AccountTransaction>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, account_id, payment_id, amount, balance_before, balance_after,
               description, created_by, created_at
        FROM account_transactions
        WHERE account_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(account_id)
    .bind(limit)
    .fetch_all(executor)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to load account transactions: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round2_half_up() {
        let value = BigDecimal::from_str("1234.5650").unwrap();
        assert_eq!(round2(&value), BigDecimal::from_str("1234.57").unwrap());
    }

    #[test]
    fn test_round2_truncates_excess_scale() {
        let value = BigDecimal::from_str("9000.004").unwrap();
        assert_eq!(round2(&value), BigDecimal::from_str("9000.00").unwrap());
    }

    #[test]
    fn test_round2_preserves_exact_values() {
        let value = BigDecimal::from_str("2000.00").unwrap();
        assert_eq!(round2(&value), value);
    }
}
