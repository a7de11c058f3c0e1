//! Payment completion engine.
//!
//! The single chokepoint that applies a completed payment to the
//! ledger. Three triggers converge here: the gateway webhook, the
//! success-redirect callback, and the mock completion endpoint used in
//! offline mode. The ledger-mutating effect runs at most once per
//! payment regardless of how many triggers fire.

use bigdecimal::BigDecimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::ledger;
use crate::models::{
    Account, BillingStatus, Enrollment, NewAccountTransaction, Payment, PaymentStatus, PaymentType,
};

/// Result of a completion attempt.
#[derive(Debug)]
pub struct CompletionOutcome {
    pub payment: Payment,
    /// True when the payment was already completed and this call
    /// performed no mutation.
    pub already_processed: bool,
}

/// Applies a completed payment to the ledger exactly once.
///
/// The idempotency guard is a single conditional update that only
/// claims the payment while its status is still `pending`; the
/// affected-row count is the signal. Concurrent duplicate triggers
/// (webhook redelivery, redirect racing the webhook) lose the claim and
/// return `already_processed` without touching the ledger. Everything
/// from the claim to the audit append commits as one transaction.
pub async fn complete_payment(
    pool: &PgPool,
    payment_id: Uuid,
    method: Option<&str>,
    reference_number: Option<&str>,
) -> Result<CompletionOutcome, AppError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

    // Claim the payment. Zero rows means somebody else already moved it
    // out of pending, or it never existed.
    let claimed: Option<Payment> = sqlx::query_as(
        r#"
        UPDATE payments
        SET status = $2,
            method = COALESCE($3, method),
            reference_number = COALESCE($4, reference_number),
            payment_date = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING id, account_id, enrollment_id, amount, status, payment_type,
                  method, reference_number, idempotency_key, created_by,
                  payment_date, created_at, updated_at
        "#,
    )
    .bind(payment_id)
    .bind(PaymentStatus::Completed)
    .bind(method)
    .bind(reference_number)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to claim payment: {}", e)))?;

    let payment = match claimed {
        Some(payment) => payment,
        None => {
            let existing = ledger::load_payment(&mut *tx, payment_id).await?;
            return match existing.status {
                PaymentStatus::Completed => Ok(CompletionOutcome {
                    payment: existing,
                    already_processed: true,
                }),
                status => Err(AppError::Conflict(format!(
                    "Payment {} is not completable (status: {:?})",
                    payment_id, status
                ))),
            };
        }
    };

    // Mirror the gateway-side transaction record.
    sqlx::query(
        r#"
        UPDATE payment_transactions
        SET gateway_status = 'paid', paid_at = NOW(), updated_at = NOW()
        WHERE payment_id = $1
        "#,
    )
    .bind(payment_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to update payment transaction: {}", e)))?;

    // Lock the account for the duration of the ledger mutation.
    let account: Account = sqlx::query_as(
        r#"
        SELECT id, student_id, total_balance, created_at, updated_at
        FROM accounts
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(payment.account_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to lock account: {}", e)))?;

    let balance_before = account.total_balance.clone();

    // Fees and installments are pre-billed obligations against the
    // balance initialized at billing generation, so settling them never
    // moves the balance. Only balance-type payments do.
    let (balance_after, description) = match payment.payment_type {
        PaymentType::FullPayment | PaymentType::Enrollment => {
            let enrollment_id = require_enrollment(&payment)?;
            settle_unpaid_fees(&mut tx, enrollment_id, payment_id).await?;
            (balance_before.clone(), "Tuition fee payment".to_string())
        }
        PaymentType::Downpayment => {
            let enrollment_id = require_enrollment(&payment)?;
            settle_downpayment_fee(&mut tx, enrollment_id, payment_id).await?;
            (balance_before.clone(), "Downpayment".to_string())
        }
        PaymentType::Installment | PaymentType::Monthly => {
            let enrollment_id = require_enrollment(&payment)?;
            let number = settle_next_installment(&mut tx, enrollment_id, payment_id).await?;
            (
                balance_before.clone(),
                format!("Installment {} payment", number),
            )
        }
        PaymentType::Balance => {
            let balance_after =
                reduce_balance(&mut tx, payment.account_id, &payment.amount).await?;
            (balance_after, "Balance payment".to_string())
        }
    };

    if let Some(enrollment_id) = payment.enrollment_id {
        advance_enrollment(&mut tx, enrollment_id, payment.payment_type).await?;
    }

    ledger::append_account_transaction(
        &mut *tx,
        &NewAccountTransaction {
            account_id: payment.account_id,
            payment_id: Some(payment_id),
            amount: payment.amount.clone(),
            balance_before,
            balance_after,
            description,
            created_by: payment.created_by,
        },
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

    tracing::info!(
        payment_id = %payment_id,
        payment_type = payment.payment_type.as_str(),
        amount = %payment.amount,
        "payment completed"
    );

    // Best-effort post-step: never fails the completion itself.
    if payment.payment_type.qualifies_enrollment() {
        if let Some(enrollment_id) = payment.enrollment_id {
            if let Err(e) = auto_enroll_subjects(pool, enrollment_id).await {
                tracing::warn!(
                    enrollment_id = %enrollment_id,
                    error = %e,
                    "subject auto-enrollment failed after payment completion"
                );
            }
        }
    }

    Ok(CompletionOutcome {
        payment,
        already_processed: false,
    })
}

/// Marks a still-pending payment as failed (gateway reported failure).
/// Terminal payments are left untouched.
pub async fn fail_payment(pool: &PgPool, payment_id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE payments
        SET status = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(payment_id)
    .bind(PaymentStatus::Failed)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to update payment status: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE payment_transactions
        SET gateway_status = 'failed', updated_at = NOW()
        WHERE payment_id = $1
        "#,
    )
    .bind(payment_id)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to update payment transaction: {}", e)))?;

    Ok(())
}

/// Cancels a payment while it is still pending.
///
/// Cancelling a completed payment is not supported: the conditional
/// update refuses to touch terminal states and the caller gets a
/// conflict instead.
pub async fn cancel_payment(pool: &PgPool, payment_id: Uuid) -> Result<Payment, AppError> {
    let cancelled: Option<Payment> = sqlx::query_as(
        r#"
        UPDATE payments
        SET status = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING id, account_id, enrollment_id, amount, status, payment_type,
                  method, reference_number, idempotency_key, created_by,
                  payment_date, created_at, updated_at
        "#,
    )
    .bind(payment_id)
    .bind(PaymentStatus::Cancelled)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to cancel payment: {}", e)))?;

    let payment = match cancelled {
        Some(payment) => payment,
        None => {
            let existing = ledger::load_payment(pool, payment_id).await?;
            return Err(AppError::Conflict(format!(
                "Payment {} is not cancellable (status: {:?})",
                payment_id, existing.status
            )));
        }
    };

    sqlx::query(
        r#"
        UPDATE payment_transactions
        SET gateway_status = 'cancelled', updated_at = NOW()
        WHERE payment_id = $1
        "#,
    )
    .bind(payment_id)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to update payment transaction: {}", e)))?;

    Ok(payment)
}

fn require_enrollment(payment: &Payment) -> Result<Uuid, AppError> {
    payment.enrollment_id.ok_or_else(|| {
        AppError::Conflict(format!(
            "Payment {} has type {} but no enrollment",
            payment.id,
            payment.payment_type.as_str()
        ))
    })
}

/// Marks every unpaid fee for the enrollment as paid.
async fn settle_unpaid_fees(
    tx: &mut Transaction<'_, Postgres>,
    enrollment_id: Uuid,
    payment_id: Uuid,
) -> Result<(), AppError> {
    let settled = sqlx::query(
        r#"
        UPDATE enrollment_fees
        SET is_paid = TRUE, paid_at = NOW()
        WHERE enrollment_id = $1 AND is_paid = FALSE
        "#,
    )
    .bind(enrollment_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to settle fees: {}", e)))?
    .rows_affected();

    if settled == 0 {
        return Err(AppError::Conflict(format!(
            "No unpaid fees remain for enrollment {} (payment {})",
            enrollment_id, payment_id
        )));
    }

    Ok(())
}

/// Marks the downpayment fee as paid.
async fn settle_downpayment_fee(
    tx: &mut Transaction<'_, Postgres>,
    enrollment_id: Uuid,
    payment_id: Uuid,
) -> Result<(), AppError> {
    let settled = sqlx::query(
        r#"
        UPDATE enrollment_fees
        SET is_paid = TRUE, paid_at = NOW()
        WHERE enrollment_id = $1 AND fee_type = 'downpayment' AND is_paid = FALSE
        "#,
    )
    .bind(enrollment_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to settle downpayment: {}", e)))?
    .rows_affected();

    if settled == 0 {
        return Err(AppError::Conflict(format!(
            "Downpayment already settled for enrollment {} (payment {})",
            enrollment_id, payment_id
        )));
    }

    Ok(())
}

/// Settles the earliest pending installment, linking it to the payment.
///
/// The subselect pins the FIFO contract: lowest pending
/// installment_number, never an arbitrary pending row.
async fn settle_next_installment(
    tx: &mut Transaction<'_, Postgres>,
    enrollment_id: Uuid,
    payment_id: Uuid,
) -> Result<i32, AppError> {
    let number: Option<i32> = sqlx::query_scalar(
        r#"
        UPDATE payment_installments
        SET status = 'paid', paid_at = NOW(), payment_id = $2
        WHERE id = (
            SELECT id FROM payment_installments
            WHERE enrollment_id = $1 AND status = 'pending'
            ORDER BY installment_number ASC
            LIMIT 1
            FOR UPDATE
        )
        RETURNING installment_number
        "#,
    )
    .bind(enrollment_id)
    .bind(payment_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to settle installment: {}", e)))?;

    number.ok_or_else(|| {
        AppError::Conflict(format!(
            "No pending installments remain for enrollment {} (payment {})",
            enrollment_id, payment_id
        ))
    })
}

/// Reduces the account balance, floored at zero. Returns the new balance.
async fn reduce_balance(
    tx: &mut Transaction<'_, Postgres>,
    account_id: Uuid,
    amount: &BigDecimal,
) -> Result<BigDecimal, AppError> {
    sqlx::query_scalar(
        r#"
        UPDATE accounts
        SET total_balance = GREATEST(total_balance - $2, 0), updated_at = NOW()
        WHERE id = $1
        RETURNING total_balance
        "#,
    )
    .bind(account_id)
    .bind(amount)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to reduce balance: {}", e)))
}

/// Advances the enrollment's billing progress and, for qualifying
/// payment types, flips a pending enrollment to enrolled.
async fn advance_enrollment(
    tx: &mut Transaction<'_, Postgres>,
    enrollment_id: Uuid,
    payment_type: PaymentType,
) -> Result<(), AppError> {
    let outstanding = ledger::outstanding_billing_count(&mut **tx, enrollment_id).await?;
    let payment_status = if outstanding == 0 {
        BillingStatus::FullyPaid
    } else {
        BillingStatus::PartiallyPaid
    };

    sqlx::query(
        r#"
        UPDATE enrollments
        SET payment_status = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(enrollment_id)
    .bind(payment_status)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to update enrollment billing: {}", e)))?;

    if payment_type.qualifies_enrollment() || outstanding == 0 {
        sqlx::query(
            r#"
            UPDATE enrollments
            SET status = 'enrolled', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(enrollment_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update enrollment status: {}", e)))?;
    }

    Ok(())
}

/// Creates enrollment_subjects rows for the enrollment's
/// program/semester/year-level, if none exist yet.
///
/// Runs outside the completion transaction; the caller logs and
/// swallows any failure.
async fn auto_enroll_subjects(pool: &PgPool, enrollment_id: Uuid) -> Result<(), AppError> {
    let enrollment: Enrollment = ledger::load_enrollment(pool, enrollment_id).await?;
    if !enrollment.is_enrolled() {
        return Ok(());
    }

    let existing: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM enrollment_subjects WHERE enrollment_id = $1
        "#,
    )
    .bind(enrollment_id)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to count enrolled subjects: {}", e)))?;

    if existing > 0 {
        return Ok(());
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO enrollment_subjects (enrollment_id, subject_id)
        SELECT $1, id FROM subjects
        WHERE program_id = $2 AND semester_id = $3 AND year_level = $4
        ON CONFLICT (enrollment_id, subject_id) DO NOTHING
        "#,
    )
    .bind(enrollment_id)
    .bind(enrollment.program_id)
    .bind(enrollment.semester_id)
    .bind(enrollment.year_level)
    .execute(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to auto-enroll subjects: {}", e)))?
    .rows_affected();

    if inserted > 0 {
        tracing::info!(
            enrollment_id = %enrollment_id,
            subjects = inserted,
            "auto-enrolled subjects after qualifying payment"
        );
    }

    Ok(())
}
