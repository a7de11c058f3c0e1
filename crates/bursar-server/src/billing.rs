//! Billing generator: materializes a billing plan for an enrollment
//! exactly once.
//!
//! The whole sequence (account upsert, fee/installment inserts, audit
//! row) runs inside a single transaction so partial failure is
//! structurally impossible. The operation is deliberately not
//! idempotent: a second call for the same enrollment is a conflict.

use bigdecimal::BigDecimal;
use chrono::{Months, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;
use crate::ledger;
use crate::models::{
    Account, EnrollmentFee, FeeType, InstallmentStatus, NewAccountTransaction, NewEnrollmentFee,
    NewPaymentInstallment, PaymentInstallment, SchemeType, TuitionScheme,
};

/// One fee in a billing plan response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSummary {
    pub id: Uuid,
    pub fee_type: FeeType,
    pub description: String,
    pub amount: String,
    pub is_paid: bool,
}

impl From<&EnrollmentFee> for FeeSummary {
    fn from(fee: &EnrollmentFee) -> Self {
        Self {
            id: fee.id,
            fee_type: fee.fee_type,
            description: fee.description.clone(),
            amount: fee.amount.to_string(),
            is_paid: fee.is_paid,
        }
    }
}

/// One installment in a billing plan response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentSummary {
    pub id: Uuid,
    pub installment_number: i32,
    pub amount: String,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
}

impl From<&PaymentInstallment> for InstallmentSummary {
    fn from(installment: &PaymentInstallment) -> Self {
        Self {
            id: installment.id,
            installment_number: installment.installment_number,
            amount: installment.amount.to_string(),
            due_date: installment.due_date,
            status: installment.status,
        }
    }
}

/// The materialized billing plan returned to the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPlan {
    pub enrollment_id: Uuid,
    pub scheme_id: Uuid,
    pub scheme_type: SchemeType,
    pub total_amount: String,
    pub account_id: Uuid,
    pub account_balance: String,
    pub fees: Vec<FeeSummary>,
    pub installments: Vec<InstallmentSummary>,
}

/// Generates the billing plan for an enrollment.
///
/// Fails with a conflict if any fee or installment rows already exist
/// for the enrollment; unique constraints on the billing tables back
/// the check at the store level.
pub async fn generate_billing(
    pool: &PgPool,
    enrollment_id: Uuid,
    created_by: Uuid,
) -> Result<BillingPlan, AppError> {
    let enrollment = ledger::load_enrollment(pool, enrollment_id).await?;
    let scheme = ledger::load_scheme(pool, enrollment.scheme_id).await?;

    if ledger::has_billing_rows(pool, enrollment_id).await? {
        return Err(AppError::Conflict(format!(
            "Billing already generated for enrollment {}",
            enrollment_id
        )));
    }

    let total_amount = ledger::round2(&scheme.total_amount());
    if total_amount <= BigDecimal::from(0) {
        return Err(AppError::BadRequest(format!(
            "Invalid billing amount {} for scheme {}",
            total_amount, scheme.id
        )));
    }

    if scheme.scheme_type == SchemeType::Installment
        && !installment_breakdown_matches(&scheme, &total_amount)
    {
        // Known soft validation: schemes are reference data maintained
        // by hand and may not sum exactly. Billing still proceeds.
        tracing::warn!(
            scheme_id = %scheme.id,
            downpayment = %scheme.downpayment,
            monthly_payment = %scheme.monthly_payment,
            months = scheme.months,
            total = %total_amount,
            "installment breakdown does not sum to scheme total"
        );
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

    // Initialize or accrue the student's balance in one atomic upsert.
    let account: Account = sqlx::query_as(
        r#"
        INSERT INTO accounts (student_id, total_balance)
        VALUES ($1, $2)
        ON CONFLICT (student_id)
        DO UPDATE SET total_balance = accounts.total_balance + EXCLUDED.total_balance,
                      updated_at = NOW()
        RETURNING id, student_id, total_balance, created_at, updated_at
        "#,
    )
    .bind(enrollment.student_id)
    .bind(&total_amount)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to initialize account: {}", e)))?;

    let balance_before = &account.total_balance - &total_amount;

    let mut fees = Vec::new();
    let mut installments = Vec::new();

    match scheme.scheme_type {
        SchemeType::FullPayment => {
            let fee = insert_fee(
                &mut tx,
                NewEnrollmentFee::full_payment(enrollment_id, total_amount.clone()),
            )
            .await?;
            fees.push(fee);
        }
        SchemeType::Installment => {
            let fee = insert_fee(
                &mut tx,
                NewEnrollmentFee::downpayment(enrollment_id, ledger::round2(&scheme.downpayment)),
            )
            .await?;
            fees.push(fee);

            let monthly = ledger::round2(&scheme.monthly_payment);
            for (number, due_date) in
                installment_due_dates(Utc::now().date_naive(), scheme.months)?
            {
                let installment = insert_installment(
                    &mut tx,
                    NewPaymentInstallment {
                        enrollment_id,
                        installment_number: number,
                        amount: monthly.clone(),
                        due_date,
                    },
                )
                .await?;
                installments.push(installment);
            }
        }
    }

    ledger::append_account_transaction(
        &mut *tx,
        &NewAccountTransaction {
            account_id: account.id,
            payment_id: None,
            amount: total_amount.clone(),
            balance_before,
            balance_after: account.total_balance.clone(),
            description: format!("Billing generated for enrollment {}", enrollment_id),
            created_by,
        },
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

    tracing::info!(
        enrollment_id = %enrollment_id,
        scheme_id = %scheme.id,
        total_amount = %total_amount,
        fees = fees.len(),
        installments = installments.len(),
        "billing generated"
    );

    Ok(BillingPlan {
        enrollment_id,
        scheme_id: scheme.id,
        scheme_type: scheme.scheme_type,
        total_amount: total_amount.to_string(),
        account_id: account.id,
        account_balance: account.total_balance.to_string(),
        fees: fees.iter().map(FeeSummary::from).collect(),
        installments: installments.iter().map(InstallmentSummary::from).collect(),
    })
}

/// Whether `downpayment + monthly * months` matches the scheme total
/// within one cent.
fn installment_breakdown_matches(scheme: &TuitionScheme, total: &BigDecimal) -> bool {
    let covered = &scheme.downpayment + &scheme.monthly_payment * BigDecimal::from(scheme.months);
    let one_cent = BigDecimal::from_str("0.01").unwrap();
    (covered - total).abs() <= one_cent
}

/// Due dates one calendar month apart, starting one month out.
fn installment_due_dates(
    start: NaiveDate,
    months: i32,
) -> Result<Vec<(i32, NaiveDate)>, AppError> {
    let mut dates = Vec::with_capacity(months.max(0) as usize);
    for number in 1..=months {
        let due_date = start
            .checked_add_months(Months::new(number as u32))
            .ok_or_else(|| {
                AppError::Internal(format!("Installment due date overflow at {}", number))
            })?;
        dates.push((number, due_date));
    }
    Ok(dates)
}

async fn insert_fee(
    tx: &mut Transaction<'_, Postgres>,
    new_fee: NewEnrollmentFee,
) -> Result<EnrollmentFee, AppError> {
    sqlx::query_as(
        r#"
        INSERT INTO enrollment_fees (enrollment_id, fee_type, description, amount)
        VALUES ($1, $2, $3, $4)
        RETURNING id, enrollment_id, fee_type, description, amount, is_paid, paid_at, created_at
        "#,
    )
    .bind(new_fee.enrollment_id)
    .bind(new_fee.fee_type)
    .bind(&new_fee.description)
    .bind(&new_fee.amount)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to create enrollment fee: {}", e)))
}

async fn insert_installment(
    tx: &mut Transaction<'_, Postgres>,
    new_installment: NewPaymentInstallment,
) -> Result<PaymentInstallment, AppError> {
    sqlx::query_as(
        r#"
        INSERT INTO payment_installments (enrollment_id, installment_number, amount, due_date)
        VALUES ($1, $2, $3, $4)
        RETURNING id, enrollment_id, installment_number, amount, due_date,
                  status, paid_at, payment_id, created_at
        "#,
    )
    .bind(new_installment.enrollment_id)
    .bind(new_installment.installment_number)
    .bind(&new_installment.amount)
    .bind(new_installment.due_date)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to create installment: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn installment_scheme(
        downpayment: &str,
        monthly: &str,
        months: i32,
        amount: &str,
    ) -> TuitionScheme {
        TuitionScheme {
            id: Uuid::new_v4(),
            name: "Installment Plan".to_string(),
            scheme_type: SchemeType::Installment,
            amount: BigDecimal::from_str(amount).unwrap(),
            discount: BigDecimal::from(0),
            downpayment: BigDecimal::from_str(downpayment).unwrap(),
            monthly_payment: BigDecimal::from_str(monthly).unwrap(),
            months,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_breakdown_matches_exactly() {
        let scheme = installment_scheme("1000.00", "2000.00", 4, "9000.00");
        let total = BigDecimal::from_str("9000.00").unwrap();
        assert!(installment_breakdown_matches(&scheme, &total));
    }

    #[test]
    fn test_breakdown_tolerates_one_cent() {
        let scheme = installment_scheme("1000.01", "2000.00", 4, "9000.00");
        let total = BigDecimal::from_str("9000.00").unwrap();
        assert!(installment_breakdown_matches(&scheme, &total));
    }

    #[test]
    fn test_breakdown_rejects_larger_gap() {
        let scheme = installment_scheme("1000.00", "2000.00", 4, "9500.00");
        let total = BigDecimal::from_str("9500.00").unwrap();
        assert!(!installment_breakdown_matches(&scheme, &total));
    }

    #[test]
    fn test_due_dates_one_month_apart() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let dates = installment_due_dates(start, 4).unwrap();
        assert_eq!(
            dates,
            vec![
                (1, NaiveDate::from_ymd_opt(2025, 2, 15).unwrap()),
                (2, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()),
                (3, NaiveDate::from_ymd_opt(2025, 4, 15).unwrap()),
                (4, NaiveDate::from_ymd_opt(2025, 5, 15).unwrap()),
            ]
        );
    }

    #[test]
    fn test_due_dates_clamp_to_month_end() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let dates = installment_due_dates(start, 2).unwrap();
        // February has no 31st; chrono clamps to the last day.
        assert_eq!(dates[0].1, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(dates[1].1, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    }

    #[test]
    fn test_due_dates_empty_for_zero_months() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert!(installment_due_dates(start, 0).unwrap().is_empty());
    }
}
