//! Billing endpoints: plan generation, checkout creation, and read
//! views over an enrollment's billing state.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::billing::{generate_billing, BillingPlan, FeeSummary, InstallmentSummary};
use crate::checkout::create_checkout;
use crate::error::AppError;
use crate::ledger;
use crate::models::{
    BillingStatus, EnrollmentFee, EnrollmentStatus, Payment, PaymentInstallment, PaymentStatus,
    PaymentType, SchemeType,
};
use crate::routes::AppState;

/// Creates the billing router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate-billing", post(generate_billing_handler))
        .route("/create-checkout", post(create_checkout_handler))
        .route("/{enrollment_id}", get(get_billing_summary))
        .route("/account/{student_id}", get(get_account_summary))
        .with_state(state)
}

/// Request body for generating billing.
/// Note: in production, created_by would come from authentication.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBillingRequest {
    pub enrollment_id: Uuid,
    pub created_by: Uuid,
}

/// POST /api/v1/billing/generate-billing
///
/// Materializes the billing plan for an enrollment: initializes the
/// student's account balance and creates the fee/installment rows.
/// Fails with a conflict if billing was already generated.
async fn generate_billing_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateBillingRequest>,
) -> Result<Json<BillingPlan>, AppError> {
    let plan = generate_billing(&state.pool, request.enrollment_id, request.created_by).await?;
    Ok(Json(plan))
}

/// Request body for opening a checkout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub enrollment_id: Uuid,
    pub created_by: Uuid,
}

/// Response for a created checkout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    pub payment_id: Uuid,
    pub enrollment_id: Option<Uuid>,
    pub amount: String,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub checkout_id: String,
    pub checkout_url: String,
    pub expires_at: DateTime<Utc>,
}

/// POST /api/v1/billing/create-checkout
///
/// Resolves the next payment due on the enrollment (unpaid fees, then
/// the downpayment, then the earliest pending installment), creates a
/// pending payment, and opens a checkout session for it.
async fn create_checkout_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, AppError> {
    let outcome = create_checkout(
        &state.pool,
        state.gateway.as_deref(),
        &state.config,
        request.enrollment_id,
        request.created_by,
    )
    .await?;

    Ok(Json(CreateCheckoutResponse {
        payment_id: outcome.payment.id,
        enrollment_id: outcome.payment.enrollment_id,
        amount: outcome.payment.amount.to_string(),
        payment_type: outcome.payment.payment_type,
        status: outcome.payment.status,
        checkout_id: outcome.transaction.checkout_id,
        checkout_url: outcome.transaction.checkout_url,
        expires_at: outcome.transaction.expires_at,
    }))
}

/// One payment in a billing summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub id: Uuid,
    pub amount: String,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Response for the billing summary endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSummaryResponse {
    pub enrollment_id: Uuid,
    pub status: EnrollmentStatus,
    pub payment_status: BillingStatus,
    pub scheme_id: Uuid,
    pub scheme_type: SchemeType,
    pub total_amount: String,
    pub account_balance: String,
    pub fees: Vec<FeeSummary>,
    pub installments: Vec<InstallmentSummary>,
    pub payments: Vec<PaymentSummary>,
}

/// GET /api/v1/billing/{enrollment_id}
///
/// Returns the enrollment's full billing state: scheme, balance, fees,
/// installments, and payment history.
async fn get_billing_summary(
    State(state): State<AppState>,
    Path(enrollment_id): Path<Uuid>,
) -> Result<Json<BillingSummaryResponse>, AppError> {
    let enrollment = ledger::load_enrollment(&state.pool, enrollment_id).await?;
    let scheme = ledger::load_scheme(&state.pool, enrollment.scheme_id).await?;
    let account = ledger::find_account_by_student(&state.pool, enrollment.student_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No account for student {}; billing was never generated",
                enrollment.student_id
            ))
        })?;

    let fees = all_fees(&state.pool, enrollment_id).await?;
    let installments = all_installments(&state.pool, enrollment_id).await?;
    let payments = payments_for_enrollment(&state.pool, enrollment_id).await?;

    Ok(Json(BillingSummaryResponse {
        enrollment_id,
        status: enrollment.status,
        payment_status: enrollment.payment_status,
        scheme_id: scheme.id,
        scheme_type: scheme.scheme_type,
        total_amount: ledger::round2(&scheme.total_amount()).to_string(),
        account_balance: account.total_balance.to_string(),
        fees: fees.iter().map(FeeSummary::from).collect(),
        installments: installments.iter().map(InstallmentSummary::from).collect(),
        payments: payments
            .into_iter()
            .map(|payment| PaymentSummary {
                id: payment.id,
                amount: payment.amount.to_string(),
                status: payment.status,
                payment_type: payment.payment_type,
                method: payment.method,
                reference_number: payment.reference_number,
                payment_date: payment.payment_date,
                created_at: payment.created_at,
            })
            .collect(),
    }))
}

/// One audit row in the account summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: Uuid,
    pub amount: String,
    pub balance_before: String,
    pub balance_after: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Response for the account summary endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummaryResponse {
    pub account_id: Uuid,
    pub student_id: Uuid,
    pub total_balance: String,
    pub updated_at: DateTime<Utc>,
    /// Most recent audit rows (last 10).
    pub recent_transactions: Vec<TransactionRecord>,
}

/// GET /api/v1/billing/account/{student_id}
///
/// Returns the student's ledger balance and recent account activity.
async fn get_account_summary(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<AccountSummaryResponse>, AppError> {
    let account = ledger::find_account_by_student(&state.pool, student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No account for student {}", student_id)))?;

    let transactions = ledger::recent_account_transactions(&state.pool, account.id, 10).await?;

    Ok(Json(AccountSummaryResponse {
        account_id: account.id,
        student_id: account.student_id,
        total_balance: account.total_balance.to_string(),
        updated_at: account.updated_at,
        recent_transactions: transactions
            .into_iter()
            .map(|entry| TransactionRecord {
                id: entry.id,
                amount: entry.amount.to_string(),
                balance_before: entry.balance_before.to_string(),
                balance_after: entry.balance_after.to_string(),
                description: entry.description,
                created_at: entry.created_at,
            })
            .collect(),
    }))
}

/// All fees for an enrollment, paid or not.
async fn all_fees(pool: &PgPool, enrollment_id: Uuid) -> Result<Vec<EnrollmentFee>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, enrollment_id, fee_type, description, amount, is_paid, paid_at, created_at
        FROM enrollment_fees
        WHERE enrollment_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(enrollment_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to load fees: {}", e)))
}

/// All installments for an enrollment, in schedule order.
async fn all_installments(
    pool: &PgPool,
    enrollment_id: Uuid,
) -> Result<Vec<PaymentInstallment>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, enrollment_id, installment_number, amount, due_date,
               status, paid_at, payment_id, created_at
        FROM payment_installments
        WHERE enrollment_id = $1
        ORDER BY installment_number ASC
        "#,
    )
    .bind(enrollment_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to load installments: {}", e)))
}

/// Payment history for an enrollment, newest first.
async fn payments_for_enrollment(
    pool: &PgPool,
    enrollment_id: Uuid,
) -> Result<Vec<Payment>, AppError> {
    sqlx::query_as(
        r#"
        SELECT id, account_id, enrollment_id, amount, status, payment_type,
               method, reference_number, idempotency_key, created_by,
               payment_date, created_at, updated_at
        FROM payments
        WHERE enrollment_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(enrollment_id)
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to load payments: {}", e)))
}
