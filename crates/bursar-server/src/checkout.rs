//! Checkout session manager: translates a payment intent into a
//! pending payment plus an externally redirectable checkout.

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bursar_gateway::{
    CheckoutLineItem, CheckoutMetadata, CheckoutRequest, PayMongoClient,
};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::ledger;
use crate::models::{
    Enrollment, NewPayment, NewPaymentTransaction, Payment, PaymentTransaction, PaymentType,
    SchemeType, TuitionScheme,
};

/// Mock checkout sessions mirror the gateway's 24-hour expiry.
const MOCK_CHECKOUT_EXPIRY_HOURS: i64 = 24;

/// A created checkout: the pending payment plus its gateway mirror.
#[derive(Debug)]
pub struct CheckoutOutcome {
    pub payment: Payment,
    pub transaction: PaymentTransaction,
}

/// The amount/description/type resolved for an enrollment's next payment.
struct PaymentIntent {
    amount: BigDecimal,
    payment_type: PaymentType,
    description: String,
}

/// Opens a checkout for the next payment due on an enrollment.
///
/// With a configured gateway this creates a hosted checkout session;
/// without one it synthesizes a local mock checkout with identical
/// downstream behavior, so the completion flow stays fully testable
/// offline. A gateway failure leaves the payment `pending` and
/// retryable with a fresh checkout.
pub async fn create_checkout(
    pool: &PgPool,
    gateway: Option<&PayMongoClient>,
    config: &AppConfig,
    enrollment_id: Uuid,
    created_by: Uuid,
) -> Result<CheckoutOutcome, AppError> {
    let enrollment = ledger::load_enrollment(pool, enrollment_id).await?;
    let scheme = ledger::load_scheme(pool, enrollment.scheme_id).await?;

    let account = ledger::find_account_by_student(pool, enrollment.student_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No account for student {}; billing was never generated",
                enrollment.student_id
            ))
        })?;

    let intent = resolve_intent(pool, &enrollment, &scheme).await?;

    let amount = ledger::round2(&intent.amount);
    if amount <= BigDecimal::from(0) {
        return Err(AppError::BadRequest(format!(
            "Invalid checkout amount: {}",
            amount
        )));
    }

    let new_payment = NewPayment {
        account_id: account.id,
        enrollment_id: Some(enrollment_id),
        amount: amount.clone(),
        payment_type: intent.payment_type,
        idempotency_key: NewPayment::idempotency_key_for(
            enrollment_id,
            intent.payment_type,
            Utc::now(),
        ),
        created_by,
    };

    let payment: Payment = sqlx::query_as(
        r#"
        INSERT INTO payments
            (account_id, enrollment_id, amount, payment_type, idempotency_key, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, account_id, enrollment_id, amount, status, payment_type,
                  method, reference_number, idempotency_key, created_by,
                  payment_date, created_at, updated_at
        "#,
    )
    .bind(new_payment.account_id)
    .bind(new_payment.enrollment_id)
    .bind(&new_payment.amount)
    .bind(new_payment.payment_type)
    .bind(&new_payment.idempotency_key)
    .bind(new_payment.created_by)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to create payment: {}", e)))?;

    let (checkout_id, checkout_url, expires_at) = match gateway {
        Some(client) => {
            let session = client
                .create_checkout_session(CheckoutRequest {
                    description: intent.description.clone(),
                    line_items: vec![CheckoutLineItem::php(
                        intent.description.clone(),
                        to_centavos(&amount)?,
                    )],
                    success_url: format!(
                        "{}/api/v1/billing/payment/success?payment_id={}",
                        config.base_url, payment.id
                    ),
                    cancel_url: format!(
                        "{}/api/v1/billing/payment/cancel?payment_id={}",
                        config.base_url, payment.id
                    ),
                    metadata: CheckoutMetadata {
                        payment_id: Some(payment.id.to_string()),
                        enrollment_id: Some(enrollment_id.to_string()),
                        student_id: Some(enrollment.student_id.to_string()),
                        payment_type: Some(intent.payment_type.as_str().to_string()),
                        scheme_id: Some(scheme.id.to_string()),
                        payment_category: Some(intent.payment_type.category().to_string()),
                    },
                })
                .await
                .map_err(|e| AppError::Gateway(e.to_string()))?;
            (session.id, session.checkout_url, session.expires_at)
        }
        None => {
            tracing::info!(payment_id = %payment.id, "gateway not configured; issuing mock checkout");
            let checkout_id = format!("cs_mock_{}", Uuid::new_v4().simple());
            let checkout_url = format!(
                "{}/api/v1/billing/payment/mock/{}",
                config.base_url, payment.id
            );
            (
                checkout_id,
                checkout_url,
                Utc::now() + Duration::hours(MOCK_CHECKOUT_EXPIRY_HOURS),
            )
        }
    };

    let new_transaction = NewPaymentTransaction {
        payment_id: payment.id,
        checkout_id,
        checkout_url,
        expires_at,
    };

    let transaction: PaymentTransaction = sqlx::query_as(
        r#"
        INSERT INTO payment_transactions (payment_id, checkout_id, checkout_url, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, payment_id, checkout_id, checkout_url, gateway_status,
                  paid_at, expires_at, created_at, updated_at
        "#,
    )
    .bind(new_transaction.payment_id)
    .bind(&new_transaction.checkout_id)
    .bind(&new_transaction.checkout_url)
    .bind(new_transaction.expires_at)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Failed to create payment transaction: {}", e)))?;

    tracing::info!(
        payment_id = %payment.id,
        enrollment_id = %enrollment_id,
        payment_type = intent.payment_type.as_str(),
        amount = %amount,
        checkout_id = %transaction.checkout_id,
        "checkout created"
    );

    Ok(CheckoutOutcome {
        payment,
        transaction,
    })
}

/// Determines what the next payment for an enrollment settles.
///
/// Full-payment schemes charge the sum of unpaid fees. Installment
/// schemes charge the downpayment fee first, then the earliest pending
/// installment.
async fn resolve_intent(
    pool: &PgPool,
    enrollment: &Enrollment,
    scheme: &TuitionScheme,
) -> Result<PaymentIntent, AppError> {
    match scheme.scheme_type {
        SchemeType::FullPayment => {
            let fees = ledger::unpaid_fees(pool, enrollment.id).await?;
            if fees.is_empty() {
                return Err(AppError::Conflict(format!(
                    "No unpaid fees remain for enrollment {}",
                    enrollment.id
                )));
            }
            let amount = fees
                .iter()
                .fold(BigDecimal::from(0), |sum, fee| sum + &fee.amount);
            Ok(PaymentIntent {
                amount,
                payment_type: PaymentType::FullPayment,
                description: "Tuition Full Payment".to_string(),
            })
        }
        SchemeType::Installment => {
            if let Some(fee) = ledger::downpayment_fee(pool, enrollment.id).await? {
                if !fee.is_paid {
                    return Ok(PaymentIntent {
                        amount: fee.amount,
                        payment_type: PaymentType::Downpayment,
                        description: "Tuition Downpayment".to_string(),
                    });
                }
            }

            let installment = ledger::next_pending_installment(pool, enrollment.id)
                .await?
                .ok_or_else(|| {
                    AppError::Conflict(format!(
                        "No pending installments remain for enrollment {}",
                        enrollment.id
                    ))
                })?;
            Ok(PaymentIntent {
                amount: installment.amount,
                payment_type: PaymentType::Installment,
                description: format!("Tuition Installment {}", installment.installment_number),
            })
        }
    }
}

/// Converts a two-decimal peso amount to centavos.
fn to_centavos(amount: &BigDecimal) -> Result<i64, AppError> {
    (amount * BigDecimal::from(100))
        .with_scale(0)
        .to_i64()
        .ok_or_else(|| AppError::Internal(format!("Amount out of range: {}", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_to_centavos() {
        let amount = BigDecimal::from_str("1234.56").unwrap();
        assert_eq!(to_centavos(&amount).unwrap(), 123_456);
    }

    #[test]
    fn test_to_centavos_whole_amount() {
        let amount = BigDecimal::from_str("2000.00").unwrap();
        assert_eq!(to_centavos(&amount).unwrap(), 200_000);
    }

    #[test]
    fn test_to_centavos_small_amount() {
        let amount = BigDecimal::from_str("0.01").unwrap();
        assert_eq!(to_centavos(&amount).unwrap(), 1);
    }
}
