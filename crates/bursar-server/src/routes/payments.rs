//! Payment lifecycle endpoints: the gateway redirect callbacks, the
//! administrative cancel, and the mock completion trigger used when no
//! gateway is configured.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::completion;
use crate::error::AppError;
use crate::models::PaymentStatus;
use crate::routes::AppState;

/// Creates the payment lifecycle router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/payment/success", get(payment_success))
        .route("/payment/cancel", get(payment_cancel))
        .route("/payment/{payment_id}/cancel", post(cancel_payment_handler))
        .route(
            "/payment/mock/{payment_id}/complete",
            post(complete_mock_payment),
        )
        .with_state(state)
}

/// Query parameters for the redirect callbacks.
#[derive(Debug, Deserialize)]
pub struct PaymentCallbackQuery {
    pub payment_id: Uuid,
}

fn status_redirect(frontend_url: &str, payment_id: Uuid, status: &str) -> Redirect {
    Redirect::to(&format!(
        "{}/payments/status?payment_id={}&status={}",
        frontend_url, payment_id, status
    ))
}

fn error_redirect(frontend_url: &str, payment_id: Uuid, error: &AppError) -> Redirect {
    Redirect::to(&format!(
        "{}/payments/status?payment_id={}&error={}",
        frontend_url, payment_id, error.code()
    ))
}

/// GET /api/v1/billing/payment/success?payment_id=
///
/// The payer's browser lands here after a successful gateway checkout.
/// Completes the payment (a no-op if the webhook already did) and
/// redirects to the frontend status page. Failures redirect with an
/// error code rather than surfacing a raw error body.
async fn payment_success(
    State(state): State<AppState>,
    Query(query): Query<PaymentCallbackQuery>,
) -> Redirect {
    match completion::complete_payment(&state.pool, query.payment_id, None, None).await {
        Ok(outcome) => {
            let status = if outcome.already_processed {
                "already_processed"
            } else {
                "completed"
            };
            status_redirect(&state.config.frontend_url, query.payment_id, status)
        }
        Err(e) => {
            tracing::error!(
                payment_id = %query.payment_id,
                error = %e,
                "payment completion via success redirect failed"
            );
            error_redirect(&state.config.frontend_url, query.payment_id, &e)
        }
    }
}

/// GET /api/v1/billing/payment/cancel?payment_id=
///
/// The payer abandoned the gateway checkout. Cancels the payment while
/// it is still pending and redirects to the frontend status page.
async fn payment_cancel(
    State(state): State<AppState>,
    Query(query): Query<PaymentCallbackQuery>,
) -> Redirect {
    match completion::cancel_payment(&state.pool, query.payment_id).await {
        Ok(_) => status_redirect(&state.config.frontend_url, query.payment_id, "cancelled"),
        Err(e) => {
            tracing::warn!(
                payment_id = %query.payment_id,
                error = %e,
                "payment cancel redirect could not cancel"
            );
            error_redirect(&state.config.frontend_url, query.payment_id, &e)
        }
    }
}

/// Response for the administrative cancel endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPaymentResponse {
    pub success: bool,
    pub payment_id: Uuid,
    pub status: PaymentStatus,
}

/// POST /api/v1/billing/payment/{payment_id}/cancel
///
/// Administrative cancel. Only pending payments can be cancelled;
/// completed payments are rejected with a conflict.
async fn cancel_payment_handler(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<CancelPaymentResponse>, AppError> {
    let payment = completion::cancel_payment(&state.pool, payment_id).await?;
    Ok(Json(CancelPaymentResponse {
        success: true,
        payment_id: payment.id,
        status: payment.status,
    }))
}

/// Optional request body for the mock completion endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockCompleteRequest {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
}

/// Response for the mock completion endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePaymentResponse {
    pub success: bool,
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub already_processed: bool,
}

/// POST /api/v1/billing/payment/mock/{payment_id}/complete
///
/// Test-only completion trigger: the offline-mode counterpart of the
/// gateway webhook, exercising the exact same completion engine.
async fn complete_mock_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    body: Option<Json<MockCompleteRequest>>,
) -> Result<Json<CompletePaymentResponse>, AppError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let method = request.method.as_deref().or(Some("mock"));

    let outcome = completion::complete_payment(
        &state.pool,
        payment_id,
        method,
        request.reference_number.as_deref(),
    )
    .await?;

    Ok(Json(CompletePaymentResponse {
        success: true,
        payment_id: outcome.payment.id,
        status: outcome.payment.status,
        already_processed: outcome.already_processed,
    }))
}
