use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use cinebook_booking::ConfirmOutcome;
use cinebook_core::PaymentId;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, CHECKOUT_EXPIRED};
use crate::state::AppState;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub provider_transaction_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments/{payment_id}/confirm", post(confirm_payment))
}

/// POST /v1/webhooks/payments/{id}/confirm
/// Capture confirmation from the payment provider.
async fn confirm_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payment_id): Path<PaymentId>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<Value>, AppError> {
    if !secret_matches(&headers, &state.webhook_secret) {
        return Err(AppError::AuthenticationError("Invalid webhook secret".to_string()));
    }

    let provider_transaction_id = req.provider_transaction_id.trim();
    if provider_transaction_id.is_empty() {
        return Err(AppError::ValidationError("providerTransactionId is required".to_string()));
    }

    tracing::info!("Received payment confirmation for payment {}", payment_id);
    match state.engine.settlement.confirm(payment_id, provider_transaction_id).await? {
        ConfirmOutcome::Confirmed(_) | ConfirmOutcome::AlreadyCompleted(_) => Ok(Json(json!({ "ok": true }))),
        ConfirmOutcome::Closed(status) => {
            Err(AppError::gone("paymentClosed", format!("{} (payment is {})", CHECKOUT_EXPIRED, status)))
        }
    }
}

/// An unset secret never authenticates, whatever the header says.
fn secret_matches(headers: &HeaderMap, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    match headers.get(WEBHOOK_SECRET_HEADER).and_then(|h| h.to_str().ok()) {
        Some(presented) => constant_time_eq::constant_time_eq(presented.as_bytes(), expected.as_bytes()),
        None => false,
    }
}
