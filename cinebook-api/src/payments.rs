use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use cinebook_booking::{CancelOutcome, PaymentSummary};
use cinebook_core::{PaymentId, PaymentStatus};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::middleware::UserClaims;
use crate::state::AppState;
use crate::views::TicketView;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub amount: i64,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub tickets: Vec<TicketView>,
}

impl From<PaymentSummary> for PaymentResponse {
    fn from(summary: PaymentSummary) -> Self {
        Self {
            payment_id: summary.payment.id,
            status: summary.payment.status,
            amount: summary.payment.amount,
            provider: summary.payment.provider,
            created_at: summary.payment.created_at,
            expires_at: summary.expires_at,
            tickets: summary.tickets.into_iter().map(TicketView::from).collect(),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments/{payment_id}", get(get_payment))
        .route("/v1/payments/{payment_id}/cancel", post(cancel_payment))
}

async fn get_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(payment_id): Path<PaymentId>,
) -> Result<Json<PaymentResponse>, AppError> {
    let summary = state.engine.settlement.summary(payment_id, &claims.user_id()).await?;
    Ok(Json(summary.into()))
}

async fn cancel_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(payment_id): Path<PaymentId>,
) -> Result<Json<Value>, AppError> {
    match state.engine.settlement.cancel(payment_id, &claims.user_id()).await? {
        CancelOutcome::Cancelled(_) | CancelOutcome::AlreadyClosed(_) => Ok(Json(json!({ "ok": true }))),
        CancelOutcome::Completed => Err(AppError::conflict("paymentCompleted", "Payment is already completed")),
    }
}
