use axum::{extract::State, routing::post, Extension, Json, Router};
use chrono::{DateTime, Utc};
use cinebook_booking::{CheckoutOutcome, ScreeningPicks};
use cinebook_core::PaymentId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, SEAT_UNAVAILABLE};
use crate::middleware::UserClaims;
use crate::state::AppState;
use crate::views::TicketView;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub screenings: Vec<ScreeningPicks>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub ok: bool,
    pub payment_id: PaymentId,
    pub amount: i64,
    pub expires_at: DateTime<Utc>,
    pub tickets: Vec<TicketView>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/checkout", post(checkout))
}

async fn checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    match state.engine.checkout.checkout(&claims.user_id(), &req.screenings).await? {
        CheckoutOutcome::Created(created) => Ok(Json(CheckoutResponse {
            ok: true,
            payment_id: created.payment.id,
            amount: created.payment.amount,
            expires_at: created.expires_at,
            tickets: created.tickets.into_iter().map(TicketView::from).collect(),
        })),
        CheckoutOutcome::Conflict(seats) => Err(AppError::ConflictError {
            code: "seatUnavailable",
            message: SEAT_UNAVAILABLE.to_string(),
            seats,
        }),
    }
}
