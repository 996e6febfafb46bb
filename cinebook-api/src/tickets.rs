use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use cinebook_core::TicketId;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::middleware::UserClaims;
use crate::state::AppState;
use crate::views::TicketView;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tickets", get(list_tickets))
        .route("/v1/tickets/{ticket_id}/cancel", post(cancel_ticket))
}

async fn list_tickets(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<Value>, AppError> {
    let tickets: Vec<TicketView> = state
        .engine
        .settlement
        .list_tickets(&claims.user_id())
        .await?
        .into_iter()
        .map(TicketView::from)
        .collect();
    Ok(Json(json!({ "tickets": tickets })))
}

async fn cancel_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(ticket_id): Path<TicketId>,
) -> Result<Json<Value>, AppError> {
    state.engine.settlement.cancel_ticket(ticket_id, &claims.user_id()).await?;
    Ok(Json(json!({ "ok": true })))
}
