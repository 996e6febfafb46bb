use axum::{
    extract::{Path, Query, State},
    routing::post,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use cinebook_booking::LockOutcome;
use cinebook_core::{ScreeningId, SeatId, SeatKey};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, SEAT_UNAVAILABLE};
use crate::middleware::UserClaims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRequest {
    pub screening_id: ScreeningId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningScope {
    #[serde(default)]
    pub screening_id: Option<ScreeningId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockResponse {
    pub ok: bool,
    pub seat_id: SeatId,
    pub screening_id: ScreeningId,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/seats/{seat_id}/lock", post(acquire_lock).delete(release_lock))
        .route("/v1/seats/{seat_id}/lock/refresh", post(refresh_lock))
}

async fn acquire_lock(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(seat_id): Path<SeatId>,
    Json(req): Json<LockRequest>,
) -> Result<Json<LockResponse>, AppError> {
    let key = SeatKey::new(seat_id, req.screening_id);
    match state.engine.locks.acquire(key, &claims.user_id()).await? {
        LockOutcome::Acquired(lock) => Ok(Json(LockResponse {
            ok: true,
            seat_id: lock.seat_id,
            screening_id: lock.screening_id,
            locked_at: lock.locked_at,
            expires_at: state.engine.policy().lock_expires_at(&lock),
        })),
        LockOutcome::HeldByOther => Err(AppError::conflict("heldByOther", SEAT_UNAVAILABLE)),
        LockOutcome::AlreadyBooked => Err(AppError::conflict("alreadyBooked", SEAT_UNAVAILABLE)),
    }
}

async fn release_lock(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(seat_id): Path<SeatId>,
    Query(scope): Query<ScreeningScope>,
) -> Result<Json<Value>, AppError> {
    state.engine.locks.release(seat_id, scope.screening_id, &claims.user_id()).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn refresh_lock(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(seat_id): Path<SeatId>,
    body: Option<Json<ScreeningScope>>,
) -> Result<Json<Value>, AppError> {
    let scope = body.map(|Json(scope)| scope).unwrap_or_default();
    let refreshed = state.engine.locks.refresh(seat_id, scope.screening_id, &claims.user_id()).await?;
    Ok(Json(json!({ "ok": true, "refreshed": refreshed })))
}
