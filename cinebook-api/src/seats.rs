use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Json, Router,
};
use cinebook_booking::{PriceQuote, SeatStatusView};
use cinebook_core::{ScreeningId, SeatId, SeatKey};
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::AppError;
use crate::middleware::UserClaims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusParams {
    pub screening_id: ScreeningId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatMapResponse {
    pub screening_id: ScreeningId,
    pub seats: Vec<SeatStatusView>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/seats/{seat_id}/status", get(seat_status))
        .route("/v1/seats/{seat_id}/price", get(seat_price))
        .route("/v1/screenings/{screening_id}/seats", get(seat_map))
        .route("/v1/screenings/{screening_id}/stream", get(seat_stream))
}

async fn seat_status(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(seat_id): Path<SeatId>,
    Query(query): Query<StatusParams>,
) -> Result<Json<SeatStatusView>, AppError> {
    let key = SeatKey::new(seat_id, query.screening_id);
    let view = state.engine.status.status(key, Some(&claims.user_id())).await?;
    Ok(Json(view))
}

async fn seat_price(
    State(state): State<AppState>,
    Path(seat_id): Path<SeatId>,
    Query(query): Query<StatusParams>,
) -> Result<Json<PriceQuote>, AppError> {
    let quote = state.engine.pricing.quote(SeatKey::new(seat_id, query.screening_id)).await?;
    Ok(Json(quote))
}

async fn seat_map(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(screening_id): Path<ScreeningId>,
) -> Result<Json<SeatMapResponse>, AppError> {
    let seats = state.engine.status.seat_map(screening_id, Some(&claims.user_id())).await?;
    Ok(Json(SeatMapResponse { screening_id, seats }))
}

/// Advisory push of seat changes for one screening. Lagged receivers just
/// skip ahead; clients re-read status when they need the truth.
async fn seat_stream(
    State(state): State<AppState>,
    Path(screening_id): Path<ScreeningId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.engine.subscribe()).filter_map(move |result| async move {
        match result {
            Ok(event) if event.screening_id == screening_id.get() => Event::default()
                .event(event.kind.event_name())
                .json_data(&event)
                .ok()
                .map(Ok),
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
