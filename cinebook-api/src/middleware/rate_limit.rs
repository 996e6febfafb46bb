use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use cinebook_store::redis_repo::rate_limit_key;
use std::net::SocketAddr;

use crate::state::AppState;

/// Per-IP fixed window. Fails open when Redis is missing or erroring, and
/// when the peer address is unknown (in-process callers).
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(redis) = state.redis.as_ref() else {
        return next.run(req).await;
    };
    let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>().copied() else {
        return next.run(req).await;
    };

    let key = rate_limit_key(&addr.ip().to_string());
    let limit = &state.rate_limit;
    match redis.check_rate_limit(&key, limit.requests_per_window, limit.window_seconds).await {
        Ok(true) => next.run(req).await,
        Ok(false) => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response(),
        Err(err) => {
            tracing::warn!("Rate limiter unavailable, letting request through: {}", err);
            next.run(req).await
        }
    }
}
