use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cinebook_booking::{BookingError, SeatConflict};
use serde_json::json;

pub const SEAT_UNAVAILABLE: &str = "Seat unavailable, please choose another";
pub const CHECKOUT_EXPIRED: &str = "Checkout session expired, please retry";

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError { code: &'static str, message: String, seats: Vec<SeatConflict> },
    GoneError { code: &'static str, message: String },
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        AppError::ConflictError { code, message: message.into(), seats: Vec::new() }
    }

    pub fn gone(code: &'static str, message: impl Into<String>) -> Self {
        AppError::GoneError { code, message: message.into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, seats) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, Vec::new()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation", msg, Vec::new()),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, "notFound", msg, Vec::new()),
            AppError::ConflictError { code, message, seats } => (StatusCode::CONFLICT, code, message, seats),
            AppError::GoneError { code, message } => (StatusCode::GONE, code, message, Vec::new()),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal Server Error".to_string(), Vec::new())
            }
            AppError::Anyhow(err) => match err.downcast::<BookingError>() {
                Ok(booking) => return booking_response(booking),
                Err(err) => {
                    tracing::error!("Internal Server Error: {:#}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal Server Error".to_string(), Vec::new())
                }
            },
        };

        let mut body = json!({
            "error": code,
            "message": message,
        });
        if !seats.is_empty() {
            body["seats"] = json!(seats);
        }

        (status, Json(body)).into_response()
    }
}

fn booking_response(err: BookingError) -> Response {
    let app_error = match err {
        BookingError::Validation(msg) => AppError::ValidationError(msg),
        BookingError::NotFound(msg) => AppError::NotFoundError(format!("{} not found", msg)),
        BookingError::Closed(msg) => AppError::gone("closed", msg),
        BookingError::Ledger(err) if err.is_retryable() => {
            tracing::warn!("Retryable ledger failure: {}", err);
            let body = Json(json!({
                "error": "unavailable",
                "message": "Temporarily unavailable, please retry",
            }));
            return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
        }
        BookingError::Ledger(err) => AppError::InternalServerError(err.to_string()),
    };
    app_error.into_response()
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
