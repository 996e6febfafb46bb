use cinebook_core::LedgerError;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Closed: {0}")]
    Closed(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type BookingResult<T> = Result<T, BookingError>;
