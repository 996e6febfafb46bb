/// Failures raised by a seat ledger backend.
///
/// Every variant means the surrounding transaction was abandoned and nothing
/// it wrote is visible.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
    #[error("Constraint violated: {0}")]
    Constraint(String),
    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),
    #[error("Ledger backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Whether the caller may simply try the whole operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_) | LedgerError::Constraint(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
