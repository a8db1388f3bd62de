use thiserror::Error;

/// Typed failures surfaced by the storage core. Handlers map each variant
/// to an HTTP status; nothing here is retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("not enough stock left to fulfil this reservation")]
    InsufficientStock,

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("storage error: {0}")]
    Persistence(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Persistence(err.to_string())
    }
}
