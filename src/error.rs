use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Validation error: {0}")]
    Validation(String),
    /// The stored order changed between read and write.
    #[error("Order {order} was modified concurrently (expected version {expected})")]
    VersionMismatch { order: u32, expected: u64 },
    #[error("Storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OrderError>;

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for OrderError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Storage(Box::new(e))
    }
}

impl OrderError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_state(what: impl Into<String>) -> Self {
        Self::InvalidState(what.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(Box::new(std::io::Error::other(message.into())))
    }

    /// Infrastructure failures may succeed when attempted again; business rule
    /// violations never do.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Io(_) | Self::VersionMismatch { .. }
        )
    }

    /// HTTP status an API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidState(_) | Self::Validation(_) => 400,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) | Self::VersionMismatch { .. } => 409,
            Self::Storage(_) => 503,
            Self::Csv(_) | Self::Io(_) => 500,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            message: self.to_string(),
        }
    }
}

/// Error object returned to API callers.
#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorBody {
    pub message: String,
}
