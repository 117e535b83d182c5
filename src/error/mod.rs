//! Domain error taxonomy for the reservation engine
//!
//! Every coordinator operation returns one of these kinds; infrastructure
//! failures are kept distinct from domain preconditions so callers can tell
//! "you may not" from "try again".

use thiserror::Error;

/// Errors returned by the reservation coordinator and its collaborators
#[derive(Error, Debug)]
pub enum DomainError {
    /// Referenced component or request id does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Requested quantity is not a positive integer
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Stock check failed, either at creation or authoritatively at commit time
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },

    /// The request is not in the state the transition requires
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Return requested twice for the same request
    #[error("request has already been returned")]
    AlreadyReturned,

    /// Input payload failed validation
    #[error("validation error: {0}")]
    Validation(String),

    /// The transactional write lost a race; retry the whole operation once
    #[error("storage conflict, operation lost a concurrent race")]
    StorageConflict,

    /// Opaque infrastructure failure; the outcome is unknown, do not assume
    /// the operation committed
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl DomainError {
    /// Stable machine-readable code for each error kind
    pub fn error_code(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::InvalidQuantity(_) => "INVALID_QUANTITY",
            DomainError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            DomainError::InvalidState(_) => "INVALID_STATE",
            DomainError::AlreadyReturned => "ALREADY_RETURNED",
            DomainError::Validation(_) => "VALIDATION_ERROR",
            DomainError::StorageConflict => "STORAGE_CONFLICT",
            DomainError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }

    /// Whether a caller may retry the whole operation after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::StorageConflict)
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DomainError::NotFound("row".to_string()),
            // 40001 serialization_failure, 40P01 deadlock_detected
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("40001") | Some("40P01") => DomainError::StorageConflict,
                _ => DomainError::StorageUnavailable(err.to_string()),
            },
            _ => DomainError::StorageUnavailable(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(err: validator::ValidationErrors) -> Self {
        DomainError::Validation(err.to_string())
    }
}

/// Result type alias using DomainError
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            DomainError::NotFound("component x".to_string()).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            DomainError::InsufficientStock {
                available: 3,
                requested: 5
            }
            .error_code(),
            "INSUFFICIENT_STOCK"
        );
        assert_eq!(DomainError::AlreadyReturned.error_code(), "ALREADY_RETURNED");
        assert_eq!(DomainError::StorageConflict.error_code(), "STORAGE_CONFLICT");
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = DomainError::InsufficientStock {
            available: 3,
            requested: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("3 available"));
        assert!(msg.contains("5 requested"));
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(DomainError::StorageConflict.is_retryable());
        assert!(!DomainError::AlreadyReturned.is_retryable());
        assert!(!DomainError::StorageUnavailable("connection reset".to_string()).is_retryable());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DomainError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
