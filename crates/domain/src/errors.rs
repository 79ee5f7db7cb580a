//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Tempora
///
/// Business-rule violations (`Immutable`, `NotBillable`, `AlreadyInvoiced`,
/// `EmptySet`, `DuplicateEpic`) are surfaced to the caller verbatim and must
/// never be retried. `Conflict` means a concurrent writer won; re-read and
/// retry. `Timeout` and `PartialFailure` are transient.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TemporaError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Entry is invoiced and immutable: {0}")]
    Immutable(String),

    #[error("Entry is not billable: {0}")]
    NotBillable(String),

    #[error("Entry is already invoiced: {0}")]
    AlreadyInvoiced(String),

    #[error("Empty entry set: {0}")]
    EmptySet(String),

    #[error("Duplicate epic: {0}")]
    DuplicateEpic(String),

    #[error("Version conflict: {0}")]
    Conflict(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Partial failure: {0}")]
    PartialFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TemporaError {
    /// Whether the failed operation is safe to retry as-is
    ///
    /// `Conflict` additionally requires the caller to re-read the entity
    /// before retrying, since the stored version has moved.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::Timeout(_) | Self::PartialFailure(_) | Self::Network(_)
        )
    }
}

/// Result type alias for Tempora operations
pub type Result<T> = std::result::Result<T, TemporaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization_tags_variant() {
        let err = TemporaError::Conflict("version 3 expected, found 5".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "Conflict");
        assert_eq!(json["message"], "version 3 expected, found 5");
    }

    #[test]
    fn test_error_round_trip() {
        let err = TemporaError::AlreadyInvoiced("entry abc".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let back: TemporaError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TemporaError::Conflict("v".into()).is_retryable());
        assert!(TemporaError::Timeout("slow tracker".into()).is_retryable());
        assert!(TemporaError::PartialFailure("2 of 5".into()).is_retryable());
        assert!(TemporaError::Network("connection reset".into()).is_retryable());

        assert!(!TemporaError::InvalidInput("bad date".into()).is_retryable());
        assert!(!TemporaError::Immutable("invoiced".into()).is_retryable());
        assert!(!TemporaError::NotBillable("entry".into()).is_retryable());
        assert!(!TemporaError::AlreadyInvoiced("entry".into()).is_retryable());
        assert!(!TemporaError::EmptySet("no entries".into()).is_retryable());
        assert!(!TemporaError::DuplicateEpic("PROJ-1".into()).is_retryable());
        assert!(!TemporaError::NotFound("entry".into()).is_retryable());
    }

    #[test]
    fn test_display_messages() {
        let err = TemporaError::NotBillable("entry 42".to_string());
        assert_eq!(err.to_string(), "Entry is not billable: entry 42");

        let err = TemporaError::DuplicateEpic("PROJ-100".to_string());
        assert_eq!(err.to_string(), "Duplicate epic: PROJ-100");
    }
}
