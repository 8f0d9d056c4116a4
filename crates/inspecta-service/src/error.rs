//! # Service Error Type
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError (rules) ──┐                                                  │
//! │                      ├──► ServiceError ──► kind() ──► ErrorResponse     │
//! │  DbError (storage) ──┘        │                        { kind,          │
//! │                               │                          message }      │
//! │  Forbidden / Config ──────────┘                                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage errors that carry domain meaning (a duplicate active session, a
//! close that lost its version check) are translated into the matching
//! [`CoreError`] at the call site, so consumers only branch on [`ErrorKind`].

use serde::Serialize;
use thiserror::Error;

use inspecta_core::{CoreError, ErrorCategory};
use inspecta_db::DbError;

/// Errors returned by every [`BackOffice`](crate::BackOffice) operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    /// The operator's role does not allow the action.
    #[error("Operator {operator_id} is not allowed to {action}")]
    Forbidden { operator_id: String, action: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Machine-readable class of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad input; fix the form and retry.
    Validation,
    /// The session or notification does not exist.
    NotFound,
    /// Not allowed in the current lifecycle state.
    State,
    /// The arqueo or a cash tally blocked the operation.
    Reconciliation,
    /// A concurrent writer won; reload and retry.
    Conflict,
    Forbidden,
    /// Storage temporarily unavailable; the same call may succeed later.
    Transient,
    Internal,
}

impl ServiceError {
    pub fn forbidden(operator_id: impl Into<String>, action: impl Into<String>) -> Self {
        ServiceError::Forbidden {
            operator_id: operator_id.into(),
            action: action.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Core(CoreError::SessionNotFound(_))
            | ServiceError::Core(CoreError::NotificationNotFound(_)) => ErrorKind::NotFound,
            ServiceError::Core(err) => match err.category() {
                ErrorCategory::Validation => ErrorKind::Validation,
                ErrorCategory::State => ErrorKind::State,
                ErrorCategory::Reconciliation => ErrorKind::Reconciliation,
                ErrorCategory::Conflict => ErrorKind::Conflict,
            },
            ServiceError::Db(err) if err.is_transient() => ErrorKind::Transient,
            ServiceError::Db(DbError::NotFound { .. }) => ErrorKind::NotFound,
            ServiceError::Db(DbError::Conflict { .. }) => ErrorKind::Conflict,
            ServiceError::Db(_) => ErrorKind::Internal,
            ServiceError::Forbidden { .. } => ErrorKind::Forbidden,
            ServiceError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Only transient storage failures are worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<toml::de::Error> for ServiceError {
    fn from(err: toml::de::Error) -> Self {
        ServiceError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Config(err.to_string())
    }
}

impl From<inspecta_core::ValidationError> for ServiceError {
    fn from(err: inspecta_core::ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// What a consumer receives when an operation fails.
///
/// ```json
/// { "kind": "RECONCILIATION", "message": "Difference of -$25.000 exceeds ..." }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        let message = match err {
            // Storage internals stay in the logs.
            ServiceError::Db(e) if !e.is_transient() && !matches!(e, DbError::NotFound { .. }) => {
                tracing::error!(error = %e, "Database operation failed");
                "Database operation failed".to_string()
            }
            other => other.to_string(),
        };
        ErrorResponse {
            kind: err.kind(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspecta_core::{Money, ValidationError};

    #[test]
    fn test_kinds() {
        let justification = ServiceError::from(CoreError::JustificationRequired {
            difference: Money::from_units(-25_000),
            threshold: Money::from_units(20_000),
            min_length: 10,
        });
        assert_eq!(justification.kind(), ErrorKind::Reconciliation);

        let closed = ServiceError::from(CoreError::SessionClosed {
            session_id: "s-1".into(),
        });
        assert_eq!(closed.kind(), ErrorKind::State);

        let invalid = ServiceError::from(ValidationError::Required {
            field: "concept".into(),
        });
        assert_eq!(invalid.kind(), ErrorKind::Validation);

        assert_eq!(
            ServiceError::from(CoreError::SessionNotFound("s-9".into())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ServiceError::forbidden("op-1", "view treasury").kind(),
            ErrorKind::Forbidden
        );
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ServiceError::from(DbError::PoolExhausted).is_retryable());
        assert!(!ServiceError::from(DbError::conflict("CashSession", "s-1")).is_retryable());
        assert!(!ServiceError::from(CoreError::Conflict {
            entity: "CashSession".into(),
            id: "s-1".into()
        })
        .is_retryable());
    }

    #[test]
    fn test_error_response_serialization() {
        let err = ServiceError::from(CoreError::AlreadyOpen {
            operator_id: "op-1".into(),
        });
        let json = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(json["kind"], "STATE");

        let db = ServiceError::from(DbError::QueryFailed("no such column: foo".into()));
        let json = serde_json::to_value(ErrorResponse::from(&db)).unwrap();
        assert_eq!(json["kind"], "INTERNAL");
        assert_eq!(json["message"], "Database operation failed");
    }
}
