//! # Error Types
//!
//! Domain-specific error types for inspecta-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  inspecta-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  │     category(): Validation | State | Reconciliation | Conflict      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  inspecta-db errors (separate crate)                                   │
//! │  └── DbError          - Database failures (transient ones retryable)   │
//! │                                                                         │
//! │  inspecta-service errors                                               │
//! │  └── ServiceError     - What callers see, with a stable ErrorKind      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                          DbError ───┴─► ServiceError → Frontend        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (session id, field, amounts)
//! 3. A rejected close always says which rule blocked it

use serde::Serialize;
use thiserror::Error;

use crate::denomination::{CashSuggestion, DenominationShortage};
use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Cash session cannot be found.
    #[error("Cash session not found: {0}")]
    SessionNotFound(String),

    /// The session is Closed and sealed.
    ///
    /// ## When This Occurs
    /// - Recording a movement after the arqueo
    /// - Closing a session twice
    #[error("Cash session {session_id} is closed")]
    SessionClosed { session_id: String },

    /// The operator already owns an Active session.
    #[error("Operator {operator_id} already has an active cash session")]
    AlreadyOpen { operator_id: String },

    /// The arqueo difference exceeds the tolerance and no usable
    /// justification was supplied.
    ///
    /// ## User Workflow
    /// ```text
    /// Close (count = $90.000, expected = $115.000)
    ///      │
    ///      ▼
    /// difference = -$25.000, tolerance = $20.000
    ///      │
    ///      ▼
    /// JustificationRequired ──► session stays Active
    ///      │
    ///      ▼
    /// Cashier retries with notes ("faltante por cambio mal entregado")
    /// ```
    #[error(
        "Difference of {difference} exceeds the tolerance of {threshold}: \
         a justification of at least {min_length} characters is required"
    )]
    JustificationRequired {
        difference: Money,
        threshold: Money,
        min_length: usize,
    },

    /// A declared cash amount does not match the denomination tally.
    #[error("Declared amount {declared} does not match the denomination total {counted}")]
    DenominationTotalMismatch { declared: Money, counted: Money },

    /// The tally is empty although the drawer should hold cash.
    #[error("Expected {expected} in cash but the denomination count is empty")]
    EmptyCount { expected: Money },

    /// A cash treasury expense asks for bills or coins the vault doesn't hold.
    #[error("The vault cannot cover {requested} with the requested denominations ({} short)", shortages.len())]
    InsufficientDenominations {
        requested: Money,
        shortages: Vec<DenominationShortage>,
        suggestion: CashSuggestion,
    },

    /// A close notification cannot be found.
    #[error("Close notification not found: {0}")]
    NotificationNotFound(String),

    /// The cash of a closed session was already received into treasury.
    #[error("Cash from session {session_id} was already received into treasury")]
    HandoverAlreadyReceived { session_id: String },

    /// Optimistic version check failed (concurrent close).
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: String, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Broad class of a [`CoreError`], used by outer layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed input, the caller can correct and retry.
    Validation,
    /// Operation not allowed in the current lifecycle state.
    State,
    /// The arqueo or a cash tally blocked the operation.
    Reconciliation,
    /// Lost a race against a concurrent writer.
    Conflict,
}

impl CoreError {
    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Validation(_) => ErrorCategory::Validation,
            CoreError::SessionNotFound(_)
            | CoreError::SessionClosed { .. }
            | CoreError::AlreadyOpen { .. }
            | CoreError::NotificationNotFound(_)
            | CoreError::HandoverAlreadyReceived { .. } => ErrorCategory::State,
            CoreError::JustificationRequired { .. }
            | CoreError::DenominationTotalMismatch { .. }
            | CoreError::EmptyCount { .. }
            | CoreError::InsufficientDenominations { .. } => ErrorCategory::Reconciliation,
            CoreError::Conflict { .. } => ErrorCategory::Conflict,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant names the offending field so the caller can correct it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be greater than zero.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be less than zero.
    #[error("{field} must be negative")]
    MustBeNegative { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Arithmetic on the value would overflow.
    #[error("{field} is too large")]
    Overflow { field: String },

    /// Invalid format (e.g., invalid UUID, malformed message).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is well-formed but not allowed in this context.
    #[error("{field} is not allowed: {reason}")]
    NotAllowed { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
