//! # Validation Module
//!
//! Input validation for till and treasury operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Collaborator contracts (serde)                               │
//! │  ├── Tagged messages, unknown fields rejected                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: field rules                                     │
//! │  ├── concept present, amounts signed per movement kind                 │
//! │  └── denomination counts non-negative                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (amount <> 0), NOT NULL                                     │
//! │  └── one active session per operator (partial unique index)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{AmountSign, MovementKind};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of free-text concepts and notes.
pub const MAX_TEXT_LEN: usize = 500;

/// Minimum concept length for treasury movements.
pub const MIN_TREASURY_CONCEPT_LEN: usize = 5;

/// Upper bound for history queries.
pub const MAX_HISTORY_LIMIT: i64 = 200;

/// Largest magnitude any single amount may carry: one trillion pesos.
///
/// Keeps every ledger sum, difference and projection well inside `i64`.
pub const MAX_AMOUNT: Money = Money::from_units(1_000_000_000_000);

// =============================================================================
// String Validators
// =============================================================================

fn required_text(value: &str, field: &str, min: usize, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }

    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates the identity of the acting operator.
pub fn validate_operator_id(operator_id: &str) -> ValidationResult<()> {
    required_text(operator_id, "operator_id", 1, 64)
}

/// Validates a cash-session movement concept.
///
/// ## Example
/// ```rust
/// use inspecta_core::validation::validate_concept;
///
/// assert!(validate_concept("Revisión técnico-mecánica ABC123").is_ok());
/// assert!(validate_concept("   ").is_err());
/// ```
pub fn validate_concept(concept: &str) -> ValidationResult<()> {
    required_text(concept, "concept", 1, MAX_TEXT_LEN)
}

/// Validates a treasury movement concept (at least 5 characters).
pub fn validate_treasury_concept(concept: &str) -> ValidationResult<()> {
    required_text(concept, "concept", MIN_TREASURY_CONCEPT_LEN, MAX_TEXT_LEN)
}

/// Validates an optional voucher, invoice or check number.
pub fn validate_voucher_number(voucher: Option<&str>) -> ValidationResult<()> {
    match voucher {
        Some(v) if v.trim().chars().count() > 50 => Err(ValidationError::TooLong {
            field: "voucher_number".to_string(),
            max: 50,
        }),
        _ => Ok(()),
    }
}

/// Validates optional closing notes (length only; the justification rule
/// lives in the reconciliation engine).
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(n) if n.trim().chars().count() > MAX_TEXT_LEN => Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_TEXT_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates a notification e-mail address (shape only).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    required_text(email, "notification_email", 3, 200)?;

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "notification_email".to_string(),
            reason: "must look like name@domain.tld".to_string(),
        }),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

fn exceeds_max(amount: Money) -> bool {
    amount.units().unsigned_abs() > MAX_AMOUNT.units().unsigned_abs()
}

fn out_of_range(field: &str, min: i64) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min,
        max: MAX_AMOUNT.units(),
    }
}

/// Validates an amount that may be zero but not negative (opening float,
/// alert thresholds), capped at [`MAX_AMOUNT`].
pub fn validate_non_negative(amount: Money, field: &str) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if exceeds_max(amount) {
        return Err(out_of_range(field, 0));
    }
    Ok(())
}

/// Validates the float a till opens with.
///
/// ## Rules
/// - Zero is allowed (a till can open empty)
/// - Negative is not
/// - At most [`MAX_AMOUNT`]
pub fn validate_initial_amount(amount: Money) -> ValidationResult<()> {
    validate_non_negative(amount, "initial_amount")
}

/// Validates a movement amount against its kind.
///
/// ## Rules
/// ```text
/// amount == 0                              → MustBeNonZero
/// VehicleCharge, SoatSaleCommission  < 0   → MustBePositive
/// ManualExpense, Refund              > 0   → MustBeNegative
/// Adjustment                               → either sign
/// |amount| > MAX_AMOUNT                    → OutOfRange
/// ```
pub fn validate_movement_amount(kind: MovementKind, amount: Money) -> ValidationResult<()> {
    if amount.is_zero() {
        return Err(ValidationError::MustBeNonZero {
            field: "amount".to_string(),
        });
    }
    if exceeds_max(amount) {
        return Err(out_of_range("amount", -MAX_AMOUNT.units()));
    }

    match kind.required_sign() {
        AmountSign::Inflow if amount.is_negative() => Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        }),
        AmountSign::Outflow if amount.is_positive() => Err(ValidationError::MustBeNegative {
            field: "amount".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Validates a positive magnitude (treasury amounts), capped at
/// [`MAX_AMOUNT`].
pub fn validate_positive(amount: Money, field: &str) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    if exceeds_max(amount) {
        return Err(out_of_range(field, 1));
    }
    Ok(())
}

/// Validates a history page size.
pub fn validate_history_limit(limit: i64) -> ValidationResult<()> {
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_HISTORY_LIMIT,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use inspecta_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "session_id").is_ok());
/// assert!(validate_uuid("not-a-uuid", "session_id").is_err());
/// ```
pub fn validate_uuid(id: &str, field: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
