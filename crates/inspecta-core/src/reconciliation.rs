//! # Reconciliation Engine (Arqueo)
//!
//! Compares the counted cash against the expected drawer balance.
//!
//! ```text
//!   difference = counted − expected
//!
//!        difference            classification
//!        ──────────            ──────────────
//!            0                 Balanced
//!           > 0                Surplus   (sobrante)
//!           < 0                Shortfall (faltante)
//!
//!   |difference| > threshold  ──►  justification of ≥ N chars or
//!                                  JustificationRequired (hard gate)
//! ```
//!
//! The boundary is inclusive on the lenient side: a difference exactly equal
//! to the threshold closes without notes.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// Default tolerance before a discrepancy must be explained.
pub const DEFAULT_JUSTIFICATION_THRESHOLD: Money = Money::from_units(20_000);

/// Default minimum justification length, in characters.
pub const DEFAULT_MIN_JUSTIFICATION_CHARS: usize = 10;

/// Outcome class of an arqueo.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Balanced,
    Surplus,
    Shortfall,
}

impl Classification {
    pub fn of(difference: Money) -> Self {
        if difference.is_zero() {
            Classification::Balanced
        } else if difference.is_positive() {
            Classification::Surplus
        } else {
            Classification::Shortfall
        }
    }
}

/// Immutable result stored with a closed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconciliationResult {
    pub expected_amount: Money,
    pub counted_amount: Money,
    pub difference: Money,
    pub classification: Classification,
    pub justification: Option<String>,
    pub justification_required: bool,
}

/// Tolerance settings for the arqueo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPolicy {
    /// Largest |difference| accepted without a justification.
    pub threshold: Money,
    /// Minimum justification length (trimmed, in characters).
    pub min_justification_chars: usize,
}

impl Default for ReconciliationPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_JUSTIFICATION_THRESHOLD,
            min_justification_chars: DEFAULT_MIN_JUSTIFICATION_CHARS,
        }
    }
}

/// Applies a [`ReconciliationPolicy`] to expected/counted pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine {
    policy: ReconciliationPolicy,
}

impl ReconciliationEngine {
    pub fn new(policy: ReconciliationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ReconciliationPolicy {
        &self.policy
    }

    /// Reconciles a count against the expected balance.
    ///
    /// ## Example
    /// ```rust
    /// use inspecta_core::reconciliation::{Classification, ReconciliationEngine};
    /// use inspecta_core::Money;
    ///
    /// let engine = ReconciliationEngine::default();
    /// let result = engine
    ///     .reconcile(Money::from_units(115_000), Money::from_units(115_000), None)
    ///     .unwrap();
    /// assert_eq!(result.classification, Classification::Balanced);
    ///
    /// // -25.000 is over the 20.000 tolerance: notes are mandatory
    /// assert!(engine
    ///     .reconcile(Money::from_units(115_000), Money::from_units(90_000), None)
    ///     .is_err());
    /// ```
    pub fn reconcile(
        &self,
        expected: Money,
        counted: Money,
        justification: Option<&str>,
    ) -> CoreResult<ReconciliationResult> {
        let difference = counted - expected;
        let justification = justification
            .map(str::trim)
            .filter(|j| !j.is_empty())
            .map(str::to_string);
        let justification_required = difference.abs() > self.policy.threshold;

        if justification_required {
            let long_enough = justification
                .as_deref()
                .is_some_and(|j| j.chars().count() >= self.policy.min_justification_chars);
            if !long_enough {
                return Err(CoreError::JustificationRequired {
                    difference,
                    threshold: self.policy.threshold,
                    min_length: self.policy.min_justification_chars,
                });
            }
        }

        Ok(ReconciliationResult {
            expected_amount: expected,
            counted_amount: counted,
            difference,
            classification: Classification::of(difference),
            justification,
            justification_required,
        })
    }
}
