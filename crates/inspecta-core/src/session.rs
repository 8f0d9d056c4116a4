//! # Cash Session State Machine
//!
//! ```text
//!            open(operator, initial, shift)
//!                        │
//!                        ▼
//!                 ┌─────────────┐   record_movement (ledger append)
//!                 │   Active    │◄─────────────┐
//!                 └──────┬──────┘──────────────┘
//!                        │ close(count, notes?)
//!                        │   counted  = DenominationCounter::total(count)
//!                        │   expected = BalanceCalculator::summarize(..)
//!                        │   ReconciliationEngine::reconcile(..)
//!          ┌─────────────┼──────────────────────────┐
//!          │ Ok          │ JustificationRequired /  │
//!          ▼             │ DenominationTotalMismatch│
//!   ┌─────────────┐      └──► stays Active ─────────┘
//!   │   Closed    │  terminal: no movements, no second close
//!   └─────────────┘
//! ```
//!
//! "One Active session per operator" spans sessions, so it is checked with
//! [`ensure_can_open`] against whatever the store returns for the operator
//! (and enforced again by a unique index in the database).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::balance;
use crate::denomination::DenominationCount;
use crate::error::{CoreError, CoreResult};
use crate::ledger::MovementLedger;
use crate::money::Money;
use crate::reconciliation::{ReconciliationEngine, ReconciliationResult};
use crate::types::{CashSession, CloseNotification, NotificationStatus, SessionStatus, Shift};
use crate::validation::{validate_initial_amount, validate_notes, validate_operator_id};

/// Everything a cashier submits to close a till.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CloseRequest {
    /// Physical tally of the drawer.
    pub count: DenominationCount,
    /// Cash amount the cashier typed in, checked against the tally.
    #[serde(default)]
    pub declared_amount: Option<Money>,
    /// Closing notes; used as the justification when one is required.
    #[serde(default)]
    pub notes: Option<String>,
}

impl CloseRequest {
    pub fn new(count: DenominationCount) -> Self {
        Self {
            count,
            declared_amount: None,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_declared_amount(mut self, amount: Money) -> Self {
        self.declared_amount = Some(amount);
        self
    }
}

/// Fails with `AlreadyOpen` when `current` is an Active session.
pub fn ensure_can_open(operator_id: &str, current: Option<&CashSession>) -> CoreResult<()> {
    match current {
        Some(s) if s.status == SessionStatus::Active => Err(CoreError::AlreadyOpen {
            operator_id: operator_id.to_string(),
        }),
        _ => Ok(()),
    }
}

impl CashSession {
    /// Creates a new Active session.
    pub fn open(
        operator_id: &str,
        initial_amount: Money,
        shift: Shift,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        validate_operator_id(operator_id)?;
        validate_initial_amount(initial_amount)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            operator_id: operator_id.trim().to_string(),
            shift,
            status: SessionStatus::Active,
            opened_at: now,
            initial_amount,
            closed_at: None,
            expected_amount: None,
            counted_amount: None,
            difference: None,
            classification: None,
            closing_notes: None,
            closing_count: None,
            version: 0,
        })
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn ensure_active(&self) -> CoreResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CoreError::SessionClosed {
                session_id: self.id.clone(),
            })
        }
    }

    /// Runs the arqueo and seals the session.
    ///
    /// An all-zero tally is refused while the drawer should still hold cash;
    /// a till that expects nothing may close with an empty count.
    ///
    /// On any error `self` is left untouched (still Active), so the caller
    /// can fix the tally or add notes and retry.
    pub fn close(
        &mut self,
        ledger: &MovementLedger,
        request: &CloseRequest,
        engine: &ReconciliationEngine,
        now: DateTime<Utc>,
    ) -> CoreResult<ReconciliationResult> {
        self.ensure_active()?;
        if ledger.session_id() != self.id {
            return Err(CoreError::SessionNotFound(ledger.session_id().to_string()));
        }
        validate_notes(request.notes.as_deref())?;

        let counted = request.count.total()?;
        if let Some(declared) = request.declared_amount {
            if declared != counted {
                return Err(CoreError::DenominationTotalMismatch { declared, counted });
            }
        }

        let expected = balance::summarize(self, ledger).expected_physical_cash;
        if request.count.is_empty() && expected.is_positive() {
            return Err(CoreError::EmptyCount { expected });
        }
        let result = engine.reconcile(expected, counted, request.notes.as_deref())?;

        self.status = SessionStatus::Closed;
        self.closed_at = Some(now);
        self.expected_amount = Some(result.expected_amount);
        self.counted_amount = Some(result.counted_amount);
        self.difference = Some(result.difference);
        self.classification = Some(result.classification);
        self.closing_notes = result.justification.clone();
        self.closing_count = Some(request.count);
        self.version += 1;

        Ok(result)
    }

    /// Builds the treasury notification for a Closed session.
    pub fn close_notification(&self) -> CoreResult<CloseNotification> {
        match (
            self.status,
            self.closed_at,
            self.expected_amount,
            self.counted_amount,
            self.difference,
        ) {
            (SessionStatus::Closed, Some(closed_at), Some(expected), Some(counted), Some(diff)) => {
                Ok(CloseNotification {
                    id: Uuid::new_v4().to_string(),
                    session_id: self.id.clone(),
                    operator_id: self.operator_id.clone(),
                    shift: self.shift,
                    closed_at,
                    cash_to_deliver: counted,
                    expected_amount: expected,
                    counted_amount: counted,
                    difference: diff,
                    notes: self.closing_notes.clone(),
                    status: NotificationStatus::Pending,
                    created_at: closed_at,
                })
            }
            _ => Err(CoreError::SessionClosed {
                session_id: self.id.clone(),
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denomination::Denomination;
    use crate::payment::PaymentMethod;
    use crate::reconciliation::Classification;
    use crate::types::{MovementInput, MovementKind};

    fn scenario_b() -> (CashSession, MovementLedger) {
        let session =
            CashSession::open("op-1", Money::from_units(50_000), Shift::Morning, Utc::now()).unwrap();
        let mut ledger = MovementLedger::new(session.id.clone());
        ledger
            .append(
                &session,
                MovementInput::new(
                    MovementKind::VehicleCharge,
                    Money::from_units(85_000),
                    PaymentMethod::Cash,
                    "RTM ABC123",
                ),
                "op-1",
                Utc::now(),
            )
            .unwrap();
        ledger
            .append(
                &session,
                MovementInput::new(
                    MovementKind::ManualExpense,
                    Money::from_units(-20_000),
                    PaymentMethod::DebitCard,
                    "Papelería",
                ),
                "op-1",
                Utc::now(),
            )
            .unwrap();
        (session, ledger)
    }

    fn count_of(units: i64) -> DenominationCount {
        // only multiples of 5000 are used in these tests
        DenominationCount::new().with(Denomination::Bill5000, units / 5_000)
    }

    #[test]
    fn test_open_validates() {
        assert!(CashSession::open("", Money::zero(), Shift::Night, Utc::now()).is_err());
        assert!(CashSession::open("op", Money::from_units(-1), Shift::Night, Utc::now()).is_err());

        let s = CashSession::open("op", Money::zero(), Shift::Night, Utc::now()).unwrap();
        assert!(s.is_active());
        assert_eq!(s.version, 0);
    }

    #[test]
    fn test_ensure_can_open() {
        let s = CashSession::open("op-1", Money::zero(), Shift::Morning, Utc::now()).unwrap();
        assert!(ensure_can_open("op-1", None).is_ok());
        assert!(matches!(
            ensure_can_open("op-1", Some(&s)),
            Err(CoreError::AlreadyOpen { .. })
        ));
    }

    #[test]
    fn test_close_balanced() {
        let (mut session, ledger) = scenario_b();
        let engine = ReconciliationEngine::default();

        let result = session
            .close(&ledger, &CloseRequest::new(count_of(115_000)), &engine, Utc::now())
            .unwrap();

        assert_eq!(result.classification, Classification::Balanced);
        assert_eq!(result.difference, Money::zero());
        assert_eq!(session.status, SessionStatus::Closed);
        assert_eq!(session.counted_amount, Some(Money::from_units(115_000)));
        assert_eq!(session.version, 1);

        // sealed
        let again = session.close(&ledger, &CloseRequest::new(count_of(115_000)), &engine, Utc::now());
        assert!(matches!(again, Err(CoreError::SessionClosed { .. })));
    }

    #[test]
    fn test_close_requires_justification_then_succeeds() {
        let (mut session, ledger) = scenario_b();
        let engine = ReconciliationEngine::default();

        let err = session
            .close(&ledger, &CloseRequest::new(count_of(90_000)), &engine, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::JustificationRequired { .. }));
        assert!(session.is_active());
        assert_eq!(session.version, 0);

        let result = session
            .close(
                &ledger,
                &CloseRequest::new(count_of(90_000)).with_notes("Faltante por cambio mal dado"),
                &engine,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(result.difference, Money::from_units(-25_000));
        assert_eq!(result.classification, Classification::Shortfall);
        assert_eq!(
            session.closing_notes.as_deref(),
            Some("Faltante por cambio mal dado")
        );
    }

    #[test]
    fn test_close_declared_mismatch() {
        let (mut session, ledger) = scenario_b();
        let err = session
            .close(
                &ledger,
                &CloseRequest::new(count_of(115_000)).with_declared_amount(Money::from_units(120_000)),
                &ReconciliationEngine::default(),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::DenominationTotalMismatch { .. }));
        assert!(session.is_active());
    }

    #[test]
    fn test_close_rejects_negative_count() {
        let (mut session, ledger) = scenario_b();
        let bad = DenominationCount::new().with(Denomination::Coin100, -3);
        let err = session
            .close(&ledger, &CloseRequest::new(bad), &ReconciliationEngine::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(session.is_active());
    }

    #[test]
    fn test_close_rejects_empty_count_when_cash_expected() {
        let (mut session, ledger) = scenario_b();
        let err = session
            .close(
                &ledger,
                &CloseRequest::new(DenominationCount::new()).with_notes("Se entregó todo al supervisor"),
                &ReconciliationEngine::default(),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::EmptyCount { expected } if expected == Money::from_units(115_000)
        ));
        assert!(session.is_active());

        let mut empty_till = CashSession::open("op-2", Money::zero(), Shift::Night, Utc::now()).unwrap();
        let result = empty_till
            .close(
                &MovementLedger::new(empty_till.id.clone()),
                &CloseRequest::new(DenominationCount::new()),
                &ReconciliationEngine::default(),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(result.classification, Classification::Balanced);
    }

    #[test]
    fn test_close_notification() {
        let (mut session, ledger) = scenario_b();
        assert!(session.close_notification().is_err());

        session
            .close(&ledger, &CloseRequest::new(count_of(115_000)), &ReconciliationEngine::default(), Utc::now())
            .unwrap();
        let note = session.close_notification().unwrap();
        assert_eq!(note.session_id, session.id);
        assert_eq!(note.cash_to_deliver, Money::from_units(115_000));
        assert_eq!(note.status, NotificationStatus::Pending);
    }
}
