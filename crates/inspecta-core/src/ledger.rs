//! # Movement Ledger
//!
//! Append-only list of movements for one cash session.
//!
//! ```text
//!   MovementInput ──► prepare() ──► Movement (id, created_at, created_by)
//!                      │
//!                      ├── session not Active?   → SessionClosed
//!                      ├── amount == 0 / sign?   → ValidationError
//!                      └── concept empty?        → ValidationError
//! ```
//!
//! The durable store lives in `inspecta-db`; this type is the in-memory view
//! it is loaded into for aggregation. Order is insertion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::payment::PaymentMethod;
use crate::types::{CashSession, Movement, MovementInput, MovementKind, SessionStatus};
use crate::validation::{validate_concept, validate_movement_amount};

/// Inflow/outflow totals for one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodTotal {
    pub method: PaymentMethod,
    pub inflows: Money,
    pub outflows: Money,
    /// inflows − |outflows|
    pub net: Money,
    pub count: i64,
}

/// Totals for one movement kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct KindTotal {
    pub kind: MovementKind,
    /// Signed sum of the movements of this kind.
    pub total: Money,
    pub count: i64,
}

/// Movements of one session, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MovementLedger {
    session_id: String,
    entries: Vec<Movement>,
}

impl MovementLedger {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            entries: Vec::new(),
        }
    }

    /// Wraps movements loaded from storage. Entries belonging to another
    /// session are dropped.
    pub fn from_entries(session_id: impl Into<String>, mut entries: Vec<Movement>) -> Self {
        let session_id = session_id.into();
        entries.retain(|m| m.session_id == session_id);
        Self {
            session_id,
            entries,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Validates `input` against `session` and builds the movement to store.
    ///
    /// Pure: nothing is appended. The db layer persists the returned value.
    pub fn prepare(
        session: &CashSession,
        input: MovementInput,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Movement> {
        if session.status != SessionStatus::Active {
            return Err(CoreError::SessionClosed {
                session_id: session.id.clone(),
            });
        }

        validate_movement_amount(input.kind, input.amount)?;
        validate_concept(&input.concept)?;

        Ok(Movement {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            kind: input.kind,
            amount: input.amount,
            payment_method: input.payment_method,
            concept: input.concept.trim().to_string(),
            vehicle_ref: input
                .vehicle_ref
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            created_at: now,
            created_by: created_by.to_string(),
        })
    }

    /// Prepares and appends in one step.
    pub fn append(
        &mut self,
        session: &CashSession,
        input: MovementInput,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<&Movement> {
        if session.id != self.session_id {
            return Err(CoreError::SessionNotFound(session.id.clone()));
        }
        let movement = Self::prepare(session, input, created_by, now)?;
        self.entries.push(movement);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// All movements, insertion order.
    pub fn list(&self) -> &[Movement] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Per-method totals, one entry per method that has movements, in
    /// [`PaymentMethod::ALL`] order.
    pub fn totals_by_method(&self) -> Vec<MethodTotal> {
        PaymentMethod::ALL
            .into_iter()
            .filter_map(|method| {
                let rows: Vec<&Movement> = self
                    .entries
                    .iter()
                    .filter(|m| m.payment_method == method)
                    .collect();
                if rows.is_empty() {
                    return None;
                }
                let inflows: Money = rows.iter().filter(|m| m.is_inflow()).map(|m| m.amount).sum();
                let outflows: Money = rows.iter().filter(|m| m.is_outflow()).map(|m| m.amount).sum();
                Some(MethodTotal {
                    method,
                    inflows,
                    outflows,
                    net: inflows + outflows,
                    count: rows.len() as i64,
                })
            })
            .collect()
    }

    /// Per-kind signed totals, one entry per kind that has movements.
    pub fn totals_by_kind(&self) -> Vec<KindTotal> {
        MovementKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let (total, count) = self
                    .entries
                    .iter()
                    .filter(|m| m.kind == kind)
                    .fold((Money::zero(), 0i64), |(sum, n), m| (sum + m.amount, n + 1));
                (count > 0).then_some(KindTotal { kind, total, count })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Shift;

    fn active_session() -> CashSession {
        CashSession::open("op-1", Money::from_units(50_000), Shift::Morning, Utc::now()).unwrap()
    }

    fn input(kind: MovementKind, amount: i64, method: PaymentMethod) -> MovementInput {
        MovementInput::new(kind, Money::from_units(amount), method, "concepto")
    }

    #[test]
    fn test_append_keeps_insertion_order() {
        let session = active_session();
        let mut ledger = MovementLedger::new(session.id.clone());
        let now = Utc::now();

        ledger
            .append(&session, input(MovementKind::VehicleCharge, 85_000, PaymentMethod::Cash), "op-1", now)
            .unwrap();
        ledger
            .append(&session, input(MovementKind::ManualExpense, -20_000, PaymentMethod::Cash), "op-1", now)
            .unwrap();
        ledger
            .append(&session, input(MovementKind::SoatSaleCommission, 12_000, PaymentMethod::DebitCard), "op-1", now)
            .unwrap();

        let kinds: Vec<_> = ledger.list().iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MovementKind::VehicleCharge,
                MovementKind::ManualExpense,
                MovementKind::SoatSaleCommission
            ]
        );
        // re-reading is safe and identical
        assert_eq!(ledger.list(), ledger.list());
    }

    #[test]
    fn test_prepare_rejects_closed_session() {
        let mut session = active_session();
        session.status = SessionStatus::Closed;
        let err = MovementLedger::prepare(
            &session,
            input(MovementKind::VehicleCharge, 85_000, PaymentMethod::Cash),
            "op-1",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::SessionClosed { .. }));
    }

    #[test]
    fn test_prepare_rejects_bad_input() {
        let session = active_session();
        let zero = MovementLedger::prepare(
            &session,
            input(MovementKind::Adjustment, 0, PaymentMethod::Cash),
            "op-1",
            Utc::now(),
        );
        assert!(matches!(zero, Err(CoreError::Validation(_))));

        let blank = MovementLedger::prepare(
            &session,
            MovementInput::new(MovementKind::VehicleCharge, Money::from_units(1), PaymentMethod::Cash, "  "),
            "op-1",
            Utc::now(),
        );
        assert!(matches!(blank, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_totals_by_method_and_kind() {
        let session = active_session();
        let mut ledger = MovementLedger::new(session.id.clone());
        let now = Utc::now();
        for (kind, amount, method) in [
            (MovementKind::VehicleCharge, 85_000, PaymentMethod::Cash),
            (MovementKind::VehicleCharge, 85_000, PaymentMethod::CreditCard),
            (MovementKind::Refund, -10_000, PaymentMethod::Cash),
            (MovementKind::SoatSaleCommission, 15_000, PaymentMethod::Cash),
        ] {
            ledger.append(&session, input(kind, amount, method), "op-1", now).unwrap();
        }

        let by_method = ledger.totals_by_method();
        assert_eq!(by_method.len(), 2);
        assert_eq!(by_method[0].method, PaymentMethod::Cash);
        assert_eq!(by_method[0].inflows, Money::from_units(100_000));
        assert_eq!(by_method[0].outflows, Money::from_units(-10_000));
        assert_eq!(by_method[0].net, Money::from_units(90_000));
        assert_eq!(by_method[0].count, 3);
        assert_eq!(by_method[1].method, PaymentMethod::CreditCard);

        let by_kind = ledger.totals_by_kind();
        assert_eq!(by_kind.len(), 3);
        assert_eq!(by_kind[0].kind, MovementKind::VehicleCharge);
        assert_eq!(by_kind[0].total, Money::from_units(170_000));
        assert_eq!(by_kind[0].count, 2);
    }

    #[test]
    fn test_from_entries_filters_foreign_session() {
        let session = active_session();
        let mut other = MovementLedger::new("other");
        let mut other_session = active_session();
        other_session.id = "other".to_string();
        other
            .append(&other_session, input(MovementKind::VehicleCharge, 1_000, PaymentMethod::Cash), "op-1", Utc::now())
            .unwrap();

        let ledger = MovementLedger::from_entries(session.id.clone(), other.list().to_vec());
        assert!(ledger.is_empty());
    }
}
