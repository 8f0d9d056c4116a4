//! # Balance Calculator
//!
//! Derives the expected drawer balance and the reporting breakdowns of a
//! session from its ledger.
//!
//! ## Expected Physical Cash
//! ```text
//! expected_physical_cash = initial_amount
//!                        + Σ inflow.amount     where method is Cash
//!                        − Σ |outflow.amount|  where method is Cash
//!                                              OR kind is ManualExpense
//! ```
//!
//! ## Invariant: expenses always debit cash
//! A ManualExpense is paid out of the drawer in bills, whatever method the
//! cashier selected on the form. It is therefore counted as a cash outflow
//! even when recorded as DebitCard or BankTransfer, and it does NOT show up
//! in the non-physical method totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::{MethodTotal, MovementLedger};
use crate::money::Money;
use crate::payment::PaymentMethod;
use crate::types::{CashSession, Movement, MovementKind};

/// Revenue and cost lines of a session, by what the money was for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConceptBreakdown {
    /// Inspection fees (all methods).
    pub inspection_revenue: Money,
    /// SOAT sale commissions (all methods).
    pub soat_commission_revenue: Money,
    /// Manual expenses, as a positive magnitude.
    pub expenses: Money,
    /// Refunds, as a positive magnitude.
    pub refunds: Money,
    /// Net of all adjustments (signed).
    pub adjustments: Money,
}

/// Derived view of a session's money. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashSessionSummary {
    pub session_id: String,
    pub initial_amount: Money,
    /// Σ of every positive movement.
    pub total_inflows: Money,
    /// Σ |every negative movement|.
    pub total_outflows: Money,
    /// Inflows that landed in the drawer.
    pub cash_inflows: Money,
    /// Outflows that left the drawer (includes every ManualExpense).
    pub cash_outflows: Money,
    pub expected_physical_cash: Money,
    /// Totals for methods settled outside the drawer.
    pub non_physical: Vec<MethodTotal>,
    /// Totals for every method that has movements.
    pub by_method: Vec<MethodTotal>,
    pub by_concept: ConceptBreakdown,
    pub movement_count: i64,
    #[ts(as = "Option<String>")]
    pub last_movement_at: Option<DateTime<Utc>>,
}

/// Expected drawer balance for `initial_amount` plus `movements`.
pub fn expected_physical_cash(initial_amount: Money, movements: &[Movement]) -> Money {
    let (cash_in, cash_out) = cash_flows(movements);
    initial_amount + cash_in - cash_out
}

fn cash_flows(movements: &[Movement]) -> (Money, Money) {
    movements
        .iter()
        .filter(|m| m.affects_physical_cash())
        .fold((Money::zero(), Money::zero()), |(cash_in, cash_out), m| {
            if m.is_inflow() {
                (cash_in + m.amount, cash_out)
            } else {
                (cash_in, cash_out + m.amount.abs())
            }
        })
}

/// Summarizes a session.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use inspecta_core::*;
///
/// let session = CashSession::open("op-1", Money::from_units(50_000), Shift::Morning, Utc::now()).unwrap();
/// let mut ledger = MovementLedger::new(session.id.clone());
/// ledger.append(&session, MovementInput::new(
///     MovementKind::VehicleCharge, Money::from_units(85_000), PaymentMethod::Cash, "RTM"),
///     "op-1", Utc::now()).unwrap();
///
/// let summary = balance::summarize(&session, &ledger);
/// assert_eq!(summary.expected_physical_cash.units(), 135_000);
/// ```
pub fn summarize(session: &CashSession, ledger: &MovementLedger) -> CashSessionSummary {
    let movements = ledger.list();
    let (cash_inflows, cash_outflows) = cash_flows(movements);

    let total_inflows: Money = movements.iter().filter(|m| m.is_inflow()).map(|m| m.amount).sum();
    let total_outflows: Money = movements
        .iter()
        .filter(|m| m.is_outflow())
        .map(|m| m.amount.abs())
        .sum();

    let by_method = ledger.totals_by_method();

    // Expenses are cash by definition, keep them out of processor totals.
    let non_physical = PaymentMethod::ALL
        .into_iter()
        .filter(|m| !m.affects_physical_cash())
        .filter_map(|method| {
            let rows: Vec<&Movement> = movements
                .iter()
                .filter(|m| m.payment_method == method && !m.kind.always_physical())
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
        .collect();

    let mut by_concept = ConceptBreakdown::default();
    for m in movements {
        match m.kind {
            MovementKind::VehicleCharge => by_concept.inspection_revenue += m.amount,
            MovementKind::SoatSaleCommission => by_concept.soat_commission_revenue += m.amount,
            MovementKind::ManualExpense => by_concept.expenses += m.amount.abs(),
            MovementKind::Refund => by_concept.refunds += m.amount.abs(),
            MovementKind::Adjustment => by_concept.adjustments += m.amount,
        }
    }

    CashSessionSummary {
        session_id: session.id.clone(),
        initial_amount: session.initial_amount,
        total_inflows,
        total_outflows,
        cash_inflows,
        cash_outflows,
        expected_physical_cash: session.initial_amount + cash_inflows - cash_outflows,
        non_physical,
        by_method,
        by_concept,
        movement_count: movements.len() as i64,
        last_movement_at: movements.iter().map(|m| m.created_at).max(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MovementInput, Shift};

    fn setup(initial: i64) -> (CashSession, MovementLedger) {
        let session =
            CashSession::open("op-1", Money::from_units(initial), Shift::Morning, Utc::now()).unwrap();
        let ledger = MovementLedger::new(session.id.clone());
        (session, ledger)
    }

    fn record(
        session: &CashSession,
        ledger: &mut MovementLedger,
        kind: MovementKind,
        amount: i64,
        method: PaymentMethod,
    ) {
        ledger
            .append(
                session,
                MovementInput::new(kind, Money::from_units(amount), method, "concepto"),
                "op-1",
                Utc::now(),
            )
            .unwrap();
    }

    #[test]
    fn test_empty_session_expects_initial() {
        let (session, ledger) = setup(50_000);
        let summary = summarize(&session, &ledger);
        assert_eq!(summary.expected_physical_cash, Money::from_units(50_000));
        assert_eq!(summary.movement_count, 0);
        assert!(summary.last_movement_at.is_none());
    }

    #[test]
    fn test_charge_then_expense() {
        let (session, mut ledger) = setup(50_000);
        record(&session, &mut ledger, MovementKind::VehicleCharge, 85_000, PaymentMethod::Cash);
        assert_eq!(
            summarize(&session, &ledger).expected_physical_cash,
            Money::from_units(135_000)
        );

        record(&session, &mut ledger, MovementKind::ManualExpense, -20_000, PaymentMethod::BankTransfer);
        let summary = summarize(&session, &ledger);
        assert_eq!(summary.expected_physical_cash, Money::from_units(115_000));
        assert_eq!(summary.cash_outflows, Money::from_units(20_000));
        // the expense does not pollute transfer totals
        assert!(summary.non_physical.is_empty());
    }

    #[test]
    fn test_non_physical_methods_excluded_from_drawer() {
        let (session, mut ledger) = setup(0);
        record(&session, &mut ledger, MovementKind::VehicleCharge, 85_000, PaymentMethod::DebitCard);
        record(&session, &mut ledger, MovementKind::VehicleCharge, 85_000, PaymentMethod::CreditLineA);
        record(&session, &mut ledger, MovementKind::Refund, -85_000, PaymentMethod::DebitCard);
        record(&session, &mut ledger, MovementKind::VehicleCharge, 60_000, PaymentMethod::Cash);

        let summary = summarize(&session, &ledger);
        assert_eq!(summary.expected_physical_cash, Money::from_units(60_000));
        assert_eq!(summary.total_inflows, Money::from_units(230_000));
        assert_eq!(summary.total_outflows, Money::from_units(85_000));
        assert_eq!(summary.non_physical.len(), 2);
        assert_eq!(summary.non_physical[0].method, PaymentMethod::DebitCard);
        assert_eq!(summary.non_physical[0].net, Money::zero());
        assert_eq!(summary.non_physical[1].method, PaymentMethod::CreditLineA);
    }

    #[test]
    fn test_concept_breakdown() {
        let (session, mut ledger) = setup(10_000);
        record(&session, &mut ledger, MovementKind::VehicleCharge, 85_000, PaymentMethod::Cash);
        record(&session, &mut ledger, MovementKind::SoatSaleCommission, 18_000, PaymentMethod::Cash);
        record(&session, &mut ledger, MovementKind::ManualExpense, -7_000, PaymentMethod::Cash);
        record(&session, &mut ledger, MovementKind::Adjustment, -1_000, PaymentMethod::Cash);
        record(&session, &mut ledger, MovementKind::Adjustment, 3_000, PaymentMethod::Cash);

        let summary = summarize(&session, &ledger);
        assert_eq!(summary.by_concept.inspection_revenue, Money::from_units(85_000));
        assert_eq!(summary.by_concept.soat_commission_revenue, Money::from_units(18_000));
        assert_eq!(summary.by_concept.expenses, Money::from_units(7_000));
        assert_eq!(summary.by_concept.adjustments, Money::from_units(2_000));
        assert_eq!(summary.expected_physical_cash, Money::from_units(108_000));
    }

    #[test]
    fn test_formula_holds_for_mixed_sequence() {
        let (session, mut ledger) = setup(25_000);
        let plan = [
            (MovementKind::VehicleCharge, 85_000, PaymentMethod::Cash),
            (MovementKind::VehicleCharge, 85_000, PaymentMethod::CreditCard),
            (MovementKind::ManualExpense, -4_500, PaymentMethod::CreditCard),
            (MovementKind::Refund, -85_000, PaymentMethod::CreditCard),
            (MovementKind::Refund, -20_000, PaymentMethod::Cash),
            (MovementKind::Adjustment, 50, PaymentMethod::Cash),
            (MovementKind::SoatSaleCommission, 9_950, PaymentMethod::BankTransfer),
        ];
        for (kind, amount, method) in plan {
            record(&session, &mut ledger, kind, amount, method);
        }

        let cash_in: i64 = 85_000 + 50;
        let cash_out: i64 = 4_500 + 20_000;
        let summary = summarize(&session, &ledger);
        assert_eq!(summary.expected_physical_cash.units(), 25_000 + cash_in - cash_out);
        assert_eq!(
            summary.expected_physical_cash,
            expected_physical_cash(session.initial_amount, ledger.list())
        );
    }

    #[test]
    fn test_summary_is_idempotent() {
        let (session, mut ledger) = setup(50_000);
        record(&session, &mut ledger, MovementKind::VehicleCharge, 85_000, PaymentMethod::Cash);
        assert_eq!(summarize(&session, &ledger), summarize(&session, &ledger));
    }
}
