//! # Treasury Ledger (Tesorería)
//!
//! The consolidated, session-independent balance of the business: the vault
//! that receives the cash of closed tills and pays payroll, rent and
//! suppliers.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CashSession closed ──► CloseNotification (Pending)                    │
//! │                                │ receive_handover                      │
//! │                                ▼                                        │
//! │  TreasuryMovementInput ──► TreasuryLedger::prepare ──► TreasuryMovement│
//! │     category + |amount|        │  sign from category                   │
//! │                                │  cash tally == amount                 │
//! │                                │  expense tally ⊆ vault inventory      │
//! │                                ▼                                        │
//! │                      TreasuryLedger::balance                            │
//! │                        current_balance = Σ amount                       │
//! │                        below_threshold = current < alert_threshold      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Treasury movements, like till movements, are never edited or deleted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::denomination::{DenominationCount, DenominationInventory};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CashSession, CloseNotification, NotificationStatus};
use crate::validation::{
    validate_email, validate_non_negative, validate_positive, validate_treasury_concept,
    validate_voucher_number,
};

/// Default low-balance alert threshold.
pub const DEFAULT_ALERT_THRESHOLD: Money = Money::from_units(100_000);

// =============================================================================
// Taxonomy
// =============================================================================

/// Whether a category brings money in or takes it out.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TreasuryDirection {
    Income,
    Expense,
}

/// Income and expense categories.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TreasuryCategory {
    // ----- income -----
    /// Cash handed over from a closed till.
    SessionTransfer,
    Loan,
    PartnerContribution,
    /// Money from other lines of business.
    ExternalIncome,
    OtherIncome,
    // ----- expense -----
    Payroll,
    Utilities,
    Rent,
    /// RUNT, inspection-equipment vendors and the like.
    Suppliers,
    InventoryPurchase,
    Maintenance,
    Taxes,
    OtherExpense,
}

impl TreasuryCategory {
    pub const ALL: [TreasuryCategory; 13] = [
        TreasuryCategory::SessionTransfer,
        TreasuryCategory::Loan,
        TreasuryCategory::PartnerContribution,
        TreasuryCategory::ExternalIncome,
        TreasuryCategory::OtherIncome,
        TreasuryCategory::Payroll,
        TreasuryCategory::Utilities,
        TreasuryCategory::Rent,
        TreasuryCategory::Suppliers,
        TreasuryCategory::InventoryPurchase,
        TreasuryCategory::Maintenance,
        TreasuryCategory::Taxes,
        TreasuryCategory::OtherExpense,
    ];

    pub const fn direction(self) -> TreasuryDirection {
        match self {
            TreasuryCategory::SessionTransfer
            | TreasuryCategory::Loan
            | TreasuryCategory::PartnerContribution
            | TreasuryCategory::ExternalIncome
            | TreasuryCategory::OtherIncome => TreasuryDirection::Income,
            _ => TreasuryDirection::Expense,
        }
    }
}

/// How treasury money moved.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TreasuryMethod {
    Cash,
    Transfer,
    Check,
    /// Bank deposit (consignación).
    Deposit,
}

impl TreasuryMethod {
    pub const ALL: [TreasuryMethod; 4] = [
        TreasuryMethod::Cash,
        TreasuryMethod::Transfer,
        TreasuryMethod::Check,
        TreasuryMethod::Deposit,
    ];
}

// =============================================================================
// Movements
// =============================================================================

/// A stored treasury movement. `amount` is signed by the category direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreasuryMovement {
    pub id: String,
    pub category: TreasuryCategory,
    pub amount: Money,
    pub payment_method: TreasuryMethod,
    pub concept: String,
    pub voucher_number: Option<String>,
    /// Till this money came from (SessionTransfer only).
    pub linked_session_id: Option<String>,
    /// Bill/coin tally for cash movements.
    pub denomination_count: Option<DenominationCount>,
    /// Business date of the movement.
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl TreasuryMovement {
    pub fn direction(&self) -> TreasuryDirection {
        self.category.direction()
    }
}

/// What an administrator submits. `amount` is a positive magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreasuryMovementInput {
    pub category: TreasuryCategory,
    pub amount: Money,
    pub payment_method: TreasuryMethod,
    pub concept: String,
    #[serde(default)]
    pub voucher_number: Option<String>,
    #[serde(default)]
    pub linked_session_id: Option<String>,
    #[serde(default)]
    pub denomination_count: Option<DenominationCount>,
    /// Defaults to the time of recording.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl TreasuryMovementInput {
    pub fn new(
        category: TreasuryCategory,
        amount: Money,
        payment_method: TreasuryMethod,
        concept: impl Into<String>,
    ) -> Self {
        Self {
            category,
            amount,
            payment_method,
            concept: concept.into(),
            voucher_number: None,
            linked_session_id: None,
            denomination_count: None,
            occurred_at: None,
        }
    }

    pub fn with_count(mut self, count: DenominationCount) -> Self {
        self.denomination_count = Some(count);
        self
    }

    pub fn with_voucher(mut self, voucher: impl Into<String>) -> Self {
        self.voucher_number = Some(voucher.into());
        self
    }

    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Alerting configuration, persisted and editable by administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreasurySettings {
    pub alert_threshold: Money,
    pub notify_low_balance: bool,
    pub notification_email: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl TreasurySettings {
    pub fn with_threshold(alert_threshold: Money, now: DateTime<Utc>) -> Self {
        Self {
            alert_threshold,
            notify_low_balance: true,
            notification_email: None,
            updated_at: now,
            updated_by: None,
        }
    }

    /// Applies a partial update, validating the new values.
    pub fn apply(
        &mut self,
        update: &TreasurySettingsUpdate,
        updated_by: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if let Some(threshold) = update.alert_threshold {
            validate_non_negative(threshold, "alert_threshold")?;
        }
        if let Some(Some(email)) = &update.notification_email {
            validate_email(email)?;
        }

        if let Some(threshold) = update.alert_threshold {
            self.alert_threshold = threshold;
        }
        if let Some(notify) = update.notify_low_balance {
            self.notify_low_balance = notify;
        }
        if let Some(email) = &update.notification_email {
            self.notification_email = email.as_ref().map(|e| e.trim().to_string());
        }
        self.updated_at = now;
        self.updated_by = Some(updated_by.to_string());
        Ok(())
    }
}

impl Default for TreasurySettings {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_ALERT_THRESHOLD, DateTime::<Utc>::default())
    }
}

/// Partial settings update. `notification_email: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreasurySettingsUpdate {
    #[serde(default)]
    pub alert_threshold: Option<Money>,
    #[serde(default)]
    pub notify_low_balance: Option<bool>,
    #[serde(default)]
    pub notification_email: Option<Option<String>>,
}

// =============================================================================
// Derived Views
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryTotal {
    pub category: TreasuryCategory,
    /// Positive magnitude.
    pub total: Money,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreasuryMethodTotal {
    pub method: TreasuryMethod,
    /// Signed net balance held through this method.
    pub balance: Money,
    pub count: i64,
}

/// The consolidated treasury position. Recomputed, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreasuryBalance {
    pub current_balance: Money,
    pub total_income: Money,
    pub total_expense: Money,
    pub by_category: Vec<CategoryTotal>,
    pub by_method: Vec<TreasuryMethodTotal>,
    /// Cash from closed tills not yet received (not part of current_balance).
    pub pending_handover: Money,
    pub alert_threshold: Money,
    pub below_threshold: bool,
    pub movement_count: i64,
}

/// Totals for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreasurySummary {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
    /// All-time balance, not just the period.
    pub current_balance: Money,
    pub total_income: Money,
    pub total_expense: Money,
    pub movement_count: i64,
    pub income_by_category: Vec<CategoryTotal>,
    pub expense_by_category: Vec<CategoryTotal>,
    pub alert_threshold: Money,
    pub below_threshold: bool,
}

/// Opening/closing position for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreasuryStatistics {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
    pub total_income: Money,
    pub total_expense: Money,
    /// Balance of everything before `from`.
    pub opening_balance: Money,
    pub closing_balance: Money,
    pub movement_count: i64,
    pub top_expense_category: Option<CategoryTotal>,
}

/// Forward-looking estimate from recent averages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashFlowProjection {
    pub window_days: i64,
    pub average_daily_income: Money,
    pub average_daily_expense: Money,
    pub current_balance: Money,
    /// Days the balance lasts at the average expense rate, ignoring income.
    /// `None` when there were no expenses in the window.
    pub days_of_autonomy: Option<i64>,
    pub projected_balance_30_days: Money,
}

// =============================================================================
// Ledger
// =============================================================================

/// All treasury movements, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TreasuryLedger {
    movements: Vec<TreasuryMovement>,
}

impl TreasuryLedger {
    pub fn new(movements: Vec<TreasuryMovement>) -> Self {
        Self { movements }
    }

    pub fn list(&self) -> &[TreasuryMovement] {
        &self.movements
    }

    pub fn push(&mut self, movement: TreasuryMovement) {
        self.movements.push(movement);
    }

    /// True when some movement already carries this session's cash.
    pub fn is_session_received(&self, session_id: &str) -> bool {
        self.movements
            .iter()
            .any(|m| m.linked_session_id.as_deref() == Some(session_id))
    }

    /// Bills and coins in the vault, replayed from cash tallies.
    pub fn inventory(&self) -> DenominationInventory {
        let mut inventory = DenominationInventory::new();
        for m in &self.movements {
            if m.payment_method != TreasuryMethod::Cash {
                continue;
            }
            if let Some(count) = &m.denomination_count {
                match m.direction() {
                    TreasuryDirection::Income => inventory.deposit(count),
                    TreasuryDirection::Expense => inventory.withdraw(count),
                }
            }
        }
        inventory
    }

    /// Validates `input` and builds the movement to store.
    ///
    /// ## Rules
    /// - `amount` > 0; the stored amount is negated for expense categories
    /// - concept ≥ 5 characters
    /// - a tally is only allowed with Cash, and must total `amount` exactly
    /// - a cash expense tally must be covered by the vault
    /// - the resulting balance must stay representable
    pub fn prepare(
        &self,
        input: TreasuryMovementInput,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<TreasuryMovement> {
        validate_positive(input.amount, "amount")?;
        validate_treasury_concept(&input.concept)?;
        validate_voucher_number(input.voucher_number.as_deref())?;

        if let Some(session_id) = input.linked_session_id.as_deref() {
            if self.is_session_received(session_id) {
                return Err(CoreError::HandoverAlreadyReceived {
                    session_id: session_id.to_string(),
                });
            }
        }

        if let Some(count) = &input.denomination_count {
            if input.payment_method != TreasuryMethod::Cash {
                return Err(ValidationError::NotAllowed {
                    field: "denomination_count".to_string(),
                    reason: "only cash movements carry a bill/coin tally".to_string(),
                }
                .into());
            }

            let counted = count.total()?;
            if counted != input.amount {
                return Err(CoreError::DenominationTotalMismatch {
                    declared: input.amount,
                    counted,
                });
            }

            if input.category.direction() == TreasuryDirection::Expense {
                self.inventory().ensure_covers(count, input.amount)?;
            }
        }

        let amount = match input.category.direction() {
            TreasuryDirection::Income => input.amount,
            TreasuryDirection::Expense => -input.amount,
        };

        self.movements
            .iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m.amount))
            .and_then(|balance| balance.checked_add(amount))
            .ok_or_else(|| ValidationError::Overflow {
                field: "amount".to_string(),
            })?;

        Ok(TreasuryMovement {
            id: Uuid::new_v4().to_string(),
            category: input.category,
            amount,
            payment_method: input.payment_method,
            concept: input.concept.trim().to_string(),
            voucher_number: input
                .voucher_number
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            linked_session_id: input.linked_session_id,
            denomination_count: input.denomination_count,
            occurred_at: input.occurred_at.unwrap_or(now),
            created_at: now,
            created_by: created_by.to_string(),
        })
    }

    /// Builds the SessionTransfer income for a pending close notification.
    ///
    /// Returns `None` when the till handed over no cash.
    pub fn prepare_handover(
        &self,
        notification: &CloseNotification,
        session: &CashSession,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<TreasuryMovement>> {
        if notification.status != NotificationStatus::Pending || self.is_session_received(&session.id)
        {
            return Err(CoreError::HandoverAlreadyReceived {
                session_id: session.id.clone(),
            });
        }
        if !notification.cash_to_deliver.is_positive() {
            return Ok(None);
        }

        let mut input = TreasuryMovementInput::new(
            TreasuryCategory::SessionTransfer,
            notification.cash_to_deliver,
            TreasuryMethod::Cash,
            format!("Traslado de caja, sesión {}", session.id),
        );
        input.linked_session_id = Some(session.id.clone());
        input.denomination_count = session.closing_count;
        input.occurred_at = Some(notification.closed_at);

        self.prepare(input, created_by, now).map(Some)
    }

    fn sums(movements: &[&TreasuryMovement]) -> (Money, Money) {
        movements.iter().fold((Money::zero(), Money::zero()), |(inc, exp), m| {
            if m.amount.is_positive() {
                (inc + m.amount, exp)
            } else {
                (inc, exp + m.amount.abs())
            }
        })
    }

    fn by_category(movements: &[&TreasuryMovement], direction: Option<TreasuryDirection>) -> Vec<CategoryTotal> {
        TreasuryCategory::ALL
            .into_iter()
            .filter(|c| direction.map_or(true, |d| c.direction() == d))
            .filter_map(|category| {
                let (total, count) = movements
                    .iter()
                    .filter(|m| m.category == category)
                    .fold((Money::zero(), 0i64), |(t, n), m| (t + m.amount.abs(), n + 1));
                (count > 0).then_some(CategoryTotal {
                    category,
                    total,
                    count,
                })
            })
            .collect()
    }

    fn in_period(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<&TreasuryMovement> {
        self.movements
            .iter()
            .filter(|m| m.occurred_at >= from && m.occurred_at <= to)
            .collect()
    }

    /// Sum of every movement.
    pub fn current_balance(&self) -> Money {
        self.movements.iter().map(|m| m.amount).sum()
    }

    /// Recomputes the treasury position.
    pub fn balance(&self, settings: &TreasurySettings, pending_handover: Money) -> TreasuryBalance {
        let all: Vec<&TreasuryMovement> = self.movements.iter().collect();
        let (total_income, total_expense) = Self::sums(&all);
        let current_balance = total_income - total_expense;

        let by_method = TreasuryMethod::ALL
            .into_iter()
            .filter_map(|method| {
                let (balance, count) = all
                    .iter()
                    .filter(|m| m.payment_method == method)
                    .fold((Money::zero(), 0i64), |(b, n), m| (b + m.amount, n + 1));
                (count > 0).then_some(TreasuryMethodTotal {
                    method,
                    balance,
                    count,
                })
            })
            .collect();

        TreasuryBalance {
            current_balance,
            total_income,
            total_expense,
            by_category: Self::by_category(&all, None),
            by_method,
            pending_handover,
            alert_threshold: settings.alert_threshold,
            below_threshold: current_balance < settings.alert_threshold,
            movement_count: all.len() as i64,
        }
    }

    /// Period totals with per-category breakdowns.
    pub fn summary(
        &self,
        settings: &TreasurySettings,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TreasurySummary {
        let period = self.in_period(from, to);
        let (total_income, total_expense) = Self::sums(&period);
        let current_balance = self.current_balance();

        TreasurySummary {
            from,
            to,
            current_balance,
            total_income,
            total_expense,
            movement_count: period.len() as i64,
            income_by_category: Self::by_category(&period, Some(TreasuryDirection::Income)),
            expense_by_category: Self::by_category(&period, Some(TreasuryDirection::Expense)),
            alert_threshold: settings.alert_threshold,
            below_threshold: current_balance < settings.alert_threshold,
        }
    }

    /// Opening and closing balances for a period, and where most money went.
    pub fn statistics(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> TreasuryStatistics {
        let period = self.in_period(from, to);
        let (total_income, total_expense) = Self::sums(&period);
        let opening_balance: Money = self
            .movements
            .iter()
            .filter(|m| m.occurred_at < from)
            .map(|m| m.amount)
            .sum();

        // first category wins a tie, in taxonomy order
        let top_expense_category = Self::by_category(&period, Some(TreasuryDirection::Expense))
            .into_iter()
            .fold(None::<CategoryTotal>, |best, c| match best {
                Some(b) if b.total >= c.total => Some(b),
                _ => Some(c),
            });

        TreasuryStatistics {
            from,
            to,
            total_income,
            total_expense,
            opening_balance,
            closing_balance: opening_balance + total_income - total_expense,
            movement_count: period.len() as i64,
            top_expense_category,
        }
    }

    /// Projects the balance forward from the last `window_days` of activity.
    pub fn project_cash_flow(&self, now: DateTime<Utc>, window_days: i64) -> CoreResult<CashFlowProjection> {
        if !(1..=365).contains(&window_days) {
            return Err(ValidationError::OutOfRange {
                field: "window_days".to_string(),
                min: 1,
                max: 365,
            }
            .into());
        }

        let period = self.in_period(now - Duration::days(window_days), now);
        let (income, expense) = Self::sums(&period);
        let average_daily_income = Money::from_units(income.units() / window_days);
        let average_daily_expense = Money::from_units(expense.units() / window_days);
        let current_balance = self.current_balance();

        let days_of_autonomy = average_daily_expense
            .is_positive()
            .then(|| (current_balance.units() / average_daily_expense.units()).max(0));

        let projected_balance_30_days = (average_daily_income - average_daily_expense)
            .checked_mul(30)
            .and_then(|delta| current_balance.checked_add(delta))
            .ok_or_else(|| ValidationError::Overflow {
                field: "projected_balance_30_days".to_string(),
            })?;

        Ok(CashFlowProjection {
            window_days,
            average_daily_income,
            average_daily_expense,
            current_balance,
            days_of_autonomy,
            projected_balance_30_days,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denomination::Denomination;
    use chrono::TimeZone;

    fn m(units: i64) -> Money {
        Money::from_units(units)
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    fn record(ledger: &mut TreasuryLedger, input: TreasuryMovementInput) -> TreasuryMovement {
        let movement = ledger.prepare(input, "admin", Utc::now()).unwrap();
        ledger.push(movement.clone());
        movement
    }

    #[test]
    fn test_sign_from_category() {
        let mut ledger = TreasuryLedger::default();
        let income = record(
            &mut ledger,
            TreasuryMovementInput::new(TreasuryCategory::Loan, m(500_000), TreasuryMethod::Transfer, "Préstamo banco"),
        );
        let expense = record(
            &mut ledger,
            TreasuryMovementInput::new(TreasuryCategory::Rent, m(200_000), TreasuryMethod::Transfer, "Arriendo marzo"),
        );
        assert_eq!(income.amount, m(500_000));
        assert_eq!(expense.amount, m(-200_000));
        assert_eq!(ledger.current_balance(), m(300_000));
    }

    #[test]
    fn test_prepare_validation() {
        let ledger = TreasuryLedger::default();
        let zero = TreasuryMovementInput::new(TreasuryCategory::Loan, m(0), TreasuryMethod::Transfer, "Préstamo");
        assert!(matches!(ledger.prepare(zero, "admin", Utc::now()), Err(CoreError::Validation(_))));

        let short = TreasuryMovementInput::new(TreasuryCategory::Loan, m(10), TreasuryMethod::Transfer, "abc");
        assert!(matches!(ledger.prepare(short, "admin", Utc::now()), Err(CoreError::Validation(_))));

        let tally_on_transfer = TreasuryMovementInput::new(
            TreasuryCategory::Loan,
            m(50_000),
            TreasuryMethod::Transfer,
            "Préstamo socio",
        )
        .with_count(DenominationCount::new().with(Denomination::Bill50000, 1));
        assert!(matches!(
            ledger.prepare(tally_on_transfer, "admin", Utc::now()),
            Err(CoreError::Validation(ValidationError::NotAllowed { .. }))
        ));
    }

    #[test]
    fn test_amount_bound_and_balance_overflow() {
        use crate::validation::MAX_AMOUNT;

        let mut ledger = TreasuryLedger::default();
        let at_cap = TreasuryMovementInput::new(TreasuryCategory::Loan, MAX_AMOUNT, TreasuryMethod::Transfer, "Préstamo banco");
        assert!(ledger.prepare(at_cap, "admin", Utc::now()).is_ok());

        let huge = TreasuryMovementInput::new(
            TreasuryCategory::Loan,
            m(i64::MAX / 2 + 1),
            TreasuryMethod::Transfer,
            "Préstamo banco",
        );
        assert!(matches!(
            ledger.prepare(huge, "admin", Utc::now()),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        // history already at the edge of i64: one more income must not wrap
        let mut edge = record(
            &mut ledger,
            TreasuryMovementInput::new(TreasuryCategory::Loan, m(1_000), TreasuryMethod::Transfer, "Préstamo socio"),
        );
        edge.id = "legacy".to_string();
        edge.amount = m(i64::MAX - 500);
        let edge_time = edge.occurred_at;
        let ledger = TreasuryLedger::new(vec![edge]);
        let more = TreasuryMovementInput::new(TreasuryCategory::Loan, m(1_000), TreasuryMethod::Transfer, "Préstamo socio");
        assert!(matches!(
            ledger.prepare(more, "admin", Utc::now()),
            Err(CoreError::Validation(ValidationError::Overflow { .. }))
        ));
        assert!(matches!(
            ledger.project_cash_flow(edge_time, 1),
            Err(CoreError::Validation(ValidationError::Overflow { .. }))
        ));
    }

    #[test]
    fn test_cash_tally_must_match_amount() {
        let ledger = TreasuryLedger::default();
        let input = TreasuryMovementInput::new(
            TreasuryCategory::PartnerContribution,
            m(100_000),
            TreasuryMethod::Cash,
            "Aporte socio",
        )
        .with_count(DenominationCount::new().with(Denomination::Bill50000, 1));

        let err = ledger.prepare(input, "admin", Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DenominationTotalMismatch { declared, counted }
                if declared == m(100_000) && counted == m(50_000)
        ));
    }

    #[test]
    fn test_cash_expense_needs_vault_denominations() {
        let mut ledger = TreasuryLedger::default();
        record(
            &mut ledger,
            TreasuryMovementInput::new(
                TreasuryCategory::PartnerContribution,
                m(100_000),
                TreasuryMethod::Cash,
                "Aporte socio",
            )
            .with_count(DenominationCount::new().with(Denomination::Bill20000, 5)),
        );

        let wants_fifties = TreasuryMovementInput::new(
            TreasuryCategory::Utilities,
            m(50_000),
            TreasuryMethod::Cash,
            "Recibo de energía",
        )
        .with_count(DenominationCount::new().with(Denomination::Bill50000, 1));
        match ledger.prepare(wants_fifties, "admin", Utc::now()) {
            Err(CoreError::InsufficientDenominations { shortages, suggestion, .. }) => {
                assert_eq!(shortages.len(), 1);
                assert_eq!(shortages[0].denomination, Denomination::Bill50000);
                assert!(matches!(suggestion, crate::CashSuggestion::Uncomposable { missing } if missing == m(10_000)));
            }
            other => panic!("expected InsufficientDenominations, got {other:?}"),
        }

        let twenties = TreasuryMovementInput::new(
            TreasuryCategory::Utilities,
            m(60_000),
            TreasuryMethod::Cash,
            "Recibo de energía",
        )
        .with_count(DenominationCount::new().with(Denomination::Bill20000, 3));
        record(&mut ledger, twenties);
        assert_eq!(ledger.inventory().available.get(Denomination::Bill20000), 2);
    }

    #[test]
    fn test_balance_and_threshold() {
        let mut ledger = TreasuryLedger::default();
        record(
            &mut ledger,
            TreasuryMovementInput::new(TreasuryCategory::ExternalIncome, m(150_000), TreasuryMethod::Deposit, "Parqueadero"),
        );
        record(
            &mut ledger,
            TreasuryMovementInput::new(TreasuryCategory::Payroll, m(80_000), TreasuryMethod::Transfer, "Nómina quincena"),
        );

        let settings = TreasurySettings::default();
        let balance = ledger.balance(&settings, m(115_000));
        assert_eq!(balance.current_balance, m(70_000));
        assert_eq!(balance.total_income, m(150_000));
        assert_eq!(balance.total_expense, m(80_000));
        assert_eq!(balance.pending_handover, m(115_000));
        assert!(balance.below_threshold);
        assert_eq!(balance.by_method.len(), 2);
        assert_eq!(balance.by_category.len(), 2);

        let relaxed = TreasurySettings::with_threshold(m(70_000), Utc::now());
        assert!(!ledger.balance(&relaxed, Money::zero()).below_threshold);
    }

    #[test]
    fn test_summary_and_statistics() {
        let mut ledger = TreasuryLedger::default();
        for (cat, amount, d) in [
            (TreasuryCategory::Loan, 1_000_000, 1),
            (TreasuryCategory::Rent, 300_000, 5),
            (TreasuryCategory::Payroll, 400_000, 10),
            (TreasuryCategory::Utilities, 50_000, 12),
            (TreasuryCategory::OtherIncome, 20_000, 20),
        ] {
            record(
                &mut ledger,
                TreasuryMovementInput::new(cat, m(amount), TreasuryMethod::Transfer, "Movimiento").occurred_at(day(d)),
            );
        }

        let summary = ledger.summary(&TreasurySettings::default(), day(5), day(12));
        assert_eq!(summary.movement_count, 3);
        assert_eq!(summary.total_expense, m(750_000));
        assert_eq!(summary.total_income, Money::zero());
        assert_eq!(summary.expense_by_category.len(), 3);
        assert!(summary.income_by_category.is_empty());
        assert_eq!(summary.current_balance, m(270_000));

        let stats = ledger.statistics(day(5), day(20));
        assert_eq!(stats.opening_balance, m(1_000_000));
        assert_eq!(stats.closing_balance, m(270_000));
        let top = stats.top_expense_category.unwrap();
        assert_eq!(top.category, TreasuryCategory::Payroll);
        assert_eq!(top.total, m(400_000));
    }

    #[test]
    fn test_cash_flow_projection() {
        let mut ledger = TreasuryLedger::default();
        let now = day(30);
        record(
            &mut ledger,
            TreasuryMovementInput::new(TreasuryCategory::Loan, m(1_000_000), TreasuryMethod::Transfer, "Préstamo")
                .occurred_at(day(1)),
        );
        record(
            &mut ledger,
            TreasuryMovementInput::new(TreasuryCategory::Payroll, m(100_000), TreasuryMethod::Transfer, "Nómina")
                .occurred_at(day(25)),
        );

        let p = ledger.project_cash_flow(now, 10).unwrap();
        assert_eq!(p.average_daily_income, Money::zero());
        assert_eq!(p.average_daily_expense, m(10_000));
        assert_eq!(p.current_balance, m(900_000));
        assert_eq!(p.days_of_autonomy, Some(90));
        assert_eq!(p.projected_balance_30_days, m(600_000));

        assert!(ledger.project_cash_flow(now, 0).is_err());
    }

    #[test]
    fn test_settings_apply() {
        let mut settings = TreasurySettings::default();
        let update = TreasurySettingsUpdate {
            alert_threshold: Some(m(250_000)),
            notify_low_balance: Some(false),
            notification_email: Some(Some("tesoreria@cda.co".to_string())),
        };
        settings.apply(&update, "admin", Utc::now()).unwrap();
        assert_eq!(settings.alert_threshold, m(250_000));
        assert!(!settings.notify_low_balance);
        assert_eq!(settings.updated_by.as_deref(), Some("admin"));

        let bad = TreasurySettingsUpdate {
            alert_threshold: Some(m(-1)),
            ..Default::default()
        };
        assert!(settings.apply(&bad, "admin", Utc::now()).is_err());
        assert_eq!(settings.alert_threshold, m(250_000));
    }

    #[test]
    fn test_handover_once() {
        use crate::ledger::MovementLedger;
        use crate::reconciliation::ReconciliationEngine;
        use crate::session::CloseRequest;
        use crate::types::Shift;

        let mut session = CashSession::open("op-1", m(50_000), Shift::Afternoon, Utc::now()).unwrap();
        let ledger = MovementLedger::new(session.id.clone());
        let count = DenominationCount::new().with(Denomination::Bill50000, 1);
        session
            .close(&ledger, &CloseRequest::new(count), &ReconciliationEngine::default(), Utc::now())
            .unwrap();
        let notification = session.close_notification().unwrap();

        let mut treasury = TreasuryLedger::default();
        let movement = treasury
            .prepare_handover(&notification, &session, "admin", Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(movement.category, TreasuryCategory::SessionTransfer);
        assert_eq!(movement.amount, m(50_000));
        assert_eq!(movement.linked_session_id.as_deref(), Some(session.id.as_str()));
        treasury.push(movement);

        assert_eq!(treasury.inventory().available.get(Denomination::Bill50000), 1);
        assert!(matches!(
            treasury.prepare_handover(&notification, &session, "admin", Utc::now()),
            Err(CoreError::HandoverAlreadyReceived { .. })
        ));
    }
}
