//! # Denomination Counter
//!
//! Converts a bill/coin tally into a monetary total, and keeps the running
//! inventory of the treasury vault.
//!
//! ## Denominations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Bills: 100000  50000  20000  10000  5000  2000  1000                   │
//! │  Coins:   1000    500    200    100    50                               │
//! │                                                                         │
//! │  total = Σ count_i × value_i          (12 terms, exact, no rounding)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The 1000 bill and the 1000 coin are tracked separately: they have the same
//! value but the vault has to hand out whichever one it physically holds.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{ValidationResult, MAX_AMOUNT};

// =============================================================================
// Denomination
// =============================================================================

/// Physical form of a denomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DenominationForm {
    Bill,
    Coin,
}

/// One of the twelve bill and coin values in circulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Denomination {
    Bill100000,
    Bill50000,
    Bill20000,
    Bill10000,
    Bill5000,
    Bill2000,
    Bill1000,
    Coin1000,
    Coin500,
    Coin200,
    Coin100,
    Coin50,
}

impl Denomination {
    /// All denominations, largest value first (bills before coins on ties).
    pub const ALL: [Denomination; 12] = [
        Denomination::Bill100000,
        Denomination::Bill50000,
        Denomination::Bill20000,
        Denomination::Bill10000,
        Denomination::Bill5000,
        Denomination::Bill2000,
        Denomination::Bill1000,
        Denomination::Coin1000,
        Denomination::Coin500,
        Denomination::Coin200,
        Denomination::Coin100,
        Denomination::Coin50,
    ];

    /// Face value in currency units.
    pub const fn value(self) -> Money {
        Money::from_units(match self {
            Denomination::Bill100000 => 100_000,
            Denomination::Bill50000 => 50_000,
            Denomination::Bill20000 => 20_000,
            Denomination::Bill10000 => 10_000,
            Denomination::Bill5000 => 5_000,
            Denomination::Bill2000 => 2_000,
            Denomination::Bill1000 | Denomination::Coin1000 => 1_000,
            Denomination::Coin500 => 500,
            Denomination::Coin200 => 200,
            Denomination::Coin100 => 100,
            Denomination::Coin50 => 50,
        })
    }

    pub const fn form(self) -> DenominationForm {
        match self {
            Denomination::Coin1000
            | Denomination::Coin500
            | Denomination::Coin200
            | Denomination::Coin100
            | Denomination::Coin50 => DenominationForm::Coin,
            _ => DenominationForm::Bill,
        }
    }

    /// Field name in [`DenominationCount`], used in validation errors.
    pub const fn field_name(self) -> &'static str {
        match self {
            Denomination::Bill100000 => "bills_100000",
            Denomination::Bill50000 => "bills_50000",
            Denomination::Bill20000 => "bills_20000",
            Denomination::Bill10000 => "bills_10000",
            Denomination::Bill5000 => "bills_5000",
            Denomination::Bill2000 => "bills_2000",
            Denomination::Bill1000 => "bills_1000",
            Denomination::Coin1000 => "coins_1000",
            Denomination::Coin500 => "coins_500",
            Denomination::Coin200 => "coins_200",
            Denomination::Coin100 => "coins_100",
            Denomination::Coin50 => "coins_50",
        }
    }
}

// =============================================================================
// Denomination Count
// =============================================================================

/// A physical tally: how many of each bill and coin.
///
/// Counts are signed so that a bad form submission can be rejected with a
/// field-level error instead of failing to deserialize. Missing fields
/// default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct DenominationCount {
    pub bills_100000: i64,
    pub bills_50000: i64,
    pub bills_20000: i64,
    pub bills_10000: i64,
    pub bills_5000: i64,
    pub bills_2000: i64,
    pub bills_1000: i64,
    pub coins_1000: i64,
    pub coins_500: i64,
    pub coins_200: i64,
    pub coins_100: i64,
    pub coins_50: i64,
}

impl DenominationCount {
    /// An all-zero tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    ///
    /// ## Example
    /// ```rust
    /// use inspecta_core::denomination::{Denomination, DenominationCount};
    ///
    /// let count = DenominationCount::new()
    ///     .with(Denomination::Bill50000, 2)
    ///     .with(Denomination::Bill10000, 1)
    ///     .with(Denomination::Coin500, 10);
    /// assert_eq!(count.total().unwrap().units(), 115_000);
    /// ```
    pub fn with(mut self, denomination: Denomination, count: i64) -> Self {
        *self.slot_mut(denomination) = count;
        self
    }

    pub fn get(&self, denomination: Denomination) -> i64 {
        match denomination {
            Denomination::Bill100000 => self.bills_100000,
            Denomination::Bill50000 => self.bills_50000,
            Denomination::Bill20000 => self.bills_20000,
            Denomination::Bill10000 => self.bills_10000,
            Denomination::Bill5000 => self.bills_5000,
            Denomination::Bill2000 => self.bills_2000,
            Denomination::Bill1000 => self.bills_1000,
            Denomination::Coin1000 => self.coins_1000,
            Denomination::Coin500 => self.coins_500,
            Denomination::Coin200 => self.coins_200,
            Denomination::Coin100 => self.coins_100,
            Denomination::Coin50 => self.coins_50,
        }
    }

    fn slot_mut(&mut self, denomination: Denomination) -> &mut i64 {
        match denomination {
            Denomination::Bill100000 => &mut self.bills_100000,
            Denomination::Bill50000 => &mut self.bills_50000,
            Denomination::Bill20000 => &mut self.bills_20000,
            Denomination::Bill10000 => &mut self.bills_10000,
            Denomination::Bill5000 => &mut self.bills_5000,
            Denomination::Bill2000 => &mut self.bills_2000,
            Denomination::Bill1000 => &mut self.bills_1000,
            Denomination::Coin1000 => &mut self.coins_1000,
            Denomination::Coin500 => &mut self.coins_500,
            Denomination::Coin200 => &mut self.coins_200,
            Denomination::Coin100 => &mut self.coins_100,
            Denomination::Coin50 => &mut self.coins_50,
        }
    }

    /// Iterates `(denomination, count)` pairs, largest value first.
    pub fn iter(&self) -> impl Iterator<Item = (Denomination, i64)> + '_ {
        Denomination::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    /// True when every count is zero.
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, n)| n == 0)
    }

    /// Rejects negative counts, naming the first offending denomination.
    pub fn validate(&self) -> ValidationResult<()> {
        match self.iter().find(|(_, n)| *n < 0) {
            Some((d, _)) => Err(ValidationError::Negative {
                field: d.field_name().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// `Σ(count_i × value_i)` over the twelve denominations.
    ///
    /// Fails on a negative count, on overflow, or when the tally is worth
    /// more than [`MAX_AMOUNT`].
    pub fn total(&self) -> ValidationResult<Money> {
        self.validate()?;
        let total = self.iter().try_fold(Money::zero(), |acc, (d, n)| {
            d.value()
                .checked_mul(n)
                .and_then(|line| acc.checked_add(line))
                .ok_or_else(|| ValidationError::Overflow {
                    field: d.field_name().to_string(),
                })
        })?;
        if total > MAX_AMOUNT {
            return Err(ValidationError::OutOfRange {
                field: "denomination_count".to_string(),
                min: 0,
                max: MAX_AMOUNT.units(),
            });
        }
        Ok(total)
    }
}

/// DenominationCounter entry point: the total value of a tally.
pub fn total(count: &DenominationCount) -> ValidationResult<Money> {
    count.total()
}

// =============================================================================
// Vault Inventory
// =============================================================================

/// A requested denomination the vault cannot cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DenominationShortage {
    pub denomination: Denomination,
    pub requested: i64,
    pub available: i64,
}

/// One line of a composition: `count` pieces of `denomination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DenominationLine {
    pub denomination: Denomination,
    pub count: i64,
}

/// Result of trying to compose an amount from what the vault holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CashSuggestion {
    /// The amount can be paid out exactly with these pieces.
    Composable { lines: Vec<DenominationLine> },
    /// The vault falls short by `missing` even using everything it holds.
    Uncomposable { missing: Money },
}

/// Bills and coins currently held by the treasury vault.
///
/// Built by replaying the tallies of cash treasury movements: incoming
/// tallies add, outgoing tallies subtract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DenominationInventory {
    pub available: DenominationCount,
}

impl DenominationInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit(&mut self, count: &DenominationCount) {
        for (d, n) in count.iter() {
            *self.available.slot_mut(d) += n;
        }
    }

    pub fn withdraw(&mut self, count: &DenominationCount) {
        for (d, n) in count.iter() {
            *self.available.slot_mut(d) -= n;
        }
    }

    /// Value of everything on hand. Counts driven negative by inconsistent
    /// history are treated as zero.
    pub fn value(&self) -> Money {
        self.available
            .iter()
            .map(|(d, n)| d.value() * n.max(0))
            .sum()
    }

    /// Every denomination where `requested` asks for more than is on hand.
    pub fn shortages(&self, requested: &DenominationCount) -> Vec<DenominationShortage> {
        requested
            .iter()
            .filter_map(|(d, want)| {
                let have = self.available.get(d).max(0);
                (want > have).then_some(DenominationShortage {
                    denomination: d,
                    requested: want,
                    available: have,
                })
            })
            .collect()
    }

    /// Composition of `amount` from what is on hand.
    ///
    /// Prefers the largest denominations and backtracks when that leaves a
    /// remainder the smaller ones cannot cover, so 60 000 from one 50 000 and
    /// three 20 000 bills comes out as three 20 000s. The search is bounded
    /// by [`SEARCH_BUDGET`] steps; past that the amount is reported as
    /// uncomposable, with `missing` taken from the greedy remainder.
    ///
    /// ## Example
    /// ```rust
    /// use inspecta_core::denomination::*;
    /// use inspecta_core::Money;
    ///
    /// let mut vault = DenominationInventory::new();
    /// vault.deposit(&DenominationCount::new()
    ///     .with(Denomination::Bill50000, 1)
    ///     .with(Denomination::Bill20000, 5));
    ///
    /// match vault.suggest(Money::from_units(90_000)) {
    ///     CashSuggestion::Composable { lines } => assert_eq!(lines.len(), 2),
    ///     other => panic!("unexpected {other:?}"),
    /// }
    /// ```
    pub fn suggest(&self, amount: Money) -> CashSuggestion {
        let stock: Vec<(Denomination, i64)> = self.available.iter().filter(|&(_, n)| n > 0).collect();

        // reach[i]: value of every piece from stock[i] on
        let mut reach = vec![0_i64; stock.len() + 1];
        for i in (0..stock.len()).rev() {
            let (d, n) = stock[i];
            reach[i] = reach[i + 1].saturating_add(d.value().units().saturating_mul(n));
        }

        let mut taken = vec![0_i64; stock.len()];
        let mut budget = SEARCH_BUDGET;
        if amount.units() >= 0 && compose(&stock, &reach, 0, amount.units(), &mut taken, &mut budget) {
            let lines = stock
                .iter()
                .zip(taken)
                .filter(|&(_, count)| count > 0)
                .map(|(&(denomination, _), count)| DenominationLine { denomination, count })
                .collect();
            return CashSuggestion::Composable { lines };
        }

        CashSuggestion::Uncomposable {
            missing: Money::from_units(greedy_remainder(&stock, amount.units())),
        }
    }

    /// Fails with `InsufficientDenominations` when `requested` cannot be
    /// paid out of the vault.
    pub fn ensure_covers(&self, requested: &DenominationCount, amount: Money) -> CoreResult<()> {
        let shortages = self.shortages(requested);
        if shortages.is_empty() {
            return Ok(());
        }
        Err(CoreError::InsufficientDenominations {
            requested: amount,
            shortages,
            suggestion: self.suggest(amount),
        })
    }
}

/// Steps [`DenominationInventory::suggest`] may spend searching.
pub const SEARCH_BUDGET: usize = 20_000;

/// Picks counts for `stock[i..]` summing to `remaining`, most of each first.
fn compose(
    stock: &[(Denomination, i64)],
    reach: &[i64],
    i: usize,
    remaining: i64,
    taken: &mut [i64],
    budget: &mut usize,
) -> bool {
    if remaining == 0 {
        return true;
    }
    if i == stock.len() || remaining > reach[i] {
        return false;
    }

    let (d, have) = stock[i];
    let value = d.value().units();
    for take in (0..=(remaining / value).min(have)).rev() {
        if *budget == 0 {
            return false;
        }
        *budget -= 1;

        let rest = remaining - take * value;
        // taking fewer only leaves more for the smaller pieces
        if rest > reach[i + 1] {
            break;
        }
        taken[i] = take;
        if compose(stock, reach, i + 1, rest, taken, budget) {
            return true;
        }
    }
    taken[i] = 0;
    false
}

fn greedy_remainder(stock: &[(Denomination, i64)], amount: i64) -> i64 {
    stock.iter().fold(amount, |remaining, &(d, have)| {
        if remaining <= 0 {
            return remaining;
        }
        let value = d.value().units();
        remaining - (remaining / value).min(have) * value
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
