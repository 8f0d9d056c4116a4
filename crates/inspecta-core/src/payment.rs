//! # Payment Method Registry
//!
//! Classifies how a movement was settled and whether it touches the till.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Method          Physical cash?   Settles in                     │
//! │  ─────────────   ──────────────   ─────────────────────────────  │
//! │  Cash            yes              the drawer                     │
//! │  DebitCard       no               card processor                 │
//! │  CreditCard      no               card processor                 │
//! │  BankTransfer    no               bank account                   │
//! │  CreditLineA     no               consumer-credit partner        │
//! │  CreditLineB     no               consumer-credit partner        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Non-physical methods are excluded from the expected drawer balance but
//! still reported per method so they can be matched against processor
//! statements.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// How a cash-session movement was paid.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Bills and coins into the drawer.
    Cash,
    DebitCard,
    CreditCard,
    BankTransfer,
    /// First consumer-credit partner.
    CreditLineA,
    /// Second consumer-credit partner.
    CreditLineB,
}

impl PaymentMethod {
    /// Every method, in reporting order.
    pub const ALL: [PaymentMethod; 6] = [
        PaymentMethod::Cash,
        PaymentMethod::DebitCard,
        PaymentMethod::CreditCard,
        PaymentMethod::BankTransfer,
        PaymentMethod::CreditLineA,
        PaymentMethod::CreditLineB,
    ];

    /// Returns true when the method moves bills or coins in the till.
    ///
    /// ## Example
    /// ```rust
    /// use inspecta_core::PaymentMethod;
    ///
    /// assert!(PaymentMethod::Cash.affects_physical_cash());
    /// assert!(!PaymentMethod::DebitCard.affects_physical_cash());
    /// ```
    #[inline]
    pub const fn affects_physical_cash(self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }

    /// Stable snake_case name, identical to the serialized form.
    pub const fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::CreditLineA => "credit_line_a",
            PaymentMethod::CreditLineB => "credit_line_b",
        }
    }
}

/// Lookup facade over [`PaymentMethod`] classification.
///
/// Stateless; kept as a type so call sites read as the registry they consult.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentMethodRegistry;

impl PaymentMethodRegistry {
    pub fn affects_physical_cash(method: PaymentMethod) -> bool {
        method.affects_physical_cash()
    }

    /// Methods that settle outside the drawer.
    pub fn non_physical() -> impl Iterator<Item = PaymentMethod> {
        PaymentMethod::ALL
            .into_iter()
            .filter(|m| !m.affects_physical_cash())
    }
}
