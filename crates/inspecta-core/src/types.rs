//! # Domain Types
//!
//! Core domain types of the till (caja) and its audit trail.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────────┐  │
//! │  │  CashSession    │   │    Movement     │   │  CloseNotification   │  │
//! │  │  ─────────────  │   │  ─────────────  │   │  ──────────────────  │  │
//! │  │  id (UUID)      │◄──│  session_id     │   │  session_id          │  │
//! │  │  operator_id    │   │  kind           │   │  cash_to_deliver     │  │
//! │  │  shift          │   │  amount (±)     │   │  difference          │  │
//! │  │  status         │   │  payment_method │   │  status              │  │
//! │  │  version        │   │  concept        │   └──────────────────────┘  │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────────┐  │
//! │  │     Shift       │   │  SessionStatus  │   │    MovementKind      │  │
//! │  │  Morning        │   │  Active         │   │  VehicleCharge   (+) │  │
//! │  │  Afternoon      │   │  Closed         │   │  SoatSaleCommission(+)│ │
//! │  │  Night          │   └─────────────────┘   │  ManualExpense   (−) │  │
//! │  └─────────────────┘                         │  Refund          (−) │  │
//! │                                              │  Adjustment      (±) │  │
//! │                                              └──────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Movements are append-only. A mistake is corrected with a new Adjustment
//! or Refund, never by editing or deleting the original row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::denomination::DenominationCount;
use crate::money::Money;
use crate::payment::PaymentMethod;
use crate::reconciliation::Classification;

// =============================================================================
// Shift
// =============================================================================

/// Work period a till is opened under (turno).
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Afternoon,
    Night,
}

// =============================================================================
// Session Status
// =============================================================================

/// Lifecycle state of a cash session. `Closed` is terminal.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Closed,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Active
    }
}

// =============================================================================
// Movement Kind
// =============================================================================

/// Which sign a movement kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSign {
    Inflow,
    Outflow,
    Either,
}

/// What a movement represents.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Inspection fee (revisión técnico-mecánica) charged for a vehicle.
    VehicleCharge,
    /// Commission earned on a SOAT insurance sale.
    SoatSaleCommission,
    /// Money taken out of the till for an expense. Always physical cash.
    ManualExpense,
    /// Money returned to a customer.
    Refund,
    /// Correction of an earlier movement.
    Adjustment,
}

impl MovementKind {
    pub const ALL: [MovementKind; 5] = [
        MovementKind::VehicleCharge,
        MovementKind::SoatSaleCommission,
        MovementKind::ManualExpense,
        MovementKind::Refund,
        MovementKind::Adjustment,
    ];

    pub const fn required_sign(self) -> AmountSign {
        match self {
            MovementKind::VehicleCharge | MovementKind::SoatSaleCommission => AmountSign::Inflow,
            MovementKind::ManualExpense | MovementKind::Refund => AmountSign::Outflow,
            MovementKind::Adjustment => AmountSign::Either,
        }
    }

    /// Expenses leave the drawer as bills whatever method was written down.
    pub const fn always_physical(self) -> bool {
        matches!(self, MovementKind::ManualExpense)
    }
}

// =============================================================================
// Cash Session
// =============================================================================

/// A shift-scoped till with its own movement ledger.
///
/// The closing fields are `None` while Active and all set once Closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashSession {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Operator (cashier) who owns the till.
    pub operator_id: String,

    pub shift: Shift,

    pub status: SessionStatus,

    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,

    /// Float the till opened with.
    pub initial_amount: Money,

    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,

    /// Expected physical cash at close (system amount).
    pub expected_amount: Option<Money>,

    /// Physical cash counted at close.
    pub counted_amount: Option<Money>,

    /// counted − expected.
    pub difference: Option<Money>,

    pub classification: Option<Classification>,

    /// Notes entered at close; doubles as the discrepancy justification.
    pub closing_notes: Option<String>,

    /// The bill/coin tally handed over at close.
    pub closing_count: Option<DenominationCount>,

    /// Optimistic concurrency version, bumped on close.
    pub version: i64,
}

// =============================================================================
// Movement
// =============================================================================

/// A single financial event in a session's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Movement {
    pub id: String,
    pub session_id: String,
    pub kind: MovementKind,
    /// Signed amount: positive = inflow, negative = outflow. Never zero.
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub concept: String,
    /// Vehicle-service record this charge belongs to, if any.
    pub vehicle_ref: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Movement {
    #[inline]
    pub fn is_inflow(&self) -> bool {
        self.amount.is_positive()
    }

    #[inline]
    pub fn is_outflow(&self) -> bool {
        self.amount.is_negative()
    }

    /// Whether this movement changes the bills and coins in the drawer.
    ///
    /// Cash movements do; so does every ManualExpense regardless of the
    /// method it was recorded with.
    pub fn affects_physical_cash(&self) -> bool {
        self.payment_method.affects_physical_cash() || self.kind.always_physical()
    }
}

/// What a caller supplies to record a movement. Id, timestamp and author
/// are filled in by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementInput {
    pub kind: MovementKind,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub concept: String,
    #[serde(default)]
    pub vehicle_ref: Option<String>,
}

impl MovementInput {
    pub fn new(
        kind: MovementKind,
        amount: Money,
        payment_method: PaymentMethod,
        concept: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            amount,
            payment_method,
            concept: concept.into(),
            vehicle_ref: None,
        }
    }

    pub fn with_vehicle_ref(mut self, vehicle_ref: impl Into<String>) -> Self {
        self.vehicle_ref = Some(vehicle_ref.into());
        self
    }
}

// =============================================================================
// Close Notification
// =============================================================================

/// Read state of a close notification in the administrator's inbox.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Cash not yet received by treasury.
    Pending,
    /// Cash received into treasury.
    Read,
    Archived,
}

/// Raised when a till closes: tells treasury how much cash to collect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CloseNotification {
    pub id: String,
    pub session_id: String,
    pub operator_id: String,
    pub shift: Shift,
    #[ts(as = "String")]
    pub closed_at: DateTime<Utc>,
    /// Physical cash the cashier hands over (equals the counted amount).
    pub cash_to_deliver: Money,
    pub expected_amount: Money,
    pub counted_amount: Money,
    pub difference: Money,
    pub notes: Option<String>,
    pub status: NotificationStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
