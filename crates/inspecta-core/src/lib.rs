//! # inspecta-core: Pure Back-Office Logic for Inspecta
//!
//! Cash desk (caja), arqueo and treasury rules of a vehicle-inspection
//! center, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Inspecta Back Office                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │         Vehicle service (registration, inspection lanes)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ VehicleServiceMessage                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 inspecta-service (BackOffice)                   │   │
//! │  │   open / record / summary / close · treasury · handovers        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ inspecta-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────────┐ ┌──────────────┐   │   │
//! │  │   │ session  │ │  ledger  │ │reconciliation│ │   treasury   │   │   │
//! │  │   │ balance  │ │ payment  │ │ denomination │ │   vehicle    │   │   │
//! │  │   └──────────┘ └──────────┘ └──────────────┘ └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 inspecta-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Sessions, movements, close notifications
//! - [`money`] - Whole-peso integer money
//! - [`payment`] - Payment methods and whether they touch the drawer
//! - [`denomination`] - Bill/coin tallies and the vault inventory
//! - [`ledger`] - Append-only movement ledger of a session
//! - [`balance`] - Expected drawer cash and session summaries
//! - [`reconciliation`] - Arqueo classification and justification rule
//! - [`session`] - Open/close state machine
//! - [`treasury`] - Central vault ledger and reports
//! - [`vehicle`] - Inbound charge messages from the vehicle service
//! - [`validation`] - Input rules shared by all of the above
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use inspecta_core::*;
//!
//! let mut session = CashSession::open("op-1", Money::from_units(50_000), Shift::Morning, Utc::now()).unwrap();
//! let mut ledger = MovementLedger::new(session.id.clone());
//! ledger.append(&session, MovementInput::new(
//!     MovementKind::VehicleCharge, Money::from_units(85_000), PaymentMethod::Cash, "RTM ABC123"),
//!     "op-1", Utc::now()).unwrap();
//!
//! let count = DenominationCount::new().with(Denomination::Bill50000, 2).with(Denomination::Bill20000, 1).with(Denomination::Bill5000, 3);
//! let result = session.close(&ledger, &CloseRequest::new(count), &ReconciliationEngine::default(), Utc::now()).unwrap();
//! assert_eq!(result.classification, Classification::Balanced);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod balance;
pub mod denomination;
pub mod error;
pub mod ledger;
pub mod money;
pub mod payment;
pub mod reconciliation;
pub mod session;
pub mod treasury;
pub mod types;
pub mod validation;
pub mod vehicle;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use balance::{CashSessionSummary, ConceptBreakdown};
pub use denomination::*;
pub use error::{CoreError, CoreResult, ErrorCategory, ValidationError};
pub use ledger::*;
pub use money::Money;
pub use payment::{PaymentMethod, PaymentMethodRegistry};
pub use reconciliation::*;
pub use session::*;
pub use treasury::*;
pub use types::*;
pub use validation::MAX_AMOUNT;
pub use vehicle::*;
