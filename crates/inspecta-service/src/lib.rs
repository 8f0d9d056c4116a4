//! # inspecta-service: Back-Office Orchestration
//!
//! The cash desk and treasury operations of a vehicle-inspection center,
//! built on [`inspecta_core`] (rules) and [`inspecta_db`] (storage).
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          inspecta-service                               │
//! │                                                                         │
//! │   OperatorContext ──► BackOffice ──┬── desk       (cashier operations)  │
//! │                                    ├── treasury   (administrator)       │
//! │                                    ├── locks      (per-session mutex)   │
//! │                                    ├── cache      (summary TTL)         │
//! │                                    └── events     (broadcast)           │
//! │                                                                         │
//! │   ServiceConfig (TOML + env) ──► init_tracing, DbConfig, arqueo policy  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use inspecta_core::{CloseRequest, Denomination, DenominationCount, Money, Shift};
//! use inspecta_service::{BackOffice, OperatorContext, ServiceConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let office = BackOffice::new(ServiceConfig::load(None)?).await?;
//! let cashier = OperatorContext::cashier("cajero-1");
//!
//! let session = office.open_session(&cashier, Money::from_units(50_000), Shift::Morning).await?;
//! let count = DenominationCount::new().with(Denomination::Bill50000, 1);
//! office.close_session(&cashier, &session.id, CloseRequest::new(count)).await?;
//! # Ok(())
//! # }
//! ```

pub mod back_office;
pub mod cache;
pub mod config;
pub mod context;
pub mod desk;
pub mod error;
pub mod events;
pub mod locks;
pub mod treasury;

pub use back_office::BackOffice;
pub use config::ServiceConfig;
pub use context::{OperatorContext, Role};
pub use desk::{SessionClosure, SessionDetail};
pub use error::{ErrorKind, ErrorResponse, ServiceError, ServiceResult};
pub use events::BackOfficeEvent;
pub use treasury::HandoverReceipt;

pub use inspecta_db::TreasuryMovementFilter;

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,inspecta=debug,sqlx=warn";

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins, then `logging.filter` from the config, then the default.
/// Calling it twice is harmless.
pub fn init_tracing(config: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = config.logging.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER);
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    });

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
