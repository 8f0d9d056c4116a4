//! # inspecta-db: Database Layer for Inspecta
//!
//! SQLite storage for the cash desk and the treasury, with sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Inspecta Data Flow                                 │
//! │                                                                         │
//! │  BackOffice::record_movement                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   inspecta-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌──────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │   │   Repositories   │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │◄──│ Session/Movement │   │  (embedded)  │   │   │
//! │  │   │  SqlitePool   │   │ Notification     │   │ 001, 002     │   │   │
//! │  │   │               │   │ Treasury         │   │              │   │   │
//! │  │   └───────────────┘   └──────────────────┘   └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use inspecta_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("inspecta.db")).await?;
//! let open = db.sessions().find_active("op-1").await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};

pub use repository::movement::MovementRepository;
pub use repository::notification::NotificationRepository;
pub use repository::session::SessionRepository;
pub use repository::treasury::{TreasuryMovementFilter, TreasuryRepository};
