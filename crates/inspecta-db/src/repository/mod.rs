//! # Repository Module
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BackOffice (inspecta-service)                                          │
//! │       │                                                                 │
//! │       │  db.sessions().find_active("op-1")                              │
//! │       ▼                                                                 │
//! │  SessionRepository ── MovementRepository ── NotificationRepository     │
//! │                          TreasuryRepository                            │
//! │       │                                                                 │
//! │       │  SQL Query (rows converted into inspecta-core types)            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories never decide business rules. Guarded writes only report a
//! [`Conflict`](crate::DbError::Conflict) when the row they expected is gone.

pub mod movement;
pub mod notification;
pub mod session;
pub mod treasury;
