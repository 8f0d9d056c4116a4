//! Embedded schema migrations.
//!
//! ```text
//! migrations/sqlite/
//!   001_initial_schema.sql   cash_sessions, cash_movements, close_notifications
//!   002_treasury.sql         treasury_movements, treasury_settings
//! ```
//!
//! Applied migrations are checksummed by sqlx; editing one that has shipped
//! breaks every existing database. Add a new numbered file instead.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Known vs applied migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub known: usize,
    pub applied: usize,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        self.applied >= self.known
    }
}

pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(known = MIGRATOR.migrations.len(), "Applying migrations");
    MIGRATOR.run(pool).await?;
    info!("Schema up to date");
    Ok(())
}

/// A database that was never migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let applied: Option<i64> =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .ok();

    Ok(MigrationStatus {
        known: MIGRATOR.migrations.len(),
        applied: applied.unwrap_or(0).max(0) as usize,
    })
}
