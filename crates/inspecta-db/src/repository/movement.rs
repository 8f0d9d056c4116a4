//! # Movement Repository
//!
//! Append-only storage of session movements. There is no update or delete:
//! corrections are new rows.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use inspecta_core::{Money, Movement, MovementKind, MovementLedger, PaymentMethod};

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: String,
    session_id: String,
    kind: MovementKind,
    amount: Money,
    payment_method: PaymentMethod,
    concept: String,
    vehicle_ref: Option<String>,
    created_at: DateTime<Utc>,
    created_by: String,
}

impl From<MovementRow> for Movement {
    fn from(row: MovementRow) -> Self {
        Movement {
            id: row.id,
            session_id: row.session_id,
            kind: row.kind,
            amount: row.amount,
            payment_method: row.payment_method,
            concept: row.concept,
            vehicle_ref: row.vehicle_ref,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Appends a movement if, and only if, its session is still active.
    ///
    /// The status check and the insert are one statement, so a close that
    /// commits first always wins.
    ///
    /// ## Errors
    /// `Conflict` when the session is closed (or missing).
    pub async fn append(&self, movement: &Movement) -> DbResult<()> {
        debug!(
            session_id = %movement.session_id,
            kind = ?movement.kind,
            amount = %movement.amount,
            "Appending movement"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO cash_movements (
                id, session_id, kind, amount, payment_method,
                concept, vehicle_ref, created_at, created_by
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
            WHERE EXISTS (
                SELECT 1 FROM cash_sessions WHERE id = ?2 AND status = 'active'
            )
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.session_id)
        .bind(movement.kind)
        .bind(movement.amount)
        .bind(movement.payment_method)
        .bind(&movement.concept)
        .bind(&movement.vehicle_ref)
        .bind(movement.created_at)
        .bind(&movement.created_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("CashSession", &movement.session_id));
        }

        Ok(())
    }

    /// Movements of a session in insertion order.
    pub async fn list_by_session(&self, session_id: &str) -> DbResult<Vec<Movement>> {
        let rows: Vec<MovementRow> = sqlx::query_as(
            r#"
            SELECT
                id, session_id, kind, amount, payment_method,
                concept, vehicle_ref, created_at, created_by
            FROM cash_movements
            WHERE session_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Movement::from).collect())
    }

    /// Loads a session's movements into a [`MovementLedger`].
    pub async fn ledger(&self, session_id: &str) -> DbResult<MovementLedger> {
        let entries = self.list_by_session(session_id).await?;
        Ok(MovementLedger::from_entries(session_id, entries))
    }

    /// Movements linked to a vehicle-service record, across sessions.
    pub async fn find_by_vehicle_ref(&self, vehicle_ref: &str) -> DbResult<Vec<Movement>> {
        let rows: Vec<MovementRow> = sqlx::query_as(
            r#"
            SELECT
                id, session_id, kind, amount, payment_method,
                concept, vehicle_ref, created_at, created_by
            FROM cash_movements
            WHERE vehicle_ref = ?1
            ORDER BY rowid
            "#,
        )
        .bind(vehicle_ref)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Movement::from).collect())
    }

    pub async fn count_by_session(&self, session_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cash_movements WHERE session_id = ?1")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
