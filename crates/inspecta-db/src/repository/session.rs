//! # Session Repository
//!
//! Durable store of cash sessions.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Session Lifecycle                                 │
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── insert() → status 'active', version 0                          │
//! │         (partial unique index: one active row per operator)            │
//! │                                                                         │
//! │  2. MOVEMENTS                                                          │
//! │     └── MovementRepository::append() (only while 'active')             │
//! │                                                                         │
//! │  3. CLOSE                                                              │
//! │     └── close() → SINGLE TRANSACTION                                   │
//! │         UPDATE ... WHERE id = ? AND status = 'active' AND version = ?  │
//! │         INSERT INTO close_notifications                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::notification::insert_notification;
use inspecta_core::{
    CashSession, Classification, CloseNotification, DenominationCount, Money, SessionStatus, Shift,
};

/// Raw `cash_sessions` row. The closing tally is JSON text.
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    operator_id: String,
    shift: Shift,
    status: SessionStatus,
    opened_at: DateTime<Utc>,
    initial_amount: Money,
    closed_at: Option<DateTime<Utc>>,
    expected_amount: Option<Money>,
    counted_amount: Option<Money>,
    difference: Option<Money>,
    classification: Option<Classification>,
    closing_notes: Option<String>,
    closing_count: Option<String>,
    version: i64,
}

impl TryFrom<SessionRow> for CashSession {
    type Error = DbError;

    fn try_from(row: SessionRow) -> DbResult<Self> {
        let closing_count = row
            .closing_count
            .as_deref()
            .map(serde_json::from_str::<DenominationCount>)
            .transpose()?;

        Ok(CashSession {
            id: row.id,
            operator_id: row.operator_id,
            shift: row.shift,
            status: row.status,
            opened_at: row.opened_at,
            initial_amount: row.initial_amount,
            closed_at: row.closed_at,
            expected_amount: row.expected_amount,
            counted_amount: row.counted_amount,
            difference: row.difference,
            classification: row.classification,
            closing_notes: row.closing_notes,
            closing_count,
            version: row.version,
        })
    }
}

const SELECT_SESSION: &str = r#"
    SELECT
        id, operator_id, shift, status, opened_at, initial_amount,
        closed_at, expected_amount, counted_amount, difference,
        classification, closing_notes, closing_count, version
    FROM cash_sessions
"#;

/// Repository for cash session operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Inserts a freshly opened session.
    ///
    /// ## Errors
    /// `UniqueViolation` on `cash_sessions.operator_id` when the operator
    /// already has an active session.
    pub async fn insert(&self, session: &CashSession) -> DbResult<()> {
        debug!(session_id = %session.id, operator_id = %session.operator_id, "Inserting cash session");

        sqlx::query(
            r#"
            INSERT INTO cash_sessions (
                id, operator_id, shift, status, opened_at, initial_amount, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&session.id)
        .bind(&session.operator_id)
        .bind(session.shift)
        .bind(session.status)
        .bind(session.opened_at)
        .bind(session.initial_amount)
        .bind(session.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashSession>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!("{SELECT_SESSION} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(CashSession::try_from).transpose()
    }

    /// Like [`get_by_id`](Self::get_by_id) but missing rows are an error.
    pub async fn require(&self, id: &str) -> DbResult<CashSession> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("CashSession", id))
    }

    /// The operator's open session, if any.
    pub async fn find_active(&self, operator_id: &str) -> DbResult<Option<CashSession>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "{SELECT_SESSION} WHERE operator_id = ?1 AND status = 'active'"
        ))
        .bind(operator_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CashSession::try_from).transpose()
    }

    /// The operator's most recently closed session.
    pub async fn last_closed(&self, operator_id: &str) -> DbResult<Option<CashSession>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "{SELECT_SESSION} WHERE operator_id = ?1 AND status = 'closed' \
             ORDER BY closed_at DESC, rowid DESC LIMIT 1"
        ))
        .bind(operator_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CashSession::try_from).transpose()
    }

    /// Sessions newest first. `operator_id = None` lists every operator.
    pub async fn history(&self, operator_id: Option<&str>, limit: i64) -> DbResult<Vec<CashSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "{SELECT_SESSION} WHERE (?1 IS NULL OR operator_id = ?1) \
             ORDER BY opened_at DESC, rowid DESC LIMIT ?2"
        ))
        .bind(operator_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CashSession::try_from).collect()
    }

    /// Every open session, oldest first.
    pub async fn list_active(&self) -> DbResult<Vec<CashSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "{SELECT_SESSION} WHERE status = 'active' ORDER BY opened_at, rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CashSession::try_from).collect()
    }

    /// Persists a close computed in memory and raises its notification.
    ///
    /// `closed` carries the new state; `expected_version` is the version it
    /// was loaded with. Zero matching rows means another writer got there
    /// first and nothing is written.
    pub async fn close(
        &self,
        closed: &CashSession,
        expected_version: i64,
        notification: &CloseNotification,
    ) -> DbResult<()> {
        let closing_count = closed
            .closing_count
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE cash_sessions SET
                status = 'closed',
                closed_at = ?3,
                expected_amount = ?4,
                counted_amount = ?5,
                difference = ?6,
                classification = ?7,
                closing_notes = ?8,
                closing_count = ?9,
                version = ?10
            WHERE id = ?1 AND status = 'active' AND version = ?2
            "#,
        )
        .bind(&closed.id)
        .bind(expected_version)
        .bind(closed.closed_at)
        .bind(closed.expected_amount)
        .bind(closed.counted_amount)
        .bind(closed.difference)
        .bind(closed.classification)
        .bind(&closed.closing_notes)
        .bind(closing_count)
        .bind(closed.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::conflict("CashSession", &closed.id));
        }

        insert_notification(&mut *tx, notification).await?;
        tx.commit().await?;

        debug!(session_id = %closed.id, version = closed.version, "Cash session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use inspecta_core::{CloseRequest, Denomination, MovementLedger, ReconciliationEngine};

    fn open(operator: &str) -> CashSession {
        CashSession::open(operator, Money::from_units(50_000), Shift::Morning, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_active() {
        let db = Database::in_memory().await.unwrap();
        let session = open("op-1");
        db.sessions().insert(&session).await.unwrap();

        let found = db.sessions().find_active("op-1").await.unwrap().unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.initial_amount, Money::from_units(50_000));
        assert_eq!(found.status, SessionStatus::Active);
        assert!(db.sessions().find_active("op-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_active_session_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        db.sessions().insert(&open("op-1")).await.unwrap();

        let err = db.sessions().insert(&open("op-1")).await.unwrap_err();
        assert!(err.is_unique_violation_on("cash_sessions.operator_id"));

        // another operator is fine
        db.sessions().insert(&open("op-2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_versioned() {
        let db = Database::in_memory().await.unwrap();
        let mut session = open("op-1");
        db.sessions().insert(&session).await.unwrap();

        let ledger = MovementLedger::new(session.id.clone());
        let count = DenominationCount::new().with(Denomination::Bill50000, 1);
        let loaded_version = session.version;
        session
            .close(&ledger, &CloseRequest::new(count), &ReconciliationEngine::default(), Utc::now())
            .unwrap();
        let note = session.close_notification().unwrap();

        db.sessions().close(&session, loaded_version, &note).await.unwrap();

        let stored = db.sessions().require(&session.id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::Closed);
        assert_eq!(stored.closing_count, Some(count));
        assert_eq!(stored.classification, Some(Classification::Balanced));
        assert_eq!(stored.version, 1);

        // a stale writer loses
        let again = db.sessions().close(&session, loaded_version, &note).await;
        assert!(matches!(again, Err(DbError::Conflict { .. })));

        // the operator may open again
        db.sessions().insert(&open("op-1")).await.unwrap();
        let last = db.sessions().last_closed("op-1").await.unwrap().unwrap();
        assert_eq!(last.id, session.id);
    }

    #[tokio::test]
    async fn test_history_filters_by_operator() {
        let db = Database::in_memory().await.unwrap();
        db.sessions().insert(&open("op-1")).await.unwrap();
        db.sessions().insert(&open("op-2")).await.unwrap();

        assert_eq!(db.sessions().history(Some("op-1"), 10).await.unwrap().len(), 1);
        assert_eq!(db.sessions().history(None, 10).await.unwrap().len(), 2);
        assert_eq!(db.sessions().history(None, 1).await.unwrap().len(), 1);
        assert_eq!(db.sessions().list_active().await.unwrap().len(), 2);
    }
}
