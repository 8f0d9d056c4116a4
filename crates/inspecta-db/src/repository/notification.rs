//! # Close Notification Repository
//!
//! The administrator's inbox of closed tills. Rows are created inside the
//! close transaction (see [`SessionRepository::close`]) and move
//! `pending → read` when treasury receives the cash, or `→ archived`.
//!
//! [`SessionRepository::close`]: crate::repository::session::SessionRepository::close

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbError, DbResult};
use inspecta_core::{CloseNotification, Money, NotificationStatus, Shift};

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: String,
    session_id: String,
    operator_id: String,
    shift: Shift,
    closed_at: DateTime<Utc>,
    cash_to_deliver: Money,
    expected_amount: Money,
    counted_amount: Money,
    difference: Money,
    notes: Option<String>,
    status: NotificationStatus,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for CloseNotification {
    fn from(row: NotificationRow) -> Self {
        CloseNotification {
            id: row.id,
            session_id: row.session_id,
            operator_id: row.operator_id,
            shift: row.shift,
            closed_at: row.closed_at,
            cash_to_deliver: row.cash_to_deliver,
            expected_amount: row.expected_amount,
            counted_amount: row.counted_amount,
            difference: row.difference,
            notes: row.notes,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

const SELECT_NOTIFICATION: &str = r#"
    SELECT
        id, session_id, operator_id, shift, closed_at, cash_to_deliver,
        expected_amount, counted_amount, difference, notes, status, created_at
    FROM close_notifications
"#;

pub(crate) async fn insert_notification(
    conn: &mut SqliteConnection,
    notification: &CloseNotification,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO close_notifications (
            id, session_id, operator_id, shift, closed_at, cash_to_deliver,
            expected_amount, counted_amount, difference, notes, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&notification.id)
    .bind(&notification.session_id)
    .bind(&notification.operator_id)
    .bind(notification.shift)
    .bind(notification.closed_at)
    .bind(notification.cash_to_deliver)
    .bind(notification.expected_amount)
    .bind(notification.counted_amount)
    .bind(notification.difference)
    .bind(&notification.notes)
    .bind(notification.status)
    .bind(notification.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Moves a notification from `from` to `to`; zero rows is a conflict.
pub(crate) async fn transition_notification(
    conn: &mut SqliteConnection,
    id: &str,
    from: NotificationStatus,
    to: NotificationStatus,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE close_notifications SET status = ?3 WHERE id = ?1 AND status = ?2")
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::conflict("CloseNotification", id));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CloseNotification>> {
        let row: Option<NotificationRow> =
            sqlx::query_as(&format!("{SELECT_NOTIFICATION} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(CloseNotification::from))
    }

    pub async fn get_by_session(&self, session_id: &str) -> DbResult<Option<CloseNotification>> {
        let row: Option<NotificationRow> =
            sqlx::query_as(&format!("{SELECT_NOTIFICATION} WHERE session_id = ?1"))
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(CloseNotification::from))
    }

    /// Notifications in `status`, oldest close first.
    pub async fn list_by_status(&self, status: NotificationStatus) -> DbResult<Vec<CloseNotification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "{SELECT_NOTIFICATION} WHERE status = ?1 ORDER BY closed_at, rowid"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CloseNotification::from).collect())
    }

    /// Cash announced by closed tills and not yet received by treasury.
    pub async fn pending_total(&self) -> DbResult<Money> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(cash_to_deliver) FROM close_notifications WHERE status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_units(total.unwrap_or(0)))
    }

    /// Archives a notification that is pending or read.
    pub async fn archive(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE close_notifications SET status = 'archived' WHERE id = ?1 AND status <> 'archived'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("CloseNotification", id));
        }
        Ok(())
    }

    pub async fn mark_read(&self, id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        transition_notification(&mut conn, id, NotificationStatus::Pending, NotificationStatus::Read).await
    }
}
