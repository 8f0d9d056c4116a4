//! # Treasury Repository
//!
//! The central vault ledger and its single settings row.
//!
//! ## Handover
//! ```text
//! receive_handover(notification_id, movement?)
//!   ┌──────────────────── SINGLE TRANSACTION ────────────────────┐
//!   │ INSERT INTO treasury_movements (linked_session_id UNIQUE)  │
//!   │ UPDATE close_notifications SET status = 'read'             │
//!   │   WHERE id = ? AND status = 'pending'                      │
//!   └─────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::notification::transition_notification;
use inspecta_core::{
    DenominationCount, Money, NotificationStatus, TreasuryCategory, TreasuryLedger, TreasuryMethod,
    TreasuryMovement, TreasurySettings,
};

#[derive(Debug, sqlx::FromRow)]
struct TreasuryMovementRow {
    id: String,
    category: TreasuryCategory,
    amount: Money,
    payment_method: TreasuryMethod,
    concept: String,
    voucher_number: Option<String>,
    linked_session_id: Option<String>,
    denomination_count: Option<String>,
    occurred_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    created_by: String,
}

impl TryFrom<TreasuryMovementRow> for TreasuryMovement {
    type Error = crate::error::DbError;

    fn try_from(row: TreasuryMovementRow) -> DbResult<Self> {
        let denomination_count = row
            .denomination_count
            .as_deref()
            .map(serde_json::from_str::<DenominationCount>)
            .transpose()?;

        Ok(TreasuryMovement {
            id: row.id,
            category: row.category,
            amount: row.amount,
            payment_method: row.payment_method,
            concept: row.concept,
            voucher_number: row.voucher_number,
            linked_session_id: row.linked_session_id,
            denomination_count,
            occurred_at: row.occurred_at,
            created_at: row.created_at,
            created_by: row.created_by,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    alert_threshold: Money,
    notify_low_balance: bool,
    notification_email: Option<String>,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

impl From<SettingsRow> for TreasurySettings {
    fn from(row: SettingsRow) -> Self {
        TreasurySettings {
            alert_threshold: row.alert_threshold,
            notify_low_balance: row.notify_low_balance,
            notification_email: row.notification_email,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        }
    }
}

const SELECT_MOVEMENT: &str = r#"
    SELECT
        id, category, amount, payment_method, concept, voucher_number,
        linked_session_id, denomination_count, occurred_at, created_at, created_by
    FROM treasury_movements
"#;

/// Optional filters for listing treasury movements. Empty means all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryMovementFilter {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<TreasuryCategory>,
    #[serde(default)]
    pub payment_method: Option<TreasuryMethod>,
    #[serde(default)]
    pub limit: Option<i64>,
}

async fn insert_movement(conn: &mut SqliteConnection, movement: &TreasuryMovement) -> DbResult<()> {
    let denomination_count = movement
        .denomination_count
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        r#"
        INSERT INTO treasury_movements (
            id, category, amount, payment_method, concept, voucher_number,
            linked_session_id, denomination_count, occurred_at, created_at, created_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&movement.id)
    .bind(movement.category)
    .bind(movement.amount)
    .bind(movement.payment_method)
    .bind(&movement.concept)
    .bind(&movement.voucher_number)
    .bind(&movement.linked_session_id)
    .bind(denomination_count)
    .bind(movement.occurred_at)
    .bind(movement.created_at)
    .bind(&movement.created_by)
    .execute(conn)
    .await?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct TreasuryRepository {
    pool: SqlitePool,
}

impl TreasuryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TreasuryRepository { pool }
    }

    // ===== Movements =====

    pub async fn insert(&self, movement: &TreasuryMovement) -> DbResult<()> {
        debug!(
            id = %movement.id,
            category = ?movement.category,
            amount = %movement.amount,
            "Inserting treasury movement"
        );
        let mut conn = self.pool.acquire().await?;
        insert_movement(&mut conn, movement).await
    }

    /// Records a received handover and marks its notification read, together.
    ///
    /// `movement` is `None` when the till handed over no cash; the
    /// notification is still marked read.
    pub async fn receive_handover(
        &self,
        notification_id: &str,
        movement: Option<&TreasuryMovement>,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        transition_notification(
            &mut *tx,
            notification_id,
            NotificationStatus::Pending,
            NotificationStatus::Read,
        )
        .await?;

        if let Some(movement) = movement {
            insert_movement(&mut *tx, movement).await?;
        }

        tx.commit().await?;
        debug!(notification_id = %notification_id, "Handover received");
        Ok(())
    }

    /// Every movement in insertion order.
    pub async fn list_all(&self) -> DbResult<Vec<TreasuryMovement>> {
        let rows: Vec<TreasuryMovementRow> =
            sqlx::query_as(&format!("{SELECT_MOVEMENT} ORDER BY rowid"))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TreasuryMovement::try_from).collect()
    }

    /// Loads the whole ledger for aggregation.
    pub async fn ledger(&self) -> DbResult<TreasuryLedger> {
        Ok(TreasuryLedger::new(self.list_all().await?))
    }

    /// Filtered listing, newest first.
    pub async fn list(&self, filter: &TreasuryMovementFilter) -> DbResult<Vec<TreasuryMovement>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_MOVEMENT);
        query.push(" WHERE 1 = 1");

        if let Some(from) = filter.from {
            query.push(" AND occurred_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND occurred_at <= ").push_bind(to);
        }
        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(method) = filter.payment_method {
            query.push(" AND payment_method = ").push_bind(method);
        }
        query.push(" ORDER BY occurred_at DESC, rowid DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let rows: Vec<TreasuryMovementRow> = query.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(TreasuryMovement::try_from).collect()
    }

    pub async fn find_by_session(&self, session_id: &str) -> DbResult<Option<TreasuryMovement>> {
        let row: Option<TreasuryMovementRow> =
            sqlx::query_as(&format!("{SELECT_MOVEMENT} WHERE linked_session_id = ?1"))
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(TreasuryMovement::try_from).transpose()
    }

    // ===== Settings =====

    /// Inserts the settings row if it does not exist yet.
    pub async fn ensure_settings(&self, defaults: &TreasurySettings) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO treasury_settings (
                id, alert_threshold, notify_low_balance, notification_email, updated_at, updated_by
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(defaults.alert_threshold)
        .bind(defaults.notify_low_balance)
        .bind(&defaults.notification_email)
        .bind(defaults.updated_at)
        .bind(&defaults.updated_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn settings(&self) -> DbResult<Option<TreasurySettings>> {
        let row: Option<SettingsRow> = sqlx::query_as(
            r#"
            SELECT alert_threshold, notify_low_balance, notification_email, updated_at, updated_by
            FROM treasury_settings WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(TreasurySettings::from))
    }

    pub async fn save_settings(&self, settings: &TreasurySettings) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO treasury_settings (
                id, alert_threshold, notify_low_balance, notification_email, updated_at, updated_by
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (id) DO UPDATE SET
                alert_threshold = excluded.alert_threshold,
                notify_low_balance = excluded.notify_low_balance,
                notification_email = excluded.notification_email,
                updated_at = excluded.updated_at,
                updated_by = excluded.updated_by
            "#,
        )
        .bind(settings.alert_threshold)
        .bind(settings.notify_low_balance)
        .bind(&settings.notification_email)
        .bind(settings.updated_at)
        .bind(&settings.updated_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
