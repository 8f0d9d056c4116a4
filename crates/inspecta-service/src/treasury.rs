//! # Treasury Operations
//!
//! Administrator-only. Every write takes the treasury mutex, so the vault
//! inventory check and the insert it guards see the same ledger, and the
//! low-balance alert is evaluated once per write.
//!
//! ## Handover Flow
//! ```text
//! close_session ──► CloseNotification (pending) ──► pending_handovers()
//!                                                        │
//!                        receive_handover(notification_id)
//!                                                        │
//!              ┌─────────────── one transaction ─────────┴────────────┐
//!              │ notification pending → read                          │
//!              │ SessionTransfer income (+cash_to_deliver, tally)     │
//!              └──────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use inspecta_core::{
    CashFlowProjection, CloseNotification, CoreError, DenominationInventory, NotificationStatus,
    TreasuryBalance, TreasuryMovement, TreasuryMovementInput, TreasurySettings,
    TreasurySettingsUpdate, TreasuryStatistics, TreasurySummary, ValidationError,
};
use inspecta_db::{DbError, TreasuryMovementFilter};

use crate::back_office::BackOffice;
use crate::context::OperatorContext;
use crate::error::{ServiceError, ServiceResult};

const MAX_LIST_LIMIT: i64 = 1_000;

/// A received handover. `movement` is `None` when the till delivered no cash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverReceipt {
    pub notification: CloseNotification,
    pub movement: Option<TreasuryMovement>,
}

fn validate_period(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<(), ValidationError> {
    if to < from {
        return Err(ValidationError::InvalidFormat {
            field: "to".to_string(),
            reason: "period end is before its start".to_string(),
        });
    }
    Ok(())
}

fn handover_error(session_id: &str, err: DbError) -> ServiceError {
    if matches!(err, DbError::Conflict { .. })
        || err.is_unique_violation_on("treasury_movements.linked_session_id")
    {
        CoreError::HandoverAlreadyReceived {
            session_id: session_id.to_string(),
        }
        .into()
    } else {
        err.into()
    }
}

impl BackOffice {
    pub async fn record_treasury_movement(
        &self,
        ctx: &OperatorContext,
        input: TreasuryMovementInput,
    ) -> ServiceResult<TreasuryMovement> {
        ctx.require_admin("record treasury movements")?;
        let mut state = self.treasury.lock().await;

        let ledger = self.db.treasury().ledger().await?;
        let movement = ledger.prepare(input, &ctx.operator_id, Utc::now())?;

        self.db.treasury().insert(&movement).await.map_err(|e| match &movement.linked_session_id {
            Some(session_id) => handover_error(session_id, e),
            None => e.into(),
        })?;

        info!(
            movement_id = %movement.id,
            category = ?movement.category,
            amount = %movement.amount,
            method = ?movement.payment_method,
            "Treasury movement recorded"
        );
        self.check_balance_alert(&mut state).await;

        Ok(movement)
    }

    /// Consolidated position, including cash still waiting in closed tills.
    pub async fn get_treasury_balance(&self, ctx: &OperatorContext) -> ServiceResult<TreasuryBalance> {
        ctx.require_admin("view treasury balance")?;
        let ledger = self.db.treasury().ledger().await?;
        let settings = self.load_treasury_settings().await?;
        let pending = self.db.notifications().pending_total().await?;
        Ok(ledger.balance(&settings, pending))
    }

    /// Filtered listing, newest first.
    pub async fn list_treasury_movements(
        &self,
        ctx: &OperatorContext,
        filter: &TreasuryMovementFilter,
    ) -> ServiceResult<Vec<TreasuryMovement>> {
        ctx.require_admin("list treasury movements")?;
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            validate_period(from, to)?;
        }
        if let Some(limit) = filter.limit {
            if !(1..=MAX_LIST_LIMIT).contains(&limit) {
                return Err(ValidationError::OutOfRange {
                    field: "limit".to_string(),
                    min: 1,
                    max: MAX_LIST_LIMIT,
                }
                .into());
            }
        }
        Ok(self.db.treasury().list(filter).await?)
    }

    pub async fn treasury_summary(
        &self,
        ctx: &OperatorContext,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ServiceResult<TreasurySummary> {
        ctx.require_admin("view treasury summary")?;
        validate_period(from, to)?;
        let ledger = self.db.treasury().ledger().await?;
        let settings = self.load_treasury_settings().await?;
        Ok(ledger.summary(&settings, from, to))
    }

    pub async fn treasury_statistics(
        &self,
        ctx: &OperatorContext,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ServiceResult<TreasuryStatistics> {
        ctx.require_admin("view treasury statistics")?;
        validate_period(from, to)?;
        let ledger = self.db.treasury().ledger().await?;
        Ok(ledger.statistics(from, to))
    }

    pub async fn cash_flow_projection(
        &self,
        ctx: &OperatorContext,
        window_days: i64,
    ) -> ServiceResult<CashFlowProjection> {
        ctx.require_admin("view cash flow projection")?;
        let ledger = self.db.treasury().ledger().await?;
        Ok(ledger.project_cash_flow(Utc::now(), window_days)?)
    }

    /// Bills and coins in the vault, replayed from cash movement tallies.
    pub async fn denomination_inventory(&self, ctx: &OperatorContext) -> ServiceResult<DenominationInventory> {
        ctx.require_admin("view vault inventory")?;
        Ok(self.db.treasury().ledger().await?.inventory())
    }

    /// Closed tills whose cash has not been received yet, oldest first.
    pub async fn pending_handovers(&self, ctx: &OperatorContext) -> ServiceResult<Vec<CloseNotification>> {
        ctx.require_admin("view pending handovers")?;
        Ok(self
            .db
            .notifications()
            .list_by_status(NotificationStatus::Pending)
            .await?)
    }

    /// Moves a closed till's cash into treasury.
    pub async fn receive_handover(
        &self,
        ctx: &OperatorContext,
        notification_id: &str,
    ) -> ServiceResult<HandoverReceipt> {
        ctx.require_admin("receive handovers")?;
        let mut state = self.treasury.lock().await;

        let mut notification = self.require_notification(notification_id).await?;
        let session = self.db.sessions().require(&notification.session_id).await?;
        let ledger = self.db.treasury().ledger().await?;

        let movement = ledger.prepare_handover(&notification, &session, &ctx.operator_id, Utc::now())?;
        self.db
            .treasury()
            .receive_handover(notification_id, movement.as_ref())
            .await
            .map_err(|e| handover_error(&session.id, e))?;
        notification.status = NotificationStatus::Read;

        info!(
            notification_id = %notification_id,
            session_id = %session.id,
            amount = %notification.cash_to_deliver,
            "Handover received into treasury"
        );
        self.check_balance_alert(&mut state).await;

        Ok(HandoverReceipt { notification, movement })
    }

    pub async fn archive_notification(
        &self,
        ctx: &OperatorContext,
        notification_id: &str,
    ) -> ServiceResult<CloseNotification> {
        ctx.require_admin("archive notifications")?;
        let mut notification = self.require_notification(notification_id).await?;

        self.db
            .notifications()
            .archive(notification_id)
            .await
            .map_err(|e| match e {
                DbError::Conflict { .. } => ServiceError::from(CoreError::Conflict {
                    entity: "CloseNotification".to_string(),
                    id: notification_id.to_string(),
                }),
                other => other.into(),
            })?;
        notification.status = NotificationStatus::Archived;

        info!(notification_id = %notification_id, "Close notification archived");
        Ok(notification)
    }

    pub async fn treasury_settings(&self, ctx: &OperatorContext) -> ServiceResult<TreasurySettings> {
        ctx.require_admin("view treasury settings")?;
        self.load_treasury_settings().await
    }

    pub async fn update_treasury_settings(
        &self,
        ctx: &OperatorContext,
        update: TreasurySettingsUpdate,
    ) -> ServiceResult<TreasurySettings> {
        ctx.require_admin("update treasury settings")?;
        let mut state = self.treasury.lock().await;

        let mut settings = self.load_treasury_settings().await?;
        settings.apply(&update, &ctx.operator_id, Utc::now())?;
        self.db.treasury().save_settings(&settings).await?;

        info!(
            threshold = %settings.alert_threshold,
            notify = settings.notify_low_balance,
            updated_by = %ctx.operator_id,
            "Treasury settings updated"
        );
        self.check_balance_alert(&mut state).await;

        Ok(settings)
    }

    async fn require_notification(&self, notification_id: &str) -> ServiceResult<CloseNotification> {
        self.db
            .notifications()
            .get_by_id(notification_id)
            .await?
            .ok_or_else(|| CoreError::NotificationNotFound(notification_id.to_string()).into())
    }
}
