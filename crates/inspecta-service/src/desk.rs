//! # Cash Desk Operations
//!
//! Open a till, record movements, read its summary, close it with an arqueo.
//!
//! ## Write Path
//! ```text
//! record_movement / close_session
//!   │
//!   ├── SessionLocks::acquire(session_id)
//!   ├── reload session (must still be Active)
//!   ├── inspecta-core validates and computes
//!   ├── inspecta-db persists behind a storage guard
//!   ├── SummaryCache::invalidate(session_id)
//!   └── EventBus::publish(..)
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use inspecta_core::{
    balance, ensure_can_open, validation, CashSession, CashSessionSummary, CloseNotification,
    CloseRequest, CoreError, Money, Movement, MovementInput, MovementLedger, ReconciliationResult,
    Shift, VehicleServiceMessage,
};
use inspecta_db::DbError;

use crate::back_office::BackOffice;
use crate::context::OperatorContext;
use crate::error::{ServiceError, ServiceResult};
use crate::events::BackOfficeEvent;

/// Outcome of a successful close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClosure {
    pub session: CashSession,
    pub result: ReconciliationResult,
    pub notification: CloseNotification,
}

/// A session with everything recorded against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: CashSession,
    pub movements: Vec<Movement>,
    pub summary: CashSessionSummary,
}

impl BackOffice {
    /// Opens a till for the calling operator.
    pub async fn open_session(
        &self,
        ctx: &OperatorContext,
        initial_amount: Money,
        shift: Shift,
    ) -> ServiceResult<CashSession> {
        let current = self.db.sessions().find_active(&ctx.operator_id).await?;
        ensure_can_open(&ctx.operator_id, current.as_ref())?;

        let session = CashSession::open(&ctx.operator_id, initial_amount, shift, Utc::now())?;

        // Two concurrent opens both pass the check above; the unique index decides.
        self.db.sessions().insert(&session).await.map_err(|e| {
            if e.is_unique_violation_on("cash_sessions.operator_id") {
                ServiceError::from(CoreError::AlreadyOpen {
                    operator_id: ctx.operator_id.clone(),
                })
            } else {
                ServiceError::from(e)
            }
        })?;

        info!(
            session_id = %session.id,
            operator_id = %session.operator_id,
            shift = ?session.shift,
            initial_amount = %session.initial_amount,
            "Cash session opened"
        );
        Ok(session)
    }

    /// Appends a movement to an Active session.
    pub async fn record_movement(
        &self,
        ctx: &OperatorContext,
        session_id: &str,
        input: MovementInput,
    ) -> ServiceResult<Movement> {
        let _guard = self.locks.acquire(session_id).await;
        let session = self.load_session(ctx, session_id).await?;

        let movement = MovementLedger::prepare(&session, input, &ctx.operator_id, Utc::now())?;

        self.db.movements().append(&movement).await.map_err(|e| match e {
            // The row stopped being Active between the read and the insert.
            DbError::Conflict { .. } => ServiceError::from(CoreError::SessionClosed {
                session_id: session_id.to_string(),
            }),
            other => ServiceError::from(other),
        })?;
        self.cache.invalidate(session_id).await;

        // The movement is stored: a failed re-read must not turn into an error
        // the caller would retry.
        let expected_physical_cash = match self.compute_summary(&session).await {
            Ok(summary) => {
                let expected = summary.expected_physical_cash;
                self.cache.put(summary).await;
                Some(expected)
            }
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "Summary refresh failed after append");
                None
            }
        };

        info!(
            session_id = %session_id,
            movement_id = %movement.id,
            kind = ?movement.kind,
            amount = %movement.amount,
            method = ?movement.payment_method,
            "Movement recorded"
        );
        self.events.publish(BackOfficeEvent::movement_recorded(
            &movement,
            expected_physical_cash,
        ));

        Ok(movement)
    }

    /// Records a charge or commission reported by the vehicle service.
    pub async fn record_vehicle_charge(
        &self,
        ctx: &OperatorContext,
        session_id: &str,
        message: VehicleServiceMessage,
    ) -> ServiceResult<Movement> {
        let vehicle_ref = message.vehicle_ref().to_string();
        let movement = self
            .record_movement(ctx, session_id, message.into_movement_input())
            .await?;
        info!(session_id = %session_id, vehicle_ref = %vehicle_ref, "Vehicle charge recorded");
        Ok(movement)
    }

    /// Derived balances of a session; served from the cache when fresh.
    pub async fn get_summary(&self, ctx: &OperatorContext, session_id: &str) -> ServiceResult<CashSessionSummary> {
        let session = self.load_session(ctx, session_id).await?;

        if let Some(summary) = self.cache.get(session_id).await {
            return Ok(summary);
        }

        let summary = self.compute_summary(&session).await?;
        self.cache.put(summary.clone()).await;
        Ok(summary)
    }

    /// Runs the arqueo and closes the session.
    ///
    /// A rejected close leaves the session Active and unchanged; the error
    /// names the blocker (missing justification, tally mismatch, ...).
    pub async fn close_session(
        &self,
        ctx: &OperatorContext,
        session_id: &str,
        request: CloseRequest,
    ) -> ServiceResult<SessionClosure> {
        let guard = self.locks.acquire(session_id).await;
        let mut session = self.load_session(ctx, session_id).await?;
        let ledger = self.db.movements().ledger(session_id).await?;
        let loaded_version = session.version;

        let result = match session.close(&ledger, &request, &self.engine, Utc::now()) {
            Ok(result) => result,
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "Close rejected");
                return Err(err.into());
            }
        };
        let notification = session.close_notification()?;

        self.db
            .sessions()
            .close(&session, loaded_version, &notification)
            .await
            .map_err(|e| match e {
                DbError::Conflict { .. } => ServiceError::from(CoreError::Conflict {
                    entity: "CashSession".to_string(),
                    id: session_id.to_string(),
                }),
                other => ServiceError::from(other),
            })?;

        self.cache.invalidate(session_id).await;
        drop(guard);

        info!(
            session_id = %session_id,
            expected = %result.expected_amount,
            counted = %result.counted_amount,
            difference = %result.difference,
            classification = ?result.classification,
            "Cash session closed"
        );
        self.events.publish(BackOfficeEvent::SessionClosed(notification.clone()));

        Ok(SessionClosure {
            session,
            result,
            notification,
        })
    }

    /// The caller's Active session, if any.
    pub async fn active_session(&self, ctx: &OperatorContext) -> ServiceResult<Option<CashSession>> {
        Ok(self.db.sessions().find_active(&ctx.operator_id).await?)
    }

    /// Every Active session; administrators only.
    pub async fn active_sessions(&self, ctx: &OperatorContext) -> ServiceResult<Vec<CashSession>> {
        ctx.require_admin("list active sessions")?;
        Ok(self.db.sessions().list_active().await?)
    }

    /// The caller's most recently closed session.
    pub async fn last_closed_session(&self, ctx: &OperatorContext) -> ServiceResult<Option<CashSession>> {
        Ok(self.db.sessions().last_closed(&ctx.operator_id).await?)
    }

    /// Newest first. Cashiers see their own sessions, administrators all.
    pub async fn session_history(&self, ctx: &OperatorContext, limit: i64) -> ServiceResult<Vec<CashSession>> {
        validation::validate_history_limit(limit)?;
        let operator = (!ctx.is_admin()).then_some(ctx.operator_id.as_str());
        Ok(self.db.sessions().history(operator, limit).await?)
    }

    pub async fn session_detail(&self, ctx: &OperatorContext, session_id: &str) -> ServiceResult<SessionDetail> {
        let session = self.load_session(ctx, session_id).await?;
        let ledger = self.db.movements().ledger(session_id).await?;
        let summary = balance::summarize(&session, &ledger);

        Ok(SessionDetail {
            session,
            movements: ledger.list().to_vec(),
            summary,
        })
    }

    /// Movements of a session in insertion order.
    pub async fn list_movements(&self, ctx: &OperatorContext, session_id: &str) -> ServiceResult<Vec<Movement>> {
        self.load_session(ctx, session_id).await?;
        Ok(self.db.movements().list_by_session(session_id).await?)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load_session(&self, ctx: &OperatorContext, session_id: &str) -> ServiceResult<CashSession> {
        let session = self
            .db
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        ctx.ensure_can_access(&session)?;
        Ok(session)
    }

    async fn compute_summary(&self, session: &CashSession) -> ServiceResult<CashSessionSummary> {
        let ledger = self.db.movements().ledger(&session.id).await?;
        Ok(balance::summarize(session, &ledger))
    }
}
