//! # BackOffice
//!
//! The single entry point consumers hold. Cash-desk operations live in
//! [`desk`](crate::desk), treasury operations in [`treasury`](crate::treasury).
//!
//! ## Runtime State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BackOffice                                                             │
//! │                                                                         │
//! │  Database ─────────── SQLite pool (source of truth)                     │
//! │  ReconciliationEngine  arqueo policy from config                        │
//! │  SessionLocks ──────── one writer per cash session                      │
//! │  SummaryCache ──────── short-TTL summaries                              │
//! │  EventBus ──────────── broadcast of BackOfficeEvent                     │
//! │  Mutex<TreasuryState>  one treasury writer; last alert state            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `BackOffice` is `Send + Sync`; share it behind an `Arc`.

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use inspecta_core::{ReconciliationEngine, TreasurySettings};
use inspecta_db::Database;

use crate::cache::SummaryCache;
use crate::config::ServiceConfig;
use crate::error::ServiceResult;
use crate::events::{BackOfficeEvent, EventBus};
use crate::locks::SessionLocks;

/// Guarded by the treasury mutex.
#[derive(Debug)]
pub(crate) struct TreasuryState {
    /// Whether the balance was below the alert threshold at the last check.
    pub(crate) below_threshold: bool,
}

pub struct BackOffice {
    pub(crate) db: Database,
    pub(crate) config: ServiceConfig,
    pub(crate) engine: ReconciliationEngine,
    pub(crate) locks: SessionLocks,
    pub(crate) cache: SummaryCache,
    pub(crate) events: EventBus,
    pub(crate) treasury: Mutex<TreasuryState>,
}

impl BackOffice {
    /// Opens the configured database, runs migrations and seeds settings.
    pub async fn new(config: ServiceConfig) -> ServiceResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()).await?;
        Self::from_database(db, config).await
    }

    /// Builds on an already-open database.
    pub async fn from_database(db: Database, config: ServiceConfig) -> ServiceResult<Self> {
        config.validate()?;
        let defaults = TreasurySettings::with_threshold(config.treasury.default_alert_threshold, Utc::now());
        db.treasury().ensure_settings(&defaults).await?;

        let settings = db.treasury().settings().await?.unwrap_or(defaults);
        let balance = db.treasury().ledger().await?.current_balance();
        let below_threshold = balance < settings.alert_threshold;

        info!(
            database = %config.database.path.display(),
            threshold = %config.reconciliation.threshold,
            summary_ttl_secs = config.cache.summary_ttl_secs,
            treasury_balance = %balance,
            "Back office ready"
        );

        Ok(BackOffice {
            engine: config.reconciliation_engine(),
            locks: SessionLocks::new(),
            cache: SummaryCache::new(config.summary_ttl()),
            events: EventBus::new(config.notifications.channel_capacity),
            treasury: Mutex::new(TreasuryState { below_threshold }),
            db,
            config,
        })
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<BackOfficeEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Re-evaluates the low-balance alert after a treasury write.
    ///
    /// Publishes only when the balance crosses below the threshold, so a
    /// treasury that stays low does not alert on every movement. Runs after
    /// the write has committed, so a failure here is logged and the previous
    /// alert state kept for the next check.
    pub(crate) async fn check_balance_alert(&self, state: &mut TreasuryState) {
        if let Err(err) = self.evaluate_balance_alert(state).await {
            warn!(error = %err, "Treasury alert check failed");
        }
    }

    async fn evaluate_balance_alert(&self, state: &mut TreasuryState) -> ServiceResult<()> {
        let settings = self.load_treasury_settings().await?;
        let current_balance = self.db.treasury().ledger().await?.current_balance();
        let below = current_balance < settings.alert_threshold;

        if below && !state.below_threshold && settings.notify_low_balance {
            warn!(
                balance = %current_balance,
                threshold = %settings.alert_threshold,
                "Treasury balance below alert threshold"
            );
            self.events.publish(BackOfficeEvent::BalanceAlert {
                current_balance,
                alert_threshold: settings.alert_threshold,
                notification_email: settings.notification_email.clone(),
            });
        }

        state.below_threshold = below;
        Ok(())
    }

    pub(crate) async fn load_treasury_settings(&self) -> ServiceResult<TreasurySettings> {
        Ok(self.db.treasury().settings().await?.unwrap_or_else(|| {
            TreasurySettings::with_threshold(self.config.treasury.default_alert_threshold, Utc::now())
        }))
    }
}
