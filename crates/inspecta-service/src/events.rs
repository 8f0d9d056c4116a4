//! # Back-Office Events
//!
//! ```text
//! ┌──────────────────┐  publish   ┌──────────────────────┐  subscribe  ┌─────────────┐
//! │ record_movement  │───────────►│                      │────────────►│ dashboard   │
//! │ close_session    │───────────►│ broadcast::Sender    │────────────►│ admin inbox │
//! │ treasury writes  │───────────►│  (BackOfficeEvent)   │────────────►│ mailer      │
//! └──────────────────┘            └──────────────────────┘             └─────────────┘
//! ```
//!
//! Events are published after the write commits. Publishing never fails the
//! operation: with no subscribers the event is dropped, and a subscriber
//! that falls more than `channel_capacity` events behind gets `Lagged`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use inspecta_core::{CloseNotification, Money, Movement, MovementKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackOfficeEvent {
    MovementRecorded {
        session_id: String,
        movement_id: String,
        kind: MovementKind,
        amount: Money,
        /// Expected drawer cash after this movement; `None` when the
        /// summary could not be recomputed after the write.
        expected_physical_cash: Option<Money>,
        recorded_at: DateTime<Utc>,
    },

    /// A till closed; treasury has cash to collect.
    SessionClosed(CloseNotification),

    /// Treasury balance dropped below the alert threshold.
    BalanceAlert {
        current_balance: Money,
        alert_threshold: Money,
        notification_email: Option<String>,
    },
}

impl BackOfficeEvent {
    pub fn movement_recorded(movement: &Movement, expected_physical_cash: Option<Money>) -> Self {
        BackOfficeEvent::MovementRecorded {
            session_id: movement.session_id.clone(),
            movement_id: movement.id.clone(),
            kind: movement.kind,
            amount: movement.amount,
            expected_physical_cash,
            recorded_at: movement.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BackOfficeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        EventBus { tx }
    }

    pub fn publish(&self, event: BackOfficeEvent) {
        match self.tx.send(event) {
            Ok(receivers) => debug!(receivers, "Event published"),
            Err(_) => debug!("Event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BackOfficeEvent> {
        self.tx.subscribe()
    }
}
