//! Short-lived cache of session summaries.
//!
//! Summaries are cheap to recompute but read far more often than movements
//! are written (every dashboard refresh). Entries expire after the
//! configured TTL and are dropped on every append or close of their session.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use inspecta_core::CashSessionSummary;

#[derive(Debug)]
struct CachedSummary {
    summary: CashSessionSummary,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct SummaryCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedSummary>>,
}

impl SummaryCache {
    /// A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        SummaryCache {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub async fn get(&self, session_id: &str) -> Option<CashSessionSummary> {
        if !self.is_enabled() {
            return None;
        }
        let entries = self.entries.read().await;
        match entries.get(session_id) {
            Some(entry) if entry.expires_at > Instant::now() => {
                debug!(session_id = %session_id, "Summary cache hit");
                Some(entry.summary.clone())
            }
            _ => None,
        }
    }

    pub async fn put(&self, summary: CashSessionSummary) {
        if !self.is_enabled() {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > Instant::now());
        entries.insert(
            summary.session_id.clone(),
            CachedSummary {
                summary,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub async fn invalidate(&self, session_id: &str) {
        if self.entries.write().await.remove(session_id).is_some() {
            debug!(session_id = %session_id, "Summary cache invalidated");
        }
    }
}
