//! Per-session write locks.
//!
//! ```text
//! record_movement(s1) ──┐
//! close_session(s1) ────┼──► lock(s1) ──► one writer at a time
//! record_movement(s2) ──────► lock(s2) ──► independent of s1
//! ```
//!
//! The lock serializes writers inside this process. The storage guards
//! (conditional insert, versioned close) still hold if another process
//! shares the database.
//!
//! An entry lives only while someone holds or waits on it: the last
//! [`SessionGuard`] to drop removes it, whether the operation succeeded,
//! was rejected, or named a session that does not exist.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type Registry = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

fn registry(locks: &Registry) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
    // the map is only touched in short non-async sections; a panic there
    // leaves it consistent
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Arc<Registry>,
}

/// Exclusive access to one session. Dropping it releases the lock and, if
/// nobody else is queued, forgets the session.
#[derive(Debug)]
pub struct SessionGuard {
    session_id: String,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Arc<Registry>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        let lock = registry(&self.locks)
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        debug!(session_id = %session_id, "Acquiring session lock");
        let guard = Arc::clone(&lock).lock_owned().await;

        SessionGuard {
            session_id: session_id.to_string(),
            lock,
            guard: Some(guard),
            registry: Arc::clone(&self.locks),
        }
    }

    /// Sessions with a holder or a waiter right now.
    pub fn len(&self) -> usize {
        registry(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut map = registry(&self.registry);
        // registry entry + `self.lock`: no other holder or waiter
        let idle = map
            .get(&self.session_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock) && Arc::strong_count(&self.lock) == 2);
        if idle {
            map.remove(&self.session_id);
            debug!(session_id = %self.session_id, "Session lock evicted");
        }
    }
}
