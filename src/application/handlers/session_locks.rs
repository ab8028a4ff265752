//! Per-session turn locks.
//!
//! At most one turn may be in flight per session. A second request for the
//! same session is refused immediately instead of queueing behind the first.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::SessionId;

/// Registry of one async lock per session.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

/// Held for the duration of one turn. Dropping it releases the session.
#[derive(Debug)]
pub struct SessionGuard {
    _guard: OwnedMutexGuard<()>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the session, or returns `None` if a turn is already running.
    pub async fn try_acquire(&self, session_id: SessionId) -> Option<SessionGuard> {
        let mut locks = self.locks.lock().await;
        // Entries only referenced by the map are idle.
        locks.retain(|id, lock| *id == session_id || Arc::strong_count(lock) > 1);

        let lock = Arc::clone(locks.entry(session_id).or_default());
        let guard = lock.try_lock_owned().ok()?;
        Some(SessionGuard { _guard: guard })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_claim_on_same_session_is_refused() {
        let locks = SessionLocks::new();
        let id = SessionId::new();

        let guard = locks.try_acquire(id).await;
        assert!(guard.is_some());
        assert!(locks.try_acquire(id).await.is_none());
    }

    #[tokio::test]
    async fn released_session_can_be_claimed_again() {
        let locks = SessionLocks::new();
        let id = SessionId::new();

        drop(locks.try_acquire(id).await);
        assert!(locks.try_acquire(id).await.is_some());
    }

    #[tokio::test]
    async fn different_sessions_do_not_block_each_other() {
        let locks = SessionLocks::new();
        let a = locks.try_acquire(SessionId::new()).await;
        let b = locks.try_acquire(SessionId::new()).await;
        assert!(a.is_some() && b.is_some());
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = SessionLocks::new();
        for _ in 0..5 {
            drop(locks.try_acquire(SessionId::new()).await);
        }
        let _held = locks.try_acquire(SessionId::new()).await;
        assert_eq!(locks.locks.lock().await.len(), 1);
    }
}
