//! Per-call mutex registry.
//!
//! The webhook runtime invokes the orchestrator concurrently with no global
//! ordering, so two events for the same call can race the load-modify-persist
//! cycle. A per-`call_control_id` async mutex serializes that cycle for one
//! call without coupling unrelated calls. Entries are dropped once the call
//! ends.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct CallLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl CallLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a call, creating it on first use.
    pub async fn acquire(&self, call_control_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock();
            map.entry(call_control_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop a call's lock entry. Safe while a guard is still held: the Arc
    /// keeps the mutex alive until the guard releases.
    pub fn release(&self, call_control_id: &str) {
        self.inner.lock().remove(call_control_id);
    }

    /// Call ids currently tracked.
    pub fn active_ids(&self) -> Vec<String> {
        self.inner.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn serializes_same_call() {
        let locks = Arc::new(CallLocks::new());
        let guard = locks.acquire("c1").await;

        let locks2 = locks.clone();
        let contended = tokio::spawn(async move {
            let _g = locks2.acquire("c1").await;
        });

        // The second acquire must block until the first guard drops.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contended.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contended)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn distinct_calls_do_not_contend() {
        let locks = CallLocks::new();
        let _g1 = locks.acquire("c1").await;
        // Must not deadlock.
        let _g2 = locks.acquire("c2").await;
        assert_eq!(locks.active_ids().len(), 2);
    }

    #[tokio::test]
    async fn release_drops_tracking() {
        let locks = CallLocks::new();
        let guard = locks.acquire("c1").await;
        locks.release("c1");
        assert!(locks.active_ids().is_empty());
        drop(guard);
    }
}
