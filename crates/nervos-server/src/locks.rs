//! Per-account serialization of the read-modify-write over metadata and
//! chunk objects. Sufficient for a single server process; a horizontally
//! scaled deployment needs conditional writes in the object store instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug)]
struct AccountSlot {
    lock: Arc<Mutex<()>>,
    last_used: Instant,
}

#[derive(Clone, Default)]
pub struct AccountLocks {
    slots: Arc<Mutex<HashMap<String, AccountSlot>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `account`. Released when the guard drops.
    pub async fn acquire(&self, account: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut slots = self.slots.lock().await;
            let slot = slots
                .entry(account.to_string())
                .or_insert_with(|| AccountSlot {
                    lock: Arc::new(Mutex::new(())),
                    last_used: Instant::now(),
                });
            slot.last_used = Instant::now();
            slot.lock.clone()
        };
        lock.lock_owned().await
    }

    /// Drop slots idle for longer than `max_idle_secs` that nobody holds.
    pub async fn purge_stale(&self, max_idle_secs: f64) {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();
        let before = slots.len();
        slots.retain(|_, slot| {
            Arc::strong_count(&slot.lock) > 1
                || now.duration_since(slot.last_used).as_secs_f64() < max_idle_secs
        });
        debug!(purged = before - slots.len(), "Purged idle account locks");
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}
