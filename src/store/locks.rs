//! Per-order exclusive try-locks.

use crate::utils::current_time_millis;
use dashmap::DashMap;
use tracing::trace;

/// How long a holder may keep an order lock before it is considered stale.
const LOCK_TTL_MS: u64 = 5_000;

struct LockEntry {
    holder: String,
    expires_at: u64,
}

/// Non-blocking exclusive locks keyed by `order:{id}`.
///
/// Acquisition never waits: a lock held by a live holder makes `try_acquire`
/// return `false`, and the caller retries on its next tick. Stale entries
/// (holder exceeded the TTL) are stolen. Release only succeeds for the
/// recorded holder.
#[derive(Default)]
pub struct OrderLockTable {
    locks: DashMap<String, LockEntry>,
}

impl OrderLockTable {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(order_id: &str) -> String {
        format!("order:{order_id}")
    }

    /// Try to take the lock for `order_id`. Re-acquisition by the same
    /// holder refreshes the TTL and succeeds.
    pub fn try_acquire(&self, order_id: &str, holder: &str) -> bool {
        let now = current_time_millis();
        let mut acquired = false;
        let entry = self
            .locks
            .entry(Self::key(order_id))
            .and_modify(|lock| {
                if lock.holder == holder || lock.expires_at <= now {
                    lock.holder = holder.to_string();
                    lock.expires_at = now + LOCK_TTL_MS;
                    acquired = true;
                }
            })
            .or_insert_with(|| {
                acquired = true;
                LockEntry {
                    holder: holder.to_string(),
                    expires_at: now + LOCK_TTL_MS,
                }
            });
        drop(entry);
        if !acquired {
            trace!("lock contention on order {order_id}");
        }
        acquired
    }

    /// Release the lock if `holder` still owns it.
    pub fn release(&self, order_id: &str, holder: &str) -> bool {
        self.locks
            .remove_if(&Self::key(order_id), |_, lock| lock.holder == holder)
            .is_some()
    }
}
