//! Per-member mutual exclusion for lifecycle transitions.
//!
//! Two concurrent tier-change or cancel requests for the same member must
//! not interleave. Each member id maps to its own async mutex; operations
//! on different members proceed independently.

use crate::domain::foundation::MemberId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed lock map serializing lifecycle mutations per member.
#[derive(Default)]
pub struct MemberLocks {
    inner: Mutex<HashMap<MemberId, Arc<AsyncMutex<()>>>>,
}

impl MemberLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for one member, waiting if another lifecycle
    /// operation on the same member is in flight.
    ///
    /// The guard is owned so it can be held across awaits in a handler.
    pub async fn acquire(&self, member_id: MemberId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap();
            map.entry(member_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_member_operations_are_serialized() {
        let locks = Arc::new(MemberLocks::new());
        let concurrent = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let concurrent = concurrent.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(MemberId::new(1)).await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_members_do_not_block_each_other() {
        let locks = MemberLocks::new();
        let _a = locks.acquire(MemberId::new(1)).await;
        // Would deadlock if member 2 shared member 1's mutex.
        let _b = locks.acquire(MemberId::new(2)).await;
    }
}
