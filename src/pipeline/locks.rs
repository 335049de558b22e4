//! Per-segment advisory locks.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type SegmentKey = (String, String);

/// One async mutex per `(work, segment)`
///
/// Held by a pipeline run from its dedup decision until assembly finishes, so
/// a second request for the same segment waits and then finds the completed
/// record. Runs for different segments never contend.
#[derive(Clone, Default)]
pub struct SegmentLocks {
    locks: Arc<Mutex<HashMap<SegmentKey, Arc<Mutex<()>>>>>,
}

impl SegmentLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `(work, segment)`
    ///
    /// The table lock is released before waiting on the segment lock.
    pub async fn lock(&self, work: &str, segment: &str) -> OwnedMutexGuard<()> {
        let segment_lock = {
            let mut locks = self.locks.lock().await;
            // Drop entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((work.to_string(), segment.to_string()))
                .or_default()
                .clone()
        };

        segment_lock.lock_owned().await
    }

    /// Number of segments with a holder or waiter
    pub async fn active(&self) -> usize {
        let locks = self.locks.lock().await;
        locks
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}
