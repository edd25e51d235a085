use crate::domain::ports::LeaseStoreBox;
use crate::error::Result;
use std::time::Duration;
use tracing::debug;

/// Per-entity mutual exclusion built on a shared lease store.
///
/// Acquisition is a test-and-set: losers get `false` straight away instead of
/// queueing. Leases expire after `ttl`, so a crashed holder blocks the entity
/// for at most that long, and a holder that outlives it may see a second
/// caller get in.
pub struct LockManager {
    leases: LeaseStoreBox,
    ttl: Duration,
}

impl LockManager {
    pub fn new(leases: LeaseStoreBox, ttl: Duration) -> Self {
        Self { leases, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn acquire(&self, key: &str) -> Result<bool> {
        let acquired = self.leases.acquire(key, self.ttl).await?;
        debug!(lock_key = %key, acquired, "lease acquire");
        Ok(acquired)
    }

    pub async fn release(&self, key: &str) -> Result<()> {
        self.leases.release(key).await?;
        debug!(lock_key = %key, "lease released");
        Ok(())
    }
}
