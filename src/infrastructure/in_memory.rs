use crate::domain::chargeable::ChargeRecord;
use crate::domain::ports::{ChargeStore, LeaseStore};
use crate::domain::status::ChargeStatus;
use crate::error::{ChargeError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// A thread-safe in-memory store for charge records.
///
/// Records are keyed by `(kind, id)`. Clones share the same map, which lets
/// tests keep a handle on a store after boxing it into an engine.
#[derive(Clone)]
pub struct InMemoryChargeStore {
    records: Arc<RwLock<HashMap<(String, u64), ChargeRecord>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for InMemoryChargeStore {
    fn default() -> Self {
        Self {
            records: Arc::default(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl InMemoryChargeStore {
    /// Creates a new, empty in-memory charge store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ChargeStore for InMemoryChargeStore {
    async fn save(&self, record: &ChargeRecord) -> Result<u64> {
        let id = match record.id {
            Some(id) => {
                self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
                id
            }
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };

        let mut stored = record.clone();
        stored.id = Some(id);
        let mut records = self.records.write().await;
        records.insert((stored.kind.clone(), id), stored);
        Ok(id)
    }

    async fn get(&self, kind: &str, id: u64) -> Result<Option<ChargeRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&(kind.to_string(), id)).cloned())
    }

    async fn with_status(
        &self,
        kind: &str,
        status: ChargeStatus,
    ) -> Result<Vec<ChargeRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<ChargeRecord> = records
            .values()
            .filter(|r| r.kind == kind && r.charge_status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.id);
        Ok(matching)
    }
}

/// Lease store living in the current process.
///
/// Only coordinates tasks sharing this value. Deployments with several
/// processes need a store all of them can see.
#[derive(Default, Clone)]
pub struct InMemoryLeaseStore {
    leases: Arc<Mutex<HashMap<String, Instant>>>,
}

impl InMemoryLeaseStore {
    /// Creates a new, empty lease store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live lease exists for `key`.
    pub async fn is_held(&self, key: &str) -> bool {
        let leases = self.leases.lock().await;
        leases
            .get(key)
            .is_some_and(|expires_at| *expires_at > Instant::now())
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut leases = self.leases.lock().await;
        if let Some(expires_at) = leases.get(key)
            && *expires_at > now
        {
            return Ok(false);
        }
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| ChargeError::StorageError(format!("lease ttl {:?} out of range", ttl)))?;
        leases.insert(key.to_string(), expires_at);
        Ok(true)
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut leases = self.leases.lock().await;
        leases.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_assigns_ids_to_new_records() {
        let store = InMemoryChargeStore::new();
        let first = store.save(&ChargeRecord::new("Order")).await.unwrap();
        let second = store.save(&ChargeRecord::new("Order")).await.unwrap();
        assert_eq!((first, second), (1, 2));

        let retrieved = store.get("Order", 2).await.unwrap().unwrap();
        assert_eq!(retrieved.id, Some(2));
        assert!(store.get("Order", 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_explicit_ids_are_not_reused() {
        let store = InMemoryChargeStore::new();
        store.save(&ChargeRecord::new("Order").with_id(10)).await.unwrap();
        let assigned = store.save(&ChargeRecord::new("Order")).await.unwrap();
        assert_eq!(assigned, 11);
    }

    #[tokio::test]
    async fn test_kinds_do_not_collide() {
        let store = InMemoryChargeStore::new();
        let mut order = ChargeRecord::new("Order").with_id(1);
        order.charge_status = ChargeStatus::Paid;
        store.save(&order).await.unwrap();
        store.save(&ChargeRecord::new("Booking").with_id(1)).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.with_status("Order", ChargeStatus::Paid).await.unwrap().len(), 1);
        assert!(store.with_status("Booking", ChargeStatus::Paid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lease_release_is_unconditional() {
        let leases = InMemoryLeaseStore::new();
        leases.release("missing").await.unwrap();

        assert!(leases.acquire("k", Duration::from_secs(5)).await.unwrap());
        assert!(leases.is_held("k").await);
        leases.release("k").await.unwrap();
        assert!(!leases.is_held("k").await);
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_is_an_error() {
        let leases = InMemoryLeaseStore::new();
        let result = leases.acquire("k", Duration::MAX).await;

        assert!(matches!(result, Err(ChargeError::StorageError(_))));
        assert!(!leases.is_held("k").await);
    }
}
