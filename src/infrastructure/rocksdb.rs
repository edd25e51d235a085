use crate::domain::chargeable::ChargeRecord;
use crate::domain::ports::{ChargeStore, LeaseStore};
use crate::domain::status::ChargeStatus;
use crate::error::{ChargeError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Column Family for charge records, keyed `{kind}:{id:020}`.
pub const CF_CHARGES: &str = "charges";
/// Column Family for leases, valued with the expiry in epoch milliseconds.
pub const CF_LEASES: &str = "leases";
/// Column Family for per-kind id sequences.
pub const CF_SEQUENCES: &str = "sequences";

/// A persistent store implementation using RocksDB.
///
/// Serves both as the `ChargeStore` and the `LeaseStore`. RocksDB only lets
/// one process open a database, so leases stored here survive restarts but
/// coordinate a single process.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    // Serializes read-modify-write sequences (id allocation, lease test-and-set).
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_CHARGES, CF_LEASES, CF_SEQUENCES]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            ChargeError::StorageError(format!("{} column family not found", name))
        })
    }

    fn next_id(&self, kind: &str) -> Result<u64> {
        let cf = self.cf(CF_SEQUENCES)?;
        let current = match self.db.get_cf(cf, kind.as_bytes())? {
            Some(bytes) => decode_u64(&bytes)?,
            None => 0,
        };
        let next = current.checked_add(1).ok_or_else(|| {
            ChargeError::StorageError(format!("{} id sequence exhausted", kind))
        })?;
        self.db.put_cf(cf, kind.as_bytes(), next.to_be_bytes())?;
        Ok(next)
    }

    fn bump_sequence(&self, kind: &str, id: u64) -> Result<()> {
        let cf = self.cf(CF_SEQUENCES)?;
        let current = match self.db.get_cf(cf, kind.as_bytes())? {
            Some(bytes) => decode_u64(&bytes)?,
            None => 0,
        };
        if id > current {
            self.db.put_cf(cf, kind.as_bytes(), id.to_be_bytes())?;
        }
        Ok(())
    }
}

fn record_key(kind: &str, id: u64) -> Vec<u8> {
    format!("{}:{:020}", kind, id).into_bytes()
}

fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| ChargeError::StorageError("corrupt u64 value".to_string()))?;
    Ok(u64::from_be_bytes(array))
}

fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[async_trait]
impl ChargeStore for RocksDBStore {
    async fn save(&self, record: &ChargeRecord) -> Result<u64> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let id = match record.id {
            Some(id) => {
                self.bump_sequence(&record.kind, id)?;
                id
            }
            None => self.next_id(&record.kind)?,
        };

        let mut stored = record.clone();
        stored.id = Some(id);
        let value = serde_json::to_vec(&stored)?;
        self.db.put_cf(self.cf(CF_CHARGES)?, record_key(&stored.kind, id), value)?;

        Ok(id)
    }

    async fn get(&self, kind: &str, id: u64) -> Result<Option<ChargeRecord>> {
        let result = self.db.get_cf(self.cf(CF_CHARGES)?, record_key(kind, id))?;

        if let Some(bytes) = result {
            Ok(Some(serde_json::from_slice(&bytes)?))
        } else {
            Ok(None)
        }
    }

    async fn with_status(
        &self,
        kind: &str,
        status: ChargeStatus,
    ) -> Result<Vec<ChargeRecord>> {
        let prefix = format!("{}:", kind).into_bytes();
        let iter = self.db.iterator_cf(
            self.cf(CF_CHARGES)?,
            IteratorMode::From(&prefix, Direction::Forward),
        );

        let mut records = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let record: ChargeRecord = serde_json::from_slice(&value)?;
            if record.charge_status == status {
                records.push(record);
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl LeaseStore for RocksDBStore {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let cf = self.cf(CF_LEASES)?;
        let now = SystemTime::now();

        if let Some(bytes) = self.db.get_pinned_cf(cf, key.as_bytes())?
            && decode_u64(&bytes)? > epoch_millis(now)
        {
            return Ok(false);
        }

        let expires_at = now
            .checked_add(ttl)
            .map(epoch_millis)
            .ok_or_else(|| ChargeError::StorageError(format!("lease ttl {:?} out of range", ttl)))?;
        self.db.put_cf(cf, key.as_bytes(), expires_at.to_be_bytes())?;
        Ok(true)
    }

    async fn release(&self, key: &str) -> Result<()> {
        self.db.delete_cf(self.cf(CF_LEASES)?, key.as_bytes())?;
        Ok(())
    }
}
