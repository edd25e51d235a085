use super::chargeable::ChargeRecord;
use super::processor::{ChargeRequest, ProcessorError, RemoteCharge};
use super::status::{ChargeStatus, RefundReason};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Persistence for charge records.
#[async_trait]
pub trait ChargeStore: Send + Sync {
    /// Writes the record and returns its identifier, assigning one if the
    /// record has never been saved.
    async fn save(&self, record: &ChargeRecord) -> Result<u64>;
    async fn get(&self, kind: &str, id: u64) -> Result<Option<ChargeRecord>>;
    async fn with_status(&self, kind: &str, status: ChargeStatus)
    -> Result<Vec<ChargeRecord>>;
}

/// Shared store of time-bounded mutual-exclusion markers.
///
/// A lease is not a lock. Once `ttl` has passed it can be taken by someone
/// else even if the first holder is still working. Implementations must be
/// visible to every process that may act on the same entity.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Creates the lease if no live one exists. Never waits.
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool>;
    /// Deletes the lease whoever holds it.
    async fn release(&self, key: &str) -> Result<()>;
}

/// The external payment gateway.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_charge(
        &self,
        request: ChargeRequest,
    ) -> std::result::Result<RemoteCharge, ProcessorError>;
    async fn retrieve_charge(
        &self,
        remote_id: &str,
    ) -> std::result::Result<RemoteCharge, ProcessorError>;
    /// Refunds `amount` cents of `charge`, or whatever remains when `amount` is `None`.
    async fn refund(
        &self,
        charge: &RemoteCharge,
        amount: Option<u64>,
        reason: RefundReason,
    ) -> std::result::Result<RemoteCharge, ProcessorError>;
}

pub type ChargeStoreBox = Box<dyn ChargeStore>;
pub type LeaseStoreBox = Box<dyn LeaseStore>;
pub type PaymentProcessorBox = Box<dyn PaymentProcessor>;
