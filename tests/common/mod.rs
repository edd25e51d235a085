#![allow(dead_code)]

use async_trait::async_trait;
use chargeable::application::engine::ChargeEngine;
use chargeable::config::ChargeConfig;
use chargeable::domain::chargeable::{ChargeArgs, ChargeRecord, Chargeable};
use chargeable::domain::payer::{Customer, Payer};
use chargeable::domain::ports::ChargeStore;
use chargeable::domain::processor::ProcessorError;
use chargeable::domain::status::ChargeStatus;
use chargeable::error::{ChargeError, Result};
use chargeable::infrastructure::in_memory::{InMemoryChargeStore, InMemoryLeaseStore};
use chargeable::infrastructure::processor::InMemoryProcessor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hook invocations recorded by `TestOrder`.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PostCharge,
    ChargeSucceeded(u64),
    ChargeFailed(String),
    ValidationFailed(String),
    PostRefund(Option<u64>),
    RefundSucceeded(Option<u64>),
    RefundFailed(String),
}

#[derive(Debug, Clone)]
pub struct TestOrder {
    pub record: ChargeRecord,
    pub payer: Option<Customer>,
    pub amount: u64,
    pub precondition: Option<String>,
    pub events: Vec<Event>,
}

impl TestOrder {
    /// A saved order worth `amount` cents with an active, tokenized payer.
    pub fn new(amount: u64) -> Self {
        Self {
            record: ChargeRecord::new("TestOrder").with_id(1),
            payer: Some(Customer::new("cus_1", "valid_token")),
            amount,
            precondition: None,
            events: Vec::new(),
        }
    }

    /// An order already charged for `amount` as `ch_1`.
    pub fn paid(amount: u64) -> Self {
        let mut order = Self::new(amount);
        order.record.charge_id = Some("ch_1".to_string());
        order.record.charge_amount = Some(amount);
        order.record.charge_status = ChargeStatus::Paid;
        order
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| matches(e)).count()
    }
}

impl Chargeable for TestOrder {
    fn record(&self) -> &ChargeRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut ChargeRecord {
        &mut self.record
    }

    fn payer(&self) -> Option<&dyn Payer> {
        self.payer.as_ref().map(|p| p as &dyn Payer)
    }

    fn charge_amount(&self) -> u64 {
        self.amount
    }

    fn validate_for_charge(&self, _args: &ChargeArgs) -> std::result::Result<(), String> {
        match &self.precondition {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }

    fn post_charge(&mut self, _args: &ChargeArgs) {
        self.events.push(Event::PostCharge);
    }

    fn charge_succeeded(&mut self, amount: u64, _args: &ChargeArgs) {
        self.events.push(Event::ChargeSucceeded(amount));
    }

    fn charge_failed(&mut self, error: &ProcessorError, _args: &ChargeArgs) {
        self.events.push(Event::ChargeFailed(error.to_string()));
    }

    fn validation_failed(&mut self, reason: &str) {
        self.events.push(Event::ValidationFailed(reason.to_string()));
    }

    fn post_refund(&mut self, amount: Option<u64>) {
        self.events.push(Event::PostRefund(amount));
    }

    fn refund_succeeded(&mut self, amount: Option<u64>) {
        self.events.push(Event::RefundSucceeded(amount));
    }

    fn refund_failed(&mut self, error: &ProcessorError) {
        self.events.push(Event::RefundFailed(error.to_string()));
    }
}

/// An engine wired to in-memory adapters, with handles kept for inspection.
pub struct Harness {
    pub engine: Arc<ChargeEngine>,
    pub store: InMemoryChargeStore,
    pub leases: InMemoryLeaseStore,
    pub processor: InMemoryProcessor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(ChargeConfig::default(), InMemoryProcessor::new())
    }

    pub fn with(config: ChargeConfig, processor: InMemoryProcessor) -> Self {
        let store = InMemoryChargeStore::new();
        let leases = InMemoryLeaseStore::new();
        let engine = ChargeEngine::new(
            Box::new(store.clone()),
            Box::new(leases.clone()),
            Box::new(processor.clone()),
            config,
        )
        .expect("valid config");

        Self {
            engine: Arc::new(engine),
            store,
            leases,
            processor,
        }
    }
}

/// A store whose writes always fail.
#[derive(Default, Clone)]
pub struct FailingStore {
    pub saves: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChargeStore for FailingStore {
    async fn save(&self, _record: &ChargeRecord) -> Result<u64> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Err(ChargeError::StorageError("disk full".to_string()))
    }

    async fn get(&self, _kind: &str, _id: u64) -> Result<Option<ChargeRecord>> {
        Ok(None)
    }

    async fn with_status(
        &self,
        _kind: &str,
        _status: ChargeStatus,
    ) -> Result<Vec<ChargeRecord>> {
        Ok(Vec::new())
    }
}
