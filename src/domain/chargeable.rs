use super::payer::Payer;
use super::processor::ProcessorError;
use super::status::ChargeStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Charge state of a billable entity, as persisted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ChargeRecord {
    /// Entity type name. Part of the lease key and the storage key.
    pub kind: String,
    /// Assigned by the store on first save.
    pub id: Option<u64>,
    pub charge_status: ChargeStatus,
    /// Processor id of the successful charge. Never changes once set.
    pub charge_id: Option<String>,
    /// Amount in cents. Once set the entity counts as processed.
    pub charge_amount: Option<u64>,
    pub charge_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub amount_refunded: u64,
    #[serde(skip)]
    pub charge_error_message: Option<String>,
    #[serde(skip)]
    pub refund_error_message: Option<String>,
}

impl ChargeRecord {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            charge_status: ChargeStatus::NotPaid,
            charge_id: None,
            charge_amount: None,
            charge_date: None,
            amount_refunded: 0,
            charge_error_message: None,
            refund_error_message: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// The identifier as it appears in messages, `None` when unsaved.
    pub fn id_display(&self) -> String {
        match self.id {
            Some(id) => id.to_string(),
            None => "None".to_string(),
        }
    }
}

/// Free-form arguments passed through `charge` to the domain hooks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChargeArgs(Map<String, Value>);

impl ChargeArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An entity that can be charged once and refunded afterwards.
///
/// Implementors supply the payer, the amount and their own precondition; the
/// engine does the rest. The lifecycle hooks default to no-ops.
pub trait Chargeable: Send {
    fn record(&self) -> &ChargeRecord;
    fn record_mut(&mut self) -> &mut ChargeRecord;

    fn payer(&self) -> Option<&dyn Payer>;

    /// Amount to charge, in cents. Must return the same value on every call.
    fn charge_amount(&self) -> u64;

    /// Domain rules that must hold before charging (e.g. "order is fulfilled").
    /// The error string is reported to the caller verbatim.
    fn validate_for_charge(&self, args: &ChargeArgs) -> Result<(), String>;

    fn charge_description(&self) -> String {
        let record = self.record();
        format!("Chargeable {} id:{}", record.kind, record.id_display())
    }

    fn is_charged(&self) -> bool {
        self.record().charge_status == ChargeStatus::Paid
    }

    /// Charged amount in dollars, for humans.
    fn charged_display(&self) -> Decimal {
        match self.record().charge_amount {
            Some(cents) if cents > 0 => (Decimal::from(cents) / Decimal::ONE_HUNDRED).round_dp(2),
            _ => Decimal::ZERO,
        }
    }

    fn lock_key(&self) -> String {
        let record = self.record();
        format!("charge_lock_{}_{}", record.kind, record.id_display())
    }

    fn post_charge(&mut self, _args: &ChargeArgs) {}
    fn charge_succeeded(&mut self, _amount: u64, _args: &ChargeArgs) {}
    fn charge_failed(&mut self, _error: &ProcessorError, _args: &ChargeArgs) {}
    fn validation_failed(&mut self, _reason: &str) {}
    fn post_refund(&mut self, _amount: Option<u64>) {}
    fn refund_succeeded(&mut self, _amount: Option<u64>) {}
    fn refund_failed(&mut self, _error: &ProcessorError) {}
}
