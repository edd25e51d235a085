use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything the processor needs to create a charge.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    /// Amount in cents.
    pub amount: u64,
    pub credential: String,
    pub currency: String,
    pub description: String,
}

/// The processor's view of a charge.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RemoteCharge {
    pub id: String,
    /// Amount the processor actually charged, in cents.
    pub amount: u64,
    pub amount_refunded: u64,
    pub currency: String,
    /// True once the full amount has been refunded.
    pub refunded: bool,
}

impl RemoteCharge {
    pub fn refundable(&self) -> u64 {
        self.amount.saturating_sub(self.amount_refunded)
    }
}

/// Failures reported by the payment processor.
///
/// These are expected outcomes: the engine turns them into status changes and
/// error messages instead of propagating them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    #[error("Your card was declined: {0}")]
    CardDeclined(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("No such charge: {0}")]
    NotFound(String),
    #[error("Payment processor unavailable: {0}")]
    Api(String),
}
