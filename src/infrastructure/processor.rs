use crate::domain::ports::PaymentProcessor;
use crate::domain::processor::{ChargeRequest, ProcessorError, RemoteCharge};
use crate::domain::status::RefundReason;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Credentials starting with this prefix are always declined.
pub const DECLINE_PREFIX: &str = "tok_decline";

#[derive(Default)]
struct SandboxState {
    charges: HashMap<String, RemoteCharge>,
    charge_calls: usize,
    refund_calls: usize,
    charge_failures: VecDeque<ProcessorError>,
    refund_failures: VecDeque<ProcessorError>,
}

/// A sandbox payment processor kept in memory.
///
/// Issues sequential ids (`ch_1`, `ch_2`, ...), declines `tok_decline*`
/// credentials and can be scripted to fail. Clones share state, so tests can
/// inspect call counts after handing a clone to an engine.
#[derive(Default, Clone)]
pub struct InMemoryProcessor {
    state: Arc<Mutex<SandboxState>>,
    latency: Option<Duration>,
}

impl InMemoryProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every remote call, to widen race windows in tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fail_next_charge(&self, error: ProcessorError) {
        self.state().charge_failures.push_back(error);
    }

    pub fn fail_next_refund(&self, error: ProcessorError) {
        self.state().refund_failures.push_back(error);
    }

    pub fn charge_calls(&self) -> usize {
        self.state().charge_calls
    }

    pub fn refund_calls(&self) -> usize {
        self.state().refund_calls
    }

    pub fn charge(&self, id: &str) -> Option<RemoteCharge> {
        self.state().charges.get(id).cloned()
    }

    fn state(&self) -> MutexGuard<'_, SandboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn wait(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryProcessor {
    async fn create_charge(&self, request: ChargeRequest) -> Result<RemoteCharge, ProcessorError> {
        self.wait().await;
        let mut state = self.state();
        state.charge_calls += 1;

        if let Some(error) = state.charge_failures.pop_front() {
            return Err(error);
        }
        if request.credential.starts_with(DECLINE_PREFIX) {
            return Err(ProcessorError::CardDeclined(format!(
                "credential {} was refused",
                request.credential
            )));
        }

        let charge = RemoteCharge {
            id: format!("ch_{}", state.charges.len() + 1),
            amount: request.amount,
            amount_refunded: 0,
            currency: request.currency,
            refunded: false,
        };
        debug!(charge_id = %charge.id, amount = charge.amount, "sandbox charge created");
        state.charges.insert(charge.id.clone(), charge.clone());
        Ok(charge)
    }

    async fn retrieve_charge(&self, remote_id: &str) -> Result<RemoteCharge, ProcessorError> {
        self.wait().await;
        self.state()
            .charges
            .get(remote_id)
            .cloned()
            .ok_or_else(|| ProcessorError::NotFound(remote_id.to_string()))
    }

    async fn refund(
        &self,
        charge: &RemoteCharge,
        amount: Option<u64>,
        reason: RefundReason,
    ) -> Result<RemoteCharge, ProcessorError> {
        self.wait().await;
        let mut state = self.state();
        state.refund_calls += 1;

        if let Some(error) = state.refund_failures.pop_front() {
            return Err(error);
        }

        let stored = state
            .charges
            .get_mut(&charge.id)
            .ok_or_else(|| ProcessorError::NotFound(charge.id.clone()))?;
        let remaining = stored.refundable();
        let amount = amount.unwrap_or(remaining);
        if amount == 0 || amount > remaining {
            return Err(ProcessorError::InvalidRequest(format!(
                "Refund amount ({}) is greater than unrefunded amount on charge ({})",
                amount, remaining
            )));
        }

        stored.amount_refunded += amount;
        stored.refunded = stored.amount_refunded == stored.amount;
        debug!(charge_id = %stored.id, amount, reason = %reason, "sandbox refund created");
        Ok(stored.clone())
    }
}
