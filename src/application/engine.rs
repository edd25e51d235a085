use super::lock::LockManager;
use crate::config::ChargeConfig;
use crate::domain::chargeable::{ChargeArgs, ChargeRecord, Chargeable};
use crate::domain::ports::{ChargeStoreBox, LeaseStoreBox, PaymentProcessorBox};
use crate::domain::processor::ChargeRequest;
use crate::domain::status::{ChargeStatus, RefundReason};
use crate::domain::validation;
use crate::error::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

/// Drives chargeable entities through charge and refund.
///
/// Every remote call happens while holding the entity's lease, and the
/// entity is persisted before the lease is released, so the next holder
/// always reads the outcome of the previous attempt.
pub struct ChargeEngine {
    store: ChargeStoreBox,
    locks: LockManager,
    processor: PaymentProcessorBox,
    config: ChargeConfig,
}

impl ChargeEngine {
    /// Creates a new `ChargeEngine`.
    ///
    /// Fails if `config` is inconsistent.
    pub fn new(
        store: ChargeStoreBox,
        leases: LeaseStoreBox,
        processor: PaymentProcessorBox,
        config: ChargeConfig,
    ) -> Result<Self> {
        config.validate()?;
        let locks = LockManager::new(leases, config.lock_ttl());
        debug!(
            ttl_secs = locks.ttl().as_secs(),
            minimum = config.minimum_charge_amount,
            maximum = config.maximum_charge_amount,
            currency = %config.currency,
            "charge engine ready"
        );
        Ok(Self {
            store,
            locks,
            processor,
            config,
        })
    }

    /// Charges `entity` once.
    ///
    /// Returns whether the entity is paid afterwards. `false` covers both a
    /// rejection (see `charge_error_message`) and a concurrent attempt
    /// holding the lease, in which case nothing happened and the call can be
    /// ignored or retried later. `Err` is reserved for storage failures.
    pub async fn charge<C: Chargeable>(&self, entity: &mut C, args: &ChargeArgs) -> Result<bool> {
        if !self.validate_for_charge(entity, args).await? {
            return Ok(false);
        }

        let key = entity.lock_key();
        if !self.locks.acquire(&key).await? {
            info!(lock_key = %key, "charge already in progress");
            return Ok(false);
        }

        // The caller's copy may predate the previous holder's save.
        if let Err(error) = self.refresh(entity).await {
            self.locks.release(&key).await?;
            return Err(error);
        }
        if let Err(rejection) =
            validation::check_charge(&*entity, args, self.config.maximum_charge_amount)
        {
            info!(lock_key = %key, reason = %rejection.reason, "charge settled by a previous holder");
            entity.record_mut().charge_error_message = Some(rejection.message);
            self.locks.release(&key).await?;
            entity.validation_failed(&rejection.reason);
            return Ok(false);
        }

        self.attempt_charge(entity, args).await;

        // Always runs: persist, then release, then notify.
        let saved = self.persist(entity).await;
        let released = self.locks.release(&key).await;
        entity.post_charge(args);
        saved?;
        released?;

        Ok(entity.is_charged())
    }

    /// Runs the charge rules. On rejection the entity is marked
    /// `ValidationFailed` (unless it was already charged), saved and notified.
    pub async fn validate_for_charge<C: Chargeable>(
        &self,
        entity: &mut C,
        args: &ChargeArgs,
    ) -> Result<bool> {
        let rejection =
            match validation::check_charge(&*entity, args, self.config.maximum_charge_amount) {
                Ok(()) => return Ok(true),
                Err(rejection) => rejection,
            };

        info!(
            kind = %entity.record().kind,
            id = %entity.record().id_display(),
            payer = %payer_id(entity),
            reason = %rejection.reason,
            "charge validation failed"
        );
        let record = entity.record_mut();
        record.charge_error_message = Some(rejection.message);
        // An entity that already holds a charge keeps its status.
        if record.charge_id.is_none() && !record.charge_status.holds_charge() {
            record.charge_status = ChargeStatus::ValidationFailed;
        }
        self.persist(entity).await?;
        entity.validation_failed(&rejection.reason);
        Ok(false)
    }

    async fn attempt_charge<C: Chargeable>(&self, entity: &mut C, args: &ChargeArgs) {
        let amount = entity.charge_amount();
        let payer = payer_id(entity);
        info!(payer = %payer, amount, "charging");

        if amount < self.config.minimum_charge_amount {
            debug!(
                amount,
                minimum = self.config.minimum_charge_amount,
                "below processor minimum, recording without remote charge"
            );
            mark_paid(entity, None, amount, args);
            return;
        }

        let request = ChargeRequest {
            amount,
            credential: entity
                .payer()
                .and_then(|p| p.payment_credential())
                .unwrap_or_default()
                .to_string(),
            currency: self.config.currency.clone(),
            description: entity.charge_description(),
        };

        match self.processor.create_charge(request).await {
            Ok(charge) => {
                info!(payer = %payer, amount = charge.amount, charge_id = %charge.id, "charged");
                mark_paid(entity, Some(charge.id), charge.amount, args);
            }
            Err(error) => {
                warn!(payer = %payer, amount, error = %error, "charge failed");
                let record = entity.record_mut();
                record.charge_status = ChargeStatus::Failed;
                record.charge_error_message = Some(error.to_string());
                entity.charge_failed(&error, args);
            }
        }
    }

    /// Refunds `amount` cents, or the remainder of the charge when `None`.
    ///
    /// Returns whether the processor accepted the refund. Failures are
    /// reported through `refund_error_message` and leave the status alone.
    pub async fn refund<C: Chargeable>(
        &self,
        entity: &mut C,
        amount: Option<u64>,
        reason: RefundReason,
    ) -> Result<bool> {
        if !self.validate_for_refund(entity, amount) {
            return Ok(false);
        }

        let key = entity.lock_key();
        if !self.locks.acquire(&key).await? {
            info!(lock_key = %key, "refund blocked by a concurrent operation");
            let record = entity.record_mut();
            record.refund_error_message = Some(format!(
                "Refund already in progress for {} {}",
                record.kind,
                record.id_display()
            ));
            return Ok(false);
        }

        if let Err(error) = self.refresh(entity).await {
            self.locks.release(&key).await?;
            return Err(error);
        }
        if let Err(rejection) = validation::check_refund(entity.record(), amount) {
            info!(lock_key = %key, reason = %rejection.reason, "refund settled by a previous holder");
            entity.record_mut().refund_error_message = Some(rejection.message);
            self.locks.release(&key).await?;
            return Ok(false);
        }

        let refunded = self.attempt_refund(entity, amount, reason).await;

        let saved = self.persist(entity).await;
        let released = self.locks.release(&key).await;
        entity.post_refund(amount);
        saved?;
        released?;

        Ok(refunded)
    }

    /// Runs the refund rules. Only `refund_error_message` is touched: nothing
    /// is saved and no hook fires.
    pub fn validate_for_refund<C: Chargeable>(&self, entity: &mut C, amount: Option<u64>) -> bool {
        match validation::check_refund(entity.record(), amount) {
            Ok(()) => true,
            Err(rejection) => {
                debug!(id = %entity.record().id_display(), reason = %rejection.reason, "refund rejected");
                entity.record_mut().refund_error_message = Some(rejection.message);
                false
            }
        }
    }

    async fn attempt_refund<C: Chargeable>(
        &self,
        entity: &mut C,
        amount: Option<u64>,
        reason: RefundReason,
    ) -> bool {
        let Some(charge_id) = entity.record().charge_id.clone() else {
            return false;
        };
        info!(charge_id = %charge_id, amount = ?amount, reason = %reason, "refunding");

        let outcome = match self.processor.retrieve_charge(&charge_id).await {
            Ok(charge) => self.processor.refund(&charge, amount, reason).await,
            Err(error) => Err(error),
        };

        match outcome {
            Ok(charge) => {
                let record = entity.record_mut();
                record.charge_status = if charge.refunded {
                    ChargeStatus::Refunded
                } else {
                    ChargeStatus::PartiallyRefunded
                };
                record.amount_refunded = charge.amount_refunded;
                record.refund_error_message = None;
                info!(charge_id = %charge_id, status = %record.charge_status, "refunded");
                entity.refund_succeeded(amount);
                true
            }
            Err(error) => {
                warn!(charge_id = %charge_id, amount = ?amount, error = %error, "refund failed");
                entity.record_mut().refund_error_message = Some(error.to_string());
                entity.refund_failed(&error);
                false
            }
        }
    }

    /// Copies the stored charge state over the caller's record.
    async fn refresh<C: Chargeable>(&self, entity: &mut C) -> Result<()> {
        let Some(id) = entity.record().id else {
            return Ok(());
        };
        let Some(stored) = self.store.get(&entity.record().kind, id).await? else {
            return Ok(());
        };

        let record = entity.record_mut();
        record.charge_status = stored.charge_status;
        record.charge_id = stored.charge_id;
        record.charge_amount = stored.charge_amount;
        record.charge_date = stored.charge_date;
        record.amount_refunded = stored.amount_refunded;
        Ok(())
    }

    async fn persist<C: Chargeable>(&self, entity: &mut C) -> Result<()> {
        let id = self.store.save(entity.record()).await?;
        entity.record_mut().id = Some(id);
        Ok(())
    }

    pub async fn find(&self, kind: &str, id: u64) -> Result<Option<ChargeRecord>> {
        self.store.get(kind, id).await
    }

    pub async fn paid(&self, kind: &str) -> Result<Vec<ChargeRecord>> {
        self.store.with_status(kind, ChargeStatus::Paid).await
    }

    pub async fn failed(&self, kind: &str) -> Result<Vec<ChargeRecord>> {
        self.store.with_status(kind, ChargeStatus::Failed).await
    }

    pub async fn refunded(&self, kind: &str) -> Result<Vec<ChargeRecord>> {
        self.store.with_status(kind, ChargeStatus::Refunded).await
    }
}

fn payer_id<C: Chargeable>(entity: &C) -> String {
    entity
        .payer()
        .map(|p| p.id().to_string())
        .unwrap_or_else(|| "none".to_string())
}

fn mark_paid<C: Chargeable>(
    entity: &mut C,
    charge_id: Option<String>,
    amount: u64,
    args: &ChargeArgs,
) {
    let record = entity.record_mut();
    if charge_id.is_some() {
        record.charge_id = charge_id;
    }
    record.charge_amount = Some(amount);
    record.charge_status = ChargeStatus::Paid;
    record.charge_date = Some(Utc::now());
    record.charge_error_message = None;
    entity.charge_succeeded(amount, args);
}
