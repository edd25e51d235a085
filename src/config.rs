use crate::error::{ChargeError, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Longest accepted lease, one day.
pub const MAX_LOCK_TTL_SECS: u64 = 86_400;

/// Settings recognized by the charge engine.
///
/// Loaded from an optional JSON file; every field falls back to its default
/// when omitted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChargeConfig {
    /// Amounts below this (in cents) are recorded as paid without calling the processor.
    pub minimum_charge_amount: u64,
    /// Hard ceiling (in cents) for a single charge.
    pub maximum_charge_amount: u64,
    /// Lifetime of a charge lease.
    ///
    /// This is a lease, not a lock: a holder that runs longer than this lets a
    /// second caller in. It only bounds how long a crashed worker can block
    /// an entity.
    pub lock_ttl_secs: u64,
    /// ISO currency code sent with every charge.
    pub currency: String,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            minimum_charge_amount: 50,
            maximum_charge_amount: 99_999_999,
            lock_ttl_secs: 60,
            currency: "usd".to_string(),
        }
    }
}

impl ChargeConfig {
    /// Reads a JSON config file and validates it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.minimum_charge_amount > self.maximum_charge_amount {
            return Err(ChargeError::ConfigurationError(format!(
                "minimum_charge_amount ({}) exceeds maximum_charge_amount ({})",
                self.minimum_charge_amount, self.maximum_charge_amount
            )));
        }
        if self.lock_ttl_secs == 0 {
            return Err(ChargeError::ConfigurationError(
                "lock_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.lock_ttl_secs > MAX_LOCK_TTL_SECS {
            return Err(ChargeError::ConfigurationError(format!(
                "lock_ttl_secs ({}) exceeds {}",
                self.lock_ttl_secs, MAX_LOCK_TTL_SECS
            )));
        }
        if self.currency.trim().is_empty() {
            return Err(ChargeError::ConfigurationError(
                "currency must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
