use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a charge.
///
/// The numeric codes are what gets persisted, so existing rows keep their
/// meaning if variants are added.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[serde(into = "u8", try_from = "u8")]
pub enum ChargeStatus {
    #[default]
    NotPaid,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
    ValidationFailed,
}

impl ChargeStatus {
    pub fn code(self) -> u8 {
        match self {
            ChargeStatus::NotPaid => 0,
            ChargeStatus::Paid => 10,
            ChargeStatus::Failed => 20,
            ChargeStatus::Refunded => 30,
            ChargeStatus::PartiallyRefunded => 31,
            ChargeStatus::ValidationFailed => 40,
        }
    }

    /// Human readable label, as shown to operators.
    pub fn label(self) -> &'static str {
        match self {
            ChargeStatus::NotPaid => "Not paid",
            ChargeStatus::Paid => "Paid",
            ChargeStatus::Failed => "Failed",
            ChargeStatus::Refunded => "Refunded",
            ChargeStatus::PartiallyRefunded => "Partially refunded",
            ChargeStatus::ValidationFailed => "Validation Failed",
        }
    }

    /// Whether a remote charge exists behind this status.
    pub fn holds_charge(self) -> bool {
        matches!(
            self,
            ChargeStatus::Paid | ChargeStatus::Refunded | ChargeStatus::PartiallyRefunded
        )
    }

    pub fn is_refundable(self) -> bool {
        matches!(self, ChargeStatus::Paid | ChargeStatus::PartiallyRefunded)
    }
}

impl From<ChargeStatus> for u8 {
    fn from(status: ChargeStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for ChargeStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ChargeStatus::NotPaid),
            10 => Ok(ChargeStatus::Paid),
            20 => Ok(ChargeStatus::Failed),
            30 => Ok(ChargeStatus::Refunded),
            31 => Ok(ChargeStatus::PartiallyRefunded),
            40 => Ok(ChargeStatus::ValidationFailed),
            other => Err(format!("unknown charge status code {}", other)),
        }
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reason attached to a refund request, forwarded to the processor.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    #[default]
    RequestedByCustomer,
    Duplicate,
    Fraudulent,
}

impl RefundReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RefundReason::RequestedByCustomer => "requested_by_customer",
            RefundReason::Duplicate => "duplicate",
            RefundReason::Fraudulent => "fraudulent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RefundReason::RequestedByCustomer => "Requested by customer",
            RefundReason::Duplicate => "Duplicate",
            RefundReason::Fraudulent => "Fraudulent",
        }
    }
}

impl fmt::Display for RefundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
