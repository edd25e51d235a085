//! Rules deciding whether a charge or refund may be attempted.
//!
//! Each rule list is evaluated in order and stops at the first rejection, so
//! the order of the arrays below is part of the contract: it decides which
//! message a caller sees when several rules fail at once.

use super::chargeable::{ChargeArgs, ChargeRecord, Chargeable};
use rust_decimal::Decimal;
use std::fmt;

/// Why an operation was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Short text safe to show to the payer.
    pub message: String,
    /// Detailed text for logs and the `validation_failed` hook.
    pub reason: String,
}

impl Rejection {
    fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            reason: message.clone(),
            message,
        }
    }

    fn with_reason(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

struct ChargeCheck<'a> {
    entity: &'a dyn Chargeable,
    args: &'a ChargeArgs,
    maximum: u64,
}

impl ChargeCheck<'_> {
    fn record(&self) -> &ChargeRecord {
        self.entity.record()
    }

    fn already_charged(&self) -> String {
        format!("{} has already been charged", self.record().kind)
    }

    fn inactive_payer(&self) -> Rejection {
        let message = format!("{} does not belong to active customer", self.record().kind);
        let reason = format!("{} {}", self.record().id_display(), message);
        Rejection::with_reason(message, reason)
    }
}

type ChargeRule = fn(&ChargeCheck<'_>) -> Result<(), Rejection>;

const CHARGE_RULES: [ChargeRule; 9] = [
    domain_precondition,
    must_be_saved,
    within_maximum,
    no_charge_id,
    no_charge_amount,
    not_paid,
    has_payer,
    payer_has_credential,
    payer_is_active,
];

fn domain_precondition(check: &ChargeCheck<'_>) -> Result<(), Rejection> {
    check
        .entity
        .validate_for_charge(check.args)
        .map_err(Rejection::new)
}

fn must_be_saved(check: &ChargeCheck<'_>) -> Result<(), Rejection> {
    if check.record().id.is_none() {
        return Err(Rejection::new(format!(
            "Chargeable object {} must be saved before it can be charged",
            check.record().kind
        )));
    }
    Ok(())
}

fn within_maximum(check: &ChargeCheck<'_>) -> Result<(), Rejection> {
    if check.entity.charge_amount() > check.maximum {
        let dollars = Decimal::from(check.maximum) / Decimal::ONE_HUNDRED;
        let message = format!("Cannot charge more than ${:.2}", dollars);
        let reason = format!(
            "{} {}: {}",
            check.record().kind,
            check.record().id_display(),
            message
        );
        return Err(Rejection::with_reason(message, reason));
    }
    Ok(())
}

fn no_charge_id(check: &ChargeCheck<'_>) -> Result<(), Rejection> {
    if check.record().charge_id.is_some() {
        let message = check.already_charged();
        let reason = format!(
            "{} {} : charge_id is set",
            check.record().id_display(),
            message
        );
        return Err(Rejection::with_reason(message, reason));
    }
    Ok(())
}

// Amount without an id only happens after a corrupted write or a free
// charge; either way the entity must not be charged again.
fn no_charge_amount(check: &ChargeCheck<'_>) -> Result<(), Rejection> {
    if check.record().charge_amount.is_some() {
        let message = check.already_charged();
        let reason = format!(
            "{} {}: charge_amount is set (but charge_id is NOT set...weird)",
            check.record().id_display(),
            message
        );
        return Err(Rejection::with_reason(message, reason));
    }
    Ok(())
}

fn not_paid(check: &ChargeCheck<'_>) -> Result<(), Rejection> {
    if check.entity.is_charged() {
        let message = check.already_charged();
        let reason = format!("{} {}", check.record().id_display(), message);
        return Err(Rejection::with_reason(message, reason));
    }
    Ok(())
}

fn has_payer(check: &ChargeCheck<'_>) -> Result<(), Rejection> {
    match check.entity.payer() {
        Some(_) => Ok(()),
        None => Err(check.inactive_payer()),
    }
}

fn payer_has_credential(check: &ChargeCheck<'_>) -> Result<(), Rejection> {
    let credential = check
        .entity
        .payer()
        .and_then(|payer| payer.payment_credential());
    match credential {
        Some(token) if !token.is_empty() => Ok(()),
        _ => Err(check.inactive_payer()),
    }
}

fn payer_is_active(check: &ChargeCheck<'_>) -> Result<(), Rejection> {
    match check.entity.payer() {
        Some(payer) if payer.is_active() => Ok(()),
        _ => Err(check.inactive_payer()),
    }
}

/// Runs the charge rules against `entity`. Has no side effects.
pub fn check_charge(
    entity: &dyn Chargeable,
    args: &ChargeArgs,
    maximum: u64,
) -> Result<(), Rejection> {
    let check = ChargeCheck {
        entity,
        args,
        maximum,
    };
    CHARGE_RULES.iter().try_for_each(|rule| rule(&check))
}

struct RefundCheck<'a> {
    record: &'a ChargeRecord,
    amount: Option<u64>,
}

type RefundRule = fn(&RefundCheck<'_>) -> Result<(), Rejection>;

const REFUND_RULES: [RefundRule; 5] = [
    refundable_status,
    charged_amount_not_zero,
    amount_not_zero,
    amount_within_charge,
    has_charge_id,
];

fn refundable_status(check: &RefundCheck<'_>) -> Result<(), Rejection> {
    if !check.record.charge_status.is_refundable() {
        return Err(Rejection::new(format!(
            "Cannot refund Chargeable with status \"{}\"",
            check.record.charge_status.label()
        )));
    }
    Ok(())
}

fn charged_amount_not_zero(check: &RefundCheck<'_>) -> Result<(), Rejection> {
    if check.record.charge_amount == Some(0) {
        return Err(Rejection::new(
            "Cannot refund Chargeable with charged amount = 0",
        ));
    }
    Ok(())
}

fn amount_not_zero(check: &RefundCheck<'_>) -> Result<(), Rejection> {
    if check.amount == Some(0) {
        return Err(Rejection::new("Cannot refund 0"));
    }
    Ok(())
}

fn amount_within_charge(check: &RefundCheck<'_>) -> Result<(), Rejection> {
    if let Some(amount) = check.amount
        && amount > check.record.charge_amount.unwrap_or(0)
    {
        return Err(Rejection::new("Cannot refund more than was charged"));
    }
    Ok(())
}

fn has_charge_id(check: &RefundCheck<'_>) -> Result<(), Rejection> {
    if check.record.charge_id.is_none() {
        return Err(Rejection::new(
            "Cannot refund Chargeable with charge_id not set",
        ));
    }
    Ok(())
}

/// Runs the refund rules. `amount` of `None` means "refund the remainder".
pub fn check_refund(record: &ChargeRecord, amount: Option<u64>) -> Result<(), Rejection> {
    let check = RefundCheck { record, amount };
    REFUND_RULES.iter().try_for_each(|rule| rule(&check))
}
