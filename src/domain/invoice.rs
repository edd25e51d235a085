use super::chargeable::{ChargeArgs, ChargeRecord, Chargeable};
use super::payer::{Customer, Payer};

pub const INVOICE_KIND: &str = "Invoice";

/// A customer invoice billed through the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub record: ChargeRecord,
    pub customer: Option<Customer>,
    /// Total due, in cents.
    pub total: u64,
    pub voided: bool,
}

impl Invoice {
    pub fn new(id: u64, customer: Option<Customer>, total: u64) -> Self {
        Self {
            record: ChargeRecord::new(INVOICE_KIND).with_id(id),
            customer,
            total,
            voided: false,
        }
    }

    /// Rebuilds an invoice around a previously stored record.
    pub fn from_record(record: ChargeRecord, customer: Option<Customer>, total: u64) -> Self {
        Self {
            record,
            customer,
            total,
            voided: false,
        }
    }
}

impl Chargeable for Invoice {
    fn record(&self) -> &ChargeRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut ChargeRecord {
        &mut self.record
    }

    fn payer(&self) -> Option<&dyn Payer> {
        self.customer.as_ref().map(|c| c as &dyn Payer)
    }

    fn charge_amount(&self) -> u64 {
        self.total
    }

    fn validate_for_charge(&self, _args: &ChargeArgs) -> Result<(), String> {
        if self.voided {
            return Err(format!("Invoice {} has been voided", self.record.id_display()));
        }
        Ok(())
    }
}
