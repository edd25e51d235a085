use crate::domain::chargeable::ChargeRecord;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct ChargeRow<'a> {
    invoice: String,
    status: &'static str,
    charge_id: Option<&'a str>,
    amount: Option<u64>,
    refunded: u64,
    error: Option<&'a str>,
}

impl<'a> From<&'a ChargeRecord> for ChargeRow<'a> {
    fn from(record: &'a ChargeRecord) -> Self {
        Self {
            invoice: record.id_display(),
            status: record.charge_status.label(),
            charge_id: record.charge_id.as_deref(),
            amount: record.charge_amount,
            refunded: record.amount_refunded,
            error: record
                .refund_error_message
                .as_deref()
                .or(record.charge_error_message.as_deref()),
        }
    }
}

/// Writes the final state of charge records as CSV.
///
/// Columns: `invoice,status,charge_id,amount,refunded,error`.
pub struct ChargeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ChargeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_records<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a ChargeRecord>,
    ) -> Result<()> {
        let mut written = false;
        for record in records {
            self.writer.serialize(ChargeRow::from(record))?;
            written = true;
        }
        if !written {
            self.writer.write_record([
                "invoice",
                "status",
                "charge_id",
                "amount",
                "refunded",
                "error",
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
