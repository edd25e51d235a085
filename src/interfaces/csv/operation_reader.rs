use crate::domain::status::RefundReason;
use crate::error::{ChargeError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Charge,
    Refund,
    Void,
}

/// One line of a billing batch.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Operation {
    pub r#type: OperationType,
    pub invoice: u64,
    pub customer: Option<String>,
    /// Cents. Invoice total for `charge`, refund amount for `refund`
    /// (empty refunds the remainder).
    pub amount: Option<u64>,
    pub reason: Option<RefundReason>,
}

/// Reads billing operations from a CSV source.
///
/// Expects the header `type, invoice, customer, amount, reason`. Whitespace is
/// trimmed and short records are accepted.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily yields operations; a malformed line yields an error and reading
    /// continues with the next one.
    pub fn operations(self) -> impl Iterator<Item = Result<Operation>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ChargeError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_valid_stream() {
        let data = "type, invoice, customer, amount, reason\n\
                    charge, 1, cus_1, 1000,\n\
                    refund, 1, , 400, duplicate\n\
                    refund, 1, , ,\n\
                    void, 2, , ,";
        let reader = OperationReader::new(data.as_bytes());
        let results: Vec<Result<Operation>> = reader.operations().collect();

        assert_eq!(results.len(), 4);
        let charge = results[0].as_ref().unwrap();
        assert_eq!(charge.r#type, OperationType::Charge);
        assert_eq!(charge.customer.as_deref(), Some("cus_1"));
        assert_eq!(charge.amount, Some(1000));

        let refund = results[1].as_ref().unwrap();
        assert_eq!(refund.reason, Some(RefundReason::Duplicate));
        assert_eq!(refund.customer, None);

        let full_refund = results[2].as_ref().unwrap();
        assert_eq!(full_refund.amount, None);
        assert_eq!(results[3].as_ref().unwrap().r#type, OperationType::Void);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "type, invoice, customer, amount, reason\n\
                    capture, 1, cus_1, 100,\n\
                    charge, 1, cus_1, -5,\n\
                    charge, 2, cus_1, 5,";
        let reader = OperationReader::new(data.as_bytes());
        let results: Vec<Result<Operation>> = reader.operations().collect();

        assert!(results[0].is_err());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
