use crate::domain::payer::Customer;
use crate::error::{ChargeError, Result};
use std::io::Read;

/// Reads customers from a CSV source with header `customer, token, active`.
pub struct CustomerReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CustomerReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn customers(self) -> impl Iterator<Item = Result<Customer>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ChargeError::from))
    }
}
