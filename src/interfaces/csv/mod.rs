//! CSV adapters used by the batch binary.

pub mod charge_writer;
pub mod customer_reader;
pub mod operation_reader;
