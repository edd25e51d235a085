//! Application layer orchestrating charges and refunds.
//!
//! `ChargeEngine` is the entry point. It validates, serializes attempts on
//! the same entity through `LockManager`, calls the processor and persists
//! the outcome.

pub mod engine;
pub mod lock;
