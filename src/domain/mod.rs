//! Domain types: the charge record, the `Chargeable` capability, validation
//! rules and the ports the engine talks to.

pub mod chargeable;
pub mod invoice;
pub mod payer;
pub mod ports;
pub mod processor;
pub mod status;
pub mod validation;
