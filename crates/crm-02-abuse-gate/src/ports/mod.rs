//! Ports of the abuse gate.

pub mod outbound;

pub use outbound::RateCounterStore;
