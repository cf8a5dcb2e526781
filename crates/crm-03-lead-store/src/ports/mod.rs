//! Ports of the lead store (hexagonal architecture).

pub mod inbound;
pub mod outbound;
