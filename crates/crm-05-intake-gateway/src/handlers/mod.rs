//! HTTP handlers.

pub mod contact;
pub mod office;
pub mod system;
