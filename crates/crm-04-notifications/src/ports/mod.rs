//! Ports of the notification dispatcher.

pub mod hooks;
pub mod outbound;

pub use hooks::{HookStatus, PostCommitHook};
pub use outbound::Mailer;
