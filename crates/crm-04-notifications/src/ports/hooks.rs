//! # Post-Commit Hook Port
//!
//! A hook is one independent side effect of a committed lead event. Each
//! hook runs in its own task with its own timeout; its failure never reaches
//! the request that triggered it.

use crate::domain::errors::MailError;
use crate::domain::events::LeadEvent;
use async_trait::async_trait;

/// What a hook did with an event it handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStatus {
    Sent,
    /// Nothing to do, e.g. no recipient.
    Skipped(&'static str),
}

#[async_trait]
pub trait PostCommitHook: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this hook reacts to `event` at all.
    fn handles(&self, event: &LeadEvent) -> bool;

    async fn run(&self, event: &LeadEvent) -> Result<HookStatus, MailError>;
}
