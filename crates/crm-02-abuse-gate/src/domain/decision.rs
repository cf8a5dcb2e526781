//! Gate inputs and verdicts.

use std::net::IpAddr;
use std::time::Duration;

/// What the gate knows about a submission before anything is parsed deeply.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionContext<'a> {
    /// Real client IP (after trusted-proxy resolution)
    pub ip: IpAddr,
    /// Value of the honeypot field, if it was sent
    pub honeypot_value: Option<&'a str>,
    /// Time since the form token was issued
    pub form_age: Option<Duration>,
}

/// Gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Continue with validation and persistence.
    Accept,
    /// Pretend success, persist nothing.
    Discard(DiscardReason),
    /// Refuse with a generic message.
    Reject(RejectReason),
}

impl GateDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, GateDecision::Accept)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The hidden field was filled in.
    Honeypot,
    /// The form was submitted faster than a human could fill it.
    TooFast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    RateLimited,
}
