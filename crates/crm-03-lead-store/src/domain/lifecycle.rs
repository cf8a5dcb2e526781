//! Status lifecycles of leads and budgets.
//!
//! ```text
//! Lead:    new ──► contacted ──► quoted ──► closed
//!           └──────────┴────────────┴──────► rejected
//!
//! Budget:  draft ──► sent ──► accepted | rejected | expired
//!            └──────────────────────────────► expired
//! ```
//!
//! Forward skips along the lead path are allowed. Terminal states are final.

use crate::domain::errors::StoreError;
use crm_types::{BudgetStatus, LeadStatus};

/// Outcome of a requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Requested status equals the current one.
    Unchanged,
    /// The change is permitted.
    Allowed,
}

/// Check a lead status change.
pub fn check_lead_transition(from: LeadStatus, to: LeadStatus) -> Result<Transition, StoreError> {
    if from == to {
        return Ok(Transition::Unchanged);
    }

    let allowed = if from.is_terminal() || to == LeadStatus::New {
        false
    } else if to == LeadStatus::Rejected {
        true
    } else {
        match (from.rank(), to.rank()) {
            (Some(current), Some(next)) => next > current,
            _ => false,
        }
    };

    if allowed {
        Ok(Transition::Allowed)
    } else {
        Err(StoreError::InvalidTransition {
            entity: "lead",
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Check a budget status change.
pub fn check_budget_transition(
    from: BudgetStatus,
    to: BudgetStatus,
) -> Result<Transition, StoreError> {
    use BudgetStatus::*;

    if from == to {
        return Ok(Transition::Unchanged);
    }

    let allowed = matches!(
        (from, to),
        (Draft, Sent) | (Draft, Expired) | (Sent, Accepted) | (Sent, Rejected) | (Sent, Expired)
    );

    if allowed {
        Ok(Transition::Allowed)
    } else {
        Err(StoreError::InvalidTransition {
            entity: "budget",
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
