//! # Audit Trail
//!
//! Builds the single audit entry written with every committed change.
//!
//! ## Rules
//!
//! - One commit, one entry. A commit touching several tracked fields writes
//!   one `updated` entry whose diff lists every field.
//! - A commit that changes nothing writes nothing.
//! - Entries are written inside the transaction of the change they describe.

use crm_types::{
    BudgetReference, BudgetStatus, FieldChange, LeadSource, LeadStatus, LogAction, Money, StaffId,
};
use serde::{Deserialize, Deserializer};

/// Tracked field names as they appear in diffs.
pub mod fields {
    pub const STATUS: &str = "status";
    pub const ASSIGNED_TO: &str = "assigned_to";
    pub const NOTES: &str = "notes";
    pub const BUDGET_REFERENCE: &str = "budget_reference";
    pub const BUDGET_AMOUNT: &str = "budget_amount";
    pub const BUDGET_STATUS: &str = "budget_status";
}

/// Requested mutation of a lead. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LeadUpdate {
    pub status: Option<LeadStatus>,
    /// `Some(None)` unassigns.
    #[serde(deserialize_with = "present")]
    pub assigned_to: Option<Option<StaffId>>,
    /// A note to append to the internal notes.
    #[serde(alias = "notes")]
    pub note: Option<String>,
}

impl LeadUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assigned_to.is_none() && self.note.is_none()
    }
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A change that was committed, for post-commit side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadChange {
    StatusChanged { from: LeadStatus, to: LeadStatus },
    Assigned {
        from: Option<StaffId>,
        to: Option<StaffId>,
    },
    NoteAdded { text: String },
}

/// An audit entry before it receives its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditDraft {
    pub action: LogAction,
    pub description: String,
    pub changes: Vec<FieldChange>,
}

/// One described field change.
#[derive(Debug, Clone)]
pub struct DescribedChange {
    pub change: FieldChange,
    pub summary: String,
    pub action: LogAction,
}

impl DescribedChange {
    pub fn status(from: LeadStatus, to: LeadStatus) -> Self {
        Self {
            change: FieldChange::new(
                fields::STATUS,
                Some(from.to_string()),
                Some(to.to_string()),
            ),
            summary: format!("Status: {} → {}", from, to),
            action: LogAction::StatusChanged,
        }
    }

    /// `from_label` / `to_label` are display names for the summary.
    pub fn assignment(
        from: Option<StaffId>,
        to: Option<StaffId>,
        from_label: Option<&str>,
        to_label: Option<&str>,
    ) -> Self {
        let summary = match (from_label, to_label) {
            (_, Some(to)) => format!("Assigned to {}", to),
            (Some(from), None) => format!("Unassigned from {}", from),
            (None, None) => "Unassigned".to_string(),
        };
        Self {
            change: FieldChange::new(
                fields::ASSIGNED_TO,
                from.map(|id| id.to_string()),
                to.map(|id| id.to_string()),
            ),
            summary,
            action: LogAction::Assigned,
        }
    }

    pub fn note(text: &str) -> Self {
        Self {
            change: FieldChange::new(fields::NOTES, None, Some(text.to_string())),
            summary: "Note added".to_string(),
            action: LogAction::Noted,
        }
    }
}

/// Fold the changes of one commit into one entry. `None` when nothing changed.
pub fn summarize(changes: Vec<DescribedChange>) -> Option<AuditDraft> {
    match changes.len() {
        0 => None,
        1 => changes.into_iter().next().map(|c| AuditDraft {
            action: c.action,
            description: c.summary,
            changes: vec![c.change],
        }),
        _ => {
            let description = changes
                .iter()
                .map(|c| c.summary.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            Some(AuditDraft {
                action: LogAction::Updated,
                description,
                changes: changes.into_iter().map(|c| c.change).collect(),
            })
        }
    }
}

/// Entry for a newly captured lead.
pub fn creation_entry(source: LeadSource, actor_label: Option<&str>) -> AuditDraft {
    let description = match actor_label {
        Some(actor) => format!("Lead created by {} (source: {})", actor, source),
        None => format!("Lead created from {} submission", source),
    };
    AuditDraft {
        action: LogAction::Created,
        description,
        changes: Vec::new(),
    }
}

/// Entry for a new budget.
pub fn budget_created_entry(reference: &BudgetReference, amount: Money) -> AuditDraft {
    AuditDraft {
        action: LogAction::BudgetCreated,
        description: format!("Budget {} created ({})", reference, amount),
        changes: vec![
            FieldChange::new(fields::BUDGET_REFERENCE, None, Some(reference.to_string())),
            FieldChange::new(fields::BUDGET_AMOUNT, None, Some(amount.to_string())),
        ],
    }
}

/// Entry for a budget status change.
pub fn budget_status_entry(
    reference: &BudgetReference,
    from: BudgetStatus,
    to: BudgetStatus,
) -> AuditDraft {
    AuditDraft {
        action: LogAction::BudgetStatusChanged,
        description: format!("Budget {}: {} → {}", reference, from, to),
        changes: vec![FieldChange::new(
            fields::BUDGET_STATUS,
            Some(from.to_string()),
            Some(to.to_string()),
        )],
    }
}
