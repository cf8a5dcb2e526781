//! Committed lead events that trigger notifications.

use crm_types::{Lead, StaffMember};

/// Something that already committed. Hooks only ever see committed state.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadEvent {
    /// A lead was captured.
    Created {
        lead: Lead,
        image_count: usize,
        service_name: Option<String>,
    },
    /// A lead was assigned to a staff member.
    Assigned {
        lead: Lead,
        assignee: StaffMember,
        by: StaffMember,
    },
    /// A note was appended to a lead.
    NoteAdded {
        lead: Lead,
        note: String,
        by: StaffMember,
    },
}

impl LeadEvent {
    pub fn lead(&self) -> &Lead {
        match self {
            LeadEvent::Created { lead, .. }
            | LeadEvent::Assigned { lead, .. }
            | LeadEvent::NoteAdded { lead, .. } => lead,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LeadEvent::Created { .. } => "created",
            LeadEvent::Assigned { .. } => "assigned",
            LeadEvent::NoteAdded { .. } => "note_added",
        }
    }
}
