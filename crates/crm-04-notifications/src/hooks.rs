//! The standard post-commit hooks.
//!
//! | Hook | Event | Recipient |
//! |------|-------|-----------|
//! | `admin_alert` | Created | configured admin address |
//! | `customer_ack` | Created | the lead's email, if any |
//! | `assignment` | Assigned | the assignee's email, if any |
//! | `note_alert` | NoteAdded | configured admin address |

use crate::domain::errors::MailError;
use crate::domain::events::LeadEvent;
use crate::domain::links::LinkBuilder;
use crate::domain::templates;
use crate::ports::hooks::{HookStatus, PostCommitHook};
use crate::ports::outbound::Mailer;
use async_trait::async_trait;
use std::sync::Arc;

/// Alerts the admin address about a new lead.
pub struct AdminAlertHook {
    mailer: Arc<dyn Mailer>,
    admin_email: Option<String>,
    links: LinkBuilder,
}

impl AdminAlertHook {
    pub fn new(mailer: Arc<dyn Mailer>, admin_email: Option<String>, links: LinkBuilder) -> Self {
        Self {
            mailer,
            admin_email,
            links,
        }
    }
}

#[async_trait]
impl PostCommitHook for AdminAlertHook {
    fn name(&self) -> &'static str {
        "admin_alert"
    }

    fn handles(&self, event: &LeadEvent) -> bool {
        matches!(event, LeadEvent::Created { .. })
    }

    async fn run(&self, event: &LeadEvent) -> Result<HookStatus, MailError> {
        let LeadEvent::Created {
            lead,
            image_count,
            service_name,
        } = event
        else {
            return Ok(HookStatus::Skipped("not a new lead"));
        };
        let Some(to) = &self.admin_email else {
            return Ok(HookStatus::Skipped("no admin address configured"));
        };

        let link = self.links.lead(lead.id)?;
        let email = templates::admin_alert(to, lead, *image_count, service_name.as_deref(), &link);
        self.mailer.send(&email).await?;
        Ok(HookStatus::Sent)
    }
}

/// Acknowledges the submission to the customer.
pub struct CustomerAckHook {
    mailer: Arc<dyn Mailer>,
    business_name: String,
}

impl CustomerAckHook {
    pub fn new(mailer: Arc<dyn Mailer>, business_name: impl Into<String>) -> Self {
        Self {
            mailer,
            business_name: business_name.into(),
        }
    }
}

#[async_trait]
impl PostCommitHook for CustomerAckHook {
    fn name(&self) -> &'static str {
        "customer_ack"
    }

    fn handles(&self, event: &LeadEvent) -> bool {
        matches!(event, LeadEvent::Created { .. })
    }

    async fn run(&self, event: &LeadEvent) -> Result<HookStatus, MailError> {
        let Some(email) = templates::customer_ack(event.lead(), &self.business_name) else {
            return Ok(HookStatus::Skipped("lead has no email address"));
        };
        self.mailer.send(&email).await?;
        Ok(HookStatus::Sent)
    }
}

/// Tells a staff member a lead was assigned to them.
pub struct AssignmentHook {
    mailer: Arc<dyn Mailer>,
    links: LinkBuilder,
}

impl AssignmentHook {
    pub fn new(mailer: Arc<dyn Mailer>, links: LinkBuilder) -> Self {
        Self { mailer, links }
    }
}

#[async_trait]
impl PostCommitHook for AssignmentHook {
    fn name(&self) -> &'static str {
        "assignment"
    }

    fn handles(&self, event: &LeadEvent) -> bool {
        matches!(event, LeadEvent::Assigned { .. })
    }

    async fn run(&self, event: &LeadEvent) -> Result<HookStatus, MailError> {
        let LeadEvent::Assigned { lead, assignee, by } = event else {
            return Ok(HookStatus::Skipped("not an assignment"));
        };
        if assignee.id == by.id {
            return Ok(HookStatus::Skipped("self-assignment"));
        }

        let link = self.links.lead(lead.id)?;
        let Some(email) = templates::assignment(lead, assignee, by, &link) else {
            return Ok(HookStatus::Skipped("assignee has no email address"));
        };
        self.mailer.send(&email).await?;
        Ok(HookStatus::Sent)
    }
}

/// Tells the admin address about a new note.
pub struct NoteAlertHook {
    mailer: Arc<dyn Mailer>,
    admin_email: Option<String>,
    links: LinkBuilder,
}

impl NoteAlertHook {
    pub fn new(mailer: Arc<dyn Mailer>, admin_email: Option<String>, links: LinkBuilder) -> Self {
        Self {
            mailer,
            admin_email,
            links,
        }
    }
}

#[async_trait]
impl PostCommitHook for NoteAlertHook {
    fn name(&self) -> &'static str {
        "note_alert"
    }

    fn handles(&self, event: &LeadEvent) -> bool {
        matches!(event, LeadEvent::NoteAdded { .. })
    }

    async fn run(&self, event: &LeadEvent) -> Result<HookStatus, MailError> {
        let LeadEvent::NoteAdded { lead, note, by } = event else {
            return Ok(HookStatus::Skipped("not a note"));
        };
        let Some(to) = &self.admin_email else {
            return Ok(HookStatus::Skipped("no admin address configured"));
        };

        let link = self.links.lead(lead.id)?;
        let email = templates::note_added(to, lead, note, by, &link);
        self.mailer.send(&email).await?;
        Ok(HookStatus::Sent)
    }
}
