//! # Intake Pipeline
//!
//! One contact submission, strictly in order:
//!
//! ```text
//! form token ─► abuse gate ─► field validation ─► attachments ─► lead store ─► post-commit hooks
//!   403          429 / fake ok        422               422          500           (spawned)
//! ```
//!
//! Nothing is written before the store step, and the store step is a single
//! transaction. Notifications are spawned after commit and never awaited by
//! the request.

use crate::domain::form::{ContactSubmission, PHOTOS_FIELD};
use crate::middleware::IntakeMetrics;
use crm_01_file_integrity::{validate_attachments, AttachmentPolicy};
use crm_02_abuse_gate::{
    AbuseGate, DiscardReason, GateDecision, RejectReason, SubmissionContext, TokenError,
};
use crm_03_lead_store::{
    ClientInfo, CreatedLead, LeadChange, LeadManagementApi, LeadUpdateOutcome, NewImageRecord,
    NewLead, StoreError,
};
use crm_04_notifications::{LeadEvent, NotificationReport, PostCommitHooks};
use crm_types::{FieldErrors, LeadId, LeadSource, StaffMember};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What happened to a submission.
#[derive(Debug)]
pub enum ContactOutcome {
    /// Lead committed; notifications are running in the background.
    Accepted {
        lead_id: LeadId,
        notifications: JoinHandle<NotificationReport>,
    },
    /// Bot traffic. Answered like a success, nothing stored.
    Discarded(DiscardReason),
    Invalid(FieldErrors),
    RateLimited,
    Forbidden(TokenError),
    /// Storage failure, already logged.
    Failed,
}

/// Everything the pipeline needs.
pub struct IntakePipelineDependencies {
    pub gate: Arc<AbuseGate>,
    pub leads: Arc<dyn LeadManagementApi>,
    pub hooks: PostCommitHooks,
    pub metrics: Arc<IntakeMetrics>,
}

/// The contact submission pipeline.
pub struct IntakePipeline {
    gate: Arc<AbuseGate>,
    leads: Arc<dyn LeadManagementApi>,
    hooks: PostCommitHooks,
    metrics: Arc<IntakeMetrics>,
    attachments: AttachmentPolicy,
}

impl IntakePipeline {
    pub fn new(deps: IntakePipelineDependencies, attachments: AttachmentPolicy) -> Self {
        Self {
            gate: deps.gate,
            leads: deps.leads,
            hooks: deps.hooks,
            metrics: deps.metrics,
            attachments,
        }
    }

    pub fn gate(&self) -> &AbuseGate {
        &self.gate
    }

    pub fn attachment_policy(&self) -> &AttachmentPolicy {
        &self.attachments
    }

    /// Run one submission through every step.
    pub async fn submit(&self, submission: ContactSubmission) -> ContactOutcome {
        self.metrics.record_submission();
        let ip = submission.ip;

        let token = match self.gate.verify_form_token(submission.csrf_token.as_deref()) {
            Ok(token) => token,
            Err(e) => {
                warn!(ip = %ip, error = %e, "Contact form token rejected");
                self.metrics.record_forbidden();
                return ContactOutcome::Forbidden(e);
            }
        };

        let ctx = SubmissionContext {
            ip,
            honeypot_value: submission.honeypot.as_deref(),
            form_age: token.map(|t| t.age),
        };
        match self.gate.evaluate(&ctx).await {
            GateDecision::Accept => {}
            GateDecision::Discard(reason) => {
                self.metrics.record_discarded();
                return ContactOutcome::Discarded(reason);
            }
            GateDecision::Reject(RejectReason::RateLimited) => {
                self.metrics.record_rate_limited();
                return ContactOutcome::RateLimited;
            }
        }

        let mut errors = FieldErrors::new();
        let contact = submission
            .form
            .validate()
            .map_err(|e| errors.merge(e))
            .ok();
        let images = validate_attachments(submission.attachments, &self.attachments)
            .map_err(|e| errors.merge(e.to_field_errors(PHOTOS_FIELD)))
            .ok();
        let (Some(contact), Some(images)) = (contact, images) else {
            debug!(ip = %ip, %errors, "Contact submission invalid");
            self.metrics.record_invalid();
            return ContactOutcome::Invalid(errors);
        };

        let new_lead = NewLead {
            contact,
            images: images
                .into_iter()
                .map(|a| NewImageRecord {
                    file_name: a.file_name,
                    format: a.format,
                    bytes: a.bytes,
                })
                .collect(),
            source: LeadSource::Web,
            client: ClientInfo {
                ip: Some(ip),
                user_agent: submission.user_agent,
            },
            actor: None,
        };

        let leads = Arc::clone(&self.leads);
        let stored = tokio::task::spawn_blocking(move || {
            let created = leads.create_lead(new_lead)?;
            let service_name = service_name(leads.as_ref(), &created);
            Ok::<_, StoreError>((created, service_name))
        })
        .await;

        let (created, service_name) = match stored {
            Ok(Ok(stored)) => stored,
            Ok(Err(StoreError::Validation(errors))) => {
                debug!(ip = %ip, %errors, "Contact submission rejected by the store");
                self.metrics.record_invalid();
                return ContactOutcome::Invalid(errors);
            }
            Ok(Err(e)) => {
                error!(ip = %ip, error = %e, "Failed to store contact submission");
                self.metrics.record_failed();
                return ContactOutcome::Failed;
            }
            Err(e) => {
                error!(ip = %ip, error = %e, "Lead store task failed");
                self.metrics.record_failed();
                return ContactOutcome::Failed;
            }
        };

        let lead_id = created.lead.id;
        info!(
            lead_id = %lead_id,
            ip = %ip,
            images = created.images.len(),
            urgency = %created.lead.urgency,
            "Lead captured"
        );
        self.metrics.record_accepted();

        let notifications = self.notify(LeadEvent::Created {
            image_count: created.images.len(),
            lead: created.lead,
            service_name,
        });
        ContactOutcome::Accepted {
            lead_id,
            notifications,
        }
    }

    /// Run the post-commit hooks for `event` in the background.
    pub fn notify(&self, event: LeadEvent) -> JoinHandle<NotificationReport> {
        let hooks = self.hooks.clone();
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            let report = hooks.dispatch(event).await;
            metrics.record_notifications(&report);
            report
        })
    }

    /// Post-commit events of a committed staff-created lead.
    pub fn notify_created(&self, created: &CreatedLead, service_name: Option<String>) {
        drop(self.notify(LeadEvent::Created {
            lead: created.lead.clone(),
            image_count: created.images.len(),
            service_name,
        }));
    }

    /// Post-commit events of a committed lead update.
    pub fn notify_updated(
        &self,
        outcome: &LeadUpdateOutcome,
        assignee: Option<StaffMember>,
        actor: &StaffMember,
    ) {
        for event in update_events(outcome, assignee, actor) {
            drop(self.notify(event));
        }
    }
}

/// Catalogue name of the lead's service. A failed lookup only loses the name.
pub fn service_name(leads: &dyn LeadManagementApi, created: &CreatedLead) -> Option<String> {
    let id = created.lead.service_id?;
    match leads.service(id) {
        Ok(service) => service.map(|s| s.name),
        Err(e) => {
            warn!(lead_id = %created.lead.id, error = %e, "Service lookup failed");
            None
        }
    }
}

/// Staff member a committed update assigned the lead to, if any.
pub fn new_assignee(outcome: &LeadUpdateOutcome) -> Option<crm_types::StaffId> {
    outcome.changes.iter().find_map(|change| match change {
        LeadChange::Assigned { to: Some(id), .. } => Some(*id),
        _ => None,
    })
}

/// Events raised by a committed update.
pub fn update_events(
    outcome: &LeadUpdateOutcome,
    assignee: Option<StaffMember>,
    actor: &StaffMember,
) -> Vec<LeadEvent> {
    let mut events = Vec::new();
    if let Some(assignee) = assignee {
        events.push(LeadEvent::Assigned {
            lead: outcome.lead.clone(),
            assignee,
            by: actor.clone(),
        });
    }
    for change in &outcome.changes {
        if let LeadChange::NoteAdded { text } = change {
            events.push(LeadEvent::NoteAdded {
                lead: outcome.lead.clone(),
                note: text.clone(),
                by: actor.clone(),
            });
        }
    }
    events
}
