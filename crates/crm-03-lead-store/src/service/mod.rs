//! # Lead Service
//!
//! Implements `LeadManagementApi` on top of any `LeadStore`.
//!
//! ## Architecture
//!
//! This service:
//! 1. Captures leads, their images and the creation entry in one transaction
//! 2. Is the only mutation path for tracked lead fields
//! 3. Writes exactly one audit entry per committed change
//! 4. Enforces role-based visibility for the back office

use crate::domain::audit::{
    budget_created_entry, budget_status_entry, creation_entry, summarize, AuditDraft,
    DescribedChange, LeadChange, LeadUpdate,
};
use crate::domain::budget::{reference_for, validate_draft, BudgetDraft};
use crate::domain::config::LeadStoreConfig;
use crate::domain::errors::StoreError;
use crate::domain::lifecycle::{check_budget_transition, check_lead_transition, Transition};
use crate::domain::validation::truncate_chars;
use crate::ports::inbound::{
    CreatedLead, LeadDetail, LeadManagementApi, LeadPage, LeadUpdateOutcome, ListQuery, NewLead,
};
use crate::ports::outbound::{
    LeadFilter, LeadStore, LeadTransaction, NewBudgetRecord, NewLeadRecord, NewLogRecord,
};
use chrono::Datelike;
use crm_types::{
    Budget, BudgetReference, BudgetStatus, Clock, ImagePayload, Lead, LeadId, LeadImageId,
    LeadLog, LeadSource, LeadStatus, ServiceCategory, ServiceId, StaffId, StaffMember, Timestamp,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Maximum length of a single note.
pub const NOTE_MAX: usize = 2000;

/// Dependencies of the lead service.
pub struct LeadServiceDependencies<S: LeadStore> {
    pub store: Arc<S>,
    pub clock: Arc<dyn Clock>,
}

/// The lead service.
pub struct LeadService<S: LeadStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: LeadStoreConfig,
}

impl<S: LeadStore> LeadService<S> {
    pub fn new(deps: LeadServiceDependencies<S>, config: LeadStoreConfig) -> Self {
        Self {
            store: deps.store,
            clock: deps.clock,
            config,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &LeadStoreConfig {
        &self.config
    }
}

/// Storage failures are logged here with detail; callers only see them generically.
fn log_failure<T>(op: &'static str, result: Result<T, StoreError>) -> Result<T, StoreError> {
    if let Err(StoreError::Storage(detail)) = &result {
        error!(operation = op, error = %detail, "Lead store operation failed; rolled back");
    }
    result
}

/// Active staff only.
fn ensure_active(actor: &StaffMember) -> Result<(), StoreError> {
    if actor.active {
        Ok(())
    } else {
        Err(StoreError::Forbidden(format!(
            "staff member {} is inactive",
            actor.username
        )))
    }
}

/// Field staff only see leads assigned to them. Hidden leads read as missing.
fn ensure_visible(lead: &Lead, viewer: &StaffMember) -> Result<(), StoreError> {
    ensure_active(viewer)?;
    if viewer.role.can_manage_leads() || lead.assigned_to == Some(viewer.id) {
        Ok(())
    } else {
        Err(StoreError::not_found("lead", lead.id))
    }
}

fn load_lead(tx: &dyn LeadTransaction, id: LeadId) -> Result<Lead, StoreError> {
    tx.get_lead(id)?
        .ok_or_else(|| StoreError::not_found("lead", id))
}

fn load_budget(tx: &dyn LeadTransaction, reference: &BudgetReference) -> Result<Budget, StoreError> {
    tx.get_budget(reference)?
        .ok_or_else(|| StoreError::not_found("budget", reference))
}

/// Append the entry for `draft` and return it with its id.
fn append_entry(
    tx: &mut dyn LeadTransaction,
    lead_id: LeadId,
    draft: AuditDraft,
    actor: Option<StaffId>,
    at: Timestamp,
) -> Result<LeadLog, StoreError> {
    let record = NewLogRecord {
        lead_id,
        action: draft.action,
        description: draft.description,
        changes: draft.changes,
        actor,
        created_at: at,
    };
    let id = tx.append_log(&record)?;
    Ok(record.into_log(id))
}

impl<S: LeadStore> LeadManagementApi for LeadService<S> {
    fn create_lead(&self, new_lead: NewLead) -> Result<CreatedLead, StoreError> {
        let NewLead {
            contact,
            images,
            source,
            client,
            actor,
        } = new_lead;

        match &actor {
            Some(staff) => {
                ensure_active(staff)?;
                if !staff.role.can_manage_leads() {
                    return Err(StoreError::Forbidden(format!(
                        "role {} cannot create leads",
                        staff.role
                    )));
                }
                if source == LeadSource::Web {
                    return Err(StoreError::field(
                        "source",
                        "Leads entered by staff cannot use the web source.",
                    ));
                }
            }
            None if source != LeadSource::Web => {
                return Err(StoreError::Forbidden(
                    "only staff can enter non-web leads".into(),
                ));
            }
            None => {}
        }

        if images.len() > self.config.max_images {
            return Err(StoreError::field(
                "images",
                format!("At most {} images are allowed.", self.config.max_images),
            ));
        }

        let now = self.clock.now();
        let (ip_address, user_agent) = if contact.privacy_accepted {
            (
                client.ip,
                client
                    .user_agent
                    .map(|ua| truncate_chars(&ua, self.config.user_agent_max_len)),
            )
        } else {
            (None, None)
        };

        let record = NewLeadRecord {
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            location: contact.location,
            message: contact.message,
            service_id: contact.service_id,
            urgency: contact.urgency,
            preferred_contact: contact.preferred_contact,
            source,
            status: LeadStatus::New,
            assigned_to: None,
            notes: String::new(),
            privacy_accepted: contact.privacy_accepted,
            ip_address,
            user_agent,
            created_at: now,
        };

        let result = self.store.with_transaction(|tx| {
            if let Some(service_id) = record.service_id {
                match tx.get_service(service_id)? {
                    Some(service) if service.active => {}
                    _ => return Err(StoreError::field("service", "Unknown service.")),
                }
            }

            let lead_id = tx.insert_lead(&record)?;

            for image in &images {
                tx.insert_image(lead_id, image, now)?;
            }
            let stored_images = tx.list_images(lead_id)?;

            let entry = creation_entry(source, actor.as_ref().map(|a| a.display_name()));
            let log = append_entry(tx, lead_id, entry, actor.as_ref().map(|a| a.id), now)?;

            Ok(CreatedLead {
                lead: record.clone().into_lead(lead_id),
                images: stored_images,
                log,
            })
        });

        let created = log_failure("create_lead", result)?;
        info!(
            lead_id = %created.lead.id,
            source = %source,
            images = created.images.len(),
            "Lead captured"
        );
        Ok(created)
    }

    fn update_lead(
        &self,
        id: LeadId,
        update: LeadUpdate,
        actor: &StaffMember,
    ) -> Result<LeadUpdateOutcome, StoreError> {
        if let Some(note) = &update.note {
            if note.chars().count() > NOTE_MAX {
                return Err(StoreError::field(
                    "note",
                    format!("Notes cannot exceed {} characters.", NOTE_MAX),
                ));
            }
        }

        let now = self.clock.now();
        let result = self.store.with_transaction(|tx| {
            let mut lead = load_lead(tx, id)?;
            ensure_visible(&lead, actor)?;

            if update.assigned_to.is_some() && !actor.role.can_manage_leads() {
                return Err(StoreError::Forbidden(format!(
                    "role {} cannot reassign leads",
                    actor.role
                )));
            }

            let mut described = Vec::new();
            let mut changes = Vec::new();

            if let Some(to) = update.status {
                let from = lead.status;
                if check_lead_transition(from, to)? == Transition::Allowed {
                    described.push(DescribedChange::status(from, to));
                    changes.push(LeadChange::StatusChanged { from, to });
                    lead.status = to;
                }
            }

            if let Some(to) = update.assigned_to {
                let from = lead.assigned_to;
                if to != from {
                    let assignee = match to {
                        Some(staff_id) => Some(
                            tx.get_staff(staff_id)?
                                .filter(|member| member.active)
                                .ok_or_else(|| {
                                    StoreError::field(
                                        "assigned_to",
                                        "Unknown or inactive staff member.",
                                    )
                                })?,
                        ),
                        None => None,
                    };
                    let previous = match from {
                        Some(staff_id) => tx.get_staff(staff_id)?,
                        None => None,
                    };
                    described.push(DescribedChange::assignment(
                        from,
                        to,
                        previous.as_ref().map(|m| m.display_name()),
                        assignee.as_ref().map(|m| m.display_name()),
                    ));
                    changes.push(LeadChange::Assigned { from, to });
                    lead.assigned_to = to;
                }
            }

            if let Some(note) = update.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                if !lead.notes.is_empty() {
                    lead.notes.push('\n');
                }
                lead.notes.push_str(&format!(
                    "[{} {}] {}",
                    now.format("%Y-%m-%d %H:%M"),
                    actor.display_name(),
                    note
                ));
                described.push(DescribedChange::note(note));
                changes.push(LeadChange::NoteAdded {
                    text: note.to_string(),
                });
            }

            let log = match summarize(described) {
                Some(draft) => {
                    lead.updated_at = now;
                    tx.update_lead(&lead)?;
                    Some(append_entry(tx, lead.id, draft, Some(actor.id), now)?)
                }
                None => None,
            };

            Ok(LeadUpdateOutcome { lead, log, changes })
        });

        let outcome = log_failure("update_lead", result)?;
        match &outcome.log {
            Some(log) => info!(
                lead_id = %id,
                log_id = %log.id,
                action = %log.action,
                actor = %actor.id,
                "Lead updated"
            ),
            None => debug!(lead_id = %id, "Lead update changed nothing"),
        }
        Ok(outcome)
    }

    fn get_lead(&self, id: LeadId, viewer: &StaffMember) -> Result<LeadDetail, StoreError> {
        self.store.with_transaction(|tx| {
            let lead = load_lead(tx, id)?;
            ensure_visible(&lead, viewer)?;
            Ok(LeadDetail {
                images: tx.list_images(id)?,
                budgets: tx.list_budgets(id)?,
                logs: tx.list_logs(id)?,
                lead,
            })
        })
    }

    fn list_leads(&self, query: &ListQuery, viewer: &StaffMember) -> Result<LeadPage, StoreError> {
        ensure_active(viewer)?;
        let limit = query
            .limit
            .unwrap_or(self.config.default_page_size)
            .clamp(1, self.config.max_page_size);
        let offset = query.offset.unwrap_or(0);
        let filter = LeadFilter {
            status: query.status,
            assigned_to: if viewer.role.can_manage_leads() {
                None
            } else {
                Some(viewer.id)
            },
            limit,
            offset,
        };

        self.store.with_transaction(|tx| {
            Ok(LeadPage {
                leads: tx.list_leads(&filter)?,
                total: tx.count_leads(&filter)?,
                limit,
                offset,
            })
        })
    }

    fn lead_logs(&self, id: LeadId, viewer: &StaffMember) -> Result<Vec<LeadLog>, StoreError> {
        self.store.with_transaction(|tx| {
            let lead = load_lead(tx, id)?;
            ensure_visible(&lead, viewer)?;
            tx.list_logs(id)
        })
    }

    fn lead_image(
        &self,
        id: LeadId,
        image_id: LeadImageId,
        viewer: &StaffMember,
    ) -> Result<ImagePayload, StoreError> {
        self.store.with_transaction(|tx| {
            let lead = load_lead(tx, id)?;
            ensure_visible(&lead, viewer)?;
            tx.get_image(id, image_id)?
                .ok_or_else(|| StoreError::not_found("image", image_id))
        })
    }

    fn create_budget(
        &self,
        lead_id: LeadId,
        draft: BudgetDraft,
        actor: &StaffMember,
    ) -> Result<Budget, StoreError> {
        ensure_active(actor)?;
        if !actor.role.can_create_budgets() {
            return Err(StoreError::Forbidden(format!(
                "role {} cannot create budgets",
                actor.role
            )));
        }

        let now = self.clock.now();
        validate_draft(&draft, now.date_naive())?;
        let year = now.year();

        let result = self.store.with_transaction(|tx| {
            load_lead(tx, lead_id)?;

            let sequence = tx.next_budget_sequence(year)?;
            let reference = reference_for(&self.config.budget_reference_prefix, year, sequence);
            let record = NewBudgetRecord {
                lead_id,
                reference,
                year,
                sequence,
                description: draft.description.trim().to_string(),
                amount: draft.amount,
                status: BudgetStatus::Draft,
                valid_until: draft.valid_until,
                document: draft.document,
                created_by: Some(actor.id),
                created_at: now,
            };
            let id = tx.insert_budget(&record)?;

            let entry = budget_created_entry(&record.reference, record.amount);
            append_entry(tx, lead_id, entry, Some(actor.id), now)?;

            Ok(record.to_budget(id))
        });

        let budget = log_failure("create_budget", result)?;
        info!(
            lead_id = %lead_id,
            reference = %budget.reference,
            amount = %budget.amount,
            "Budget created"
        );
        Ok(budget)
    }

    fn change_budget_status(
        &self,
        reference: &BudgetReference,
        status: BudgetStatus,
        actor: &StaffMember,
    ) -> Result<Budget, StoreError> {
        ensure_active(actor)?;
        if !actor.role.can_create_budgets() {
            return Err(StoreError::Forbidden(format!(
                "role {} cannot change budgets",
                actor.role
            )));
        }

        let now = self.clock.now();
        let result = self.store.with_transaction(|tx| {
            let mut budget = load_budget(tx, reference)?;
            let from = budget.status;
            if check_budget_transition(from, status)? == Transition::Unchanged {
                return Ok(budget);
            }

            tx.update_budget_status(budget.id, status)?;
            let entry = budget_status_entry(reference, from, status);
            append_entry(tx, budget.lead_id, entry, Some(actor.id), now)?;

            budget.status = status;
            Ok(budget)
        });

        let budget = log_failure("change_budget_status", result)?;
        info!(reference = %reference, status = %budget.status, "Budget status changed");
        Ok(budget)
    }

    fn get_budget(
        &self,
        reference: &BudgetReference,
        viewer: &StaffMember,
    ) -> Result<Budget, StoreError> {
        self.store.with_transaction(|tx| {
            let budget = load_budget(tx, reference)?;
            let lead = load_lead(tx, budget.lead_id)?;
            ensure_visible(&lead, viewer).map_err(|_| StoreError::not_found("budget", reference))?;
            Ok(budget)
        })
    }

    fn budget_document(
        &self,
        reference: &BudgetReference,
        viewer: &StaffMember,
    ) -> Result<Vec<u8>, StoreError> {
        self.store.with_transaction(|tx| {
            let budget = load_budget(tx, reference)?;
            let lead = load_lead(tx, budget.lead_id)?;
            ensure_visible(&lead, viewer).map_err(|_| StoreError::not_found("budget", reference))?;
            tx.get_budget_document(reference)?
                .ok_or_else(|| StoreError::not_found("budget document", reference))
        })
    }

    fn staff_member(&self, id: StaffId) -> Result<Option<StaffMember>, StoreError> {
        self.store.with_transaction(|tx| tx.get_staff(id))
    }

    fn service(&self, id: ServiceId) -> Result<Option<ServiceCategory>, StoreError> {
        self.store.with_transaction(|tx| tx.get_service(id))
    }

    fn upsert_staff(&self, staff: &StaffMember) -> Result<(), StoreError> {
        self.store.with_transaction(|tx| tx.upsert_staff(staff))
    }

    fn upsert_service(&self, service: &ServiceCategory) -> Result<(), StoreError> {
        self.store.with_transaction(|tx| tx.upsert_service(service))
    }

    fn health_check(&self) -> Result<(), StoreError> {
        self.store.ping()
    }
}

#[cfg(test)]
mod tests;
