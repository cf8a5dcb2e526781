//! # Inbound Ports (Driving Ports)
//!
//! The API the lead service offers to the HTTP gateway and to tests.
//!
//! Every operation that changes a tracked field goes through this trait, and
//! every such operation writes its audit entry in the same transaction.

use crate::domain::audit::{LeadChange, LeadUpdate};
use crate::domain::budget::BudgetDraft;
use crate::domain::errors::StoreError;
use crate::domain::validation::ContactDetails;
use crate::ports::outbound::NewImageRecord;
use crm_types::{
    Budget, BudgetReference, BudgetStatus, ImagePayload, Lead, LeadId, LeadImage, LeadImageId,
    LeadLog, LeadSource, LeadStatus, ServiceCategory, ServiceId, StaffId, StaffMember,
};
use serde::Serialize;
use std::net::IpAddr;

/// Network details of the submitter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

/// A lead to capture.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub contact: ContactDetails,
    pub images: Vec<NewImageRecord>,
    pub source: LeadSource,
    pub client: ClientInfo,
    /// Staff member entering the lead; `None` for the public form.
    pub actor: Option<StaffMember>,
}

/// Result of a successful capture.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedLead {
    pub lead: Lead,
    pub images: Vec<LeadImage>,
    pub log: LeadLog,
}

/// Result of an audited lead update.
#[derive(Debug, Clone)]
pub struct LeadUpdateOutcome {
    pub lead: Lead,
    /// `None` when the update changed nothing.
    pub log: Option<LeadLog>,
    pub changes: Vec<LeadChange>,
}

/// Everything the back office shows for one lead.
#[derive(Debug, Clone, Serialize)]
pub struct LeadDetail {
    pub lead: Lead,
    pub images: Vec<LeadImage>,
    pub budgets: Vec<Budget>,
    pub logs: Vec<LeadLog>,
}

/// Listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<LeadStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// One page of leads.
#[derive(Debug, Clone, Serialize)]
pub struct LeadPage {
    pub leads: Vec<Lead>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// Primary API of the lead service.
pub trait LeadManagementApi: Send + Sync {
    /// Capture a lead with its images and creation entry, atomically.
    fn create_lead(&self, new_lead: NewLead) -> Result<CreatedLead, StoreError>;

    /// Apply an audited change to status, assignment or notes.
    fn update_lead(
        &self,
        id: LeadId,
        update: LeadUpdate,
        actor: &StaffMember,
    ) -> Result<LeadUpdateOutcome, StoreError>;

    fn get_lead(&self, id: LeadId, viewer: &StaffMember) -> Result<LeadDetail, StoreError>;

    fn list_leads(&self, query: &ListQuery, viewer: &StaffMember) -> Result<LeadPage, StoreError>;

    /// Audit trail of a lead, oldest first.
    fn lead_logs(&self, id: LeadId, viewer: &StaffMember) -> Result<Vec<LeadLog>, StoreError>;

    fn lead_image(
        &self,
        id: LeadId,
        image_id: LeadImageId,
        viewer: &StaffMember,
    ) -> Result<ImagePayload, StoreError>;

    /// Create a budget with the next reference of the current year.
    fn create_budget(
        &self,
        lead_id: LeadId,
        draft: BudgetDraft,
        actor: &StaffMember,
    ) -> Result<Budget, StoreError>;

    /// Audited budget status change.
    fn change_budget_status(
        &self,
        reference: &BudgetReference,
        status: BudgetStatus,
        actor: &StaffMember,
    ) -> Result<Budget, StoreError>;

    fn get_budget(
        &self,
        reference: &BudgetReference,
        viewer: &StaffMember,
    ) -> Result<Budget, StoreError>;

    fn budget_document(
        &self,
        reference: &BudgetReference,
        viewer: &StaffMember,
    ) -> Result<Vec<u8>, StoreError>;

    fn staff_member(&self, id: StaffId) -> Result<Option<StaffMember>, StoreError>;

    fn service(&self, id: ServiceId) -> Result<Option<ServiceCategory>, StoreError>;

    /// Register or refresh a staff member.
    fn upsert_staff(&self, staff: &StaffMember) -> Result<(), StoreError>;

    /// Register or refresh a catalogue entry.
    fn upsert_service(&self, service: &ServiceCategory) -> Result<(), StoreError>;

    /// Backend liveness.
    fn health_check(&self) -> Result<(), StoreError>;
}
