//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the lead service.
//!
//! Production: `SqliteLeadStore`
//! Testing: `InMemoryLeadStore` (with fault injection)

use crate::domain::errors::StoreError;
use chrono::NaiveDate;
use crm_types::{
    Budget, BudgetId, BudgetReference, BudgetStatus, ContactChannel, FieldChange, ImageFormat,
    ImagePayload, Lead, LeadId, LeadImage, LeadImageId, LeadLog, LeadSource, LeadStatus, LogAction,
    LogId, Money, ServiceCategory, ServiceId, StaffId, StaffMember, Timestamp, Urgency,
};
use std::net::IpAddr;

/// Abstract interface for transactional lead storage.
///
/// ## Atomicity Guarantee
///
/// Everything done through the `LeadTransaction` handed to `f` commits
/// together when `f` returns `Ok`, and is rolled back when it returns `Err`.
pub trait LeadStore: Send + Sync + 'static {
    fn with_transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn LeadTransaction) -> Result<T, StoreError>;

    /// Cheap liveness probe of the backend.
    fn ping(&self) -> Result<(), StoreError>;
}

/// Operations available inside a transaction.
///
/// Audit entries can only be appended: there is no update or delete for logs.
pub trait LeadTransaction {
    // Leads
    fn insert_lead(&mut self, lead: &NewLeadRecord) -> Result<LeadId, StoreError>;
    fn update_lead(&mut self, lead: &Lead) -> Result<(), StoreError>;
    fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, StoreError>;
    fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError>;
    fn count_leads(&self, filter: &LeadFilter) -> Result<u64, StoreError>;

    // Images
    fn insert_image(
        &mut self,
        lead_id: LeadId,
        image: &NewImageRecord,
        uploaded_at: Timestamp,
    ) -> Result<LeadImageId, StoreError>;
    fn list_images(&self, lead_id: LeadId) -> Result<Vec<LeadImage>, StoreError>;
    fn get_image(
        &self,
        lead_id: LeadId,
        image_id: LeadImageId,
    ) -> Result<Option<ImagePayload>, StoreError>;

    // Audit
    fn append_log(&mut self, entry: &NewLogRecord) -> Result<LogId, StoreError>;
    fn list_logs(&self, lead_id: LeadId) -> Result<Vec<LeadLog>, StoreError>;

    // Budgets
    /// Next free sequence number for `year` (1 for the first budget of a year).
    fn next_budget_sequence(&mut self, year: i32) -> Result<u32, StoreError>;
    fn insert_budget(&mut self, budget: &NewBudgetRecord) -> Result<BudgetId, StoreError>;
    fn update_budget_status(
        &mut self,
        id: BudgetId,
        status: BudgetStatus,
    ) -> Result<(), StoreError>;
    fn get_budget(&self, reference: &BudgetReference) -> Result<Option<Budget>, StoreError>;
    fn list_budgets(&self, lead_id: LeadId) -> Result<Vec<Budget>, StoreError>;
    fn get_budget_document(
        &self,
        reference: &BudgetReference,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    // Staff & catalogue
    fn upsert_staff(&mut self, staff: &StaffMember) -> Result<(), StoreError>;
    fn get_staff(&self, id: StaffId) -> Result<Option<StaffMember>, StoreError>;
    fn upsert_service(&mut self, service: &ServiceCategory) -> Result<(), StoreError>;
    fn get_service(&self, id: ServiceId) -> Result<Option<ServiceCategory>, StoreError>;
}

// =============================================================================
// RECORDS
// =============================================================================

/// A lead about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeadRecord {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub message: String,
    pub service_id: Option<ServiceId>,
    pub urgency: Urgency,
    pub preferred_contact: ContactChannel,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub assigned_to: Option<StaffId>,
    pub notes: String,
    pub privacy_accepted: bool,
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

impl NewLeadRecord {
    /// The full lead once the store assigned `id`.
    pub fn into_lead(self, id: LeadId) -> Lead {
        Lead {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            location: self.location,
            message: self.message,
            service_id: self.service_id,
            urgency: self.urgency,
            preferred_contact: self.preferred_contact,
            source: self.source,
            status: self.status,
            assigned_to: self.assigned_to,
            notes: self.notes,
            privacy_accepted: self.privacy_accepted,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// A validated image about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImageRecord {
    pub file_name: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// An audit entry about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogRecord {
    pub lead_id: LeadId,
    pub action: LogAction,
    pub description: String,
    pub changes: Vec<FieldChange>,
    pub actor: Option<StaffId>,
    pub created_at: Timestamp,
}

impl NewLogRecord {
    pub fn into_log(self, id: LogId) -> LeadLog {
        LeadLog {
            id,
            lead_id: self.lead_id,
            action: self.action,
            description: self.description,
            changes: self.changes,
            actor: self.actor,
            created_at: self.created_at,
        }
    }
}

/// A budget about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudgetRecord {
    pub lead_id: LeadId,
    pub reference: BudgetReference,
    pub year: i32,
    pub sequence: u32,
    pub description: String,
    pub amount: Money,
    pub status: BudgetStatus,
    pub valid_until: Option<NaiveDate>,
    pub document: Option<Vec<u8>>,
    pub created_by: Option<StaffId>,
    pub created_at: Timestamp,
}

impl NewBudgetRecord {
    pub fn to_budget(&self, id: BudgetId) -> Budget {
        Budget {
            id,
            lead_id: self.lead_id,
            reference: self.reference.clone(),
            description: self.description.clone(),
            amount: self.amount,
            status: self.status,
            valid_until: self.valid_until,
            has_document: self.document.is_some(),
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

/// Listing filter. Results are ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub assigned_to: Option<StaffId>,
    pub limit: u32,
    pub offset: u32,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        self.status.map_or(true, |s| lead.status == s)
            && self
                .assigned_to
                .map_or(true, |a| lead.assigned_to == Some(a))
    }
}
