//! In-memory lead store.
//!
//! A transaction works on a copy of the tables that replaces the live copy on
//! commit. The write lock is held for the whole transaction, so transactions
//! are serialized exactly like `BEGIN IMMEDIATE` on SQLite.
//!
//! Faults can be injected to exercise rollback paths.

use crate::domain::errors::StoreError;
use crate::ports::outbound::{
    LeadFilter, LeadStore, LeadTransaction, NewBudgetRecord, NewImageRecord, NewLeadRecord,
    NewLogRecord,
};
use crm_types::{
    Budget, BudgetId, BudgetReference, BudgetStatus, ImagePayload, Lead, LeadId, LeadImage,
    LeadImageId, LeadLog, LogId, ServiceCategory, ServiceId, StaffId, StaffMember, Timestamp,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    InsertLead,
    InsertImage,
    AppendLog,
    InsertBudget,
    Ping,
}

#[derive(Debug, Clone)]
struct StoredBudget {
    budget: Budget,
    year: i32,
    sequence: u32,
    document: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    leads: BTreeMap<LeadId, Lead>,
    images: BTreeMap<LeadImageId, (LeadImage, Vec<u8>)>,
    logs: BTreeMap<LogId, LeadLog>,
    budgets: BTreeMap<BudgetId, StoredBudget>,
    staff: BTreeMap<StaffId, StaffMember>,
    services: BTreeMap<ServiceId, ServiceCategory>,
    last_lead_id: i64,
    last_image_id: i64,
    last_log_id: i64,
    last_budget_id: i64,
}

/// Lead store kept in process memory.
#[derive(Default)]
pub struct InMemoryLeadStore {
    tables: RwLock<Tables>,
    faults: Mutex<HashSet<Fault>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `fault` fail until cleared.
    pub fn inject_fault(&self, fault: Fault) {
        self.faults.lock().insert(fault);
    }

    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    pub fn lead_count(&self) -> usize {
        self.tables.read().leads.len()
    }

    pub fn image_count(&self) -> usize {
        self.tables.read().images.len()
    }

    pub fn log_count(&self) -> usize {
        self.tables.read().logs.len()
    }

    pub fn budget_count(&self) -> usize {
        self.tables.read().budgets.len()
    }
}

impl LeadStore for InMemoryLeadStore {
    fn with_transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn LeadTransaction) -> Result<T, StoreError>,
    {
        let mut live = self.tables.write();
        let faults = self.faults.lock().clone();
        let mut tx = MemoryTransaction {
            tables: live.clone(),
            faults,
        };

        let value = f(&mut tx)?;
        *live = tx.tables;
        Ok(value)
    }

    fn ping(&self) -> Result<(), StoreError> {
        if self.faults.lock().contains(&Fault::Ping) {
            return Err(StoreError::Storage("injected ping failure".into()));
        }
        Ok(())
    }
}

struct MemoryTransaction {
    tables: Tables,
    faults: HashSet<Fault>,
}

impl MemoryTransaction {
    fn check(&self, fault: Fault) -> Result<(), StoreError> {
        if self.faults.contains(&fault) {
            Err(StoreError::Storage(format!("injected fault: {:?}", fault)))
        } else {
            Ok(())
        }
    }
}

impl LeadTransaction for MemoryTransaction {
    fn insert_lead(&mut self, lead: &NewLeadRecord) -> Result<LeadId, StoreError> {
        self.check(Fault::InsertLead)?;
        if let Some(service) = lead.service_id {
            if !self.tables.services.contains_key(&service) {
                return Err(StoreError::Storage(format!(
                    "foreign key violation: service {}",
                    service
                )));
            }
        }
        self.tables.last_lead_id += 1;
        let id = LeadId(self.tables.last_lead_id);
        self.tables.leads.insert(id, lead.clone().into_lead(id));
        Ok(id)
    }

    fn update_lead(&mut self, lead: &Lead) -> Result<(), StoreError> {
        match self.tables.leads.get_mut(&lead.id) {
            Some(existing) => {
                *existing = lead.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("lead", lead.id)),
        }
    }

    fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, StoreError> {
        Ok(self.tables.leads.get(&id).cloned())
    }

    fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        Ok(self
            .tables
            .leads
            .values()
            .rev()
            .filter(|lead| filter.matches(lead))
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

    fn count_leads(&self, filter: &LeadFilter) -> Result<u64, StoreError> {
        Ok(self
            .tables
            .leads
            .values()
            .filter(|lead| filter.matches(lead))
            .count() as u64)
    }

    fn insert_image(
        &mut self,
        lead_id: LeadId,
        image: &NewImageRecord,
        uploaded_at: Timestamp,
    ) -> Result<LeadImageId, StoreError> {
        self.check(Fault::InsertImage)?;
        if !self.tables.leads.contains_key(&lead_id) {
            return Err(StoreError::Storage(format!(
                "foreign key violation: lead {}",
                lead_id
            )));
        }
        self.tables.last_image_id += 1;
        let id = LeadImageId(self.tables.last_image_id);
        let meta = LeadImage {
            id,
            lead_id,
            format: image.format,
            size_bytes: image.bytes.len() as u64,
            file_name: image.file_name.clone(),
            uploaded_at,
        };
        self.tables.images.insert(id, (meta, image.bytes.clone()));
        Ok(id)
    }

    fn list_images(&self, lead_id: LeadId) -> Result<Vec<LeadImage>, StoreError> {
        Ok(self
            .tables
            .images
            .values()
            .filter(|(meta, _)| meta.lead_id == lead_id)
            .map(|(meta, _)| meta.clone())
            .collect())
    }

    fn get_image(
        &self,
        lead_id: LeadId,
        image_id: LeadImageId,
    ) -> Result<Option<ImagePayload>, StoreError> {
        Ok(self
            .tables
            .images
            .get(&image_id)
            .filter(|(meta, _)| meta.lead_id == lead_id)
            .map(|(meta, bytes)| ImagePayload {
                format: meta.format,
                bytes: bytes.clone(),
            }))
    }

    fn append_log(&mut self, entry: &NewLogRecord) -> Result<LogId, StoreError> {
        self.check(Fault::AppendLog)?;
        if !self.tables.leads.contains_key(&entry.lead_id) {
            return Err(StoreError::Storage(format!(
                "foreign key violation: lead {}",
                entry.lead_id
            )));
        }
        self.tables.last_log_id += 1;
        let id = LogId(self.tables.last_log_id);
        self.tables.logs.insert(id, entry.clone().into_log(id));
        Ok(id)
    }

    fn list_logs(&self, lead_id: LeadId) -> Result<Vec<LeadLog>, StoreError> {
        Ok(self
            .tables
            .logs
            .values()
            .filter(|log| log.lead_id == lead_id)
            .cloned()
            .collect())
    }

    fn next_budget_sequence(&mut self, year: i32) -> Result<u32, StoreError> {
        let last = self
            .tables
            .budgets
            .values()
            .filter(|b| b.year == year)
            .map(|b| b.sequence)
            .max()
            .unwrap_or(0);
        Ok(last + 1)
    }

    fn insert_budget(&mut self, budget: &NewBudgetRecord) -> Result<BudgetId, StoreError> {
        self.check(Fault::InsertBudget)?;
        if self
            .tables
            .budgets
            .values()
            .any(|b| b.budget.reference == budget.reference)
        {
            return Err(StoreError::Storage(format!(
                "unique violation: budget reference {}",
                budget.reference
            )));
        }
        self.tables.last_budget_id += 1;
        let id = BudgetId(self.tables.last_budget_id);
        self.tables.budgets.insert(
            id,
            StoredBudget {
                budget: budget.to_budget(id),
                year: budget.year,
                sequence: budget.sequence,
                document: budget.document.clone(),
            },
        );
        Ok(id)
    }

    fn update_budget_status(
        &mut self,
        id: BudgetId,
        status: BudgetStatus,
    ) -> Result<(), StoreError> {
        match self.tables.budgets.get_mut(&id) {
            Some(stored) => {
                stored.budget.status = status;
                Ok(())
            }
            None => Err(StoreError::not_found("budget", id)),
        }
    }

    fn get_budget(&self, reference: &BudgetReference) -> Result<Option<Budget>, StoreError> {
        Ok(self
            .tables
            .budgets
            .values()
            .find(|b| &b.budget.reference == reference)
            .map(|b| b.budget.clone()))
    }

    fn list_budgets(&self, lead_id: LeadId) -> Result<Vec<Budget>, StoreError> {
        Ok(self
            .tables
            .budgets
            .values()
            .filter(|b| b.budget.lead_id == lead_id)
            .map(|b| b.budget.clone())
            .collect())
    }

    fn get_budget_document(
        &self,
        reference: &BudgetReference,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .tables
            .budgets
            .values()
            .find(|b| &b.budget.reference == reference)
            .and_then(|b| b.document.clone()))
    }

    fn upsert_staff(&mut self, staff: &StaffMember) -> Result<(), StoreError> {
        self.tables.staff.insert(staff.id, staff.clone());
        Ok(())
    }

    fn get_staff(&self, id: StaffId) -> Result<Option<StaffMember>, StoreError> {
        Ok(self.tables.staff.get(&id).cloned())
    }

    fn upsert_service(&mut self, service: &ServiceCategory) -> Result<(), StoreError> {
        self.tables.services.insert(service.id, service.clone());
        Ok(())
    }

    fn get_service(&self, id: ServiceId) -> Result<Option<ServiceCategory>, StoreError> {
        Ok(self.tables.services.get(&id).cloned())
    }
}
