//! SQLite lead store.
//!
//! One connection behind a mutex; every transaction is `BEGIN IMMEDIATE`, so
//! writers never interleave. Foreign keys are enforced and images, logs and
//! budgets cascade with their lead.

mod migrations;

pub use migrations::run_migrations;

use crate::domain::errors::StoreError;
use crate::ports::outbound::{
    LeadFilter, LeadStore, LeadTransaction, NewBudgetRecord, NewImageRecord, NewLeadRecord,
    NewLogRecord,
};
use chrono::SecondsFormat;
use crm_types::{
    Budget, BudgetId, BudgetReference, BudgetStatus, FieldChange, ImagePayload, Lead, LeadId,
    LeadImage, LeadImageId, LeadLog, LogId, Money, ServiceCategory, ServiceId, StaffId,
    StaffMember, Timestamp,
};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const LEAD_COLUMNS: &str = "id, name, email, phone, location, message, service_id, urgency, \
     preferred_contact, source, status, assigned_to, notes, privacy_accepted, ip_address, \
     user_agent, created_at, updated_at";

const IMAGE_COLUMNS: &str = "id, lead_id, format, size_bytes, file_name, uploaded_at";

const LOG_COLUMNS: &str = "id, lead_id, action, description, changes, actor, created_at";

const BUDGET_COLUMNS: &str = "id, lead_id, reference, description, amount_cents, status, \
     valid_until, document IS NOT NULL, created_by, created_at";

const STAFF_COLUMNS: &str = "id, username, full_name, email, phone, role, active";

/// Lead store backed by a SQLite database file.
pub struct SqliteLeadStore {
    conn: Mutex<Connection>,
}

impl SqliteLeadStore {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self::from_connection(conn)?;
        info!(path = %path.display(), "Opened SQLite lead store");
        Ok(store)
    }

    /// A private in-memory database, for tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let applied = run_migrations(&mut conn)?;
        if applied > 0 {
            info!(applied, "Database schema up to date");
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl LeadStore for SqliteLeadStore {
    fn with_transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn LeadTransaction) -> Result<T, StoreError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Dropping `tx` without commit rolls back.
        let value = {
            let mut handle = SqliteTransaction { conn: &tx };
            f(&mut handle)?
        };
        tx.commit()?;
        Ok(value)
    }

    fn ping(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

struct SqliteTransaction<'a> {
    conn: &'a Connection,
}

// =============================================================================
// COLUMN CONVERSION
// =============================================================================

fn timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a text column through `FromStr`.
fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parsed_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: LeadId(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        location: row.get(4)?,
        message: row.get(5)?,
        service_id: row.get::<_, Option<i64>>(6)?.map(ServiceId),
        urgency: parsed(row, 7)?,
        preferred_contact: parsed(row, 8)?,
        source: parsed(row, 9)?,
        status: parsed(row, 10)?,
        assigned_to: row.get::<_, Option<i64>>(11)?.map(StaffId),
        notes: row.get(12)?,
        privacy_accepted: row.get(13)?,
        ip_address: parsed_opt(row, 14)?,
        user_agent: row.get(15)?,
        created_at: parsed(row, 16)?,
        updated_at: parsed(row, 17)?,
    })
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<LeadImage> {
    Ok(LeadImage {
        id: LeadImageId(row.get(0)?),
        lead_id: LeadId(row.get(1)?),
        format: parsed(row, 2)?,
        size_bytes: row.get::<_, i64>(3)?.max(0) as u64,
        file_name: row.get(4)?,
        uploaded_at: parsed(row, 5)?,
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<LeadLog> {
    let raw_changes: String = row.get(4)?;
    let changes: Vec<FieldChange> = serde_json::from_str(&raw_changes)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(LeadLog {
        id: LogId(row.get(0)?),
        lead_id: LeadId(row.get(1)?),
        action: parsed(row, 2)?,
        description: row.get(3)?,
        changes,
        actor: row.get::<_, Option<i64>>(5)?.map(StaffId),
        created_at: parsed(row, 6)?,
    })
}

fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: BudgetId(row.get(0)?),
        lead_id: LeadId(row.get(1)?),
        reference: parsed(row, 2)?,
        description: row.get(3)?,
        amount: Money::from_cents(row.get(4)?),
        status: parsed(row, 5)?,
        valid_until: parsed_opt(row, 6)?,
        has_document: row.get(7)?,
        created_by: row.get::<_, Option<i64>>(8)?.map(StaffId),
        created_at: parsed(row, 9)?,
    })
}

fn staff_from_row(row: &Row<'_>) -> rusqlite::Result<StaffMember> {
    Ok(StaffMember {
        id: StaffId(row.get(0)?),
        username: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        role: parsed(row, 5)?,
        active: row.get(6)?,
    })
}

// =============================================================================
// TRANSACTION OPERATIONS
// =============================================================================

impl LeadTransaction for SqliteTransaction<'_> {
    fn insert_lead(&mut self, lead: &NewLeadRecord) -> Result<LeadId, StoreError> {
        let created_at = timestamp(&lead.created_at);
        self.conn
            .prepare_cached(
                "INSERT INTO leads (name, email, phone, location, message, service_id, urgency,
                     preferred_contact, source, status, assigned_to, notes, privacy_accepted,
                     ip_address, user_agent, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
            )?
            .execute(params![
                lead.name,
                lead.email,
                lead.phone,
                lead.location,
                lead.message,
                lead.service_id.map(|s| s.0),
                lead.urgency.as_str(),
                lead.preferred_contact.as_str(),
                lead.source.as_str(),
                lead.status.as_str(),
                lead.assigned_to.map(|s| s.0),
                lead.notes,
                lead.privacy_accepted,
                lead.ip_address.map(|ip| ip.to_string()),
                lead.user_agent,
                created_at,
            ])?;
        Ok(LeadId(self.conn.last_insert_rowid()))
    }

    fn update_lead(&mut self, lead: &Lead) -> Result<(), StoreError> {
        let changed = self
            .conn
            .prepare_cached(
                "UPDATE leads SET status = ?2, assigned_to = ?3, notes = ?4, updated_at = ?5
                 WHERE id = ?1",
            )?
            .execute(params![
                lead.id.0,
                lead.status.as_str(),
                lead.assigned_to.map(|s| s.0),
                lead.notes,
                timestamp(&lead.updated_at),
            ])?;
        if changed == 0 {
            return Err(StoreError::not_found("lead", lead.id));
        }
        Ok(())
    }

    fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, StoreError> {
        let sql = format!("SELECT {} FROM leads WHERE id = ?1", LEAD_COLUMNS);
        Ok(self
            .conn
            .prepare_cached(&sql)?
            .query_row([id.0], lead_from_row)
            .optional()?)
    }

    fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        let sql = format!(
            "SELECT {} FROM leads
             WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR assigned_to = ?2)
             ORDER BY id DESC LIMIT ?3 OFFSET ?4",
            LEAD_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(
            params![
                filter.status.map(|s| s.as_str()),
                filter.assigned_to.map(|s| s.0),
                filter.limit,
                filter.offset,
            ],
            lead_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn count_leads(&self, filter: &LeadFilter) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .prepare_cached(
                "SELECT COUNT(*) FROM leads
                 WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR assigned_to = ?2)",
            )?
            .query_row(
                params![
                    filter.status.map(|s| s.as_str()),
                    filter.assigned_to.map(|s| s.0)
                ],
                |row| row.get(0),
            )?;
        Ok(count.max(0) as u64)
    }

    fn insert_image(
        &mut self,
        lead_id: LeadId,
        image: &NewImageRecord,
        uploaded_at: Timestamp,
    ) -> Result<LeadImageId, StoreError> {
        self.conn
            .prepare_cached(
                "INSERT INTO lead_images (lead_id, format, size_bytes, file_name, data, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?
            .execute(params![
                lead_id.0,
                image.format.as_str(),
                image.bytes.len() as i64,
                image.file_name,
                image.bytes,
                timestamp(&uploaded_at),
            ])?;
        Ok(LeadImageId(self.conn.last_insert_rowid()))
    }

    fn list_images(&self, lead_id: LeadId) -> Result<Vec<LeadImage>, StoreError> {
        let sql = format!(
            "SELECT {} FROM lead_images WHERE lead_id = ?1 ORDER BY id",
            IMAGE_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map([lead_id.0], image_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get_image(
        &self,
        lead_id: LeadId,
        image_id: LeadImageId,
    ) -> Result<Option<ImagePayload>, StoreError> {
        Ok(self
            .conn
            .prepare_cached("SELECT format, data FROM lead_images WHERE id = ?1 AND lead_id = ?2")?
            .query_row([image_id.0, lead_id.0], |row| {
                Ok(ImagePayload {
                    format: parsed(row, 0)?,
                    bytes: row.get(1)?,
                })
            })
            .optional()?)
    }

    fn append_log(&mut self, entry: &NewLogRecord) -> Result<LogId, StoreError> {
        let changes = serde_json::to_string(&entry.changes)
            .map_err(|e| StoreError::Storage(format!("Failed to encode log changes: {}", e)))?;
        self.conn
            .prepare_cached(
                "INSERT INTO lead_logs (lead_id, action, description, changes, actor, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?
            .execute(params![
                entry.lead_id.0,
                entry.action.as_str(),
                entry.description,
                changes,
                entry.actor.map(|s| s.0),
                timestamp(&entry.created_at),
            ])?;
        Ok(LogId(self.conn.last_insert_rowid()))
    }

    fn list_logs(&self, lead_id: LeadId) -> Result<Vec<LeadLog>, StoreError> {
        let sql = format!(
            "SELECT {} FROM lead_logs WHERE lead_id = ?1 ORDER BY id",
            LOG_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map([lead_id.0], log_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn next_budget_sequence(&mut self, year: i32) -> Result<u32, StoreError> {
        let last: u32 = self
            .conn
            .prepare_cached("SELECT COALESCE(MAX(sequence), 0) FROM budgets WHERE year = ?1")?
            .query_row([year], |row| row.get(0))?;
        Ok(last + 1)
    }

    fn insert_budget(&mut self, budget: &NewBudgetRecord) -> Result<BudgetId, StoreError> {
        self.conn
            .prepare_cached(
                "INSERT INTO budgets (lead_id, reference, year, sequence, description,
                     amount_cents, status, valid_until, document, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?
            .execute(params![
                budget.lead_id.0,
                budget.reference.as_str(),
                budget.year,
                budget.sequence,
                budget.description,
                budget.amount.cents(),
                budget.status.as_str(),
                budget.valid_until.map(|d| d.to_string()),
                budget.document,
                budget.created_by.map(|s| s.0),
                timestamp(&budget.created_at),
            ])?;
        Ok(BudgetId(self.conn.last_insert_rowid()))
    }

    fn update_budget_status(
        &mut self,
        id: BudgetId,
        status: BudgetStatus,
    ) -> Result<(), StoreError> {
        let changed = self
            .conn
            .prepare_cached("UPDATE budgets SET status = ?2 WHERE id = ?1")?
            .execute(params![id.0, status.as_str()])?;
        if changed == 0 {
            return Err(StoreError::not_found("budget", id));
        }
        Ok(())
    }

    fn get_budget(&self, reference: &BudgetReference) -> Result<Option<Budget>, StoreError> {
        let sql = format!("SELECT {} FROM budgets WHERE reference = ?1", BUDGET_COLUMNS);
        Ok(self
            .conn
            .prepare_cached(&sql)?
            .query_row([reference.as_str()], budget_from_row)
            .optional()?)
    }

    fn list_budgets(&self, lead_id: LeadId) -> Result<Vec<Budget>, StoreError> {
        let sql = format!(
            "SELECT {} FROM budgets WHERE lead_id = ?1 ORDER BY id",
            BUDGET_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map([lead_id.0], budget_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get_budget_document(
        &self,
        reference: &BudgetReference,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let document: Option<Option<Vec<u8>>> = self
            .conn
            .prepare_cached("SELECT document FROM budgets WHERE reference = ?1")?
            .query_row([reference.as_str()], |row| row.get(0))
            .optional()?;
        Ok(document.flatten())
    }

    fn upsert_staff(&mut self, staff: &StaffMember) -> Result<(), StoreError> {
        self.conn
            .prepare_cached(
                "INSERT INTO staff (id, username, full_name, email, phone, role, active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                     username = excluded.username,
                     full_name = excluded.full_name,
                     email = excluded.email,
                     phone = excluded.phone,
                     role = excluded.role,
                     active = excluded.active",
            )?
            .execute(params![
                staff.id.0,
                staff.username,
                staff.full_name,
                staff.email,
                staff.phone,
                staff.role.as_str(),
                staff.active,
            ])?;
        Ok(())
    }

    fn get_staff(&self, id: StaffId) -> Result<Option<StaffMember>, StoreError> {
        let sql = format!("SELECT {} FROM staff WHERE id = ?1", STAFF_COLUMNS);
        Ok(self
            .conn
            .prepare_cached(&sql)?
            .query_row([id.0], staff_from_row)
            .optional()?)
    }

    fn upsert_service(&mut self, service: &ServiceCategory) -> Result<(), StoreError> {
        self.conn
            .prepare_cached(
                "INSERT INTO services (id, name, active) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, active = excluded.active",
            )?
            .execute(params![service.id.0, service.name, service.active])?;
        Ok(())
    }

    fn get_service(&self, id: ServiceId) -> Result<Option<ServiceCategory>, StoreError> {
        Ok(self
            .conn
            .prepare_cached("SELECT id, name, active FROM services WHERE id = ?1")?
            .query_row([id.0], |row| {
                Ok(ServiceCategory {
                    id: ServiceId(row.get(0)?),
                    name: row.get(1)?,
                    active: row.get(2)?,
                })
            })
            .optional()?)
    }
}
