//! # Core Domain Entities
//!
//! Defines the CRM entities captured by the intake pipeline and mutated by the
//! back office.
//!
//! ## Clusters
//!
//! - **Leads**: `Lead`, `LeadImage`, `ImageFormat` and the lead vocabularies
//!   (`LeadStatus`, `Urgency`, `ContactChannel`, `LeadSource`)
//! - **Quotes**: `Budget`, `BudgetReference`, `BudgetStatus`
//! - **Audit**: `LeadLog`, `LogAction`, `FieldChange`
//! - **Staff & Catalogue**: `StaffMember`, `Role`, `ServiceCategory`

use crate::errors::UnknownVariant;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::money::Money;

/// Wall-clock instant used for every persisted timestamp.
pub type Timestamp = DateTime<Utc>;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }
    };
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stable lowercase wire form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

id_type!(
    /// Store-assigned lead identifier, strictly increasing.
    LeadId
);
id_type!(
    /// Identifier of a stored lead attachment.
    LeadImageId
);
id_type!(
    /// Identifier of a budget row.
    BudgetId
);
id_type!(
    /// Identifier of an audit entry. Ordering by id is commit order.
    LogId
);
id_type!(
    /// Identifier of a staff member.
    StaffId
);
id_type!(
    /// Identifier of a service catalogue entry.
    ServiceId
);

// =============================================================================
// CLUSTER A: LEADS
// =============================================================================

wire_enum!(
    /// Lifecycle status of a lead.
    ///
    /// `new → contacted → quoted → closed`, with `rejected` as a side exit.
    LeadStatus, "lead status" {
        New => "new",
        Contacted => "contacted",
        Quoted => "quoted",
        Closed => "closed",
        Rejected => "rejected",
    }
);

impl LeadStatus {
    /// Position along the main path. `Rejected` sits outside it.
    pub fn rank(&self) -> Option<u8> {
        match self {
            LeadStatus::New => Some(0),
            LeadStatus::Contacted => Some(1),
            LeadStatus::Quoted => Some(2),
            LeadStatus::Closed => Some(3),
            LeadStatus::Rejected => None,
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStatus::Closed | LeadStatus::Rejected)
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        LeadStatus::New
    }
}

wire_enum!(
    /// How urgently the customer needs the service.
    Urgency, "urgency" {
        Normal => "normal",
        Urgent => "urgent",
    }
);

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Normal
    }
}

wire_enum!(
    /// Channel the customer prefers to be contacted on.
    ContactChannel, "contact channel" {
        Email => "email",
        Phone => "phone",
        Whatsapp => "whatsapp",
    }
);

impl Default for ContactChannel {
    fn default() -> Self {
        ContactChannel::Email
    }
}

wire_enum!(
    /// Where the lead came from.
    LeadSource, "lead source" {
        Web => "web",
        Phone => "phone",
        Referral => "referral",
        Other => "other",
    }
);

impl Default for LeadSource {
    fn default() -> Self {
        LeadSource::Web
    }
}

wire_enum!(
    /// Image formats recognised by content signature.
    ImageFormat, "image format" {
        Jpeg => "jpeg",
        Png => "png",
        Webp => "webp",
        Gif => "gif",
    }
);

impl ImageFormat {
    /// Canonical MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Gif => "image/gif",
        }
    }

    /// Map a MIME type to a format. `image/jpg` is accepted as an alias.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/webp" => Some(ImageFormat::Webp),
            "image/gif" => Some(ImageFormat::Gif),
            _ => None,
        }
    }
}

/// A prospective customer inquiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
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
    /// Internal notes, never shown to the customer.
    pub notes: String,
    pub privacy_accepted: bool,
    /// Retained only when the submitter accepted the privacy policy.
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Metadata of a stored attachment. The payload is fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadImage {
    pub id: LeadImageId,
    pub lead_id: LeadId,
    pub format: ImageFormat,
    pub size_bytes: u64,
    pub file_name: String,
    pub uploaded_at: Timestamp,
}

/// Raw bytes of a stored attachment with the format they were validated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

// =============================================================================
// CLUSTER B: QUOTES
// =============================================================================

wire_enum!(
    /// Status of a quote sent to a customer.
    BudgetStatus, "budget status" {
        Draft => "draft",
        Sent => "sent",
        Accepted => "accepted",
        Rejected => "rejected",
        Expired => "expired",
    }
);

impl BudgetStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BudgetStatus::Accepted | BudgetStatus::Rejected | BudgetStatus::Expired
        )
    }
}

impl Default for BudgetStatus {
    fn default() -> Self {
        BudgetStatus::Draft
    }
}

/// Human-facing quote reference: `<PREFIX>-<YYYY>-<NNN>`.
///
/// The sequence is zero-padded to three digits and grows past 999 unpadded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BudgetReference(String);

impl BudgetReference {
    pub fn new(prefix: &str, year: i32, sequence: u32) -> Self {
        Self(format!("{}-{:04}-{:03}", prefix, year, sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(prefix, year, sequence)`.
    pub fn parts(&self) -> Option<(&str, i32, u32)> {
        let mut pieces = self.0.rsplitn(3, '-');
        let sequence = pieces.next()?.parse().ok()?;
        let year = pieces.next()?.parse().ok()?;
        let prefix = pieces.next()?;
        if prefix.is_empty() {
            return None;
        }
        Some((prefix, year, sequence))
    }
}

impl fmt::Display for BudgetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BudgetReference {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let candidate = BudgetReference(s.trim().to_string());
        match candidate.parts() {
            Some(_) => Ok(candidate),
            None => Err(UnknownVariant {
                kind: "budget reference",
                value: s.to_string(),
            }),
        }
    }
}

/// A quote attached to a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub lead_id: LeadId,
    pub reference: BudgetReference,
    pub description: String,
    pub amount: Money,
    pub status: BudgetStatus,
    pub valid_until: Option<NaiveDate>,
    /// Whether a PDF document is stored with the budget.
    pub has_document: bool,
    pub created_by: Option<StaffId>,
    pub created_at: Timestamp,
}

// =============================================================================
// CLUSTER C: AUDIT
// =============================================================================

wire_enum!(
    /// What an audit entry records.
    LogAction, "log action" {
        Created => "created",
        StatusChanged => "status_changed",
        Assigned => "assigned",
        Noted => "noted",
        Updated => "updated",
        BudgetCreated => "budget_created",
        BudgetStatusChanged => "budget_status_changed",
    }
);

/// One field's before/after values inside an audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl FieldChange {
    pub fn new(field: impl Into<String>, old: Option<String>, new: Option<String>) -> Self {
        Self {
            field: field.into(),
            old,
            new,
        }
    }
}

/// Append-only audit entry of a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadLog {
    pub id: LogId,
    pub lead_id: LeadId,
    pub action: LogAction,
    pub description: String,
    pub changes: Vec<FieldChange>,
    /// `None` for system-generated entries such as web intake.
    pub actor: Option<StaffId>,
    pub created_at: Timestamp,
}

// =============================================================================
// CLUSTER D: STAFF & CATALOGUE
// =============================================================================

wire_enum!(
    /// Back-office role of a staff member.
    Role, "role" {
        Admin => "admin",
        Office => "office",
        Field => "field",
    }
);

impl Role {
    pub fn can_manage_leads(&self) -> bool {
        matches!(self, Role::Admin | Role::Office)
    }

    pub fn can_create_budgets(&self) -> bool {
        matches!(self, Role::Admin | Role::Office)
    }
}

/// An authenticated staff identity together with its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub active: bool,
}

impl StaffMember {
    /// Name to show in emails and audit descriptions.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

/// A service the business offers. Leads may reference one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCategory {
    pub id: ServiceId,
    pub name: String,
    pub active: bool,
}
