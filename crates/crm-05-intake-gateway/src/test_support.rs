//! Fixtures shared by the gateway's unit tests.

use crate::domain::form::ContactSubmission;
use crate::middleware::{IntakeMetrics, StaffDirectory};
use crate::pipeline::{IntakePipeline, IntakePipelineDependencies};
use crate::router::AppState;
use crm_01_file_integrity::{AttachmentInput, AttachmentPolicy, DeclaredType, DocumentPolicy};
use crm_02_abuse_gate::{AbuseGate, AbuseGateDependencies, GateConfig, InMemoryCounterStore};
use crm_03_lead_store::{
    ContactForm, InMemoryLeadStore, LeadManagementApi, LeadService, LeadServiceDependencies,
    LeadStoreConfig,
};
use crm_04_notifications::{NotificationConfig, PostCommitHooks, RecordingMailer};
use crm_types::{Clock, ManualClock, Role, ServiceCategory, ServiceId, StaffId, StaffMember};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// 2024-06-10 12:00:00 UTC
pub const START: i64 = 1_718_020_800;

pub const OFFICE_TOKEN: &str = "office-token-0002";
pub const FIELD_TOKEN: &str = "field-token-0007";

pub struct Fixture {
    pub state: AppState,
    pub store: Arc<InMemoryLeadStore>,
    pub mailer: Arc<RecordingMailer>,
    pub clock: ManualClock,
    pub metrics: Arc<IntakeMetrics>,
    pub staff: StaffDirectory,
}

pub fn member(id: i64, username: &str, role: Role) -> StaffMember {
    StaffMember {
        id: StaffId(id),
        username: username.into(),
        full_name: String::new(),
        email: Some(format!("{}@example.com", username)),
        phone: None,
        role,
        active: true,
    }
}

pub fn office() -> StaffMember {
    member(2, "office", Role::Office)
}

pub fn technician() -> StaffMember {
    member(7, "tech7", Role::Field)
}

pub fn fixture() -> Fixture {
    fixture_with(GateConfig::default())
}

pub fn fixture_with(mut gate_config: GateConfig) -> Fixture {
    let clock = ManualClock::at_unix(START);
    let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());

    gate_config.form_token.secret = Some("test-secret-0123456789abcdef".into());
    let gate = AbuseGate::new(
        gate_config,
        AbuseGateDependencies {
            counters: Arc::new(InMemoryCounterStore::with_clock(Arc::clone(&shared_clock))),
            clock: Arc::clone(&shared_clock),
        },
    )
    .unwrap();

    let store = Arc::new(InMemoryLeadStore::new());
    let service = LeadService::new(
        LeadServiceDependencies {
            store: store.clone(),
            clock: shared_clock,
        },
        LeadStoreConfig::default(),
    );
    for staff in [office(), technician()] {
        service.upsert_staff(&staff).unwrap();
    }
    service
        .upsert_service(&ServiceCategory {
            id: ServiceId(1),
            name: "Air conditioning".into(),
            active: true,
        })
        .unwrap();
    let leads: Arc<dyn LeadManagementApi> = Arc::new(service);

    let mailer = Arc::new(RecordingMailer::new());
    let hooks = PostCommitHooks::from_config(
        &NotificationConfig {
            admin_email: Some("owner@example.com".into()),
            public_origin: "https://crm.example.com".into(),
            hook_timeout: Duration::from_secs(2),
            ..NotificationConfig::default()
        },
        mailer.clone(),
    )
    .unwrap();

    let metrics = Arc::new(IntakeMetrics::new());
    let pipeline = IntakePipeline::new(
        IntakePipelineDependencies {
            gate: Arc::new(gate),
            leads: Arc::clone(&leads),
            hooks,
            metrics: Arc::clone(&metrics),
        },
        AttachmentPolicy::default(),
    );

    let staff = StaffDirectory::new()
        .with_member(OFFICE_TOKEN, office())
        .with_member(FIELD_TOKEN, technician());

    Fixture {
        state: AppState {
            pipeline: Arc::new(pipeline),
            leads,
            documents: DocumentPolicy::default(),
            metrics: Arc::clone(&metrics),
        },
        store,
        mailer,
        clock,
        metrics,
        staff,
    }
}

pub fn jpeg(size: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(size, 0x5A);
    bytes
}

pub fn riff(form: &[u8; 4]) -> Vec<u8> {
    let mut bytes = b"RIFF".to_vec();
    bytes.extend_from_slice(&64u32.to_le_bytes());
    bytes.extend_from_slice(form);
    bytes.resize(76, 0);
    bytes
}

pub fn photo(name: &str, content_type: &str, bytes: Vec<u8>) -> AttachmentInput {
    AttachmentInput {
        file_name: name.into(),
        declared: DeclaredType::from_content_type(Some(content_type)),
        bytes,
    }
}

pub fn contact_form() -> ContactForm {
    ContactForm {
        name: "Juan Pérez".into(),
        email: "juan@example.com".into(),
        phone: String::new(),
        message: "Necesito presupuesto".into(),
        privacy_accepted: true,
        ..ContactForm::default()
    }
}

impl Fixture {
    pub fn token(&self) -> String {
        self.state.pipeline.gate().issue_form_token().unwrap()
    }

    pub fn submission(&self, ip: &str) -> ContactSubmission {
        ContactSubmission {
            form: contact_form(),
            honeypot: Some(String::new()),
            csrf_token: Some(self.token()),
            attachments: Vec::new(),
            ip: ip.parse::<IpAddr>().unwrap(),
            user_agent: Some("Mozilla/5.0".into()),
        }
    }
}
