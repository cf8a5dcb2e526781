//! Shared fixtures for the integration flows.

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use crm_01_file_integrity::{AttachmentPolicy, DocumentPolicy};
use crm_02_abuse_gate::{AbuseGate, AbuseGateDependencies, GateConfig, InMemoryCounterStore};
use crm_03_lead_store::{
    InMemoryLeadStore, LeadManagementApi, LeadService, LeadServiceDependencies, LeadStore,
    LeadStoreConfig, ListQuery, SqliteLeadStore,
};
use crm_04_notifications::{NotificationConfig, PostCommitHooks, RecordingMailer};
use crm_05_intake_gateway::{
    build_router, AppState, GatewayConfig, IntakeMetrics, IntakePipeline,
    IntakePipelineDependencies, StaffDirectory,
};
use crm_types::{Clock, ManualClock, Role, ServiceCategory, ServiceId, StaffId, StaffMember};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// 2024-06-10 12:00:00 UTC
pub const START: i64 = 1_718_020_800;

pub const ADMIN_EMAIL: &str = "owner@example.com";
pub const ORIGIN: &str = "https://crm.example.com";
pub const OFFICE_TOKEN: &str = "office-token-integration-02";
pub const FIELD_TOKEN: &str = "field-token-integration-07";
pub const CLIENT: &str = "203.0.113.9";

const BOUNDARY: &str = "----lead-desk-integration";

/// The full intake stack over one lead store.
pub struct Stack {
    pub state: AppState,
    pub router: Router,
    pub mailer: Arc<RecordingMailer>,
    pub clock: ManualClock,
}

pub fn office() -> StaffMember {
    StaffMember {
        id: StaffId(2),
        username: "office".into(),
        full_name: "Office Desk".into(),
        email: Some("office@example.com".into()),
        phone: None,
        role: Role::Office,
        active: true,
    }
}

pub fn technician() -> StaffMember {
    StaffMember {
        id: StaffId(7),
        username: "tech7".into(),
        full_name: "Luis Ortega".into(),
        email: Some("tech7@example.com".into()),
        phone: None,
        role: Role::Field,
        active: true,
    }
}

/// Stack over an in-memory SQLite database.
pub fn sqlite_stack() -> Stack {
    stack_over(Arc::new(SqliteLeadStore::open_in_memory().unwrap()))
}

/// Stack over the fault-injecting in-memory store.
pub fn memory_stack() -> (Stack, Arc<InMemoryLeadStore>) {
    let store = Arc::new(InMemoryLeadStore::new());
    (stack_over(Arc::clone(&store)), store)
}

pub fn stack_over<S: LeadStore>(store: Arc<S>) -> Stack {
    let clock = ManualClock::at_unix(START);
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());

    let mut gate_config = GateConfig::default();
    gate_config.form_token.secret = Some("integration-secret-0123456789".into());
    let gate = AbuseGate::new(
        gate_config,
        AbuseGateDependencies {
            counters: Arc::new(InMemoryCounterStore::with_clock(Arc::clone(&shared))),
            clock: Arc::clone(&shared),
        },
    )
    .unwrap();

    let service = LeadService::new(
        LeadServiceDependencies {
            store,
            clock: shared,
        },
        LeadStoreConfig::default(),
    );
    service.upsert_staff(&office()).unwrap();
    service.upsert_staff(&technician()).unwrap();
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
            admin_email: Some(ADMIN_EMAIL.into()),
            public_origin: ORIGIN.into(),
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

    let state = AppState {
        pipeline: Arc::new(pipeline),
        leads,
        documents: DocumentPolicy::default(),
        metrics,
    };
    let staff = StaffDirectory::new()
        .with_member(OFFICE_TOKEN, office())
        .with_member(FIELD_TOKEN, technician());
    let router = build_router(state.clone(), &GatewayConfig::default(), staff);

    Stack {
        state,
        router,
        mailer,
        clock,
    }
}

impl Stack {
    pub fn token(&self) -> String {
        self.state.pipeline.gate().issue_form_token().unwrap()
    }

    pub fn lead_total(&self) -> u64 {
        self.state
            .leads
            .list_leads(&ListQuery::default(), &office())
            .unwrap()
            .total
    }

    /// Wait until the mailer has seen `count` attempts.
    pub async fn mail_attempts(&self, count: usize) -> usize {
        for _ in 0..200 {
            let seen = self.mailer.attempts().len();
            if seen >= count {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.mailer.attempts().len()
    }
}

pub fn jpeg(size: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(size, 0x11);
    bytes
}

pub fn riff(form: &[u8; 4]) -> Vec<u8> {
    let mut bytes = b"RIFF".to_vec();
    bytes.extend_from_slice(&128u32.to_le_bytes());
    bytes.extend_from_slice(form);
    bytes.resize(140, 0);
    bytes
}

// =============================================================================
// HTTP
// =============================================================================

/// `multipart/form-data` body builder.
#[derive(Default)]
pub struct Form {
    buf: Vec<u8>,
}

impl Form {
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"photos\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(bytes);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// The form a customer fills in, honeypot left empty.
    pub fn juan(token: &str) -> Self {
        Self::juan_with_honeypot(token, "")
    }

    pub fn juan_with_honeypot(token: &str, honeypot: &str) -> Self {
        Form::default()
            .text("name", "Juan Pérez")
            .text("email", "juan@example.com")
            .text("phone", "")
            .text("message", "Necesito presupuesto")
            .text("privacy_accepted", "on")
            .text("website_url", honeypot)
            .text("csrf_token", token)
    }

    pub fn request(mut self, ip: &str) -> Request<Body> {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Request::builder()
            .method("POST")
            .uri("/contact")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header("x-forwarded-for", ip)
            .header(header::USER_AGENT, "Mozilla/5.0 (X11; Linux x86_64)")
            .body(Body::from(self.buf))
            .unwrap()
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub async fn send(router: &Router, req: Request<Body>) -> Reply {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    Reply {
        status,
        headers,
        body,
    }
}

pub fn office_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
