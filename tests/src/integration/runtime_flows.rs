//! # Runtime Flows
//!
//! The service as the binary assembles it: configuration, container wiring
//! over an on-disk database, and HTTP over a real socket.

use super::support::{office_request, send, Form, CLIENT};
use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use crm_03_lead_store::{BudgetDraft, ListQuery};
use crm_05_intake_gateway::{build_router, serve};
use crm_runtime::config::StaffEntry;
use crm_runtime::{RuntimeConfig, ServiceContainer};
use crm_types::{Money, Role, StaffId, StaffMember};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const ADMIN_TOKEN: &str = "admin-token-runtime-0001";

fn config(database: &Path) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.database.path = database.to_path_buf();
    config.abuse_gate.form_token.secret = Some("runtime-secret-0123456789".into());
    config.staff.push(StaffEntry {
        id: 1,
        username: "admin".into(),
        full_name: "Office Admin".into(),
        email: Some("admin@example.com".into()),
        phone: None,
        role: Role::Admin,
        active: true,
        token: ADMIN_TOKEN.into(),
    });
    config.validate().unwrap();
    config
}

fn admin() -> StaffMember {
    StaffMember {
        id: StaffId(1),
        username: "admin".into(),
        full_name: "Office Admin".into(),
        email: Some("admin@example.com".into()),
        phone: None,
        role: Role::Admin,
        active: true,
    }
}

fn draft() -> BudgetDraft {
    BudgetDraft {
        description: "Annual maintenance".into(),
        amount: Money::from_cents(18_000),
        valid_until: None,
        document: None,
    }
}

fn shut_down(container: ServiceContainer) {
    if let Some(cleanup) = container.cleanup {
        cleanup.abort();
    }
}

#[tokio::test]
async fn test_leads_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir.path().join("leads.sqlite3"));
    let year = Utc::now().year();

    // First run: capture a lead and quote it
    let container = ServiceContainer::build(&config).await.unwrap();
    let router = build_router(
        container.state.clone(),
        &config.gateway,
        container.staff.clone(),
    );
    let token = container.state.pipeline.gate().issue_form_token().unwrap();
    let reply = send(&router, Form::juan(&token).request(CLIENT)).await;
    assert_eq!(reply.status, StatusCode::OK);

    let leads = &container.state.leads;
    let lead_id = leads.list_leads(&ListQuery::default(), &admin()).unwrap().leads[0].id;
    let first = leads.create_budget(lead_id, draft(), &admin()).unwrap();
    assert_eq!(first.reference.as_str(), format!("PRES-{}-001", year));
    drop(router);
    shut_down(container);

    // Second run over the same file
    let container = ServiceContainer::build(&config).await.unwrap();
    let leads = &container.state.leads;
    let page = leads.list_leads(&ListQuery::default(), &admin()).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.leads[0].name, "Juan Pérez");
    assert_eq!(leads.lead_logs(lead_id, &admin()).unwrap().len(), 2);

    let second = leads.create_budget(lead_id, draft(), &admin()).unwrap();
    assert_eq!(second.reference.as_str(), format!("PRES-{}-002", year));
    shut_down(container);
}

#[tokio::test]
async fn test_configured_staff_can_use_the_office_api() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir.path().join("leads.sqlite3"));
    let container = ServiceContainer::build(&config).await.unwrap();
    let router = build_router(
        container.state.clone(),
        &config.gateway,
        container.staff.clone(),
    );

    let allowed = send(
        &router,
        office_request("GET", "/office/leads", ADMIN_TOKEN, None),
    )
    .await;
    let refused = send(
        &router,
        office_request("GET", "/office/leads", "not-a-configured-token", None),
    )
    .await;

    assert_eq!(allowed.status, StatusCode::OK);
    assert_eq!(allowed.json()["total"], 0);
    assert_eq!(refused.status, StatusCode::UNAUTHORIZED);
    shut_down(container);
}

#[tokio::test]
async fn test_health_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir.path().join("leads.sqlite3"));
    let container = ServiceContainer::build(&config).await.unwrap();
    let router = build_router(
        container.state.clone(),
        &config.gateway,
        container.staff.clone(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, router, async move {
        let _ = stop_rx.await;
    }));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let response = String::from_utf8_lossy(&raw);

    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("\"status\":\"healthy\""));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
    shut_down(container);
}
