//! # Back-Office Flows
//!
//! Captured leads worked through the staff API and the lead service:
//! lifecycle changes, assignment, the audit trail and budgets.

use super::support::*;
use axum::http::StatusCode;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{TimeZone, Utc};
use crm_03_lead_store::{BudgetDraft, Fault, LeadUpdate, ListQuery};
use crm_types::{LeadId, LeadStatus, LogAction, Money, StaffId};
use serde_json::json;

/// Submit the customer form and return the new lead id.
async fn capture(stack: &Stack) -> LeadId {
    let reply = send(&stack.router, Form::juan(&stack.token()).request(CLIENT)).await;
    assert_eq!(reply.status, StatusCode::OK);
    stack
        .state
        .leads
        .list_leads(&ListQuery::default(), &office())
        .unwrap()
        .leads[0]
        .id
}

fn draft(cents: i64) -> BudgetDraft {
    BudgetDraft {
        description: "Split unit installation".into(),
        amount: Money::from_cents(cents),
        valid_until: None,
        document: None,
    }
}

// =============================================================================
// AUDIT TRAIL
// =============================================================================

#[tokio::test]
async fn test_office_status_change_adds_one_entry() {
    let stack = sqlite_stack();
    let id = capture(&stack).await;

    let reply = send(
        &stack.router,
        office_request(
            "PATCH",
            &format!("/office/leads/{}", id),
            OFFICE_TOKEN,
            Some(json!({"status": "contacted"})),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    let logs = stack.state.leads.lead_logs(id, &office()).unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].action, LogAction::StatusChanged);
    assert_eq!(logs[1].actor, Some(StaffId(2)));
}

#[tokio::test]
async fn test_service_status_change_adds_one_entry() {
    let stack = sqlite_stack();
    let id = capture(&stack).await;

    let outcome = stack
        .state
        .leads
        .update_lead(
            id,
            LeadUpdate {
                status: Some(LeadStatus::Quoted),
                ..LeadUpdate::default()
            },
            &office(),
        )
        .unwrap();

    assert!(outcome.log.is_some());
    let logs = stack.state.leads.lead_logs(id, &office()).unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].action, LogAction::StatusChanged);
}

#[tokio::test]
async fn test_unchanged_update_writes_nothing() {
    let stack = sqlite_stack();
    let id = capture(&stack).await;

    let outcome = stack
        .state
        .leads
        .update_lead(
            id,
            LeadUpdate {
                status: Some(LeadStatus::New),
                ..LeadUpdate::default()
            },
            &office(),
        )
        .unwrap();

    assert!(outcome.log.is_none());
    assert_eq!(stack.state.leads.lead_logs(id, &office()).unwrap().len(), 1);
}

#[tokio::test]
async fn test_audit_failure_rolls_back_status_change() {
    let (stack, store) = memory_stack();
    let id = capture(&stack).await;
    store.inject_fault(Fault::AppendLog);

    let reply = send(
        &stack.router,
        office_request(
            "PATCH",
            &format!("/office/leads/{}", id),
            OFFICE_TOKEN,
            Some(json!({"status": "contacted"})),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    store.clear_faults();
    let detail = stack.state.leads.get_lead(id, &office()).unwrap();
    assert_eq!(detail.lead.status, LeadStatus::New);
    assert_eq!(detail.logs.len(), 1);
}

// =============================================================================
// ASSIGNMENT
// =============================================================================

#[tokio::test]
async fn test_assignment_notifies_and_grants_access() {
    let stack = sqlite_stack();
    let id = capture(&stack).await;
    let uri = format!("/office/leads/{}", id);
    stack.mail_attempts(2).await;

    let hidden = send(&stack.router, office_request("GET", &uri, FIELD_TOKEN, None)).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);

    let reply = send(
        &stack.router,
        office_request(
            "PATCH",
            &uri,
            OFFICE_TOKEN,
            Some(json!({"assigned_to": 7, "note": "Customer prefers mornings"})),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["lead"]["assigned_to"], 7);

    assert!(stack.mail_attempts(3).await >= 3);
    assert!(stack
        .mailer
        .attempts()
        .iter()
        .any(|e| e.to == "tech7@example.com"));

    let visible = send(&stack.router, office_request("GET", &uri, FIELD_TOKEN, None)).await;
    assert_eq!(visible.status, StatusCode::OK);
    assert_eq!(visible.json()["lead"]["id"], id.0);
}

#[tokio::test]
async fn test_phone_lead_entered_by_staff() {
    let stack = sqlite_stack();

    let reply = send(
        &stack.router,
        office_request(
            "POST",
            "/office/leads",
            OFFICE_TOKEN,
            Some(json!({
                "name": "Ana López",
                "phone": "+34 600 123 456",
                "message": "Boiler makes a noise",
                "service": "1",
                "source": "phone"
            })),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    let body = reply.json();
    assert_eq!(body["lead"]["source"], "phone");
    assert!(body["lead"]["ip_address"].is_null());
    let id = LeadId(body["lead"]["id"].as_i64().unwrap());
    let logs = stack.state.leads.lead_logs(id, &office()).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].actor, Some(StaffId(2)));
}

// =============================================================================
// BUDGETS
// =============================================================================

#[tokio::test]
async fn test_budget_expired_yesterday_is_rejected() {
    let stack = sqlite_stack();
    let id = capture(&stack).await;

    let reply = send(
        &stack.router,
        office_request(
            "POST",
            &format!("/office/leads/{}/budgets", id),
            OFFICE_TOKEN,
            Some(json!({
                "description": "Split unit installation",
                "amount": "1250.00",
                "valid_until": "2024-06-09"
            })),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.json()["errors"]["valid_until"].is_array());
    assert!(stack.state.leads.get_lead(id, &office()).unwrap().budgets.is_empty());
}

#[tokio::test]
async fn test_budget_with_document_round_trip() {
    let stack = sqlite_stack();
    let id = capture(&stack).await;
    let pdf = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\ntrailer\n%%EOF\n";

    let reply = send(
        &stack.router,
        office_request(
            "POST",
            &format!("/office/leads/{}/budgets", id),
            OFFICE_TOKEN,
            Some(json!({
                "description": "Split unit installation",
                "amount": "1250.00",
                "valid_until": "2024-06-10",
                "document_base64": STANDARD.encode(pdf)
            })),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json()["reference"], "PRES-2024-001");

    let document = send(
        &stack.router,
        office_request(
            "GET",
            "/office/budgets/PRES-2024-001/document",
            OFFICE_TOKEN,
            None,
        ),
    )
    .await;
    assert_eq!(document.status, StatusCode::OK);
    assert_eq!(document.body, pdf.to_vec());

    let logs = stack.state.leads.lead_logs(id, &office()).unwrap();
    assert_eq!(logs.last().unwrap().action, LogAction::BudgetCreated);
}

#[tokio::test]
async fn test_budget_references_restart_each_year() {
    let stack = sqlite_stack();
    let id = capture(&stack).await;
    let leads = &stack.state.leads;

    let first = leads.create_budget(id, draft(125_000), &office()).unwrap();
    let second = leads.create_budget(id, draft(48_000), &office()).unwrap();
    stack
        .clock
        .set(Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap());
    let third = leads.create_budget(id, draft(9_900), &office()).unwrap();

    assert_eq!(first.reference.as_str(), "PRES-2024-001");
    assert_eq!(second.reference.as_str(), "PRES-2024-002");
    assert_eq!(third.reference.as_str(), "PRES-2025-001");
}
