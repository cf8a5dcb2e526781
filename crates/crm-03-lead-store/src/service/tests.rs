use super::*;
use crate::adapters::memory::{Fault, InMemoryLeadStore};
use crate::domain::validation::ContactDetails;
use crate::ports::inbound::ClientInfo;
use crate::ports::outbound::NewImageRecord;
use chrono::{NaiveDate, TimeZone, Utc};
use crm_types::{
    ContactChannel, ImageFormat, LogAction, ManualClock, Money, Role, ServiceId, Urgency,
};
use std::net::{IpAddr, Ipv4Addr};

// =============================================================================
// Test Helpers
// =============================================================================

struct Harness {
    service: LeadService<InMemoryLeadStore>,
    store: Arc<InMemoryLeadStore>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryLeadStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap(),
    ));
    let service = LeadService::new(
        LeadServiceDependencies {
            store: store.clone(),
            clock: clock.clone(),
        },
        LeadStoreConfig::default(),
    );

    for member in [admin(), office(), technician(7), technician(8)] {
        service.upsert_staff(&member).unwrap();
    }
    service
        .upsert_service(&ServiceCategory {
            id: ServiceId(1),
            name: "Air conditioning".into(),
            active: true,
        })
        .unwrap();
    service
        .upsert_service(&ServiceCategory {
            id: ServiceId(2),
            name: "Discontinued".into(),
            active: false,
        })
        .unwrap();

    Harness {
        service,
        store,
        clock,
    }
}

fn staff(id: i64, username: &str, role: Role) -> StaffMember {
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

fn admin() -> StaffMember {
    let mut member = staff(1, "admin", Role::Admin);
    member.full_name = "Ana Admin".into();
    member
}

fn office() -> StaffMember {
    staff(2, "office", Role::Office)
}

fn technician(id: i64) -> StaffMember {
    staff(id, &format!("tech{}", id), Role::Field)
}

fn juan() -> ContactDetails {
    ContactDetails {
        name: "Juan Pérez".into(),
        email: Some("juan@example.com".into()),
        phone: None,
        location: None,
        message: "Necesito presupuesto".into(),
        service_id: None,
        urgency: Urgency::Normal,
        preferred_contact: ContactChannel::Email,
        privacy_accepted: true,
    }
}

fn jpeg(name: &str) -> NewImageRecord {
    NewImageRecord {
        file_name: name.into(),
        format: ImageFormat::Jpeg,
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10],
    }
}

fn web_lead(images: Vec<NewImageRecord>) -> NewLead {
    NewLead {
        contact: juan(),
        images,
        source: LeadSource::Web,
        client: ClientInfo {
            ip: Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9))),
            user_agent: Some("Mozilla/5.0".into()),
        },
        actor: None,
    }
}

fn status(to: LeadStatus) -> LeadUpdate {
    LeadUpdate {
        status: Some(to),
        ..LeadUpdate::default()
    }
}

fn draft(amount: i64, valid_until: Option<NaiveDate>) -> BudgetDraft {
    BudgetDraft {
        description: "Split AC install, 2 units".into(),
        amount: Money::from_cents(amount),
        valid_until,
        document: None,
    }
}

// =============================================================================
// Lead capture
// =============================================================================

#[test]
fn test_create_lead_with_images_writes_one_log() {
    let h = harness();

    let created = h
        .service
        .create_lead(web_lead(vec![jpeg("a.jpg"), jpeg("b.jpg")]))
        .unwrap();

    assert_eq!(created.lead.status, LeadStatus::New);
    assert_eq!(created.lead.urgency, Urgency::Normal);
    assert_eq!(created.images.len(), 2);
    assert_eq!(created.log.action, LogAction::Created);
    assert_eq!(created.log.actor, None);
    assert_eq!(h.store.lead_count(), 1);
    assert_eq!(h.store.image_count(), 2);
    assert_eq!(h.store.log_count(), 1);
}

#[test]
fn test_image_failure_leaves_no_lead() {
    let h = harness();
    h.store.inject_fault(Fault::InsertImage);

    let err = h
        .service
        .create_lead(web_lead(vec![jpeg("a.jpg")]))
        .unwrap_err();

    assert!(matches!(err, StoreError::Storage(_)));
    assert_eq!(h.store.lead_count(), 0);
    assert_eq!(h.store.log_count(), 0);
}

#[test]
fn test_log_failure_leaves_no_lead() {
    let h = harness();
    h.store.inject_fault(Fault::AppendLog);

    assert!(h.service.create_lead(web_lead(Vec::new())).is_err());
    assert_eq!(h.store.lead_count(), 0);
    assert_eq!(h.store.image_count(), 0);
}

#[test]
fn test_too_many_images_rejected() {
    let h = harness();
    let images = (0..6).map(|i| jpeg(&format!("{}.jpg", i))).collect();

    let err = h.service.create_lead(web_lead(images)).unwrap_err();

    match err {
        StoreError::Validation(errors) => assert!(errors.contains("images")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(h.store.lead_count(), 0);
}

#[test]
fn test_unknown_or_inactive_service_rejected() {
    let h = harness();
    for service in [ServiceId(2), ServiceId(99)] {
        let mut lead = web_lead(Vec::new());
        lead.contact.service_id = Some(service);
        let err = h.service.create_lead(lead).unwrap_err();
        assert!(matches!(err, StoreError::Validation(ref e) if e.contains("service")));
    }

    let mut lead = web_lead(Vec::new());
    lead.contact.service_id = Some(ServiceId(1));
    assert_eq!(
        h.service.create_lead(lead).unwrap().lead.service_id,
        Some(ServiceId(1))
    );
}

#[test]
fn test_client_info_kept_only_with_consent() {
    let h = harness();

    let consented = h.service.create_lead(web_lead(Vec::new())).unwrap();
    assert!(consented.lead.ip_address.is_some());
    assert_eq!(consented.lead.user_agent.as_deref(), Some("Mozilla/5.0"));

    let mut lead = web_lead(Vec::new());
    lead.contact.privacy_accepted = false;
    let anonymous = h.service.create_lead(lead).unwrap();
    assert_eq!(anonymous.lead.ip_address, None);
    assert_eq!(anonymous.lead.user_agent, None);
}

#[test]
fn test_user_agent_truncated() {
    let h = harness();
    let mut lead = web_lead(Vec::new());
    lead.client.user_agent = Some("x".repeat(800));

    let created = h.service.create_lead(lead).unwrap();

    assert_eq!(created.lead.user_agent.map(|ua| ua.len()), Some(500));
}

#[test]
fn test_staff_lead_sources() {
    let h = harness();

    let mut by_phone = web_lead(Vec::new());
    by_phone.source = LeadSource::Phone;
    assert!(matches!(
        h.service.create_lead(by_phone.clone()),
        Err(StoreError::Forbidden(_))
    ));

    by_phone.actor = Some(office());
    let created = h.service.create_lead(by_phone).unwrap();
    assert_eq!(created.lead.source, LeadSource::Phone);
    assert_eq!(created.log.actor, Some(StaffId(2)));

    let mut staff_web = web_lead(Vec::new());
    staff_web.actor = Some(office());
    assert!(matches!(
        h.service.create_lead(staff_web),
        Err(StoreError::Validation(ref e)) if e.contains("source")
    ));

    let mut by_tech = web_lead(Vec::new());
    by_tech.source = LeadSource::Referral;
    by_tech.actor = Some(technician(7));
    assert!(matches!(
        h.service.create_lead(by_tech),
        Err(StoreError::Forbidden(_))
    ));
}

// =============================================================================
// Audited updates
// =============================================================================

#[test]
fn test_single_status_change_writes_one_entry() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;

    let outcome = h
        .service
        .update_lead(id, status(LeadStatus::Contacted), &office())
        .unwrap();

    assert_eq!(outcome.lead.status, LeadStatus::Contacted);
    let log = outcome.log.unwrap();
    assert_eq!(log.action, LogAction::StatusChanged);
    assert_eq!(log.actor, Some(StaffId(2)));
    assert_eq!(
        outcome.changes,
        vec![LeadChange::StatusChanged {
            from: LeadStatus::New,
            to: LeadStatus::Contacted
        }]
    );
    assert_eq!(h.service.lead_logs(id, &office()).unwrap().len(), 2);
}

#[test]
fn test_combined_update_folds_into_one_entry() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;

    let update = LeadUpdate {
        status: Some(LeadStatus::Contacted),
        assigned_to: Some(Some(StaffId(7))),
        note: Some("Customer prefers mornings".into()),
    };
    let outcome = h.service.update_lead(id, update, &admin()).unwrap();

    let log = outcome.log.unwrap();
    assert_eq!(log.action, LogAction::Updated);
    assert_eq!(log.changes.len(), 3);
    assert_eq!(
        log.description,
        "Status: new → contacted; Assigned to tech7; Note added"
    );
    assert_eq!(outcome.lead.assigned_to, Some(StaffId(7)));
    assert!(outcome
        .lead
        .notes
        .starts_with("[2024-06-10 12:00 Ana Admin] Customer prefers mornings"));
    assert_eq!(h.store.log_count(), 2);
}

#[test]
fn test_no_op_update_writes_nothing() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;

    let update = LeadUpdate {
        status: Some(LeadStatus::New),
        assigned_to: Some(None),
        note: Some("   ".into()),
    };
    let outcome = h.service.update_lead(id, update, &office()).unwrap();

    assert!(outcome.log.is_none());
    assert!(outcome.changes.is_empty());
    assert_eq!(h.store.log_count(), 1);
}

#[test]
fn test_invalid_transition_rejected() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;
    h.service
        .update_lead(id, status(LeadStatus::Quoted), &office())
        .unwrap();

    let err = h
        .service
        .update_lead(id, status(LeadStatus::New), &office())
        .unwrap_err();

    assert!(matches!(err, StoreError::InvalidTransition { .. }));
    assert_eq!(h.store.log_count(), 2);
}

#[test]
fn test_audit_failure_rolls_back_status_change() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;
    h.store.inject_fault(Fault::AppendLog);

    let err = h
        .service
        .update_lead(id, status(LeadStatus::Contacted), &office())
        .unwrap_err();
    assert!(matches!(err, StoreError::Storage(_)));

    h.store.clear_faults();
    let detail = h.service.get_lead(id, &office()).unwrap();
    assert_eq!(detail.lead.status, LeadStatus::New);
    assert_eq!(detail.logs.len(), 1);
}

#[test]
fn test_assign_to_unknown_staff_rejected() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;

    let update = LeadUpdate {
        assigned_to: Some(Some(StaffId(404))),
        ..LeadUpdate::default()
    };
    let err = h.service.update_lead(id, update, &office()).unwrap_err();

    assert!(matches!(err, StoreError::Validation(ref e) if e.contains("assigned_to")));
}

#[test]
fn test_field_staff_limited_to_assigned_leads() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;
    let other = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;
    let assign = LeadUpdate {
        assigned_to: Some(Some(StaffId(7))),
        ..LeadUpdate::default()
    };
    h.service.update_lead(id, assign, &office()).unwrap();

    let tech = technician(7);
    assert!(h.service.get_lead(id, &tech).is_ok());
    assert!(matches!(
        h.service.get_lead(other, &tech),
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        h.service.get_lead(id, &technician(8)),
        Err(StoreError::NotFound { .. })
    ));

    let page = h.service.list_leads(&ListQuery::default(), &tech).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.leads[0].id, id);

    let noted = LeadUpdate {
        status: Some(LeadStatus::Contacted),
        note: Some("Visited, measured the roof".into()),
        ..LeadUpdate::default()
    };
    assert!(h.service.update_lead(id, noted, &tech).is_ok());

    let reassign = LeadUpdate {
        assigned_to: Some(Some(StaffId(8))),
        ..LeadUpdate::default()
    };
    assert!(matches!(
        h.service.update_lead(id, reassign, &tech),
        Err(StoreError::Forbidden(_))
    ));
}

#[test]
fn test_inactive_staff_forbidden() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;
    let mut former = office();
    former.active = false;

    assert!(matches!(
        h.service.update_lead(id, status(LeadStatus::Contacted), &former),
        Err(StoreError::Forbidden(_))
    ));
    assert!(matches!(
        h.service.list_leads(&ListQuery::default(), &former),
        Err(StoreError::Forbidden(_))
    ));
}

#[test]
fn test_list_newest_first_with_paging() {
    let h = harness();
    let ids: Vec<LeadId> = (0..3)
        .map(|_| h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id)
        .collect();

    let query = ListQuery {
        limit: Some(2),
        ..ListQuery::default()
    };
    let page = h.service.list_leads(&query, &office()).unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.limit, 2);
    assert_eq!(page.leads[0].id, ids[2]);
    assert_eq!(page.leads[1].id, ids[1]);

    let query = ListQuery {
        status: Some(LeadStatus::Contacted),
        ..ListQuery::default()
    };
    assert_eq!(h.service.list_leads(&query, &office()).unwrap().total, 0);
}

#[test]
fn test_lead_image_scoped_to_lead() {
    let h = harness();
    let created = h
        .service
        .create_lead(web_lead(vec![jpeg("a.jpg")]))
        .unwrap();
    let other = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;
    let image_id = created.images[0].id;

    let payload = h
        .service
        .lead_image(created.lead.id, image_id, &office())
        .unwrap();
    assert_eq!(payload.format, ImageFormat::Jpeg);
    assert!(h.service.lead_image(other, image_id, &office()).is_err());
}

// =============================================================================
// Budgets
// =============================================================================

#[test]
fn test_budget_references_sequential_per_year() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;

    let first = h.service.create_budget(id, draft(850_000, None), &office()).unwrap();
    let second = h.service.create_budget(id, draft(120_000, None), &office()).unwrap();
    assert_eq!(first.reference.as_str(), "PRES-2024-001");
    assert_eq!(second.reference.as_str(), "PRES-2024-002");

    h.clock
        .set(Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap());
    let next_year = h.service.create_budget(id, draft(5_000, None), &office()).unwrap();
    assert_eq!(next_year.reference.as_str(), "PRES-2025-001");
}

#[test]
fn test_budget_creation_is_audited() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;

    let budget = h.service.create_budget(id, draft(850_000, None), &office()).unwrap();

    assert_eq!(budget.status, BudgetStatus::Draft);
    let logs = h.service.lead_logs(id, &office()).unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].action, LogAction::BudgetCreated);
    assert_eq!(logs[1].description, "Budget PRES-2024-001 created (8500.00)");
}

#[test]
fn test_budget_valid_until_yesterday_rejected() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;
    let yesterday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();

    let err = h
        .service
        .create_budget(id, draft(850_000, Some(yesterday)), &office())
        .unwrap_err();

    match err {
        StoreError::Validation(errors) => assert!(errors.contains("valid_until")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(h.store.budget_count(), 0);
}

#[test]
fn test_budget_requires_office_role_and_lead() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;

    assert!(matches!(
        h.service.create_budget(id, draft(100, None), &technician(7)),
        Err(StoreError::Forbidden(_))
    ));
    assert!(matches!(
        h.service.create_budget(LeadId(999), draft(100, None), &office()),
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
fn test_budget_status_change_audited() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;
    let budget = h.service.create_budget(id, draft(850_000, None), &office()).unwrap();

    let sent = h
        .service
        .change_budget_status(&budget.reference, BudgetStatus::Sent, &office())
        .unwrap();
    assert_eq!(sent.status, BudgetStatus::Sent);

    let again = h
        .service
        .change_budget_status(&budget.reference, BudgetStatus::Sent, &office())
        .unwrap();
    assert_eq!(again.status, BudgetStatus::Sent);

    assert!(matches!(
        h.service
            .change_budget_status(&budget.reference, BudgetStatus::Draft, &office()),
        Err(StoreError::InvalidTransition { .. })
    ));

    let logs = h.service.lead_logs(id, &office()).unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[2].action, LogAction::BudgetStatusChanged);
    assert_eq!(
        h.service
            .get_budget(&budget.reference, &office())
            .unwrap()
            .status,
        BudgetStatus::Sent
    );
}

#[test]
fn test_budget_document_roundtrip() {
    let h = harness();
    let id = h.service.create_lead(web_lead(Vec::new())).unwrap().lead.id;
    let mut with_pdf = draft(850_000, None);
    with_pdf.document = Some(b"%PDF-1.7 quote".to_vec());

    let budget = h.service.create_budget(id, with_pdf, &office()).unwrap();
    assert!(budget.has_document);
    assert_eq!(
        h.service
            .budget_document(&budget.reference, &office())
            .unwrap(),
        b"%PDF-1.7 quote".to_vec()
    );

    let plain = h.service.create_budget(id, draft(100, None), &office()).unwrap();
    assert!(matches!(
        h.service.budget_document(&plain.reference, &office()),
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
fn test_health_check_reports_store_failure() {
    let h = harness();
    assert!(h.service.health_check().is_ok());
    h.store.inject_fault(Fault::Ping);
    assert!(h.service.health_check().is_err());
}

#[test]
fn test_service_catalogue_lookup() {
    let h = harness();
    let found = h.service.service(ServiceId(1)).unwrap().unwrap();
    assert_eq!(found.name, "Air conditioning");
    assert!(h.service.service(ServiceId(99)).unwrap().is_none());
}
