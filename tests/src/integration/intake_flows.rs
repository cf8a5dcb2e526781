//! # Contact Intake Flows
//!
//! Public form submissions through the full router:
//!
//! ```text
//! multipart ─► IpProtection ─► abuse gate ─► file integrity ─► lead store ─► post-commit hooks
//! ```

use super::support::*;
use axum::http::StatusCode;
use crm_03_lead_store::{Fault, ListQuery};
use crm_05_intake_gateway::domain::error::{INTERNAL_MESSAGE, RATE_LIMITED_MESSAGE};
use crm_05_intake_gateway::domain::form::SUCCESS_MESSAGE;
use crm_types::{LeadStatus, LogAction, Urgency};
use serde_json::json;

// =============================================================================
// ACCEPTED SUBMISSIONS
// =============================================================================

#[tokio::test]
async fn test_customer_enquiry_with_two_photos() {
    let stack = sqlite_stack();
    let photo = jpeg(1024 * 1024);
    let form = Form::juan(&stack.token())
        .file("salon.jpg", "image/jpeg", &photo)
        .file("split.jpg", "image/jpeg", &photo);

    let reply = send(&stack.router, form.request(CLIENT)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!({"status": "ok", "message": SUCCESS_MESSAGE})
    );

    let page = stack
        .state
        .leads
        .list_leads(&ListQuery::default(), &office())
        .unwrap();
    assert_eq!(page.total, 1);
    let detail = stack.state.leads.get_lead(page.leads[0].id, &office()).unwrap();
    assert_eq!(detail.lead.name, "Juan Pérez");
    assert_eq!(detail.lead.phone, None);
    assert_eq!(detail.lead.status, LeadStatus::New);
    assert_eq!(detail.lead.urgency, Urgency::Normal);
    assert_eq!(detail.lead.ip_address, Some(CLIENT.parse().unwrap()));
    assert_eq!(detail.images.len(), 2);
    assert_eq!(detail.logs.len(), 1);
    assert_eq!(detail.logs[0].action, LogAction::Created);
    assert_eq!(detail.logs[0].actor, None);

    // Admin alert and customer acknowledgement
    assert_eq!(stack.mail_attempts(2).await, 2);
    let mut recipients: Vec<String> = stack.mailer.attempts().into_iter().map(|e| e.to).collect();
    recipients.sort();
    assert_eq!(recipients, vec!["juan@example.com", ADMIN_EMAIL]);
}

#[tokio::test]
async fn test_admin_alert_links_to_office_lead() {
    let stack = sqlite_stack();
    let reply = send(&stack.router, Form::juan(&stack.token()).request(CLIENT)).await;
    assert_eq!(reply.status, StatusCode::OK);
    stack.mail_attempts(2).await;

    let page = stack
        .state
        .leads
        .list_leads(&ListQuery::default(), &office())
        .unwrap();
    let alert = stack
        .mailer
        .delivered()
        .into_iter()
        .find(|e| e.to == ADMIN_EMAIL)
        .unwrap();
    let link = format!("{}/office/leads/{}", ORIGIN, page.leads[0].id);
    assert!(alert.text_body.contains(&link), "{}", alert.text_body);
}

#[tokio::test]
async fn test_stored_photo_is_served_back() {
    let stack = sqlite_stack();
    let photo = jpeg(2048);
    let form = Form::juan(&stack.token()).file("boiler.jpg", "image/jpeg", &photo);
    assert_eq!(send(&stack.router, form.request(CLIENT)).await.status, StatusCode::OK);

    let page = stack
        .state
        .leads
        .list_leads(&ListQuery::default(), &office())
        .unwrap();
    let detail = stack.state.leads.get_lead(page.leads[0].id, &office()).unwrap();
    let uri = format!(
        "/office/leads/{}/images/{}",
        detail.lead.id, detail.images[0].id
    );

    let reply = send(&stack.router, office_request("GET", &uri, OFFICE_TOKEN, None)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers["content-type"], "image/jpeg");
    assert_eq!(reply.body, photo);
}

// =============================================================================
// BOT AND ABUSE HANDLING
// =============================================================================

#[tokio::test]
async fn test_honeypot_is_indistinguishable_from_success() {
    let human = sqlite_stack();
    let human_reply = send(&human.router, Form::juan(&human.token()).request(CLIENT)).await;

    let stack = sqlite_stack();
    let bot = Form::juan_with_honeypot(&stack.token(), "bot-value");
    let bot_reply = send(&stack.router, bot.request(CLIENT)).await;

    assert_eq!(bot_reply.status, human_reply.status);
    assert_eq!(bot_reply.body, human_reply.body);
    assert_eq!(stack.lead_total(), 0);
    assert!(stack.mailer.attempts().is_empty());
    assert_eq!(stack.state.metrics.snapshot().submissions_discarded, 1);
}

#[tokio::test]
async fn test_sixth_submission_in_window_is_refused() {
    let stack = sqlite_stack();
    for _ in 0..5 {
        let reply = send(&stack.router, Form::juan(&stack.token()).request(CLIENT)).await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    let reply = send(&stack.router, Form::juan(&stack.token()).request(CLIENT)).await;

    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(reply.json()["message"], RATE_LIMITED_MESSAGE);
    assert_eq!(stack.lead_total(), 5);

    // Another visitor is unaffected
    let other = send(&stack.router, Form::juan(&stack.token()).request("198.51.100.77")).await;
    assert_eq!(other.status, StatusCode::OK);
    assert_eq!(stack.lead_total(), 6);
}

#[tokio::test]
async fn test_rate_limit_window_rolls_over() {
    let stack = sqlite_stack();
    for _ in 0..5 {
        send(&stack.router, Form::juan(&stack.token()).request(CLIENT)).await;
    }
    stack.clock.advance(std::time::Duration::from_secs(3600));

    let reply = send(&stack.router, Form::juan(&stack.token()).request(CLIENT)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(stack.lead_total(), 6);
}

#[tokio::test]
async fn test_riff_without_webp_tag_is_rejected() {
    let stack = sqlite_stack();
    let form = Form::juan(&stack.token()).file("photo.webp", "image/webp", &riff(b"WAVE"));

    let reply = send(&stack.router, form.request(CLIENT)).await;

    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.json()["errors"]["photos"].is_array());
    assert_eq!(stack.lead_total(), 0);
}

#[tokio::test]
async fn test_webp_photo_is_accepted() {
    let stack = sqlite_stack();
    let form = Form::juan(&stack.token()).file("photo.webp", "image/webp", &riff(b"WEBP"));

    let reply = send(&stack.router, form.request(CLIENT)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(stack.lead_total(), 1);
}

// =============================================================================
// FAILURE BOUNDARIES
// =============================================================================

#[tokio::test]
async fn test_mail_outage_keeps_the_lead() {
    let stack = sqlite_stack();
    stack.mailer.fail_all();

    let reply = send(&stack.router, Form::juan(&stack.token()).request(CLIENT)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(stack.mail_attempts(2).await, 2);
    assert!(stack.mailer.delivered().is_empty());

    let page = stack
        .state
        .leads
        .list_leads(&ListQuery::default(), &office())
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.leads[0].status, LeadStatus::New);
}

#[tokio::test]
async fn test_image_insert_failure_leaves_no_lead() {
    let (stack, store) = memory_stack();
    store.inject_fault(Fault::InsertImage);
    let form = Form::juan(&stack.token()).file("a.jpg", "image/jpeg", &jpeg(4096));

    let reply = send(&stack.router, form.request(CLIENT)).await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json()["message"], INTERNAL_MESSAGE);
    assert_eq!(store.lead_count(), 0);
    assert_eq!(store.image_count(), 0);
    assert_eq!(store.log_count(), 0);
    assert!(stack.mailer.attempts().is_empty());
}
