//! Public contact form endpoints.

use crate::domain::error::ApiError;
use crate::domain::form::{
    is_checked, ContactSubmission, FormAccepted, FormTokenResponse, CSRF_FIELD, CSRF_HEADER,
    PHOTOS_FIELD,
};
use crate::middleware::ClientIp;
use crate::pipeline::ContactOutcome;
use crate::router::AppState;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{Extension, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use crm_01_file_integrity::{AttachmentInput, DeclaredType};
use crm_03_lead_store::ContactForm;
use std::net::IpAddr;
use tracing::debug;

/// `GET /contact/token`
pub async fn form_token(State(state): State<AppState>) -> Json<FormTokenResponse> {
    let gate = state.pipeline.gate();
    Json(FormTokenResponse {
        csrf_token: gate.issue_form_token(),
        honeypot_field: gate.honeypot_field().to_string(),
    })
}

/// `POST /contact`
pub async fn submit(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!(ip = %ip, error = %rejection, "Contact submission is not multipart");
            return ApiError::bad_request(rejection.body_text()).into_response();
        }
    };

    let honeypot_field = state.pipeline.gate().honeypot_field().to_string();
    let mut submission = match read_submission(multipart, &honeypot_field, ip).await {
        Ok(submission) => submission,
        Err(e) => return e.into_response(),
    };
    submission.user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if submission.csrf_token.is_none() {
        submission.csrf_token = headers
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }

    match state.pipeline.submit(submission).await {
        // The response never waits for notifications
        ContactOutcome::Accepted { .. } | ContactOutcome::Discarded(_) => {
            Json(FormAccepted::new()).into_response()
        }
        ContactOutcome::Invalid(errors) => ApiError::invalid(errors).into_response(),
        ContactOutcome::RateLimited => ApiError::rate_limited().into_response(),
        ContactOutcome::Forbidden(_) => ApiError::form_expired().into_response(),
        ContactOutcome::Failed => ApiError::internal().into_response(),
    }
}

/// Collect the multipart fields into a submission. Unknown fields are ignored.
async fn read_submission(
    mut multipart: Multipart,
    honeypot_field: &str,
    ip: IpAddr,
) -> Result<ContactSubmission, ApiError> {
    let mut form = ContactForm::default();
    let mut honeypot = None;
    let mut csrf_token = None;
    let mut attachments = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == PHOTOS_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let declared = DeclaredType::from_content_type(field.content_type());
            let bytes = field
                .bytes()
                .await
                .map_err(multipart_error)?;
            // Browsers send an empty part for an untouched file input
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            attachments.push(AttachmentInput {
                file_name,
                declared,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(multipart_error)?;
        if name == honeypot_field {
            honeypot = Some(value);
            continue;
        }
        match name.as_str() {
            CSRF_FIELD => csrf_token = Some(value),
            "name" => form.name = value,
            "email" => form.email = value,
            "phone" => form.phone = value,
            "location" => form.location = value,
            "message" => form.message = value,
            "service" => form.service = value,
            "urgency" => form.urgency = value,
            "preferred_contact" => form.preferred_contact = value,
            "privacy_accepted" => form.privacy_accepted = is_checked(&value),
            _ => {}
        }
    }

    Ok(ContactSubmission {
        form,
        honeypot,
        csrf_token: csrf_token.filter(|t| !t.trim().is_empty()),
        attachments,
        ip,
        user_agent: None,
    })
}

/// Oversized bodies keep their 413.
fn multipart_error(e: MultipartError) -> ApiError {
    debug!(error = %e, "Unreadable multipart field");
    ApiError::new(e.status(), e.body_text())
}
