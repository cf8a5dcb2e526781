//! Back-office endpoints.
//!
//! Every handler runs behind `StaffAuthLayer` and receives the authenticated
//! [`StaffMember`] as a request extension. Store calls are blocking and run on
//! the blocking pool. Post-commit hooks are spawned only after the store call
//! returned successfully.

use crate::domain::error::ApiError;
use crate::pipeline::{new_assignee, service_name};
use crate::router::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crm_01_file_integrity::validate_document;
use crm_03_lead_store::{
    BudgetDraft, ClientInfo, ContactForm, LeadManagementApi, LeadUpdate, ListQuery, NewLead,
    StoreError,
};
use crm_types::{
    BudgetReference, BudgetStatus, FieldErrors, LeadId, LeadImageId, LeadLog, LeadSource,
    LeadStatus, StaffMember,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Field carrying budget document errors.
pub const DOCUMENT_FIELD: &str = "document";

/// Run a store operation on the blocking pool.
async fn blocking<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn LeadManagementApi) -> Result<T, StoreError> + Send + 'static,
{
    let leads = Arc::clone(&state.leads);
    tokio::task::spawn_blocking(move || op(leads.as_ref()))
        .await
        .map_err(|e| {
            error!(error = %e, "Lead store task failed");
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}

fn path_error(rejection: PathRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

fn json_error(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

fn parse_reference(raw: &str) -> Result<BudgetReference, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found("Budget"))
}

// =============================================================================
// LEADS
// =============================================================================

/// Query string of `GET /office/leads`
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<LeadStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list_leads(
    State(state): State<AppState>,
    Extension(viewer): Extension<StaffMember>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|r| ApiError::bad_request(r.body_text()))?;
    let query = ListQuery {
        status: params.status,
        limit: params.limit,
        offset: params.offset,
    };
    let page = blocking(&state, move |leads| leads.list_leads(&query, &viewer)).await?;
    Ok(Json(page).into_response())
}

/// Body of `POST /office/leads`
#[derive(Debug, Deserialize)]
pub struct StaffLeadRequest {
    #[serde(flatten)]
    pub contact: ContactForm,
    pub source: LeadSource,
}

pub async fn create_lead(
    State(state): State<AppState>,
    Extension(actor): Extension<StaffMember>,
    body: Result<Json<StaffLeadRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(json_error)?;
    let contact = request.contact.validate().map_err(ApiError::invalid)?;

    let new_lead = NewLead {
        contact,
        images: Vec::new(),
        source: request.source,
        // The request comes from the office, not from the customer
        client: ClientInfo::default(),
        actor: Some(actor),
    };
    let (created, service) = blocking(&state, move |leads| {
        let created = leads.create_lead(new_lead)?;
        let service = service_name(leads, &created);
        Ok((created, service))
    })
    .await?;

    state.metrics.record_office_mutation();
    state.pipeline.notify_created(&created, service);
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn get_lead(
    State(state): State<AppState>,
    Extension(viewer): Extension<StaffMember>,
    id: Result<Path<LeadId>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id.map_err(path_error)?;
    let detail = blocking(&state, move |leads| leads.get_lead(id, &viewer)).await?;
    Ok(Json(detail).into_response())
}

/// Response of `PATCH /office/leads/:id`
#[derive(Debug, Serialize)]
pub struct LeadUpdated {
    pub lead: crm_types::Lead,
    /// `null` when nothing changed
    pub log: Option<LeadLog>,
}

pub async fn update_lead(
    State(state): State<AppState>,
    Extension(actor): Extension<StaffMember>,
    id: Result<Path<LeadId>, PathRejection>,
    body: Result<Json<LeadUpdate>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id.map_err(path_error)?;
    let Json(update) = body.map_err(json_error)?;

    let by = actor.clone();
    let (outcome, assignee) = blocking(&state, move |leads| {
        let outcome = leads.update_lead(id, update, &by)?;
        // The update is committed; a failed lookup only loses the email
        let assignee = match new_assignee(&outcome) {
            Some(staff_id) => leads.staff_member(staff_id).unwrap_or_else(|e| {
                warn!(lead_id = %id, error = %e, "Assignee lookup failed");
                None
            }),
            None => None,
        };
        Ok((outcome, assignee))
    })
    .await?;

    if outcome.log.is_some() {
        info!(lead_id = %id, staff = %actor.username, changes = outcome.changes.len(), "Lead updated");
        state.metrics.record_office_mutation();
        state.pipeline.notify_updated(&outcome, assignee, &actor);
    }
    Ok(Json(LeadUpdated {
        lead: outcome.lead,
        log: outcome.log,
    })
    .into_response())
}

pub async fn lead_logs(
    State(state): State<AppState>,
    Extension(viewer): Extension<StaffMember>,
    id: Result<Path<LeadId>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id.map_err(path_error)?;
    let logs = blocking(&state, move |leads| leads.lead_logs(id, &viewer)).await?;
    Ok(Json(logs).into_response())
}

pub async fn lead_image(
    State(state): State<AppState>,
    Extension(viewer): Extension<StaffMember>,
    ids: Result<Path<(LeadId, LeadImageId)>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path((id, image_id)) = ids.map_err(path_error)?;
    let image = blocking(&state, move |leads| leads.lead_image(id, image_id, &viewer)).await?;
    Ok((
        [(header::CONTENT_TYPE, image.format.mime_type())],
        image.bytes,
    )
        .into_response())
}

// =============================================================================
// BUDGETS
// =============================================================================

/// Body of `POST /office/leads/:id/budgets`
#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    #[serde(flatten)]
    pub draft: BudgetDraft,
    /// Standard base64 of a PDF
    #[serde(default)]
    pub document_base64: Option<String>,
}

/// Decode and check an uploaded budget document.
fn decode_document(encoded: &str, state: &AppState) -> Result<Vec<u8>, FieldErrors> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|_| FieldErrors::single(DOCUMENT_FIELD, "The document is not valid base64."))?;
    validate_document(&bytes, &state.documents)
        .map_err(|e| FieldErrors::single(DOCUMENT_FIELD, e.to_string()))?;
    Ok(bytes)
}

pub async fn create_budget(
    State(state): State<AppState>,
    Extension(actor): Extension<StaffMember>,
    id: Result<Path<LeadId>, PathRejection>,
    body: Result<Json<BudgetRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id.map_err(path_error)?;
    let Json(request) = body.map_err(json_error)?;

    let mut draft = request.draft;
    if let Some(encoded) = request.document_base64.filter(|d| !d.trim().is_empty()) {
        draft.document = Some(decode_document(&encoded, &state).map_err(ApiError::invalid)?);
    }

    let budget = blocking(&state, move |leads| leads.create_budget(id, draft, &actor)).await?;
    state.metrics.record_office_mutation();
    Ok((StatusCode::CREATED, Json(budget)).into_response())
}

pub async fn get_budget(
    State(state): State<AppState>,
    Extension(viewer): Extension<StaffMember>,
    Path(reference): Path<String>,
) -> Result<Response, ApiError> {
    let reference = parse_reference(&reference)?;
    let budget = blocking(&state, move |leads| leads.get_budget(&reference, &viewer)).await?;
    Ok(Json(budget).into_response())
}

/// Body of `PATCH /office/budgets/:reference`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetStatusRequest {
    pub status: BudgetStatus,
}

pub async fn change_budget_status(
    State(state): State<AppState>,
    Extension(actor): Extension<StaffMember>,
    Path(reference): Path<String>,
    body: Result<Json<BudgetStatusRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let reference = parse_reference(&reference)?;
    let Json(request) = body.map_err(json_error)?;

    let budget = blocking(&state, move |leads| {
        leads.change_budget_status(&reference, request.status, &actor)
    })
    .await?;
    state.metrics.record_office_mutation();
    Ok(Json(budget).into_response())
}

pub async fn budget_document(
    State(state): State<AppState>,
    Extension(viewer): Extension<StaffMember>,
    Path(reference): Path<String>,
) -> Result<Response, ApiError> {
    let reference = parse_reference(&reference)?;
    let file_name = format!("attachment; filename=\"{}.pdf\"", reference.as_str());
    let bytes = blocking(&state, move |leads| leads.budget_document(&reference, &viewer)).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, file_name),
        ],
        bytes,
    )
        .into_response())
}
