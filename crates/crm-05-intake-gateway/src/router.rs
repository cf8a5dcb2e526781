//! Route table and middleware stack.

use crate::domain::config::GatewayConfig;
use crate::handlers::{contact, office, system};
use crate::middleware::{
    create_cors_layer, IntakeMetrics, IpProtectionLayer, StaffAuthLayer, StaffDirectory,
    TracingLayer, TrustedProxyConfig,
};
use crate::pipeline::IntakePipeline;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use crm_01_file_integrity::DocumentPolicy;
use crm_03_lead_store::LeadManagementApi;
use crm_types::routes;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IntakePipeline>,
    pub leads: Arc<dyn LeadManagementApi>,
    pub documents: DocumentPolicy,
    pub metrics: Arc<IntakeMetrics>,
}

/// Build the complete router.
///
/// Public routes: contact form, token, health, metrics.
/// Back-office routes require a staff token.
pub fn build_router(state: AppState, config: &GatewayConfig, staff: StaffDirectory) -> Router {
    let office = Router::new()
        .route(
            routes::OFFICE_LEADS,
            get(office::list_leads).post(office::create_lead),
        )
        .route(
            routes::OFFICE_LEAD,
            get(office::get_lead).patch(office::update_lead),
        )
        .route(routes::OFFICE_LEAD_LOGS, get(office::lead_logs))
        .route(routes::OFFICE_LEAD_IMAGE, get(office::lead_image))
        .route(routes::OFFICE_LEAD_BUDGETS, post(office::create_budget))
        .route(
            routes::OFFICE_BUDGET,
            get(office::get_budget).patch(office::change_budget_status),
        )
        .route(routes::OFFICE_BUDGET_DOCUMENT, get(office::budget_document))
        .route_layer(StaffAuthLayer::new(staff));

    // Outermost first
    let middleware = ServiceBuilder::new()
        .layer(TracingLayer::new())
        .layer(IpProtectionLayer::new(TrustedProxyConfig::from(
            &config.security,
        )))
        .layer(TimeoutLayer::new(config.timeouts.request))
        .layer(create_cors_layer(&config.cors));

    Router::new()
        .route(routes::CONTACT_TOKEN, get(contact::form_token))
        .route(routes::CONTACT, post(contact::submit))
        .route(routes::HEALTH, get(system::health_check))
        .route(routes::METRICS, get(system::metrics))
        .merge(office)
        .layer(DefaultBodyLimit::max(config.limits.body_limit))
        .layer(middleware)
        .with_state(state)
}
