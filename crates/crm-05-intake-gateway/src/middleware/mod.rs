//! Middleware stack for the intake gateway.
//!
//! Layer order: Request → Tracing → IpProtection → Timeout → CORS → Handler
//!
//! Back-office routes additionally pass through `StaffAuth`.

pub mod auth;
pub mod ip_protection;
pub mod metrics;
pub mod tracing;

pub use self::auth::{constant_time_compare, StaffAuthLayer, StaffDirectory};
pub use self::ip_protection::{ClientIp, IpProtectionLayer, TrustedProxyConfig};
pub use self::metrics::{IntakeMetrics, MetricsSnapshot};
pub use self::tracing::TracingLayer;

use crate::domain::config::CorsConfig;
use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// CORS for the public form. An empty origin list allows no cross-origin calls.
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ]);

    if config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
