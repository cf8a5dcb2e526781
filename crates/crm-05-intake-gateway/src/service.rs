//! Intake gateway service - binds the listener and serves the router.

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::middleware::StaffDirectory;
use crate::router::{build_router, AppState};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Intake gateway service state
pub struct IntakeGatewayService {
    config: GatewayConfig,
    router: Router,
}

impl IntakeGatewayService {
    /// Validate the config and build the router.
    pub fn new(
        config: GatewayConfig,
        state: AppState,
        staff: StaffDirectory,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        if staff.is_empty() {
            warn!("No staff tokens configured; back-office routes will refuse every request");
        }
        let router = build_router(state, &config, staff);
        Ok(Self {
            config,
            router,
        })
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn start<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        serve(listener, self.router, shutdown).await
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Serve `router` on `listener` with peer addresses available to the
/// middleware, draining in-flight requests on shutdown.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<(), GatewayError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(addr = %addr, "Intake gateway listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("Intake gateway stopped");
    Ok(())
}
