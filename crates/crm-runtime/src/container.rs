//! # Service Container
//!
//! Builds every component from a validated [`RuntimeConfig`] in dependency
//! order:
//!
//! 1. Lead store (SQLite) and lead service; seed staff and services
//! 2. Rate-limit counters (Redis or in-process) and abuse gate
//! 3. Mailer and post-commit hooks
//! 4. Intake pipeline, app state and staff directory

use crate::config::RuntimeConfig;
use anyhow::{Context, Result};
use crm_02_abuse_gate::{
    cleanup_task, AbuseGate, AbuseGateDependencies, InMemoryCounterStore, RateCounterStore,
};
use crm_03_lead_store::{
    LeadManagementApi, LeadService, LeadServiceDependencies, LeadStore, SqliteLeadStore,
};
use crm_04_notifications::{mailer_from_config, PostCommitHooks};
use crm_05_intake_gateway::{
    AppState, IntakeGatewayService, IntakeMetrics, IntakePipeline, IntakePipelineDependencies,
    StaffDirectory,
};
use crm_types::{Clock, SystemClock};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Everything the gateway needs, fully wired.
pub struct ServiceContainer {
    pub state: AppState,
    pub staff: StaffDirectory,
    /// In-process counter eviction, when that store is in use
    pub cleanup: Option<JoinHandle<()>>,
}

impl ServiceContainer {
    /// Wire the service over the configured SQLite database.
    pub async fn build(config: &RuntimeConfig) -> Result<Self> {
        let path = config.database.path.clone();
        let store = tokio::task::spawn_blocking(move || SqliteLeadStore::open(&path))
            .await
            .context("database task failed")?
            .with_context(|| {
                format!("failed to open database {}", config.database.path.display())
            })?;
        info!(path = %config.database.path.display(), "Lead database opened");
        Self::build_with_store(config, Arc::new(store)).await
    }

    /// Wire the service over any lead store.
    pub async fn build_with_store<S: LeadStore>(
        config: &RuntimeConfig,
        store: Arc<S>,
    ) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let service = LeadService::new(
            LeadServiceDependencies {
                store,
                clock: Arc::clone(&clock),
            },
            config.lead_store.clone(),
        );
        let leads: Arc<dyn LeadManagementApi> = Arc::new(service);
        seed(config, Arc::clone(&leads)).await?;

        let (counters, cleanup) = counter_store(config).await?;
        let gate = AbuseGate::new(
            config.abuse_gate.clone(),
            AbuseGateDependencies {
                counters,
                clock: Arc::clone(&clock),
            },
        )
        .context("[abuse_gate]")?;
        if config.abuse_gate.form_token.enabled && config.abuse_gate.form_token.secret.is_none() {
            warn!("No CSRF secret configured; form tokens will not survive a restart");
        }

        let mailer = mailer_from_config(&config.notifications).context("[notifications]")?;
        let hooks = PostCommitHooks::from_config(&config.notifications, mailer)
            .context("[notifications]")?;
        info!(
            hooks = ?hooks.hook_names(),
            enabled = hooks.is_enabled(),
            "Post-commit hooks configured"
        );

        let metrics = Arc::new(IntakeMetrics::new());
        let pipeline = IntakePipeline::new(
            IntakePipelineDependencies {
                gate: Arc::new(gate),
                leads: Arc::clone(&leads),
                hooks,
                metrics: Arc::clone(&metrics),
            },
            config.attachments.clone(),
        );

        let mut staff = StaffDirectory::new();
        for entry in &config.staff {
            staff.insert(entry.token.clone(), entry.member());
        }

        Ok(Self {
            state: AppState {
                pipeline: Arc::new(pipeline),
                leads,
                documents: config.documents.clone(),
                metrics,
            },
            staff,
            cleanup,
        })
    }

    /// Gateway service over this container.
    pub fn gateway(&self, config: &RuntimeConfig) -> Result<IntakeGatewayService> {
        IntakeGatewayService::new(config.gateway.clone(), self.state.clone(), self.staff.clone())
            .context("[gateway]")
    }
}

/// Register configured staff members and services.
async fn seed(config: &RuntimeConfig, leads: Arc<dyn LeadManagementApi>) -> Result<()> {
    let staff: Vec<_> = config.staff.iter().map(|e| e.member()).collect();
    let services = config.services.clone();
    let (staff_count, service_count) = (staff.len(), services.len());

    tokio::task::spawn_blocking(move || {
        for member in &staff {
            leads.upsert_staff(member)?;
        }
        for service in &services {
            leads.upsert_service(service)?;
        }
        Ok::<_, crm_03_lead_store::StoreError>(())
    })
    .await
    .context("seed task failed")?
    .context("failed to seed staff and services")?;

    info!(
        staff = staff_count,
        services = service_count,
        "Staff and service catalogue seeded"
    );
    Ok(())
}

#[cfg(feature = "redis")]
async fn counter_store(
    config: &RuntimeConfig,
) -> Result<(Arc<dyn RateCounterStore>, Option<JoinHandle<()>>)> {
    if let Some(url) = &config.redis.url {
        let store = crm_02_abuse_gate::RedisCounterStore::connect(
            url,
            config.abuse_gate.rate_limit.key_prefix.clone(),
            config.redis.op_timeout,
        )
        .await
        .context("failed to connect to Redis")?;
        info!("Rate-limit counters in Redis");
        return Ok((Arc::new(store), None));
    }
    Ok(in_memory_counters(config))
}

#[cfg(not(feature = "redis"))]
async fn counter_store(
    config: &RuntimeConfig,
) -> Result<(Arc<dyn RateCounterStore>, Option<JoinHandle<()>>)> {
    if config.redis.url.is_some() {
        warn!("redis.url is set but this build has no Redis support; using in-process counters");
    }
    Ok(in_memory_counters(config))
}

fn in_memory_counters(config: &RuntimeConfig) -> (Arc<dyn RateCounterStore>, Option<JoinHandle<()>>) {
    let store = Arc::new(InMemoryCounterStore::new());
    let cleanup = tokio::spawn(cleanup_task(
        Arc::clone(&store),
        config.redis.cleanup_interval,
    ));
    info!("Rate-limit counters in process memory");
    (store, Some(cleanup))
}
