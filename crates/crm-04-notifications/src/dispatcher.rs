//! # Post-Commit Dispatcher
//!
//! Runs the hooks that handle an event, each in its own task under its own
//! timeout. Failures, timeouts and panics are logged and reported; none of
//! them propagate.

use crate::domain::config::NotificationConfig;
use crate::domain::errors::ConfigError;
use crate::domain::events::LeadEvent;
use crate::domain::links::LinkBuilder;
use crate::domain::report::{HookOutcome, NotificationReport};
use crate::hooks::{AdminAlertHook, AssignmentHook, CustomerAckHook, NoteAlertHook};
use crate::ports::hooks::{HookStatus, PostCommitHook};
use crate::ports::outbound::Mailer;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};

/// Ordered list of post-commit hooks.
#[derive(Clone)]
pub struct PostCommitHooks {
    hooks: Vec<Arc<dyn PostCommitHook>>,
    timeout: Duration,
    enabled: bool,
}

impl PostCommitHooks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            hooks: Vec::new(),
            timeout,
            enabled: true,
        }
    }

    /// A list that never does anything.
    pub fn disabled() -> Self {
        Self {
            hooks: Vec::new(),
            timeout: Duration::from_secs(1),
            enabled: false,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn PostCommitHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// The standard hooks as configured.
    pub fn from_config(
        config: &NotificationConfig,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if !config.enabled {
            info!("Notifications disabled");
            return Ok(Self::disabled());
        }

        let links = LinkBuilder::parse(&config.public_origin)
            .map_err(|e| ConfigError::Notifications(e.to_string()))?;

        let mut hooks = Self::new(config.hook_timeout).with_hook(Arc::new(AdminAlertHook::new(
            mailer.clone(),
            config.admin_email.clone(),
            links.clone(),
        )));
        if config.send_customer_confirmation {
            hooks = hooks.with_hook(Arc::new(CustomerAckHook::new(
                mailer.clone(),
                config.business_name.clone(),
            )));
        }
        if config.notify_assignee {
            hooks = hooks.with_hook(Arc::new(AssignmentHook::new(mailer.clone(), links.clone())));
        }
        if config.notify_notes {
            hooks = hooks.with_hook(Arc::new(NoteAlertHook::new(
                mailer.clone(),
                config.admin_email.clone(),
                links,
            )));
        }

        info!(
            hooks = hooks.hooks.len(),
            mailer = mailer.backend(),
            "Notification hooks ready"
        );
        Ok(hooks)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn hook_names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Run every hook that handles `event` and wait for all of them.
    pub async fn dispatch(&self, event: LeadEvent) -> NotificationReport {
        let mut report = NotificationReport::default();
        if !self.enabled {
            return report;
        }

        let lead_id = event.lead().id;
        let kind = event.kind();
        let event = Arc::new(event);

        let tasks: Vec<(&'static str, JoinHandle<HookOutcome>)> = self
            .hooks
            .iter()
            .filter(|hook| hook.handles(&event))
            .map(|hook| {
                let name = hook.name();
                let hook = Arc::clone(hook);
                let event = Arc::clone(&event);
                let timeout = self.timeout;
                let span = tracing::info_span!("hook", hook = name, lead_id = %lead_id, event = kind);
                let task = tokio::spawn(
                    async move { run_hook(hook.as_ref(), &event, timeout).await }.instrument(span),
                );
                (name, task)
            })
            .collect();

        for (name, task) in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    error!(hook = name, lead_id = %lead_id, error = %join_error, "Notification hook aborted");
                    HookOutcome::Failed {
                        error: "hook aborted".to_string(),
                    }
                }
            };
            report.push(name, outcome);
        }

        info!(
            lead_id = %lead_id,
            event = kind,
            sent = report.sent(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Notifications dispatched"
        );
        report
    }

    /// Dispatch in the background. The caller never waits for delivery.
    pub fn spawn_dispatch(&self, event: LeadEvent) -> JoinHandle<NotificationReport> {
        let hooks = self.clone();
        tokio::spawn(async move { hooks.dispatch(event).await })
    }
}

async fn run_hook(hook: &dyn PostCommitHook, event: &LeadEvent, timeout: Duration) -> HookOutcome {
    match tokio::time::timeout(timeout, hook.run(event)).await {
        Ok(Ok(HookStatus::Sent)) => {
            info!("Notification sent");
            HookOutcome::Sent
        }
        Ok(Ok(HookStatus::Skipped(reason))) => {
            info!(reason, "Notification skipped");
            HookOutcome::Skipped {
                reason: reason.to_string(),
            }
        }
        Ok(Err(e)) => {
            error!(error = %e, "Notification failed");
            HookOutcome::Failed {
                error: e.to_string(),
            }
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Notification timed out");
            HookOutcome::Failed {
                error: format!("timed out after {:?}", timeout),
            }
        }
    }
}
