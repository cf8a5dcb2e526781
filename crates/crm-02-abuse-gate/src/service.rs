//! # Abuse Gate Service
//!
//! Decides, before any side effect, whether a contact submission proceeds.
//!
//! ## Order of Checks
//!
//! 1. Rate limit (every attempt counts, bots included)
//! 2. Honeypot field
//! 3. Minimum fill time
//!
//! Counter store failures fail open: the attempt is let through and a warning
//! is logged, so a counter outage never costs a genuine lead.

use crate::domain::config::GateConfig;
use crate::domain::decision::{DiscardReason, GateDecision, RejectReason, SubmissionContext};
use crate::domain::errors::TokenError;
use crate::domain::form_token::{FormTokenSigner, VerifiedToken};
use crate::domain::window::window_slot;
use crate::ports::outbound::RateCounterStore;
use crm_types::Clock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The abuse gate.
pub struct AbuseGate {
    config: GateConfig,
    counters: Arc<dyn RateCounterStore>,
    clock: Arc<dyn Clock>,
    signer: Option<FormTokenSigner>,
}

/// Dependencies for AbuseGate
pub struct AbuseGateDependencies {
    pub counters: Arc<dyn RateCounterStore>,
    pub clock: Arc<dyn Clock>,
}

impl AbuseGate {
    pub fn new(
        config: GateConfig,
        deps: AbuseGateDependencies,
    ) -> Result<Self, crate::domain::config::ConfigError> {
        config.validate()?;

        let signer = if config.form_token.enabled {
            let max_age = config.form_token.max_age;
            Some(match &config.form_token.secret {
                Some(secret) => {
                    FormTokenSigner::new(secret.as_bytes(), max_age, Arc::clone(&deps.clock))?
                }
                None => {
                    warn!("No form token secret configured; generated an ephemeral key");
                    FormTokenSigner::with_random_key(max_age, Arc::clone(&deps.clock))?
                }
            })
        } else {
            None
        };

        Ok(Self {
            config,
            counters: deps.counters,
            clock: deps.clock,
            signer,
        })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Name of the honeypot form field.
    pub fn honeypot_field(&self) -> &str {
        &self.config.honeypot.field_name
    }

    /// Issue a form token, if form tokens are enabled.
    pub fn issue_form_token(&self) -> Option<String> {
        self.signer.as_ref().map(FormTokenSigner::issue)
    }

    /// Verify a submitted form token.
    ///
    /// Returns `Ok(None)` when form tokens are disabled.
    pub fn verify_form_token(
        &self,
        token: Option<&str>,
    ) -> Result<Option<VerifiedToken>, TokenError> {
        let Some(signer) = &self.signer else {
            return Ok(None);
        };
        let token = token.ok_or(TokenError::Missing)?;
        signer.verify(token).map(Some)
    }

    /// Evaluate a submission.
    pub async fn evaluate(&self, ctx: &SubmissionContext<'_>) -> GateDecision {
        if !self.within_rate_limit(ctx).await {
            info!(ip = %ctx.ip, "Contact submission rate limited");
            return GateDecision::Reject(RejectReason::RateLimited);
        }

        let honeypot = &self.config.honeypot;
        if honeypot.enabled {
            let tripped = ctx
                .honeypot_value
                .map(|value| !value.is_empty())
                .unwrap_or(false);
            if tripped {
                warn!(
                    ip = %ctx.ip,
                    field = %honeypot.field_name,
                    "Honeypot field filled; discarding submission"
                );
                return GateDecision::Discard(DiscardReason::Honeypot);
            }

            if !honeypot.min_fill_time.is_zero() {
                if let Some(age) = ctx.form_age {
                    if age < honeypot.min_fill_time {
                        warn!(
                            ip = %ctx.ip,
                            fill_ms = age.as_millis() as u64,
                            "Form submitted faster than minimum fill time; discarding"
                        );
                        return GateDecision::Discard(DiscardReason::TooFast);
                    }
                }
            }
        }

        GateDecision::Accept
    }

    async fn within_rate_limit(&self, ctx: &SubmissionContext<'_>) -> bool {
        let limits = &self.config.rate_limit;
        if !limits.enabled {
            return true;
        }
        if limits.whitelist.contains(&ctx.ip) {
            debug!(ip = %ctx.ip, "Whitelisted IP bypasses rate limit");
            return true;
        }

        let slot = window_slot(
            &limits.key_prefix,
            ctx.ip,
            self.clock.unix_seconds(),
            limits.window,
        );

        match self
            .counters
            .increment_and_check(&slot.key, slot.remaining, limits.max_submissions)
            .await
        {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(
                    ip = %ctx.ip,
                    backend = self.counters.backend(),
                    error = %e,
                    "Rate limit counter unavailable; allowing submission"
                );
                true
            }
        }
    }
}
