//! Intake counters, exposed as JSON on `/metrics`.

use crm_04_notifications::NotificationReport;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Intake pipeline metrics
#[derive(Debug, Default)]
pub struct IntakeMetrics {
    // Contact submissions
    pub submissions_total: AtomicU64,
    pub submissions_accepted: AtomicU64,
    pub submissions_discarded: AtomicU64,
    pub submissions_rate_limited: AtomicU64,
    pub submissions_invalid: AtomicU64,
    pub submissions_forbidden: AtomicU64,
    pub submissions_failed: AtomicU64,

    // Post-commit notifications
    pub notifications_sent: AtomicU64,
    pub notifications_skipped: AtomicU64,
    pub notifications_failed: AtomicU64,

    // Back office
    pub office_mutations: AtomicU64,
}

/// Point-in-time copy of [`IntakeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub submissions_total: u64,
    pub submissions_accepted: u64,
    pub submissions_discarded: u64,
    pub submissions_rate_limited: u64,
    pub submissions_invalid: u64,
    pub submissions_forbidden: u64,
    pub submissions_failed: u64,
    pub notifications_sent: u64,
    pub notifications_skipped: u64,
    pub notifications_failed: u64,
    pub office_mutations: u64,
}

impl IntakeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submission(&self) {
        self.submissions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.submissions_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.submissions_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.submissions_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self) {
        self.submissions_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forbidden(&self) {
        self.submissions_forbidden.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.submissions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_office_mutation(&self) {
        self.office_mutations.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold a dispatch report into the notification counters
    pub fn record_notifications(&self, report: &NotificationReport) {
        self.notifications_sent
            .fetch_add(report.sent() as u64, Ordering::Relaxed);
        self.notifications_skipped
            .fetch_add(report.skipped() as u64, Ordering::Relaxed);
        self.notifications_failed
            .fetch_add(report.failed() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submissions_total: self.submissions_total.load(Ordering::Relaxed),
            submissions_accepted: self.submissions_accepted.load(Ordering::Relaxed),
            submissions_discarded: self.submissions_discarded.load(Ordering::Relaxed),
            submissions_rate_limited: self.submissions_rate_limited.load(Ordering::Relaxed),
            submissions_invalid: self.submissions_invalid.load(Ordering::Relaxed),
            submissions_forbidden: self.submissions_forbidden.load(Ordering::Relaxed),
            submissions_failed: self.submissions_failed.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_skipped: self.notifications_skipped.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            office_mutations: self.office_mutations.load(Ordering::Relaxed),
        }
    }
}
