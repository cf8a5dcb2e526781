//! Outcome of one dispatch.

use serde::Serialize;

/// What happened to one hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HookOutcome {
    Sent,
    Skipped { reason: String },
    Failed { error: String },
}

/// Per-hook outcomes of one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationReport {
    pub entries: Vec<(&'static str, HookOutcome)>,
}

impl NotificationReport {
    pub fn push(&mut self, hook: &'static str, outcome: HookOutcome) {
        self.entries.push((hook, outcome));
    }

    pub fn outcome(&self, hook: &str) -> Option<&HookOutcome> {
        self.entries
            .iter()
            .find(|(name, _)| *name == hook)
            .map(|(_, outcome)| outcome)
    }

    pub fn sent(&self) -> usize {
        self.count(|o| matches!(o, HookOutcome::Sent))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, HookOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, HookOutcome::Failed { .. }))
    }

    /// Hooks that actually tried to deliver.
    pub fn attempts(&self) -> usize {
        self.sent() + self.failed()
    }

    fn count(&self, pred: impl Fn(&HookOutcome) -> bool) -> usize {
        self.entries.iter().filter(|(_, o)| pred(o)).count()
    }
}
