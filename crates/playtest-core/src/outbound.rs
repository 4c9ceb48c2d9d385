//! Post-commit collaborators: the reward ledger and the notification fanout.
//!
//! The engine never calls a collaborator before its own transaction commits,
//! and a collaborator failure never rolls engine state back. Deliveries are
//! fire-and-forget: failures are logged and dropped, because both downstream
//! systems can re-derive anything they missed from the store.
//!
//! The trait is intentionally simple; retries, batching, and real transport
//! live in the implementations.

use serde::{Deserialize, Serialize};

use crate::model::FeedbackStatus;

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

/// One-shot reward grant for a completed task.
///
/// Emitted at most once per (task, tester) pair; the completion row's
/// uniqueness is what enforces that, not the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEvent {
    pub tester_id: String,
    pub title_id: String,
    pub task_id: String,
    pub xp: u32,
    pub points: u32,
}

/// Events other systems may want to fan out to testers or dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    TesterJoined {
        tester_id: String,
        title_id: String,
    },
    TaskCreated {
        title_id: String,
        task_id: String,
        name: String,
    },
    FeedbackStatusChanged {
        feedback_id: String,
        title_id: String,
        tester_id: String,
        status: FeedbackStatus,
    },
    TitleReleased {
        title_id: String,
    },
}

// ---------------------------------------------------------------------------
// Collaborator trait
// ---------------------------------------------------------------------------

/// Abstraction over the external reward ledger and notification service.
pub trait Outbound {
    /// Deliver a reward grant to the external ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails; the engine logs and continues.
    fn deliver_reward(&mut self, event: &RewardEvent) -> anyhow::Result<()>;

    /// Deliver a notification to the fanout service.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails; the engine logs and continues.
    fn deliver_notification(&mut self, notification: &Notification) -> anyhow::Result<()>;
}

/// Swallows everything. For callers that have no collaborators wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutbound;

impl Outbound for NullOutbound {
    fn deliver_reward(&mut self, _event: &RewardEvent) -> anyhow::Result<()> {
        Ok(())
    }

    fn deliver_notification(&mut self, _notification: &Notification) -> anyhow::Result<()> {
        Ok(())
    }
}

pub(crate) fn emit_reward(outbound: &mut dyn Outbound, event: &RewardEvent) {
    if let Err(error) = outbound.deliver_reward(event) {
        tracing::warn!(
            tester_id = %event.tester_id,
            task_id = %event.task_id,
            error = %error,
            "reward delivery failed, dropping"
        );
    }
}

pub(crate) fn emit_notification(outbound: &mut dyn Outbound, notification: &Notification) {
    if let Err(error) = outbound.deliver_notification(notification) {
        tracing::warn!(
            error = %error,
            "notification delivery failed, dropping"
        );
    }
}

// ---------------------------------------------------------------------------
// Recording sink (for testing)
// ---------------------------------------------------------------------------

/// Captures every delivery for inspection, optionally refusing them to
/// exercise the log-and-continue path.
#[derive(Debug, Default)]
pub struct RecordingOutbound {
    rewards: Vec<RewardEvent>,
    notifications: Vec<Notification>,
    refuse_deliveries: bool,
}

impl RecordingOutbound {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail, as an unavailable collaborator
    /// would.
    pub fn refuse_deliveries(&mut self, refuse: bool) {
        self.refuse_deliveries = refuse;
    }

    #[must_use]
    pub fn rewards(&self) -> &[RewardEvent] {
        &self.rewards
    }

    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }
}

impl Outbound for RecordingOutbound {
    fn deliver_reward(&mut self, event: &RewardEvent) -> anyhow::Result<()> {
        if self.refuse_deliveries {
            anyhow::bail!("reward ledger unavailable");
        }
        self.rewards.push(event.clone());
        Ok(())
    }

    fn deliver_notification(&mut self, notification: &Notification) -> anyhow::Result<()> {
        if self.refuse_deliveries {
            anyhow::bail!("notification service unavailable");
        }
        self.notifications.push(notification.clone());
        Ok(())
    }
}
