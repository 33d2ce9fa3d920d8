use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What triggered an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SlowProgress,
    MissedDeadline,
    DeadlineApproaching,
    BlockerDetected,
    ResourceBottleneck,
    DependencyViolation,
}

/// Alert severity. Critical alerts are escalated to the human channel
/// exactly once.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// A monitoring alert written back to the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub task_id: Option<String>,
    pub agent_id: Option<String>,
    /// Set once the alert has been forwarded to the human channel.
    pub escalated: bool,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        id: impl Into<String>,
        kind: AlertKind,
        severity: AlertSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            severity,
            message: message.into(),
            task_id: None,
            agent_id: None,
            escalated: false,
            created_at: Utc::now(),
        }
    }

    pub fn for_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn for_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }
}
