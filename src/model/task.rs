use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of work a task represents. Drives capability matching and the
/// planner's breakdown templates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    CodeGeneration,
    CodeReview,
    Testing,
    Documentation,
    Design,
    Deployment,
    /// Matches any capable, available agent.
    General,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeGeneration => "code_generation",
            Self::CodeReview => "code_review",
            Self::Testing => "testing",
            Self::Documentation => "documentation",
            Self::Design => "design",
            Self::Deployment => "deployment",
            Self::General => "general",
        }
    }
}

/// Task priority, ordered so `Critical` sorts first via `Ord`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Critical,
    High,
    Medium,
    Low,
}

/// Task lifecycle status.
///
/// `assigned_to` is set exactly when the status is one of Assigned,
/// InProgress, Blocked, or Completed; the registry enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Planned,
    Assigned,
    InProgress,
    Blocked,
    Completed,
}

impl TaskStatus {
    /// Whether a task in this status occupies one of its agent's slots.
    pub fn consumes_slot(&self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress)
    }
}

/// A unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    /// Estimated effort in hours.
    pub estimated_effort: f64,
    pub assigned_to: Option<String>,
    /// Ids of tasks this one depends on.
    pub dependencies: BTreeSet<String>,
    /// Ids of blockers raised against this task (append-only).
    pub blockers: Vec<String>,
    pub parent_objective: Option<String>,
    /// Completion percentage, 0–100.
    pub progress: f64,
    /// Explicit deadline; when absent the monitor derives one from
    /// `assigned_at` and `estimated_effort`.
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new planned task.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        task_type: TaskType,
        priority: TaskPriority,
        estimated_effort: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            task_type,
            priority,
            status: TaskStatus::Planned,
            estimated_effort,
            assigned_to: None,
            dependencies: BTreeSet::new(),
            blockers: Vec::new(),
            parent_objective: None,
            progress: 0.0,
            deadline: None,
            created_at: Utc::now(),
            assigned_at: None,
            started_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parent_objective(mut self, objective_id: impl Into<String>) -> Self {
        self.parent_objective = Some(objective_id.into());
        self
    }

    /// Whether this task is still waiting on the agent to finish it.
    pub fn is_active(&self) -> bool {
        self.status.consumes_slot()
    }

    /// The instant work effectively began: `started_at`, else `assigned_at`.
    pub fn work_started(&self) -> Option<DateTime<Utc>> {
        self.started_at.or(self.assigned_at)
    }
}
