use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of obstacle is blocking a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerType {
    /// An upstream task has not completed.
    Dependency,
    /// The assigned agent is unavailable.
    Resource,
    /// Work has stalled with no progress.
    Technical,
    /// A human decision is required to proceed.
    DecisionNeeded,
}

impl BlockerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dependency => "dependency",
            Self::Resource => "resource",
            Self::Technical => "technical",
            Self::DecisionNeeded => "decision_needed",
        }
    }
}

/// How a blocker is remediated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Ask other agents to help clear upstream work.
    AddResources,
    /// Send templated guidance to unstick the work.
    ProvideGuidance,
    /// Move the task to a different agent.
    ReassignTask,
    /// Hand the decision to the human channel.
    EscalateToHuman,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddResources => "add_resources",
            Self::ProvideGuidance => "provide_guidance",
            Self::ReassignTask => "reassign_task",
            Self::EscalateToHuman => "escalate_to_human",
        }
    }
}

/// A typed, resolvable obstacle attached to a task.
///
/// Blockers form an append-only audit trail: they are resolved, never
/// deleted. The registry keeps at most one unresolved blocker per
/// (task, type) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blocker {
    pub id: String,
    pub task_id: String,
    pub blocker_type: BlockerType,
    pub title: String,
    pub description: String,
    /// Human-readable impact statement.
    pub impact: String,
    pub resolution_strategy: Option<ResolutionStrategy>,
    pub escalated_to_human: bool,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl Blocker {
    pub fn new(
        id: impl Into<String>,
        task_id: impl Into<String>,
        blocker_type: BlockerType,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            task_id: task_id.into(),
            blocker_type,
            title: title.into(),
            description: String::new(),
            impact: String::new(),
            resolution_strategy: None,
            escalated_to_human: false,
            resolved: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = impact.into();
        self
    }
}
