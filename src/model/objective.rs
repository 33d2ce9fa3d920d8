use serde::{Deserialize, Serialize};

use super::task::TaskPriority;

/// A sprint-level goal that the planner breaks down into tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintObjective {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    /// Relative effort on a 1–10 scale (not hours).
    pub estimated_effort: u8,
    /// Ordered acceptance criteria.
    pub acceptance_criteria: Vec<String>,
    /// Ids of objectives this one depends on.
    pub dependencies: Vec<String>,
}

impl SprintObjective {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        priority: TaskPriority,
        estimated_effort: u8,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            priority,
            estimated_effort: estimated_effort.clamp(1, 10),
            acceptance_criteria: Vec::new(),
            dependencies: Vec::new(),
        }
    }
}
