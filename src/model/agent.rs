use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::TaskType;

/// A capability-bearing worker eligible for task assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCapability {
    pub agent_id: String,
    pub name: String,
    /// Free-form role label ("backend-dev", "qa", ...). Feeds the
    /// role-by-task-type expertise bonus.
    pub role: String,
    /// Task types this agent can take.
    pub capabilities: BTreeSet<TaskType>,
    /// Domain name → expertise level 0–10. Domain names are matched against
    /// task descriptions during scoring.
    pub expertise: BTreeMap<String, u8>,
    /// Maximum concurrent task slots.
    pub max_workload: u32,
    /// Occupied slots; kept equal to the count of this agent's tasks with
    /// status Assigned or InProgress by the registry.
    pub current_workload: u32,
    pub available: bool,
    pub last_seen: DateTime<Utc>,
}

impl AgentCapability {
    pub fn new(agent_id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            role: role.into(),
            capabilities: BTreeSet::new(),
            expertise: BTreeMap::new(),
            max_workload: 3,
            current_workload: 0,
            available: true,
            last_seen: Utc::now(),
        }
    }

    pub fn with_capabilities<I: IntoIterator<Item = TaskType>>(mut self, caps: I) -> Self {
        self.capabilities = caps.into_iter().collect();
        self
    }

    pub fn with_expertise(mut self, domain: impl Into<String>, level: u8) -> Self {
        self.expertise.insert(domain.into(), level.min(10));
        self
    }

    pub fn with_max_workload(mut self, slots: u32) -> Self {
        self.max_workload = slots;
        self
    }

    /// Free task slots.
    pub fn remaining_slots(&self) -> u32 {
        self.max_workload.saturating_sub(self.current_workload)
    }

    /// Whether this agent can take a task of the given type.
    ///
    /// General tasks match every agent; otherwise the type must be in the
    /// capability set.
    pub fn can_handle(&self, task_type: TaskType) -> bool {
        task_type == TaskType::General || self.capabilities.contains(&task_type)
    }
}

/// Historical performance metrics for one agent, all in [0, 1].
///
/// Updated by external feedback (sprint reviews, heartbeats); agents with no
/// record score a neutral 50 on the historical component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Fraction of assigned tasks completed.
    pub completion_rate: f64,
    /// Review-derived quality measure.
    pub quality_score: f64,
    /// How close actuals land to estimates.
    pub time_accuracy: f64,
}

impl PerformanceRecord {
    pub fn new(completion_rate: f64, quality_score: f64, time_accuracy: f64) -> Self {
        Self {
            completion_rate: completion_rate.clamp(0.0, 1.0),
            quality_score: quality_score.clamp(0.0, 1.0),
            time_accuracy: time_accuracy.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_tasks_match_any_agent() {
        let agent = AgentCapability::new("agent-a", "Aaron", "backend-dev")
            .with_capabilities([TaskType::CodeGeneration]);
        assert!(agent.can_handle(TaskType::CodeGeneration));
        assert!(agent.can_handle(TaskType::General));
        assert!(!agent.can_handle(TaskType::Testing));
    }

    #[test]
    fn remaining_slots_saturates() {
        let mut agent = AgentCapability::new("agent-a", "Aaron", "qa").with_max_workload(2);
        agent.current_workload = 3;
        assert_eq!(agent.remaining_slots(), 0);
    }

    #[test]
    fn performance_record_clamps_inputs() {
        let record = PerformanceRecord::new(1.5, -0.2, 0.8);
        assert_eq!(record.completion_rate, 1.0);
        assert_eq!(record.quality_score, 0.0);
        assert_eq!(record.time_accuracy, 0.8);
    }
}
