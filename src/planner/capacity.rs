//! Team capacity computation and utilization banding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::registry::TaskRegistry;

/// Available hours per agent, captured at session start and treated as the
/// reference for the rest of the planning conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    pub per_agent: BTreeMap<String, f64>,
}

impl CapacitySnapshot {
    pub fn total(&self) -> f64 {
        self.per_agent.values().sum()
    }

    pub fn available_for(&self, agent_id: &str) -> f64 {
        self.per_agent.get(agent_id).copied().unwrap_or(0.0)
    }
}

/// Compute buffered sprint capacity per agent: sprint hours minus the hours
/// already committed to assigned work, floored at zero.
pub fn compute_capacity(registry: &TaskRegistry, config: &PlannerConfig) -> CapacitySnapshot {
    let sprint_hours = config.sprint_hours();
    let per_agent = registry
        .agents()
        .map(|agent| {
            let committed = registry.assigned_hours(&agent.agent_id);
            (agent.agent_id.clone(), (sprint_hours - committed).max(0.0))
        })
        .collect();
    CapacitySnapshot { per_agent }
}

/// How heavily a planned load sits on an agent's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationBand {
    /// At most 75% of capacity.
    Comfortable,
    /// Between 75% and 100%.
    Tight,
    /// More than the agent can carry.
    OverCapacity,
}

impl UtilizationBand {
    pub fn for_load(planned_hours: f64, capacity_hours: f64) -> Self {
        if capacity_hours <= 0.0 {
            return if planned_hours > 0.0 {
                Self::OverCapacity
            } else {
                Self::Comfortable
            };
        }
        let utilization = planned_hours / capacity_hours;
        if utilization <= 0.75 {
            Self::Comfortable
        } else if utilization <= 1.0 {
            Self::Tight
        } else {
            Self::OverCapacity
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comfortable => "comfortable",
            Self::Tight => "tight",
            Self::OverCapacity => "over-capacity",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentCapability, Task, TaskPriority, TaskType};

    #[test]
    fn capacity_subtracts_committed_hours() {
        let mut registry = TaskRegistry::new();
        registry.upsert_agent(
            AgentCapability::new("agent-a", "Aaron", "backend-dev")
                .with_capabilities([TaskType::CodeGeneration])
                .with_max_workload(3),
        );
        let id = registry.add_task(Task::new(
            "",
            "existing work",
            TaskType::CodeGeneration,
            TaskPriority::High,
            10.0,
        ));
        registry.assign(&id, "agent-a").unwrap();

        let config = PlannerConfig::default();
        let snapshot = compute_capacity(&registry, &config);
        // 14 * 6 * 0.8 = 67.2, minus 10 committed.
        assert!((snapshot.available_for("agent-a") - 57.2).abs() < 1e-9);
        assert!((snapshot.total() - 57.2).abs() < 1e-9);
    }

    #[test]
    fn capacity_floors_at_zero() {
        let mut registry = TaskRegistry::new();
        registry.upsert_agent(
            AgentCapability::new("agent-a", "Aaron", "backend-dev")
                .with_capabilities([TaskType::CodeGeneration])
                .with_max_workload(20),
        );
        let id = registry.add_task(Task::new(
            "",
            "huge",
            TaskType::CodeGeneration,
            TaskPriority::High,
            500.0,
        ));
        registry.assign(&id, "agent-a").unwrap();

        let snapshot = compute_capacity(&registry, &PlannerConfig::default());
        assert_eq!(snapshot.available_for("agent-a"), 0.0);
    }

    #[test]
    fn utilization_bands() {
        assert_eq!(
            UtilizationBand::for_load(30.0, 60.0),
            UtilizationBand::Comfortable
        );
        assert_eq!(UtilizationBand::for_load(55.0, 60.0), UtilizationBand::Tight);
        assert_eq!(
            UtilizationBand::for_load(70.0, 60.0),
            UtilizationBand::OverCapacity
        );
        assert_eq!(
            UtilizationBand::for_load(1.0, 0.0),
            UtilizationBand::OverCapacity
        );
        assert_eq!(
            UtilizationBand::for_load(0.0, 0.0),
            UtilizationBand::Comfortable
        );
    }
}
