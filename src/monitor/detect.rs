//! Blocker detectors for the deep-scan loop.
//!
//! Each detector is a pure predicate over the registry snapshot; the monitor
//! turns positive results into blockers through the registry, which handles
//! (task, type) deduplication.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::{Task, TaskStatus};
use crate::registry::TaskRegistry;

/// Dependency state of one task: which upstream ids are still incomplete and
/// which do not exist at all.
#[derive(Debug, Default)]
pub struct DependencyCheck {
    pub incomplete: Vec<String>,
    pub dangling: Vec<String>,
}

impl DependencyCheck {
    pub fn is_blocked(&self) -> bool {
        !self.incomplete.is_empty() || !self.dangling.is_empty()
    }
}

/// Partition a task's dependencies into incomplete and dangling ids.
pub fn check_dependencies(registry: &TaskRegistry, task: &Task) -> DependencyCheck {
    let mut check = DependencyCheck::default();
    for dep_id in &task.dependencies {
        match registry.task(dep_id) {
            Some(dep) if dep.status != TaskStatus::Completed => {
                check.incomplete.push(dep_id.clone());
            }
            Some(_) => {}
            None => check.dangling.push(dep_id.clone()),
        }
    }
    check
}

/// Whether the task's assigned agent is missing or unavailable.
///
/// Returns the offending agent id so the blocker can name it.
pub fn unavailable_agent(registry: &TaskRegistry, task: &Task) -> Option<String> {
    let agent_id = task.assigned_to.as_deref()?;
    match registry.agent(agent_id) {
        Some(agent) if agent.available => None,
        _ => Some(agent_id.to_string()),
    }
}

/// Whether a task has shown zero velocity for longer than the stall window.
pub fn is_stalled(task: &Task, now: DateTime<Utc>, stall_window: Duration) -> bool {
    if task.progress > 0.0 {
        return false;
    }
    let Some(started) = task.work_started() else {
        return false;
    };
    let elapsed = now.signed_duration_since(started).num_seconds().max(0) as u64;
    elapsed > stall_window.as_secs()
}
