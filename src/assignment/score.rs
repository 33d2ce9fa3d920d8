//! The five scoring components, each clamped to [0, 100].

use chrono::{DateTime, Utc};

use crate::model::{AgentCapability, PerformanceRecord, Task, TaskStatus, TaskType};

/// Flat bonus for a role that habitually owns a task type.
const ROLE_BONUSES: &[(&str, TaskType, f64)] = &[
    ("backend-dev", TaskType::CodeGeneration, 20.0),
    ("frontend-dev", TaskType::CodeGeneration, 15.0),
    ("qa", TaskType::Testing, 20.0),
    ("architect", TaskType::Design, 20.0),
    ("tech-writer", TaskType::Documentation, 20.0),
    ("devops", TaskType::Deployment, 20.0),
    ("reviewer", TaskType::CodeReview, 15.0),
];

/// Hours one workload slot represents when computing utilization.
const HOURS_PER_SLOT: f64 = 8.0;

/// Expertise: 50 for the capability match, up to 50 more from expertise in
/// domains the task description mentions, plus a role-by-type bonus.
pub fn expertise_score(task: &Task, agent: &AgentCapability) -> f64 {
    let mut score = if agent.can_handle(task.task_type) {
        50.0
    } else {
        0.0
    };

    let description = task.description.to_lowercase();
    let mut domain_bonus = 0.0;
    for (domain, level) in &agent.expertise {
        if !domain.is_empty() && description.contains(&domain.to_lowercase()) {
            domain_bonus += f64::from(*level) * 5.0;
        }
    }
    score += domain_bonus.min(50.0);

    let role = agent.role.to_lowercase();
    for (bonus_role, bonus_type, bonus) in ROLE_BONUSES {
        if role == *bonus_role && task.task_type == *bonus_type {
            score += bonus;
            break;
        }
    }

    score.clamp(0.0, 100.0)
}

/// Workload: headroom from utilization plus a free-slot bonus, or a hard
/// penalty when the agent is full.
///
/// Utilization is assigned hours over `max_workload * 8h`. The score is
/// monotone non-increasing in `current_workload`.
pub fn workload_score(agent: &AgentCapability, current_tasks: &[Task]) -> f64 {
    let assigned_hours: f64 = current_tasks
        .iter()
        .filter(|t| {
            t.status.consumes_slot() && t.assigned_to.as_deref() == Some(agent.agent_id.as_str())
        })
        .map(|t| t.estimated_effort)
        .sum();
    let capacity_hours = f64::from(agent.max_workload) * HOURS_PER_SLOT;
    let utilization_pct = if capacity_hours > 0.0 {
        assigned_hours / capacity_hours * 100.0
    } else {
        100.0
    };

    let mut score = (100.0 - utilization_pct).max(0.0);
    let remaining = agent.remaining_slots();
    if remaining == 0 {
        score -= 50.0;
    } else {
        score += (f64::from(remaining) * 10.0).min(20.0);
    }
    score.clamp(0.0, 100.0)
}

/// Availability: tiered by how recently the agent was seen; zero when the
/// agent is marked unavailable.
pub fn availability_score(agent: &AgentCapability, now: DateTime<Utc>) -> f64 {
    if !agent.available {
        return 0.0;
    }
    let age_minutes = now
        .signed_duration_since(agent.last_seen)
        .num_minutes()
        .max(0);
    match age_minutes {
        0..=4 => 100.0,
        5..=14 => 80.0,
        15..=29 => 60.0,
        _ => 30.0,
    }
}

/// Dependency affinity: rewards agents already working next to this task.
///
/// +25 per in-progress task of the agent sharing a dependency edge (either
/// direction), +15 per active task under the same objective, +10 per other
/// agent already holding one of the task's dependencies. Capped at 100.
pub fn dependency_score(task: &Task, agent: &AgentCapability, current_tasks: &[Task]) -> f64 {
    let mut score = 50.0;

    for other in current_tasks {
        if other.id == task.id || other.assigned_to.as_deref() != Some(agent.agent_id.as_str()) {
            continue;
        }
        if other.status == TaskStatus::InProgress
            && (task.dependencies.contains(&other.id) || other.dependencies.contains(&task.id))
        {
            score += 25.0;
        }
        if other.is_active()
            && task.parent_objective.is_some()
            && other.parent_objective == task.parent_objective
        {
            score += 15.0;
        }
    }

    let mut collaborators: Vec<&str> = current_tasks
        .iter()
        .filter(|t| task.dependencies.contains(&t.id))
        .filter_map(|t| t.assigned_to.as_deref())
        .filter(|id| *id != agent.agent_id.as_str())
        .collect();
    collaborators.sort_unstable();
    collaborators.dedup();
    score += collaborators.len() as f64 * 10.0;

    score.clamp(0.0, 100.0)
}

/// Historical: weighted blend of the performance record, neutral 50 when no
/// record exists.
pub fn historical_score(record: Option<&PerformanceRecord>) -> f64 {
    match record {
        Some(r) => {
            (r.completion_rate * 40.0 + r.quality_score * 35.0 + r.time_accuracy * 25.0)
                .clamp(0.0, 100.0)
        }
        None => 50.0,
    }
}
