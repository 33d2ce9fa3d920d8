//! Derived per-task progress and risk metrics.
//!
//! Nothing here is persisted; every liveness tick recomputes the report from
//! the task's timestamps and progress percentage.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Task;

/// How far behind expectation a task is running.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify the actual/expected progress ratio.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.8 {
            Self::Low
        } else if ratio >= 0.6 {
            Self::Medium
        } else if ratio >= 0.3 {
            Self::High
        } else {
            Self::Critical
        }
    }
}

/// Snapshot of one task's execution health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub task_id: String,
    /// Where the task should be by now, 0–100.
    pub expected_progress: f64,
    pub actual_progress: f64,
    /// actual / expected; 1.0 when nothing is expected yet.
    pub progress_ratio: f64,
    /// Progress percent gained per elapsed hour.
    pub velocity: f64,
    /// Hours to completion at the current velocity; `None` while velocity
    /// is zero.
    pub estimated_remaining_hours: Option<f64>,
    pub risk: RiskLevel,
    pub on_track: bool,
}

/// Compute a progress report for a task.
///
/// Returns `None` for tasks that have not been assigned yet (no baseline to
/// measure against). Expected progress is linear across the estimated
/// effort, clamped at 100.
pub fn assess(task: &Task, now: DateTime<Utc>) -> Option<ProgressReport> {
    let started = task.work_started()?;
    let elapsed_hours = (now.signed_duration_since(started).num_seconds().max(0) as f64) / 3600.0;

    let expected_progress = if task.estimated_effort > 0.0 {
        (elapsed_hours / task.estimated_effort).clamp(0.0, 1.0) * 100.0
    } else {
        100.0
    };
    let actual_progress = task.progress.clamp(0.0, 100.0);
    let progress_ratio = if expected_progress > 0.0 {
        actual_progress / expected_progress
    } else {
        1.0
    };
    let velocity = if elapsed_hours > 0.0 {
        actual_progress / elapsed_hours
    } else {
        0.0
    };
    let estimated_remaining_hours = if velocity > 0.0 {
        Some((100.0 - actual_progress) / velocity)
    } else {
        None
    };

    let risk = RiskLevel::from_ratio(progress_ratio);
    let on_track = matches!(risk, RiskLevel::Low | RiskLevel::Medium)
        && velocity > 0.0
        && estimated_remaining_hours
            .map(|remaining| remaining < task.estimated_effort * 1.5)
            .unwrap_or(false);

    Some(ProgressReport {
        task_id: task.id.clone(),
        expected_progress,
        actual_progress,
        progress_ratio,
        velocity,
        estimated_remaining_hours,
        risk,
        on_track,
    })
}

/// The instant a task is considered overdue: its explicit deadline, or
/// `assigned_at` plus buffered effort.
pub fn effective_deadline(task: &Task, buffer: f64) -> Option<DateTime<Utc>> {
    if let Some(deadline) = task.deadline {
        return Some(deadline);
    }
    let assigned = task.assigned_at?;
    let budget_secs = (task.estimated_effort * 3600.0 * buffer) as i64;
    Some(assigned + Duration::seconds(budget_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TaskPriority, TaskStatus, TaskType};

    fn active_task(effort: f64, hours_ago: i64, progress: f64) -> Task {
        let mut task = Task::new(
            "task-1",
            "build",
            TaskType::CodeGeneration,
            TaskPriority::High,
            effort,
        );
        task.status = TaskStatus::InProgress;
        task.assigned_to = Some("agent-a".to_string());
        task.assigned_at = Some(Utc::now() - Duration::hours(hours_ago));
        task.started_at = task.assigned_at;
        task.progress = progress;
        task
    }

    #[test]
    fn unassigned_task_has_no_report() {
        let task = Task::new(
            "task-1",
            "build",
            TaskType::CodeGeneration,
            TaskPriority::High,
            4.0,
        );
        assert!(assess(&task, Utc::now()).is_none());
    }

    #[test]
    fn ratio_tiers_map_to_risk_levels() {
        assert_eq!(RiskLevel::from_ratio(1.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_ratio(0.8), RiskLevel::Low);
        assert_eq!(RiskLevel::from_ratio(0.7), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_ratio(0.5), RiskLevel::High);
        assert_eq!(RiskLevel::from_ratio(0.1), RiskLevel::Critical);
    }

    #[test]
    fn stalled_overdue_task_is_critical() {
        // Assigned 3h ago, 1h estimate, zero progress.
        let task = active_task(1.0, 3, 0.0);
        let report = assess(&task, Utc::now()).unwrap();
        assert_eq!(report.expected_progress, 100.0);
        assert_eq!(report.risk, RiskLevel::Critical);
        assert_eq!(report.velocity, 0.0);
        assert!(report.estimated_remaining_hours.is_none());
        assert!(!report.on_track);
    }

    #[test]
    fn healthy_task_is_on_track() {
        // Halfway through a 4h task with 60% done.
        let task = active_task(4.0, 2, 60.0);
        let report = assess(&task, Utc::now()).unwrap();
        assert_eq!(report.risk, RiskLevel::Low);
        assert!(report.velocity > 0.0);
        assert!(report.on_track);
    }

    #[test]
    fn fresh_task_carries_no_risk() {
        let task = active_task(4.0, 0, 0.0);
        let report = assess(&task, task.assigned_at.unwrap()).unwrap();
        assert_eq!(report.expected_progress, 0.0);
        assert_eq!(report.progress_ratio, 1.0);
        assert_eq!(report.risk, RiskLevel::Low);
    }

    #[test]
    fn implicit_deadline_uses_buffered_effort() {
        let task = active_task(4.0, 0, 0.0);
        let deadline = effective_deadline(&task, 1.5).unwrap();
        let expected = task.assigned_at.unwrap() + Duration::hours(6);
        assert_eq!(deadline, expected);
    }

    #[test]
    fn explicit_deadline_wins() {
        let mut task = active_task(4.0, 0, 0.0);
        let explicit = Utc::now() + Duration::hours(1);
        task.deadline = Some(explicit);
        assert_eq!(effective_deadline(&task, 1.5), Some(explicit));
    }
}
