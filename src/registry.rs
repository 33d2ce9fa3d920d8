//! In-memory registry for tasks, agents, blockers, objectives, and alerts.
//!
//! All compound mutations (assignment, transfer, blocker bookkeeping) happen
//! inside a single `&mut self` method, so wrapping the registry in a mutex
//! makes each of them one uninterrupted step. That is the entire concurrency
//! story: components share a [`SharedRegistry`] and never hold partial
//! updates across a lock release.
//!
//! Invariants enforced here:
//! - `assigned_to` is set iff status is Assigned/InProgress/Blocked/Completed;
//! - an assigned task is Blocked iff it has at least one unresolved blocker;
//!   unassigned tasks record blockers while staying Planned;
//! - `current_workload` equals the count of the agent's Assigned/InProgress
//!   tasks (blocking or completing a task frees the slot), and never exceeds
//!   `max_workload`;
//! - at most one unresolved blocker per (task, type) pair;
//! - at most one alert per (kind, task) pair;
//! - tasks and blockers are never deleted.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::OrchestratorError;
use crate::model::{
    AgentCapability, Alert, AlertKind, AlertSeverity, Blocker, BlockerType, PerformanceRecord,
    SprintObjective, Task, TaskStatus,
};

/// Registry handle shared between the engine, monitor, and planner.
pub type SharedRegistry = Arc<Mutex<TaskRegistry>>;

/// Result of a blocker-detection insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockerOutcome {
    /// A new blocker was created with this id.
    New(String),
    /// An unresolved blocker of the same (task, type) already exists.
    Existing(String),
}

impl BlockerOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::New(id) | Self::Existing(id) => id,
        }
    }
}

/// The in-memory store all components operate on.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Task>,
    agents: BTreeMap<String, AgentCapability>,
    blockers: BTreeMap<String, Blocker>,
    objectives: BTreeMap<String, SprintObjective>,
    alerts: BTreeMap<String, Alert>,
    performance: BTreeMap<String, PerformanceRecord>,
    next_task: u64,
    next_objective: u64,
    next_blocker: u64,
    next_alert: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a registry for sharing across components.
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    // ---- ids ------------------------------------------------------------

    fn mint_task_id(&mut self) -> String {
        self.next_task += 1;
        format!("task-{}", self.next_task)
    }

    fn mint_objective_id(&mut self) -> String {
        self.next_objective += 1;
        format!("obj-{}", self.next_objective)
    }

    fn mint_blocker_id(&mut self) -> String {
        self.next_blocker += 1;
        format!("blk-{}", self.next_blocker)
    }

    fn mint_alert_id(&mut self) -> String {
        self.next_alert += 1;
        format!("alert-{}", self.next_alert)
    }

    // ---- inserts & reads ------------------------------------------------

    /// Insert a task, minting an id if the draft's id is empty.
    /// Returns the task's id.
    pub fn add_task(&mut self, mut task: Task) -> String {
        if task.id.is_empty() {
            task.id = self.mint_task_id();
        }
        let id = task.id.clone();
        self.tasks.insert(id.clone(), task);
        id
    }

    /// Insert an objective, minting an id if the draft's id is empty.
    pub fn add_objective(&mut self, mut objective: SprintObjective) -> String {
        if objective.id.is_empty() {
            objective.id = self.mint_objective_id();
        }
        let id = objective.id.clone();
        self.objectives.insert(id.clone(), objective);
        id
    }

    /// Insert or replace an agent record.
    pub fn upsert_agent(&mut self, agent: AgentCapability) -> String {
        let id = agent.agent_id.clone();
        self.agents.insert(id.clone(), agent);
        id
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn agent(&self, id: &str) -> Option<&AgentCapability> {
        self.agents.get(id)
    }

    pub fn blocker(&self, id: &str) -> Option<&Blocker> {
        self.blockers.get(id)
    }

    pub fn objective(&self, id: &str) -> Option<&SprintObjective> {
        self.objectives.get(id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentCapability> {
        self.agents.values()
    }

    pub fn blockers(&self) -> impl Iterator<Item = &Blocker> {
        self.blockers.values()
    }

    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.values()
    }

    /// Tasks currently occupying an agent slot (Assigned or InProgress).
    pub fn active_tasks(&self) -> Vec<&Task> {
        self.tasks.values().filter(|t| t.is_active()).collect()
    }

    /// Clone snapshots used by the pure assignment engine.
    pub fn snapshot_tasks(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    pub fn snapshot_agents(&self) -> Vec<AgentCapability> {
        self.agents.values().cloned().collect()
    }

    pub fn performance_ledger(&self) -> BTreeMap<String, PerformanceRecord> {
        self.performance.clone()
    }

    // ---- agent updates --------------------------------------------------

    /// External heartbeat: refresh `last_seen` and availability.
    pub fn record_heartbeat(
        &mut self,
        agent_id: &str,
        available: bool,
    ) -> Result<(), OrchestratorError> {
        let agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| OrchestratorError::AgentNotFound(agent_id.to_string()))?;
        agent.available = available;
        agent.last_seen = Utc::now();
        Ok(())
    }

    /// Record performance metrics for an agent.
    pub fn set_performance(&mut self, agent_id: &str, record: PerformanceRecord) {
        self.performance.insert(agent_id.to_string(), record);
    }

    /// Sum of estimated hours across an agent's slot-consuming tasks.
    pub fn assigned_hours(&self, agent_id: &str) -> f64 {
        self.tasks
            .values()
            .filter(|t| t.status.consumes_slot() && t.assigned_to.as_deref() == Some(agent_id))
            .map(|t| t.estimated_effort)
            .sum()
    }

    /// Tasks currently attributed to an agent (any status).
    pub fn agent_tasks(&self, agent_id: &str) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|t| t.assigned_to.as_deref() == Some(agent_id))
            .collect()
    }

    // ---- task lifecycle -------------------------------------------------

    /// Atomically assign a planned task to an agent.
    ///
    /// Sets `assigned_to`, `assigned_at`, and status Assigned, and takes one
    /// of the agent's slots, as a single step.
    pub fn assign(&mut self, task_id: &str, agent_id: &str) -> Result<(), OrchestratorError> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        if let Some(current) = &task.assigned_to {
            return Err(OrchestratorError::AlreadyAssigned {
                task_id: task_id.to_string(),
                agent_id: current.clone(),
            });
        }
        let agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| OrchestratorError::AgentNotFound(agent_id.to_string()))?;
        if agent.remaining_slots() == 0 {
            return Err(OrchestratorError::AgentAtCapacity(agent_id.to_string()));
        }
        agent.current_workload += 1;
        // Both lookups succeeded; mutate the task last so no partial state
        // is possible.
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        task.assigned_to = Some(agent_id.to_string());
        task.assigned_at = Some(Utc::now());
        task.status = TaskStatus::Assigned;
        Ok(())
    }

    /// Return an assigned task to the planned pool, freeing its agent slot.
    pub fn unassign(&mut self, task_id: &str) -> Result<(), OrchestratorError> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        let consumed = task.status.consumes_slot();
        let agent_id = task.assigned_to.take();
        task.status = TaskStatus::Planned;
        task.assigned_at = None;
        task.started_at = None;
        if consumed {
            if let Some(agent_id) = agent_id {
                if let Some(agent) = self.agents.get_mut(&agent_id) {
                    agent.current_workload = agent.current_workload.saturating_sub(1);
                }
            }
        }
        Ok(())
    }

    /// Atomically move a task to a different agent.
    ///
    /// Frees the old agent's slot and takes one from the new agent in the
    /// same step. Blocked tasks transfer without touching workloads (a
    /// blocked task consumes no slot); they re-take a slot when unblocked.
    pub fn transfer(&mut self, task_id: &str, new_agent_id: &str) -> Result<(), OrchestratorError> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        let consumes = task.status.consumes_slot();
        let old_agent = task.assigned_to.clone();
        if !self.agents.contains_key(new_agent_id) {
            return Err(OrchestratorError::AgentNotFound(new_agent_id.to_string()));
        }
        if consumes {
            let new_agent = self
                .agents
                .get(new_agent_id)
                .ok_or_else(|| OrchestratorError::AgentNotFound(new_agent_id.to_string()))?;
            if new_agent.remaining_slots() == 0 {
                return Err(OrchestratorError::AgentAtCapacity(new_agent_id.to_string()));
            }
            if let Some(old) = &old_agent {
                if let Some(agent) = self.agents.get_mut(old) {
                    agent.current_workload = agent.current_workload.saturating_sub(1);
                }
            }
            if let Some(agent) = self.agents.get_mut(new_agent_id) {
                agent.current_workload += 1;
            }
        }
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        task.assigned_to = Some(new_agent_id.to_string());
        task.assigned_at = Some(Utc::now());
        Ok(())
    }

    /// Mark an assigned task as started.
    pub fn start(&mut self, task_id: &str) -> Result<(), OrchestratorError> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        if task.status == TaskStatus::Assigned {
            task.status = TaskStatus::InProgress;
            task.started_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Update a task's progress percentage (clamped to 0–100).
    pub fn update_progress(&mut self, task_id: &str, progress: f64) -> Result<(), OrchestratorError> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        task.progress = progress.clamp(0.0, 100.0);
        Ok(())
    }

    /// Replace a task's estimated effort, in hours. Floored at one hour.
    pub fn set_estimated_effort(
        &mut self,
        task_id: &str,
        hours: f64,
    ) -> Result<(), OrchestratorError> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        task.estimated_effort = hours.max(1.0);
        Ok(())
    }

    /// Complete a task, freeing its agent slot.
    pub fn complete(&mut self, task_id: &str) -> Result<(), OrchestratorError> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
        let freed = task.status.consumes_slot();
        let agent_id = task.assigned_to.clone();
        task.status = TaskStatus::Completed;
        task.progress = 100.0;
        if freed {
            if let Some(agent_id) = agent_id {
                if let Some(agent) = self.agents.get_mut(&agent_id) {
                    agent.current_workload = agent.current_workload.saturating_sub(1);
                }
            }
        }
        Ok(())
    }

    // ---- blockers -------------------------------------------------------

    /// Whether an unresolved blocker of this type already exists for the task.
    pub fn has_unresolved_blocker(&self, task_id: &str, blocker_type: BlockerType) -> bool {
        self.blockers.values().any(|b| {
            !b.resolved && b.task_id == task_id && b.blocker_type == blocker_type
        })
    }

    /// Unresolved blockers attached to a task.
    pub fn unresolved_blockers(&self, task_id: &str) -> Vec<&Blocker> {
        self.blockers
            .values()
            .filter(|b| !b.resolved && b.task_id == task_id)
            .collect()
    }

    /// Insert a blocker, deduplicating on (task, type).
    ///
    /// A new blocker moves an assigned task to Blocked and frees its agent
    /// slot. Unassigned tasks record the blocker but stay Planned, since
    /// Blocked implies an assignee.
    pub fn add_blocker(&mut self, draft: Blocker) -> Result<BlockerOutcome, OrchestratorError> {
        if !self.tasks.contains_key(&draft.task_id) {
            return Err(OrchestratorError::TaskNotFound(draft.task_id));
        }
        if let Some(existing) = self.blockers.values().find(|b| {
            !b.resolved && b.task_id == draft.task_id && b.blocker_type == draft.blocker_type
        }) {
            return Ok(BlockerOutcome::Existing(existing.id.clone()));
        }

        let mut blocker = draft;
        if blocker.id.is_empty() {
            blocker.id = self.mint_blocker_id();
        }
        let id = blocker.id.clone();
        let task_id = blocker.task_id.clone();
        self.blockers.insert(id.clone(), blocker);

        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.clone()))?;
        task.blockers.push(id.clone());
        let freed = task.status.consumes_slot();
        let agent_id = task.assigned_to.clone();
        if agent_id.is_some() && task.status != TaskStatus::Completed {
            task.status = TaskStatus::Blocked;
        }
        if freed {
            if let Some(agent_id) = agent_id {
                if let Some(agent) = self.agents.get_mut(&agent_id) {
                    agent.current_workload = agent.current_workload.saturating_sub(1);
                }
            }
        }
        Ok(BlockerOutcome::New(id))
    }

    /// Record the strategy chosen for a blocker.
    pub fn set_resolution_strategy(
        &mut self,
        blocker_id: &str,
        strategy: crate::model::ResolutionStrategy,
    ) -> Result<(), OrchestratorError> {
        let blocker = self
            .blockers
            .get_mut(blocker_id)
            .ok_or_else(|| OrchestratorError::BlockerNotFound(blocker_id.to_string()))?;
        blocker.resolution_strategy = Some(strategy);
        Ok(())
    }

    /// Mark a blocker escalated to the human channel.
    ///
    /// Idempotent: returns `true` only the first time.
    pub fn escalate_blocker(&mut self, blocker_id: &str) -> Result<bool, OrchestratorError> {
        let blocker = self
            .blockers
            .get_mut(blocker_id)
            .ok_or_else(|| OrchestratorError::BlockerNotFound(blocker_id.to_string()))?;
        if blocker.escalated_to_human {
            return Ok(false);
        }
        blocker.escalated_to_human = true;
        Ok(true)
    }

    /// Resolve a blocker. When it was the task's last unresolved blocker the
    /// task leaves Blocked: back to InProgress if it had started, else
    /// Assigned, re-taking the agent slot. If the assignee filled up while
    /// the task was blocked there is no slot to re-take; the task returns to
    /// the planned pool for the engine to re-place.
    pub fn resolve_blocker(&mut self, blocker_id: &str) -> Result<(), OrchestratorError> {
        let blocker = self
            .blockers
            .get_mut(blocker_id)
            .ok_or_else(|| OrchestratorError::BlockerNotFound(blocker_id.to_string()))?;
        if blocker.resolved {
            return Ok(());
        }
        blocker.resolved = true;
        let task_id = blocker.task_id.clone();

        let still_blocked = self
            .blockers
            .values()
            .any(|b| !b.resolved && b.task_id == task_id);
        if still_blocked {
            return Ok(());
        }
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.clone()))?;
        if task.status != TaskStatus::Blocked {
            return Ok(());
        }
        match task.assigned_to.clone() {
            Some(agent_id) => {
                let has_slot = self
                    .agents
                    .get(&agent_id)
                    .map(|a| a.remaining_slots() > 0)
                    .unwrap_or(false);
                if has_slot {
                    task.status = if task.started_at.is_some() {
                        TaskStatus::InProgress
                    } else {
                        TaskStatus::Assigned
                    };
                    if let Some(agent) = self.agents.get_mut(&agent_id) {
                        agent.current_workload += 1;
                    }
                } else {
                    task.assigned_to = None;
                    task.assigned_at = None;
                    task.started_at = None;
                    task.status = TaskStatus::Planned;
                }
            }
            None => task.status = TaskStatus::Planned,
        }
        Ok(())
    }

    // ---- alerts ---------------------------------------------------------

    /// Record an alert, minting its id. Deduplicates on (kind, task) so a
    /// condition that persists across ticks raises one alert, not one per
    /// tick. Returns the alert's id (the existing id on a dedup hit).
    pub fn push_alert(
        &mut self,
        kind: AlertKind,
        severity: AlertSeverity,
        message: impl Into<String>,
        task_id: Option<&str>,
        agent_id: Option<&str>,
    ) -> String {
        if let Some(existing) = self
            .alerts
            .values()
            .find(|a| a.kind == kind && a.task_id.as_deref() == task_id)
        {
            return existing.id.clone();
        }
        let id = self.mint_alert_id();
        let mut alert = Alert::new(id.clone(), kind, severity, message);
        if let Some(task_id) = task_id {
            alert = alert.for_task(task_id);
        }
        if let Some(agent_id) = agent_id {
            alert = alert.for_agent(agent_id);
        }
        self.alerts.insert(id.clone(), alert);
        id
    }

    /// Ids of critical alerts not yet forwarded to the human channel.
    pub fn unescalated_critical_alerts(&self) -> Vec<String> {
        self.alerts
            .values()
            .filter(|a| a.severity == AlertSeverity::Critical && !a.escalated)
            .map(|a| a.id.clone())
            .collect()
    }

    /// Flag an alert as escalated. Returns `true` only the first time.
    pub fn mark_alert_escalated(&mut self, alert_id: &str) -> bool {
        match self.alerts.get_mut(alert_id) {
            Some(alert) if !alert.escalated => {
                alert.escalated = true;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TaskPriority, TaskType};

    fn registry_with_agent(slots: u32) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        registry.upsert_agent(
            AgentCapability::new("agent-a", "Aaron", "backend-dev")
                .with_capabilities([TaskType::CodeGeneration])
                .with_max_workload(slots),
        );
        registry
    }

    fn draft_task(title: &str) -> Task {
        let mut task = Task::new("", title, TaskType::CodeGeneration, TaskPriority::High, 4.0);
        task.id.clear();
        task
    }

    #[test]
    fn ids_are_minted_sequentially() {
        let mut registry = TaskRegistry::new();
        assert_eq!(registry.add_task(draft_task("one")), "task-1");
        assert_eq!(registry.add_task(draft_task("two")), "task-2");
        let obj = SprintObjective::new("", "goal", TaskPriority::High, 5);
        assert_eq!(registry.add_objective(obj), "obj-1");
    }

    #[test]
    fn assign_sets_fields_and_takes_slot() {
        let mut registry = registry_with_agent(2);
        let id = registry.add_task(draft_task("build"));
        registry.assign(&id, "agent-a").unwrap();

        let task = registry.task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.assigned_to.as_deref(), Some("agent-a"));
        assert!(task.assigned_at.is_some());
        assert_eq!(registry.agent("agent-a").unwrap().current_workload, 1);
    }

    #[test]
    fn assign_rejects_double_assignment() {
        let mut registry = registry_with_agent(2);
        let id = registry.add_task(draft_task("build"));
        registry.assign(&id, "agent-a").unwrap();
        let err = registry.assign(&id, "agent-a").unwrap_err();
        assert!(matches!(err, OrchestratorError::AlreadyAssigned { .. }));
        // Workload unchanged by the failed second attempt.
        assert_eq!(registry.agent("agent-a").unwrap().current_workload, 1);
    }

    #[test]
    fn assign_rejects_full_agent() {
        let mut registry = registry_with_agent(1);
        let first = registry.add_task(draft_task("one"));
        let second = registry.add_task(draft_task("two"));
        registry.assign(&first, "agent-a").unwrap();
        let err = registry.assign(&second, "agent-a").unwrap_err();
        assert!(matches!(err, OrchestratorError::AgentAtCapacity(_)));
    }

    #[test]
    fn complete_frees_the_slot() {
        let mut registry = registry_with_agent(1);
        let id = registry.add_task(draft_task("build"));
        registry.assign(&id, "agent-a").unwrap();
        registry.start(&id).unwrap();
        registry.complete(&id).unwrap();

        let task = registry.task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100.0);
        // Completed tasks keep their assignee but free the slot.
        assert_eq!(task.assigned_to.as_deref(), Some("agent-a"));
        assert_eq!(registry.agent("agent-a").unwrap().current_workload, 0);
    }

    #[test]
    fn blocker_dedup_keeps_one_unresolved_per_type() {
        let mut registry = registry_with_agent(2);
        let id = registry.add_task(draft_task("build"));
        registry.assign(&id, "agent-a").unwrap();

        let first = registry
            .add_blocker(Blocker::new("", &id, BlockerType::Technical, "stalled"))
            .unwrap();
        let second = registry
            .add_blocker(Blocker::new("", &id, BlockerType::Technical, "stalled again"))
            .unwrap();
        assert!(matches!(first, BlockerOutcome::New(_)));
        assert!(matches!(second, BlockerOutcome::Existing(_)));
        assert_eq!(second.id(), first.id());
        assert_eq!(registry.unresolved_blockers(&id).len(), 1);
    }

    #[test]
    fn blocking_and_unblocking_moves_workload() {
        let mut registry = registry_with_agent(2);
        let id = registry.add_task(draft_task("build"));
        registry.assign(&id, "agent-a").unwrap();
        registry.start(&id).unwrap();

        let outcome = registry
            .add_blocker(Blocker::new("", &id, BlockerType::Dependency, "waiting"))
            .unwrap();
        assert_eq!(registry.task(&id).unwrap().status, TaskStatus::Blocked);
        assert_eq!(registry.agent("agent-a").unwrap().current_workload, 0);

        registry.resolve_blocker(outcome.id()).unwrap();
        // Task had started, so it returns to InProgress and re-takes the slot.
        assert_eq!(registry.task(&id).unwrap().status, TaskStatus::InProgress);
        assert_eq!(registry.agent("agent-a").unwrap().current_workload, 1);
    }

    #[test]
    fn resolving_one_of_two_blockers_keeps_task_blocked() {
        let mut registry = registry_with_agent(2);
        let id = registry.add_task(draft_task("build"));
        registry.assign(&id, "agent-a").unwrap();

        let dep = registry
            .add_blocker(Blocker::new("", &id, BlockerType::Dependency, "dep"))
            .unwrap();
        let tech = registry
            .add_blocker(Blocker::new("", &id, BlockerType::Technical, "stall"))
            .unwrap();

        registry.resolve_blocker(dep.id()).unwrap();
        assert_eq!(registry.task(&id).unwrap().status, TaskStatus::Blocked);

        registry.resolve_blocker(tech.id()).unwrap();
        assert_eq!(registry.task(&id).unwrap().status, TaskStatus::Assigned);
    }

    #[test]
    fn unassign_returns_task_to_pool() {
        let mut registry = registry_with_agent(1);
        let id = registry.add_task(draft_task("build"));
        registry.assign(&id, "agent-a").unwrap();
        registry.start(&id).unwrap();

        registry.unassign(&id).unwrap();
        let task = registry.task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Planned);
        assert!(task.assigned_to.is_none());
        assert!(task.assigned_at.is_none());
        assert!(task.started_at.is_none());
        assert_eq!(registry.agent("agent-a").unwrap().current_workload, 0);
    }

    #[test]
    fn blocker_on_unassigned_task_keeps_it_planned() {
        let mut registry = registry_with_agent(2);
        let id = registry.add_task(draft_task("build"));

        let outcome = registry
            .add_blocker(Blocker::new("", &id, BlockerType::DecisionNeeded, "choose"))
            .unwrap();
        let task = registry.task(&id).unwrap();
        // No assignee, so the task cannot be Blocked; the blocker is still
        // recorded against it.
        assert_eq!(task.status, TaskStatus::Planned);
        assert!(task.assigned_to.is_none());
        assert_eq!(registry.unresolved_blockers(&id).len(), 1);

        registry.resolve_blocker(outcome.id()).unwrap();
        assert_eq!(registry.task(&id).unwrap().status, TaskStatus::Planned);
        assert!(registry.unresolved_blockers(&id).is_empty());
    }

    #[test]
    fn resolving_into_full_agent_returns_task_to_pool() {
        let mut registry = registry_with_agent(1);
        let first = registry.add_task(draft_task("one"));
        let second = registry.add_task(draft_task("two"));
        registry.assign(&first, "agent-a").unwrap();

        let outcome = registry
            .add_blocker(Blocker::new("", &first, BlockerType::Dependency, "waiting"))
            .unwrap();
        // Blocking freed the slot; another task fills it.
        registry.assign(&second, "agent-a").unwrap();

        registry.resolve_blocker(outcome.id()).unwrap();
        let task = registry.task(&first).unwrap();
        // The agent is full again, so the task goes back to the planned pool
        // instead of overcommitting the agent.
        assert_eq!(task.status, TaskStatus::Planned);
        assert!(task.assigned_to.is_none());
        let agent = registry.agent("agent-a").unwrap();
        assert_eq!(agent.current_workload, 1);
        assert!(agent.current_workload <= agent.max_workload);
    }

    #[test]
    fn transfer_moves_slot_between_agents() {
        let mut registry = registry_with_agent(2);
        registry.upsert_agent(
            AgentCapability::new("agent-b", "Betty", "backend-dev")
                .with_capabilities([TaskType::CodeGeneration])
                .with_max_workload(2),
        );
        let id = registry.add_task(draft_task("build"));
        registry.assign(&id, "agent-a").unwrap();

        registry.transfer(&id, "agent-b").unwrap();
        assert_eq!(
            registry.task(&id).unwrap().assigned_to.as_deref(),
            Some("agent-b")
        );
        assert_eq!(registry.agent("agent-a").unwrap().current_workload, 0);
        assert_eq!(registry.agent("agent-b").unwrap().current_workload, 1);
    }

    #[test]
    fn escalate_blocker_is_idempotent() {
        let mut registry = registry_with_agent(2);
        let id = registry.add_task(draft_task("build"));
        registry.assign(&id, "agent-a").unwrap();
        let outcome = registry
            .add_blocker(Blocker::new("", &id, BlockerType::DecisionNeeded, "choose"))
            .unwrap();

        assert!(registry.escalate_blocker(outcome.id()).unwrap());
        assert!(!registry.escalate_blocker(outcome.id()).unwrap());
    }

    #[test]
    fn workload_sum_matches_active_task_count() {
        let mut registry = registry_with_agent(3);
        registry.upsert_agent(
            AgentCapability::new("agent-b", "Betty", "qa")
                .with_capabilities([TaskType::CodeGeneration])
                .with_max_workload(3),
        );
        let a = registry.add_task(draft_task("one"));
        let b = registry.add_task(draft_task("two"));
        let c = registry.add_task(draft_task("three"));
        registry.assign(&a, "agent-a").unwrap();
        registry.assign(&b, "agent-a").unwrap();
        registry.assign(&c, "agent-b").unwrap();
        registry.complete(&a).unwrap();

        let total: u32 = registry.agents().map(|ag| ag.current_workload).sum();
        let active = registry
            .tasks()
            .filter(|t| t.status.consumes_slot())
            .count() as u32;
        assert_eq!(total, active);
    }

    #[test]
    fn alert_dedup_keeps_one_per_kind_and_task() {
        let mut registry = TaskRegistry::new();
        let first = registry.push_alert(
            AlertKind::SlowProgress,
            AlertSeverity::Critical,
            "task-1 is behind",
            Some("task-1"),
            None,
        );
        let repeat = registry.push_alert(
            AlertKind::SlowProgress,
            AlertSeverity::Critical,
            "task-1 is still behind",
            Some("task-1"),
            None,
        );
        assert_eq!(repeat, first);
        assert_eq!(registry.alerts().count(), 1);

        // A different kind for the same task is a separate alert.
        let other = registry.push_alert(
            AlertKind::MissedDeadline,
            AlertSeverity::Critical,
            "task-1 missed its deadline",
            Some("task-1"),
            None,
        );
        assert_ne!(other, first);
        assert_eq!(registry.alerts().count(), 2);
    }

    #[test]
    fn alert_escalation_flag_flips_once() {
        let mut registry = TaskRegistry::new();
        let id = registry.push_alert(
            AlertKind::MissedDeadline,
            AlertSeverity::Critical,
            "task-1 missed its deadline",
            Some("task-1"),
            None,
        );
        assert_eq!(registry.unescalated_critical_alerts(), vec![id.clone()]);
        assert!(registry.mark_alert_escalated(&id));
        assert!(!registry.mark_alert_escalated(&id));
        assert!(registry.unescalated_critical_alerts().is_empty());
    }
}
