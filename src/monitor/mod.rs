//! Progress monitor: periodic risk tracking, blocker detection, and
//! automated remediation.
//!
//! Three loops run as background threads sharing the registry:
//! - liveness (default 30s): recomputes progress reports for active tasks,
//!   raising slow-progress and deadline alerts;
//! - deep scan (default 300s): runs the blocker detectors and attempts one
//!   remediation per new blocker;
//! - alert processing (default 30s): forwards critical alerts to the human
//!   channel exactly once.
//!
//! Each loop polls a [`ShutdownSignal`] between ticks and stops promptly.
//! Errors inside a tick are logged with their task/agent id and never abort
//! the loop. Outbound messages are composed under the registry lock but sent
//! after it is released, so the mutating remediation step (reassignment)
//! stays a single uninterrupted registry operation while message delivery
//! never holds the lock.

mod detect;
mod progress;
mod remediate;

pub use detect::{check_dependencies, is_stalled, unavailable_agent, DependencyCheck};
pub use progress::{assess, effective_deadline, ProgressReport, RiskLevel};
pub use remediate::{choose_strategy, guidance_message, plan_for, RemediationPlan};

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::assignment::AssignmentEngine;
use crate::config::MonitorConfig;
use crate::error::OrchestratorError;
use crate::message::{MessageKind, MessageMeta, MessageSink};
use crate::model::{
    AlertKind, AlertSeverity, Blocker, BlockerType, ResolutionStrategy, Task,
};
use crate::registry::{BlockerOutcome, SharedRegistry, TaskRegistry};
use crate::shutdown::ShutdownSignal;

/// Messages composed during a tick, delivered after the registry lock drops.
type Outbox = Vec<(String, MessageMeta)>;

/// The monitor component. Cheap to share behind an `Arc`; `spawn` starts the
/// three loops.
pub struct ProgressMonitor {
    registry: SharedRegistry,
    engine: AssignmentEngine,
    sink: Arc<dyn MessageSink>,
    config: MonitorConfig,
}

impl ProgressMonitor {
    pub fn new(
        registry: SharedRegistry,
        engine: AssignmentEngine,
        sink: Arc<dyn MessageSink>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            registry,
            engine,
            sink,
            config,
        }
    }

    /// One liveness pass. Returns the reports it computed, newest state
    /// first by task id order.
    pub fn liveness_tick(&self) -> Vec<ProgressReport> {
        self.liveness_tick_at(Utc::now())
    }

    pub fn liveness_tick_at(&self, now: DateTime<Utc>) -> Vec<ProgressReport> {
        let mut reports = Vec::new();
        let Ok(mut registry) = self.registry.lock() else {
            warn!("liveness tick skipped: registry lock poisoned");
            return reports;
        };

        let snapshot: Vec<Task> = registry.active_tasks().into_iter().cloned().collect();
        for task in snapshot {
            let Some(report) = progress::assess(&task, now) else {
                continue;
            };

            match report.risk {
                RiskLevel::High => {
                    registry.push_alert(
                        AlertKind::SlowProgress,
                        AlertSeverity::Warning,
                        format!(
                            "task {} is behind: {:.0}% done vs {:.0}% expected",
                            task.id, report.actual_progress, report.expected_progress
                        ),
                        Some(&task.id),
                        task.assigned_to.as_deref(),
                    );
                }
                RiskLevel::Critical => {
                    registry.push_alert(
                        AlertKind::SlowProgress,
                        AlertSeverity::Critical,
                        format!(
                            "task {} is critically behind: {:.0}% done vs {:.0}% expected",
                            task.id, report.actual_progress, report.expected_progress
                        ),
                        Some(&task.id),
                        task.assigned_to.as_deref(),
                    );
                }
                RiskLevel::Low | RiskLevel::Medium => {}
            }

            if let Some(deadline) =
                progress::effective_deadline(&task, self.config.deadline_buffer)
            {
                if now > deadline {
                    registry.push_alert(
                        AlertKind::MissedDeadline,
                        AlertSeverity::Critical,
                        format!("task {} missed its deadline ({deadline})", task.id),
                        Some(&task.id),
                        task.assigned_to.as_deref(),
                    );
                } else if deadline.signed_duration_since(now).num_seconds() < 3600 {
                    registry.push_alert(
                        AlertKind::DeadlineApproaching,
                        AlertSeverity::Warning,
                        format!("task {} is within an hour of its deadline", task.id),
                        Some(&task.id),
                        task.assigned_to.as_deref(),
                    );
                }
            }

            reports.push(report);
        }
        reports
    }

    /// One deep-scan pass: run the three detectors over active tasks and
    /// attempt remediation for each new blocker. Returns new blocker ids.
    pub fn deep_scan_tick(&self) -> Vec<String> {
        self.deep_scan_tick_at(Utc::now())
    }

    pub fn deep_scan_tick_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut new_blockers = Vec::new();
        let mut outbox: Outbox = Vec::new();
        {
            let Ok(mut registry) = self.registry.lock() else {
                warn!("deep scan skipped: registry lock poisoned");
                return new_blockers;
            };

            let snapshot: Vec<Task> = registry.active_tasks().into_iter().cloned().collect();
            for task in snapshot {
                if let Err(e) = self.scan_task(&mut registry, &task, now, &mut new_blockers, &mut outbox)
                {
                    warn!(task_id = %task.id, error = %e, "deep scan skipped task");
                }
            }
        }
        self.flush(outbox);
        new_blockers
    }

    fn scan_task(
        &self,
        registry: &mut TaskRegistry,
        task: &Task,
        now: DateTime<Utc>,
        new_blockers: &mut Vec<String>,
        outbox: &mut Outbox,
    ) -> Result<(), OrchestratorError> {
        // Dependency detector.
        let check = detect::check_dependencies(registry, task);
        for dangling in &check.dangling {
            warn!(task_id = %task.id, dependency = %dangling, "dangling dependency reference");
            registry.push_alert(
                AlertKind::DependencyViolation,
                AlertSeverity::Error,
                format!("task {} references unknown dependency {}", task.id, dangling),
                Some(&task.id),
                None,
            );
        }
        if check.is_blocked() {
            let mut waiting: Vec<&str> = check.incomplete.iter().map(String::as_str).collect();
            waiting.extend(check.dangling.iter().map(String::as_str));
            let draft = Blocker::new("", &task.id, BlockerType::Dependency, "waiting on dependencies")
                .with_description(format!("incomplete dependencies: {}", waiting.join(", ")))
                .with_impact("task cannot proceed until upstream work completes");
            self.insert_and_remediate(registry, draft, task, new_blockers, outbox)?;
        }

        // Resource detector.
        if let Some(agent_id) = detect::unavailable_agent(registry, task) {
            registry.push_alert(
                AlertKind::ResourceBottleneck,
                AlertSeverity::Warning,
                format!("agent {agent_id} is unavailable with assigned work"),
                Some(&task.id),
                Some(&agent_id),
            );
            let draft = Blocker::new("", &task.id, BlockerType::Resource, "assigned agent unavailable")
                .with_description(format!("agent {agent_id} is not available"))
                .with_impact("task has an assignee who cannot work on it");
            self.insert_and_remediate(registry, draft, task, new_blockers, outbox)?;
        }

        // Technical stall detector.
        if detect::is_stalled(task, now, self.config.slow_progress_threshold) {
            let draft = Blocker::new("", &task.id, BlockerType::Technical, "no progress recorded")
                .with_description(format!(
                    "zero velocity for more than {}h",
                    self.config.slow_progress_threshold.as_secs() / 3600
                ))
                .with_impact("work appears stuck");
            self.insert_and_remediate(registry, draft, task, new_blockers, outbox)?;
        }
        Ok(())
    }

    /// Raise a decision-needed blocker for a task. Always remediated by
    /// escalation to the human channel, idempotently per blocker.
    pub fn request_decision(
        &self,
        task_id: &str,
        question: &str,
    ) -> Result<String, OrchestratorError> {
        let mut outbox: Outbox = Vec::new();
        let id = {
            let mut registry = self
                .registry
                .lock()
                .map_err(|_| OrchestratorError::Send("registry lock poisoned".to_string()))?;
            let task = registry
                .task(task_id)
                .cloned()
                .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?;
            let draft = Blocker::new("", task_id, BlockerType::DecisionNeeded, question)
                .with_impact("blocked until a human decides");
            let mut ids = Vec::new();
            self.insert_and_remediate(&mut registry, draft, &task, &mut ids, &mut outbox)?;
            match ids.into_iter().next() {
                Some(id) => id,
                // Dedup hit: reuse the open blocker.
                None => registry
                    .unresolved_blockers(task_id)
                    .iter()
                    .find(|b| b.blocker_type == BlockerType::DecisionNeeded)
                    .map(|b| b.id.clone())
                    .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))?,
            }
        };
        self.flush(outbox);
        Ok(id)
    }

    fn insert_and_remediate(
        &self,
        registry: &mut TaskRegistry,
        draft: Blocker,
        task: &Task,
        new_blockers: &mut Vec<String>,
        outbox: &mut Outbox,
    ) -> Result<(), OrchestratorError> {
        let blocker_type = draft.blocker_type;
        match registry.add_blocker(draft)? {
            BlockerOutcome::Existing(_) => Ok(()),
            BlockerOutcome::New(id) => {
                info!(task_id = %task.id, blocker_id = %id, blocker_type = blocker_type.as_str(), "blocker detected");
                registry.push_alert(
                    AlertKind::BlockerDetected,
                    AlertSeverity::Warning,
                    format!("{} blocker on task {}", blocker_type.as_str(), task.id),
                    Some(&task.id),
                    task.assigned_to.as_deref(),
                );
                new_blockers.push(id.clone());
                if let Err(e) = self.remediate(registry, &id, task, outbox) {
                    warn!(blocker_id = %id, error = %e, "remediation attempt failed");
                }
                Ok(())
            }
        }
    }

    /// Attempt one remediation for a blocker. The mutating strategy
    /// (reassignment) runs entirely under the caller's registry lock; the
    /// others only queue messages.
    fn remediate(
        &self,
        registry: &mut TaskRegistry,
        blocker_id: &str,
        task: &Task,
        outbox: &mut Outbox,
    ) -> Result<(), OrchestratorError> {
        let blocker_type = registry
            .blocker(blocker_id)
            .ok_or_else(|| OrchestratorError::BlockerNotFound(blocker_id.to_string()))?
            .blocker_type;
        let plan = remediate::plan_for(blocker_type);
        registry.set_resolution_strategy(blocker_id, plan.strategy)?;
        debug!(
            blocker_id,
            strategy = plan.strategy.as_str(),
            estimated_minutes = plan.estimated_minutes,
            confidence = plan.confidence,
            "remediation planned"
        );

        match plan.strategy {
            ResolutionStrategy::ProvideGuidance => {
                let content = remediate::guidance_message(task.task_type, blocker_type);
                outbox.push((
                    content,
                    MessageMeta::with_context(
                        MessageKind::Guidance,
                        json!({ "task_id": task.id, "blocker_id": blocker_id }),
                    ),
                ));
            }
            ResolutionStrategy::AddResources => {
                let content = format!(
                    "Task {} is waiting on upstream work. Consider pulling help \
                     onto its dependencies so it can unblock sooner.",
                    task.id
                );
                outbox.push((
                    content,
                    MessageMeta::with_context(
                        MessageKind::Guidance,
                        json!({ "task_id": task.id, "blocker_id": blocker_id }),
                    ),
                ));
            }
            ResolutionStrategy::ReassignTask => {
                self.try_reassign(registry, blocker_id, task)?;
            }
            ResolutionStrategy::EscalateToHuman => {
                if registry.escalate_blocker(blocker_id)? {
                    let title = registry
                        .blocker(blocker_id)
                        .map(|b| b.title.clone())
                        .unwrap_or_default();
                    outbox.push((
                        format!("Decision needed on task {}: {}", task.id, title),
                        MessageMeta::with_context(
                            MessageKind::Escalation,
                            json!({ "task_id": task.id, "blocker_id": blocker_id }),
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Move a blocked task to the best alternative agent, atomically.
    ///
    /// On success the blocker resolves and the task re-enters its previous
    /// in-flight status with the new agent. When no alternative exists the
    /// blocker stays open for the next scan.
    fn try_reassign(
        &self,
        registry: &mut TaskRegistry,
        blocker_id: &str,
        task: &Task,
    ) -> Result<(), OrchestratorError> {
        let current_agent = task.assigned_to.clone();
        let agents: Vec<_> = registry
            .snapshot_agents()
            .into_iter()
            .filter(|a| Some(&a.agent_id) != current_agent.as_ref() && a.remaining_slots() > 0)
            .collect();
        let tasks = registry.snapshot_tasks();
        let history = registry.performance_ledger();

        match self
            .engine
            .find_best_assignment(task, &agents, &tasks, &history)
        {
            Some(best) => {
                registry.transfer(&task.id, &best.agent_id)?;
                registry.resolve_blocker(blocker_id)?;
                info!(
                    task_id = %task.id,
                    from = current_agent.as_deref().unwrap_or("-"),
                    to = %best.agent_id,
                    "task reassigned"
                );
                Ok(())
            }
            None => {
                info!(task_id = %task.id, blocker_id, "no alternative agent; blocker left open");
                Ok(())
            }
        }
    }

    /// One alert-processing pass: forward unescalated critical alerts to the
    /// human channel, flipping each alert's `escalated` flag exactly once.
    pub fn alert_tick(&self) -> usize {
        let mut outbox: Outbox = Vec::new();
        {
            let Ok(mut registry) = self.registry.lock() else {
                warn!("alert tick skipped: registry lock poisoned");
                return 0;
            };
            for id in registry.unescalated_critical_alerts() {
                if !registry.mark_alert_escalated(&id) {
                    continue;
                }
                if let Some(alert) = registry.alerts().find(|a| a.id == id) {
                    outbox.push((
                        format!("[critical] {}", alert.message),
                        MessageMeta::with_context(
                            MessageKind::Alert,
                            json!({
                                "alert_id": alert.id,
                                "task_id": alert.task_id,
                                "agent_id": alert.agent_id,
                            }),
                        ),
                    ));
                }
            }
        }
        let count = outbox.len();
        self.flush(outbox);
        count
    }

    fn flush(&self, outbox: Outbox) {
        for (content, meta) in outbox {
            if let Err(e) = self.sink.send_message(&content, &meta) {
                warn!(error = %e, "outbound message failed");
            }
        }
    }

    /// Start the three monitor loops. The returned handle stops them.
    pub fn spawn(self: Arc<Self>, shutdown: ShutdownSignal) -> MonitorHandle {
        let liveness = {
            let monitor = Arc::clone(&self);
            spawn_loop(
                "liveness",
                monitor.config.monitoring_interval,
                shutdown.clone(),
                move || {
                    monitor.liveness_tick();
                },
            )
        };
        let deep_scan = {
            let monitor = Arc::clone(&self);
            spawn_loop(
                "deep-scan",
                monitor.config.progress_check_interval,
                shutdown.clone(),
                move || {
                    monitor.deep_scan_tick();
                },
            )
        };
        let alerts = {
            let monitor = Arc::clone(&self);
            spawn_loop(
                "alerts",
                monitor.config.monitoring_interval,
                shutdown.clone(),
                move || {
                    monitor.alert_tick();
                },
            )
        };
        MonitorHandle {
            shutdown,
            handles: vec![liveness, deep_scan, alerts],
        }
    }
}

/// Handle over the running monitor loops.
pub struct MonitorHandle {
    shutdown: ShutdownSignal,
    handles: Vec<thread::JoinHandle<()>>,
}

impl MonitorHandle {
    /// Signal shutdown and wait for all loops to exit.
    pub fn stop(mut self) {
        self.shutdown.trigger();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn spawn_loop(
    name: &'static str,
    interval: Duration,
    shutdown: ShutdownSignal,
    tick: impl Fn() + Send + 'static,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let start = Instant::now();
        let mut next = interval;
        let poll = interval.min(Duration::from_millis(100)).max(Duration::from_millis(1));
        loop {
            if shutdown.is_shutdown() {
                break;
            }
            if start.elapsed() >= next {
                tick();
                next += interval;
            }
            thread::sleep(poll);
        }
        debug!(name, "monitor loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MemorySink;
    use crate::model::{AgentCapability, TaskPriority, TaskStatus, TaskType};
    use chrono::Duration as ChronoDuration;

    fn setup() -> (SharedRegistry, Arc<MemorySink>, ProgressMonitor) {
        let registry = TaskRegistry::new().into_shared();
        let sink = Arc::new(MemorySink::new());
        let monitor = ProgressMonitor::new(
            Arc::clone(&registry),
            AssignmentEngine::default(),
            sink.clone() as Arc<dyn MessageSink>,
            MonitorConfig::default(),
        );
        (registry, sink, monitor)
    }

    fn add_agent(registry: &SharedRegistry, id: &str, caps: &[TaskType]) {
        registry.lock().unwrap().upsert_agent(
            AgentCapability::new(id, id, "backend-dev")
                .with_capabilities(caps.iter().copied())
                .with_max_workload(3),
        );
    }

    fn add_active_task(registry: &SharedRegistry, agent: &str, hours_ago: i64, effort: f64) -> String {
        let mut registry = registry.lock().unwrap();
        let id = registry.add_task(Task::new(
            "",
            "build the thing",
            TaskType::CodeGeneration,
            TaskPriority::High,
            effort,
        ));
        registry.assign(&id, agent).unwrap();
        registry.start(&id).unwrap();
        {
            // Backdate the start for elapsed-time scenarios.
            let now = Utc::now() - ChronoDuration::hours(hours_ago);
            let task = registry.task(&id).unwrap().clone();
            let mut task = task;
            task.assigned_at = Some(now);
            task.started_at = Some(now);
            registry.add_task(task);
        }
        id
    }

    #[test]
    fn liveness_raises_critical_slow_progress() {
        let (registry, _sink, monitor) = setup();
        add_agent(&registry, "agent-a", &[TaskType::CodeGeneration]);
        add_active_task(&registry, "agent-a", 3, 1.0);

        let reports = monitor.liveness_tick();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].risk, RiskLevel::Critical);

        let registry = registry.lock().unwrap();
        assert!(registry.alerts().any(|a| a.kind == AlertKind::SlowProgress
            && a.severity == AlertSeverity::Critical));
        // 3h elapsed also blows the 1.5h implicit deadline.
        assert!(registry.alerts().any(|a| a.kind == AlertKind::MissedDeadline));
    }

    #[test]
    fn repeated_ticks_do_not_stack_alerts() {
        let (registry, sink, monitor) = setup();
        add_agent(&registry, "agent-a", &[TaskType::CodeGeneration]);
        add_active_task(&registry, "agent-a", 3, 1.0);

        // The same stalled state across two ticks raises each alert once.
        monitor.liveness_tick();
        monitor.liveness_tick();
        {
            let registry = registry.lock().unwrap();
            assert_eq!(
                registry
                    .alerts()
                    .filter(|a| a.kind == AlertKind::SlowProgress)
                    .count(),
                1
            );
            assert_eq!(
                registry
                    .alerts()
                    .filter(|a| a.kind == AlertKind::MissedDeadline)
                    .count(),
                1
            );
        }
        // One forward per incident, not per tick.
        assert_eq!(monitor.alert_tick(), 2);
        assert_eq!(monitor.alert_tick(), 0);
        assert_eq!(sink.count_of(MessageKind::Alert), 2);
    }

    #[test]
    fn deep_scan_raises_stall_blocker_once() {
        let (registry, _sink, monitor) = setup();
        add_agent(&registry, "agent-a", &[TaskType::CodeGeneration]);
        let id = add_active_task(&registry, "agent-a", 3, 8.0);

        let first = monitor.deep_scan_tick();
        assert_eq!(first.len(), 1);
        {
            let registry = registry.lock().unwrap();
            let task = registry.task(&id).unwrap();
            assert_eq!(task.status, TaskStatus::Blocked);
            assert!(registry.has_unresolved_blocker(&id, BlockerType::Technical));
        }

        // Second scan on unchanged state: dedup, no new blocker.
        let second = monitor.deep_scan_tick();
        assert!(second.is_empty());
        let registry = registry.lock().unwrap();
        assert_eq!(registry.unresolved_blockers(&id).len(), 1);
    }

    #[test]
    fn stall_remediation_sends_guidance() {
        let (registry, sink, monitor) = setup();
        add_agent(&registry, "agent-a", &[TaskType::CodeGeneration]);
        add_active_task(&registry, "agent-a", 3, 8.0);

        monitor.deep_scan_tick();
        assert_eq!(sink.count_of(MessageKind::Guidance), 1);
    }

    #[test]
    fn dependency_blocker_for_incomplete_upstream() {
        let (registry, _sink, monitor) = setup();
        add_agent(&registry, "agent-a", &[TaskType::CodeGeneration]);
        let (upstream, downstream) = {
            let mut reg = registry.lock().unwrap();
            let upstream = reg.add_task(Task::new(
                "",
                "upstream",
                TaskType::CodeGeneration,
                TaskPriority::High,
                4.0,
            ));
            let downstream = reg.add_task(
                Task::new(
                    "",
                    "downstream",
                    TaskType::CodeGeneration,
                    TaskPriority::High,
                    4.0,
                )
                .with_dependencies([upstream.clone()]),
            );
            reg.assign(&downstream, "agent-a").unwrap();
            (upstream, downstream)
        };

        monitor.deep_scan_tick();
        {
            let reg = registry.lock().unwrap();
            assert!(reg.has_unresolved_blocker(&downstream, BlockerType::Dependency));
        }

        // Upstream completes; the blocker can be resolved and the task
        // returns to Assigned.
        {
            let mut reg = registry.lock().unwrap();
            reg.assign(&upstream, "agent-a").unwrap();
            reg.complete(&upstream).unwrap();
            let blocker_id = reg.unresolved_blockers(&downstream)[0].id.clone();
            reg.resolve_blocker(&blocker_id).unwrap();
            assert_eq!(reg.task(&downstream).unwrap().status, TaskStatus::Assigned);
        }
    }

    #[test]
    fn resource_blocker_reassigns_to_available_agent() {
        let (registry, _sink, monitor) = setup();
        add_agent(&registry, "agent-a", &[TaskType::CodeGeneration]);
        add_agent(&registry, "agent-b", &[TaskType::CodeGeneration]);
        let id = {
            let mut reg = registry.lock().unwrap();
            let id = reg.add_task(Task::new(
                "",
                "build",
                TaskType::CodeGeneration,
                TaskPriority::High,
                4.0,
            ));
            reg.assign(&id, "agent-a").unwrap();
            reg.record_heartbeat("agent-a", false).unwrap();
            id
        };

        monitor.deep_scan_tick();

        let reg = registry.lock().unwrap();
        let task = reg.task(&id).unwrap();
        assert_eq!(task.assigned_to.as_deref(), Some("agent-b"));
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(reg.agent("agent-b").unwrap().current_workload, 1);
        assert_eq!(reg.agent("agent-a").unwrap().current_workload, 0);
        // The resource blocker resolved as part of the reassignment.
        assert!(!reg.has_unresolved_blocker(&id, BlockerType::Resource));
    }

    #[test]
    fn resource_blocker_stays_open_without_alternative() {
        let (registry, _sink, monitor) = setup();
        add_agent(&registry, "agent-a", &[TaskType::CodeGeneration]);
        let id = {
            let mut reg = registry.lock().unwrap();
            let id = reg.add_task(Task::new(
                "",
                "build",
                TaskType::CodeGeneration,
                TaskPriority::High,
                4.0,
            ));
            reg.assign(&id, "agent-a").unwrap();
            reg.record_heartbeat("agent-a", false).unwrap();
            id
        };

        monitor.deep_scan_tick();

        let reg = registry.lock().unwrap();
        assert!(reg.has_unresolved_blocker(&id, BlockerType::Resource));
        assert_eq!(reg.task(&id).unwrap().assigned_to.as_deref(), Some("agent-a"));
    }

    #[test]
    fn decision_blocker_always_escalates_once() {
        let (registry, sink, monitor) = setup();
        add_agent(&registry, "agent-a", &[TaskType::CodeGeneration]);
        let id = {
            let mut reg = registry.lock().unwrap();
            let id = reg.add_task(Task::new(
                "",
                "build",
                TaskType::CodeGeneration,
                TaskPriority::High,
                4.0,
            ));
            reg.assign(&id, "agent-a").unwrap();
            id
        };

        let blocker_id = monitor.request_decision(&id, "Ship behind a flag?").unwrap();
        {
            let reg = registry.lock().unwrap();
            let blocker = reg.blocker(&blocker_id).unwrap();
            assert!(blocker.escalated_to_human);
            assert_eq!(
                blocker.resolution_strategy,
                Some(ResolutionStrategy::EscalateToHuman)
            );
        }
        assert_eq!(sink.count_of(MessageKind::Escalation), 1);

        // A repeated request hits the dedup path and does not re-escalate.
        let again = monitor.request_decision(&id, "Ship behind a flag?").unwrap();
        assert_eq!(again, blocker_id);
        assert_eq!(sink.count_of(MessageKind::Escalation), 1);
    }

    #[test]
    fn critical_alerts_escalate_exactly_once() {
        let (registry, sink, monitor) = setup();
        registry.lock().unwrap().push_alert(
            AlertKind::MissedDeadline,
            AlertSeverity::Critical,
            "task task-1 missed its deadline",
            Some("task-1"),
            None,
        );

        assert_eq!(monitor.alert_tick(), 1);
        assert_eq!(monitor.alert_tick(), 0);
        assert_eq!(sink.count_of(MessageKind::Alert), 1);
    }

    #[test]
    fn loops_stop_on_shutdown() {
        let monitor = Arc::new(ProgressMonitor::new(
            TaskRegistry::new().into_shared(),
            AssignmentEngine::default(),
            Arc::new(MemorySink::new()) as Arc<dyn MessageSink>,
            MonitorConfig {
                monitoring_interval: Duration::from_millis(10),
                progress_check_interval: Duration::from_millis(10),
                ..MonitorConfig::default()
            },
        ));
        let shutdown = ShutdownSignal::new();
        let handle = monitor.spawn(shutdown.clone());
        std::thread::sleep(Duration::from_millis(50));
        handle.stop();
        assert!(shutdown.is_shutdown());
    }
}
