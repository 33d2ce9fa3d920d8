//! Sprint planner: a forward-only, human-in-the-loop phase machine.
//!
//! The conversation walks `ObjectiveSetting → TaskBreakdown → Estimation →
//! AssignmentPlanning → CapacityValidation → Finalization`. A phase advances
//! only when the human reply parses; anything else earns a clarification
//! prompt and the phase stays put. Only one session may be in progress at a
//! time; a second `initiate` is rejected.

mod breakdown;
mod capacity;
mod estimate;
mod parse;

pub use breakdown::{custom_tasks, expand_objective, template_for, TemplateStep};
pub use capacity::{compute_capacity, CapacitySnapshot, UtilizationBand};
pub use estimate::{summarize, EstimationSummary};
pub use parse::{
    parse_adjustments, parse_objectives, strip_bullet, Adjustment, EffortEstimator,
    KeywordEstimator, ObjectiveCategory,
};

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::assignment::AssignmentEngine;
use crate::config::PlannerConfig;
use crate::error::OrchestratorError;
use crate::message::{MessageKind, MessageMeta, MessageSink};
use crate::model::{SprintObjective, Task};
use crate::registry::SharedRegistry;

/// The planning phases, in conversation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PlanningPhase {
    ObjectiveSetting,
    TaskBreakdown,
    Estimation,
    AssignmentPlanning,
    CapacityValidation,
    Finalization,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

/// One assignment the planner intends to apply at finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedAssignment {
    pub task_id: String,
    pub agent_id: String,
    pub hours: f64,
}

/// Live state of a planning conversation.
#[derive(Debug)]
pub struct PlanningSession {
    pub phase: PlanningPhase,
    pub state: SessionState,
    pub objective_ids: Vec<String>,
    pub task_ids: Vec<String>,
    /// Append-only log of decisions and notes.
    pub decisions: Vec<String>,
    capacity: CapacitySnapshot,
    drafts: Vec<Task>,
    categories: Vec<ObjectiveCategory>,
    planned: Vec<PlannedAssignment>,
}

impl PlanningSession {
    fn open(capacity: CapacitySnapshot) -> Self {
        Self {
            phase: PlanningPhase::ObjectiveSetting,
            state: SessionState::InProgress,
            objective_ids: Vec::new(),
            task_ids: Vec::new(),
            decisions: Vec::new(),
            capacity,
            drafts: Vec::new(),
            categories: Vec::new(),
            planned: Vec::new(),
        }
    }

    pub fn capacity(&self) -> &CapacitySnapshot {
        &self.capacity
    }

    pub fn planned_assignments(&self) -> &[PlannedAssignment] {
        &self.planned
    }
}

/// A finalized plan, kept in the immutable planning history.
#[derive(Debug, Clone)]
pub struct CompletedPlan {
    pub objective_ids: Vec<String>,
    pub task_ids: Vec<String>,
    pub assignments: Vec<PlannedAssignment>,
    pub decisions: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// The planner component.
pub struct SprintPlanner {
    registry: SharedRegistry,
    engine: AssignmentEngine,
    sink: Arc<dyn MessageSink>,
    config: PlannerConfig,
    estimator: Box<dyn EffortEstimator>,
    session: Option<PlanningSession>,
    history: Vec<CompletedPlan>,
}

impl SprintPlanner {
    pub fn new(
        registry: SharedRegistry,
        engine: AssignmentEngine,
        sink: Arc<dyn MessageSink>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            registry,
            engine,
            sink,
            config,
            estimator: Box::new(KeywordEstimator),
            session: None,
            history: Vec::new(),
        }
    }

    /// Swap the estimation heuristics.
    pub fn with_estimator(mut self, estimator: Box<dyn EffortEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn session(&self) -> Option<&PlanningSession> {
        self.session.as_ref()
    }

    pub fn history(&self) -> &[CompletedPlan] {
        &self.history
    }

    /// Open a planning session and send the capacity-aware kickoff prompt.
    ///
    /// Rejected while another session is in progress or paused.
    pub fn initiate(&mut self) -> Result<(), OrchestratorError> {
        if self.session.as_ref().is_some_and(|s| {
            matches!(s.state, SessionState::InProgress | SessionState::Paused)
        }) {
            return Err(OrchestratorError::SessionActive);
        }

        let capacity = {
            let registry = self.lock_registry()?;
            compute_capacity(&registry, &self.config)
        };
        let mut lines: Vec<String> = capacity
            .per_agent
            .iter()
            .map(|(agent, hours)| format!("- {agent}: {hours:.1}h available"))
            .collect();
        lines.sort();
        let prompt = format!(
            "Starting sprint planning ({} days). Team capacity: {:.1}h total.\n{}\n\
             What are the objectives for this sprint? One per line.",
            self.config.default_sprint_days,
            capacity.total(),
            lines.join("\n")
        );
        self.send(&prompt, MessageKind::PlanningPrompt, json!({"phase": "objective_setting"}))?;
        self.session = Some(PlanningSession::open(capacity));
        info!("planning session opened");
        Ok(())
    }

    /// Cancel the active session, if any.
    pub fn cancel(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.state = SessionState::Cancelled;
            info!("planning session cancelled");
        }
    }

    /// Pause the active session; replies are rejected until `resume`.
    pub fn pause(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.state == SessionState::InProgress {
                session.state = SessionState::Paused;
            }
        }
    }

    pub fn resume(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.state == SessionState::Paused {
                session.state = SessionState::InProgress;
            }
        }
    }

    /// Feed one human reply into the phase machine.
    ///
    /// Returns the phase after processing. Unparseable input sends a
    /// clarification prompt and leaves the phase unchanged.
    pub fn handle_reply(&mut self, text: &str) -> Result<PlanningPhase, OrchestratorError> {
        let mut session = self
            .session
            .take()
            .ok_or(OrchestratorError::NoActiveSession)?;
        if session.state != SessionState::InProgress {
            self.session = Some(session);
            return Err(OrchestratorError::NoActiveSession);
        }

        let result = match session.phase {
            PlanningPhase::ObjectiveSetting => self.on_objectives(&mut session, text),
            PlanningPhase::TaskBreakdown => self.on_breakdown(&mut session, text),
            PlanningPhase::Estimation => self.on_estimation(&mut session, text),
            PlanningPhase::AssignmentPlanning => self.on_assignment_planning(&mut session, text),
            PlanningPhase::CapacityValidation => self.on_capacity_validation(&mut session, text),
            // Nothing left to discuss once finalized.
            PlanningPhase::Finalization => Ok(PlanningPhase::Finalization),
        };

        match result {
            Ok(phase) => {
                if session.state == SessionState::Completed {
                    self.history.push(CompletedPlan {
                        objective_ids: session.objective_ids.clone(),
                        task_ids: session.task_ids.clone(),
                        assignments: session.planned.clone(),
                        decisions: session.decisions.clone(),
                        completed_at: Utc::now(),
                    });
                } else {
                    self.session = Some(session);
                }
                Ok(phase)
            }
            Err(e) => {
                self.session = Some(session);
                Err(e)
            }
        }
    }

    // ---- phase handlers -------------------------------------------------

    fn on_objectives(
        &mut self,
        session: &mut PlanningSession,
        text: &str,
    ) -> Result<PlanningPhase, OrchestratorError> {
        let drafts = parse_objectives(text, self.estimator.as_ref());
        if drafts.is_empty() {
            return self.clarify(
                session,
                "I couldn't find any objectives in that. Please list one objective per line.",
            );
        }

        let mut objectives = Vec::new();
        {
            let mut registry = self.lock_registry()?;
            for draft in &drafts {
                let mut objective =
                    SprintObjective::new("", draft.title.clone(), draft.priority, draft.effort);
                objective.acceptance_criteria = draft.acceptance_criteria.clone();
                let id = registry.add_objective(objective);
                session.objective_ids.push(id.clone());
                session.categories.push(draft.category);
                if let Some(obj) = registry.objective(&id) {
                    objectives.push(obj.clone());
                }
            }
        }

        session.drafts = objectives
            .iter()
            .zip(session.categories.iter())
            .flat_map(|(objective, category)| expand_objective(objective, *category))
            .collect();
        session
            .decisions
            .push(format!("captured {} objectives", objectives.len()));

        let mut proposal = String::from("Proposed task breakdown:\n");
        for draft in &session.drafts {
            proposal.push_str(&format!(
                "- {} [{}] {:.0}h\n",
                draft.title,
                draft.task_type.as_str(),
                draft.estimated_effort
            ));
        }
        proposal.push_str(
            "Reply \"accept\" to use this breakdown, \"modify\" to see it again, \
             or send your own task list (one per line).",
        );
        self.send(&proposal, MessageKind::PlanningPrompt, json!({"phase": "task_breakdown"}))?;
        session.phase = PlanningPhase::TaskBreakdown;
        Ok(session.phase)
    }

    fn on_breakdown(
        &mut self,
        session: &mut PlanningSession,
        text: &str,
    ) -> Result<PlanningPhase, OrchestratorError> {
        let normalized = text.trim().to_lowercase();
        if normalized == "accept" {
            let drafts = std::mem::take(&mut session.drafts);
            self.materialize(session, drafts)?;
            session.decisions.push("breakdown accepted".to_string());
            return self.send_estimation_review(session);
        }
        if normalized == "modify" {
            let mut proposal = String::from("Current proposal:\n");
            for draft in &session.drafts {
                proposal.push_str(&format!("- {}\n", draft.title));
            }
            proposal.push_str("Send a replacement task list (one per line) or \"accept\".");
            self.send(&proposal, MessageKind::PlanningPrompt, json!({"phase": "task_breakdown"}))?;
            return Ok(session.phase);
        }

        let lines: Vec<String> = text.lines().filter_map(strip_bullet).collect();
        let looks_like_list =
            lines.len() >= 2 || text.trim_start().starts_with(['-', '*', '•']);
        if looks_like_list && !lines.is_empty() {
            let objectives = {
                let registry = self.lock_registry()?;
                session
                    .objective_ids
                    .iter()
                    .filter_map(|id| registry.objective(id).cloned())
                    .collect::<Vec<_>>()
            };
            let drafts = custom_tasks(&lines, &objectives, self.estimator.as_ref());
            self.materialize(session, drafts)?;
            session
                .decisions
                .push(format!("custom task list of {} accepted", lines.len()));
            return self.send_estimation_review(session);
        }

        self.clarify(
            session,
            "Reply \"accept\", \"modify\", or send a task list with one task per line.",
        )
    }

    fn on_estimation(
        &mut self,
        session: &mut PlanningSession,
        text: &str,
    ) -> Result<PlanningPhase, OrchestratorError> {
        let normalized = text.trim().to_lowercase();
        if is_approval(&normalized) {
            session.decisions.push("estimates approved".to_string());
            let report = self.plan_assignments(session)?;
            self.send(
                &report,
                MessageKind::PlanningPrompt,
                json!({"phase": "assignment_planning"}),
            )?;
            session.phase = PlanningPhase::AssignmentPlanning;
            return Ok(session.phase);
        }
        if normalized.contains("detail") {
            let tasks = self.session_tasks(session)?;
            self.send(
                &estimate::render_walkthrough(&tasks),
                MessageKind::PlanningPrompt,
                json!({"phase": "estimation"}),
            )?;
            return Ok(session.phase);
        }

        let adjustments = parse_adjustments(text);
        if !adjustments.is_empty() {
            let mut applied = 0usize;
            let mut unmatched = Vec::new();
            {
                let mut registry = self.lock_registry()?;
                for adjustment in &adjustments {
                    let fragment = adjustment.title_fragment.to_lowercase();
                    let target = session.task_ids.iter().find(|id| {
                        registry
                            .task(id)
                            .map(|t| t.title.to_lowercase().contains(&fragment))
                            .unwrap_or(false)
                    });
                    match target {
                        Some(id) => {
                            registry.set_estimated_effort(id, adjustment.hours)?;
                            applied += 1;
                        }
                        None => unmatched.push(adjustment.title_fragment.clone()),
                    }
                }
            }
            session
                .decisions
                .push(format!("{applied} estimate adjustments applied"));
            if !unmatched.is_empty() {
                warn!(?unmatched, "estimate adjustments with no matching task");
            }
            return self.send_estimation_review(session);
        }

        self.clarify(
            session,
            "Reply \"approve\", \"details\", or adjust with lines like \"task title: 4h\".",
        )
    }

    fn on_assignment_planning(
        &mut self,
        session: &mut PlanningSession,
        text: &str,
    ) -> Result<PlanningPhase, OrchestratorError> {
        let normalized = text.trim().to_lowercase();
        if is_approval(&normalized) {
            session.decisions.push("assignment plan approved".to_string());
            let report = self.capacity_report(session);
            self.send(
                &report,
                MessageKind::PlanningPrompt,
                json!({"phase": "capacity_validation"}),
            )?;
            session.phase = PlanningPhase::CapacityValidation;
            return Ok(session.phase);
        }
        if normalized.contains("revise") {
            let report = self.plan_assignments(session)?;
            self.send(
                &report,
                MessageKind::PlanningPrompt,
                json!({"phase": "assignment_planning"}),
            )?;
            return Ok(session.phase);
        }
        self.clarify(session, "Reply \"approve\" to continue or \"revise\" to replan.")
    }

    fn on_capacity_validation(
        &mut self,
        session: &mut PlanningSession,
        text: &str,
    ) -> Result<PlanningPhase, OrchestratorError> {
        let normalized = text.trim().to_lowercase();
        if normalized.contains("confirm") || normalized.contains("finalize") || is_approval(&normalized)
        {
            return self.finalize(session);
        }
        self.clarify(session, "Reply \"confirm\" to finalize the sprint plan.")
    }

    // ---- helpers --------------------------------------------------------

    fn finalize(
        &mut self,
        session: &mut PlanningSession,
    ) -> Result<PlanningPhase, OrchestratorError> {
        let mut applied = 0usize;
        {
            let mut registry = self.lock_registry()?;
            for planned in &session.planned {
                match registry.assign(&planned.task_id, &planned.agent_id) {
                    Ok(()) => applied += 1,
                    Err(e) => {
                        warn!(
                            task_id = %planned.task_id,
                            agent_id = %planned.agent_id,
                            error = %e,
                            "planned assignment skipped"
                        );
                    }
                }
            }
        }
        session
            .decisions
            .push(format!("finalized with {applied} assignments"));
        session.phase = PlanningPhase::Finalization;
        session.state = SessionState::Completed;
        self.send(
            &format!(
                "Sprint plan finalized: {} objectives, {} tasks, {applied} assignments applied.",
                session.objective_ids.len(),
                session.task_ids.len()
            ),
            MessageKind::PlanningPrompt,
            json!({"phase": "finalization"}),
        )?;
        info!(applied, "planning session finalized");
        Ok(PlanningPhase::Finalization)
    }

    /// Materialize task drafts into the registry and remember their ids.
    fn materialize(
        &mut self,
        session: &mut PlanningSession,
        drafts: Vec<Task>,
    ) -> Result<(), OrchestratorError> {
        let mut registry = self.lock_registry()?;
        for draft in drafts {
            let id = registry.add_task(draft);
            session.task_ids.push(id);
        }
        Ok(())
    }

    fn send_estimation_review(
        &mut self,
        session: &mut PlanningSession,
    ) -> Result<PlanningPhase, OrchestratorError> {
        let tasks = self.session_tasks(session)?;
        let summary = estimate::summarize(&tasks);
        self.send(
            &estimate::render(&summary, &tasks),
            MessageKind::PlanningPrompt,
            json!({"phase": "estimation"}),
        )?;
        session.phase = PlanningPhase::Estimation;
        Ok(session.phase)
    }

    /// Score every planned session task against a static snapshot and build
    /// the assignment-planning report. Stores the plan on the session.
    fn plan_assignments(
        &mut self,
        session: &mut PlanningSession,
    ) -> Result<String, OrchestratorError> {
        let (tasks, agents, all_tasks, ledger) = {
            let registry = self.lock_registry()?;
            (
                self.session_tasks_locked(session, &registry),
                registry.snapshot_agents(),
                registry.snapshot_tasks(),
                registry.performance_ledger(),
            )
        };
        let recommendations = self
            .engine
            .recommendations(&tasks, &agents, &all_tasks, &ledger);

        let mut planned = Vec::new();
        let mut hours_by_agent: BTreeMap<String, f64> = BTreeMap::new();
        for rec in &recommendations {
            let hours = tasks
                .iter()
                .find(|t| t.id == rec.task_id)
                .map(|t| t.estimated_effort)
                .unwrap_or(0.0);
            *hours_by_agent.entry(rec.score.agent_id.clone()).or_insert(0.0) += hours;
            planned.push(PlannedAssignment {
                task_id: rec.task_id.clone(),
                agent_id: rec.score.agent_id.clone(),
                hours,
            });
        }
        let unassignable: Vec<&str> = tasks
            .iter()
            .filter(|t| !planned.iter().any(|p| p.task_id == t.id))
            .map(|t| t.title.as_str())
            .collect();
        session.planned = planned;

        let mut report = String::from("Proposed assignments:\n");
        for item in &session.planned {
            report.push_str(&format!(
                "- {} -> {} ({:.0}h)\n",
                item.task_id, item.agent_id, item.hours
            ));
        }
        for (agent, hours) in &hours_by_agent {
            let capacity = session.capacity.available_for(agent);
            let band = UtilizationBand::for_load(*hours, capacity);
            report.push_str(&format!(
                "{agent}: {hours:.0}h planned of {capacity:.1}h available ({})\n",
                band.as_str()
            ));
        }
        if !unassignable.is_empty() {
            report.push_str(&format!(
                "No capable agent found for: {}\n",
                unassignable.join(", ")
            ));
        }
        report.push_str("Reply \"approve\" to continue or \"revise\" to replan.");
        Ok(report)
    }

    fn capacity_report(&self, session: &PlanningSession) -> String {
        let mut hours_by_agent: BTreeMap<String, f64> = BTreeMap::new();
        for planned in &session.planned {
            *hours_by_agent.entry(planned.agent_id.clone()).or_insert(0.0) += planned.hours;
        }
        let mut report = String::from("Capacity validation:\n");
        for (agent, capacity) in &session.capacity.per_agent {
            let planned = hours_by_agent.get(agent).copied().unwrap_or(0.0);
            let band = UtilizationBand::for_load(planned, *capacity);
            report.push_str(&format!(
                "- {agent}: {planned:.0}h of {capacity:.1}h ({})\n",
                band.as_str()
            ));
        }
        report.push_str("Reply \"confirm\" to finalize the plan.");
        report
    }

    fn session_tasks(
        &self,
        session: &PlanningSession,
    ) -> Result<Vec<Task>, OrchestratorError> {
        let registry = self.lock_registry()?;
        Ok(self.session_tasks_locked(session, &registry))
    }

    fn session_tasks_locked(
        &self,
        session: &PlanningSession,
        registry: &crate::registry::TaskRegistry,
    ) -> Vec<Task> {
        session
            .task_ids
            .iter()
            .filter_map(|id| registry.task(id).cloned())
            .collect()
    }

    fn clarify(
        &mut self,
        session: &PlanningSession,
        hint: &str,
    ) -> Result<PlanningPhase, OrchestratorError> {
        self.send(
            hint,
            MessageKind::Clarification,
            json!({"phase": format!("{:?}", session.phase)}),
        )?;
        Ok(session.phase)
    }

    fn send(
        &self,
        content: &str,
        kind: MessageKind,
        context: serde_json::Value,
    ) -> Result<(), OrchestratorError> {
        self.sink
            .send_message(content, &MessageMeta::with_context(kind, context))
    }

    fn lock_registry(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, crate::registry::TaskRegistry>, OrchestratorError> {
        self.registry
            .lock()
            .map_err(|_| OrchestratorError::Send("registry lock poisoned".to_string()))
    }
}

fn is_approval(normalized: &str) -> bool {
    matches!(
        normalized,
        "approve" | "approved" | "yes" | "ok" | "okay" | "looks good" | "lgtm"
    )
}
