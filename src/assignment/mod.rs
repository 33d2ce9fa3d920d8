//! Assignment engine: multi-factor scoring of task-to-agent matches.
//!
//! Scoring is pure: it reads snapshots of tasks, agents, and the performance
//! ledger and never mutates the registry. The caller applies the winning
//! match through [`crate::registry::TaskRegistry::assign`], which is the one
//! atomic step.

mod score;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AgentCapability, PerformanceRecord, Task, TaskStatus};

pub use score::{
    availability_score, dependency_score, expertise_score, historical_score, workload_score,
};

/// Named weighting profiles for combining the five sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    SkillBased,
    WorkloadBalanced,
    AvailabilityFirst,
    DependencyAware,
    PerformanceBased,
    /// Balanced blend; the default.
    #[default]
    Hybrid,
}

/// Weight vector over (expertise, workload, availability, dependency,
/// historical). Each vector sums to 1.0 so totals stay in [0, 100].
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub expertise: f64,
    pub workload: f64,
    pub availability: f64,
    pub dependency: f64,
    pub historical: f64,
}

impl AssignmentStrategy {
    pub fn weights(&self) -> ScoreWeights {
        match self {
            Self::SkillBased => ScoreWeights {
                expertise: 0.50,
                workload: 0.15,
                availability: 0.10,
                dependency: 0.10,
                historical: 0.15,
            },
            Self::WorkloadBalanced => ScoreWeights {
                expertise: 0.15,
                workload: 0.50,
                availability: 0.10,
                dependency: 0.10,
                historical: 0.15,
            },
            Self::AvailabilityFirst => ScoreWeights {
                expertise: 0.15,
                workload: 0.15,
                availability: 0.50,
                dependency: 0.10,
                historical: 0.10,
            },
            Self::DependencyAware => ScoreWeights {
                expertise: 0.15,
                workload: 0.10,
                availability: 0.10,
                dependency: 0.50,
                historical: 0.15,
            },
            Self::PerformanceBased => ScoreWeights {
                expertise: 0.15,
                workload: 0.10,
                availability: 0.10,
                dependency: 0.15,
                historical: 0.50,
            },
            Self::Hybrid => ScoreWeights {
                expertise: 0.30,
                workload: 0.25,
                availability: 0.15,
                dependency: 0.15,
                historical: 0.15,
            },
        }
    }
}

/// A scored candidate: the weighted total plus each component, so callers
/// can explain the decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentScore {
    pub agent_id: String,
    pub total: f64,
    pub expertise: f64,
    pub workload: f64,
    pub availability: f64,
    pub dependency: f64,
    pub historical: f64,
}

/// One entry of a batch recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecommendation {
    pub task_id: String,
    pub score: AssignmentScore,
}

/// The assignment engine. Holds only the strategy; all inputs arrive per
/// call so identical inputs always produce identical outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentEngine {
    strategy: AssignmentStrategy,
}

impl AssignmentEngine {
    pub fn new(strategy: AssignmentStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> AssignmentStrategy {
        self.strategy
    }

    /// Find the best available, capable agent for a task.
    ///
    /// Returns `None` when no agent passes the candidate filter
    /// (availability plus capability match). Ties on the weighted total are
    /// broken by ascending `agent_id`, which keeps the result deterministic
    /// regardless of input order.
    pub fn find_best_assignment(
        &self,
        task: &Task,
        agents: &[AgentCapability],
        current_tasks: &[Task],
        history: &BTreeMap<String, PerformanceRecord>,
    ) -> Option<AssignmentScore> {
        self.find_best_assignment_at(task, agents, current_tasks, history, Utc::now())
    }

    /// [`Self::find_best_assignment`] with an explicit clock, so the
    /// availability tiers are reproducible.
    pub fn find_best_assignment_at(
        &self,
        task: &Task,
        agents: &[AgentCapability],
        current_tasks: &[Task],
        history: &BTreeMap<String, PerformanceRecord>,
        now: DateTime<Utc>,
    ) -> Option<AssignmentScore> {
        let weights = self.strategy.weights();
        let mut best: Option<AssignmentScore> = None;

        for agent in agents {
            if !agent.available || !agent.can_handle(task.task_type) {
                continue;
            }
            let candidate = self.score_candidate(task, agent, current_tasks, history, now, &weights);
            best = match best {
                None => Some(candidate),
                Some(current) => {
                    if candidate.total > current.total
                        || (candidate.total == current.total
                            && candidate.agent_id < current.agent_id)
                    {
                        Some(candidate)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        best
    }

    fn score_candidate(
        &self,
        task: &Task,
        agent: &AgentCapability,
        current_tasks: &[Task],
        history: &BTreeMap<String, PerformanceRecord>,
        now: DateTime<Utc>,
        weights: &ScoreWeights,
    ) -> AssignmentScore {
        let expertise = expertise_score(task, agent);
        let workload = workload_score(agent, current_tasks);
        let availability = availability_score(agent, now);
        let dependency = dependency_score(task, agent, current_tasks);
        let historical = historical_score(history.get(&agent.agent_id));
        let total = expertise * weights.expertise
            + workload * weights.workload
            + availability * weights.availability
            + dependency * weights.dependency
            + historical * weights.historical;
        AssignmentScore {
            agent_id: agent.agent_id.clone(),
            total,
            expertise,
            workload,
            availability,
            dependency,
            historical,
        }
    }

    /// Score a batch of tasks against one static snapshot.
    ///
    /// Tasks are ordered by priority (critical first), then fewer
    /// dependencies, then earliest creation. The snapshot is not rebalanced
    /// between recommendations; applying them can still fail capacity checks
    /// at the registry, which is the caller's signal to re-run.
    pub fn recommendations(
        &self,
        tasks: &[Task],
        agents: &[AgentCapability],
        current_tasks: &[Task],
        history: &BTreeMap<String, PerformanceRecord>,
    ) -> Vec<AssignmentRecommendation> {
        self.recommendations_at(tasks, agents, current_tasks, history, Utc::now())
    }

    pub fn recommendations_at(
        &self,
        tasks: &[Task],
        agents: &[AgentCapability],
        current_tasks: &[Task],
        history: &BTreeMap<String, PerformanceRecord>,
        now: DateTime<Utc>,
    ) -> Vec<AssignmentRecommendation> {
        let mut pending: Vec<&Task> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Planned)
            .collect();
        pending.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.dependencies.len().cmp(&b.dependencies.len()))
                .then(a.created_at.cmp(&b.created_at))
        });

        pending
            .into_iter()
            .filter_map(|task| {
                self.find_best_assignment_at(task, agents, current_tasks, history, now)
                    .map(|score| AssignmentRecommendation {
                        task_id: task.id.clone(),
                        score,
                    })
            })
            .collect()
    }
}
