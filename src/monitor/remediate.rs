//! Remediation strategy selection and guidance templating.
//!
//! Strategy choice, time estimates, and confidence come from fixed tables;
//! the monitor executes the chosen strategy against the registry.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::model::{BlockerType, ResolutionStrategy, TaskType};

/// A planned remediation attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub strategy: ResolutionStrategy,
    /// Rough wall-clock estimate for the remediation to take effect.
    pub estimated_minutes: u32,
    /// Confidence in [0, 1] that the strategy clears the blocker.
    pub confidence: f64,
}

/// Map a blocker type to its default strategy.
pub fn choose_strategy(blocker_type: BlockerType) -> ResolutionStrategy {
    match blocker_type {
        BlockerType::Dependency => ResolutionStrategy::AddResources,
        BlockerType::Technical => ResolutionStrategy::ProvideGuidance,
        BlockerType::Resource => ResolutionStrategy::ReassignTask,
        BlockerType::DecisionNeeded => ResolutionStrategy::EscalateToHuman,
    }
}

/// Build the remediation plan for a blocker type.
///
/// Base minutes/confidence per strategy, with a small confidence boost when
/// the type is the one the strategy was made for.
pub fn plan_for(blocker_type: BlockerType) -> RemediationPlan {
    let strategy = choose_strategy(blocker_type);
    let (estimated_minutes, base_confidence): (u32, f64) = match strategy {
        ResolutionStrategy::AddResources => (30, 0.60),
        ResolutionStrategy::ProvideGuidance => (15, 0.70),
        ResolutionStrategy::ReassignTask => (20, 0.65),
        ResolutionStrategy::EscalateToHuman => (60, 0.90),
    };
    let boost = match blocker_type {
        BlockerType::Dependency => 0.10,
        BlockerType::Resource | BlockerType::Technical | BlockerType::DecisionNeeded => 0.05,
    };
    RemediationPlan {
        strategy,
        estimated_minutes,
        confidence: (base_confidence + boost).min(1.0),
    }
}

static GUIDANCE_TEMPLATES: Lazy<HashMap<(TaskType, BlockerType), &'static str>> =
    Lazy::new(|| {
        let mut templates = HashMap::new();
        templates.insert(
            (TaskType::CodeGeneration, BlockerType::Technical),
            "Break the implementation into smaller commits, re-run the failing \
             build locally, and revisit the most recent change first.",
        );
        templates.insert(
            (TaskType::CodeGeneration, BlockerType::Dependency),
            "Stub the unfinished upstream interface so work can continue in \
             parallel, and sync with the owner of the blocking task.",
        );
        templates.insert(
            (TaskType::Testing, BlockerType::Technical),
            "Isolate the flaky case, pin its inputs, and run it in a loop to \
             reproduce before touching the suite.",
        );
        templates.insert(
            (TaskType::Testing, BlockerType::Dependency),
            "Write the test plan against the agreed interface now; fill in \
             fixtures once the upstream task lands.",
        );
        templates.insert(
            (TaskType::Documentation, BlockerType::Dependency),
            "Draft the sections that do not depend on the pending work and \
             mark the rest with placeholders.",
        );
        templates.insert(
            (TaskType::Deployment, BlockerType::Resource),
            "Verify the target environment credentials and hand the rollout \
             checklist to whoever picks this up.",
        );
        templates
    });

/// Templated guidance keyed by (task type, blocker type), with a generic
/// fallback.
pub fn guidance_message(task_type: TaskType, blocker_type: BlockerType) -> String {
    match GUIDANCE_TEMPLATES.get(&(task_type, blocker_type)) {
        Some(template) => (*template).to_string(),
        None => format!(
            "Review the {} blocker, note what was tried, and split off any \
             part of the task that can proceed independently.",
            blocker_type.as_str()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_table_matches_blocker_types() {
        assert_eq!(
            choose_strategy(BlockerType::Dependency),
            ResolutionStrategy::AddResources
        );
        assert_eq!(
            choose_strategy(BlockerType::Technical),
            ResolutionStrategy::ProvideGuidance
        );
        assert_eq!(
            choose_strategy(BlockerType::Resource),
            ResolutionStrategy::ReassignTask
        );
        assert_eq!(
            choose_strategy(BlockerType::DecisionNeeded),
            ResolutionStrategy::EscalateToHuman
        );
    }

    #[test]
    fn plans_carry_boosted_confidence() {
        let plan = plan_for(BlockerType::Dependency);
        assert_eq!(plan.strategy, ResolutionStrategy::AddResources);
        assert_eq!(plan.estimated_minutes, 30);
        assert!((plan.confidence - 0.70).abs() < 1e-9);

        let escalation = plan_for(BlockerType::DecisionNeeded);
        assert!((escalation.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn guidance_uses_template_when_available() {
        let specific = guidance_message(TaskType::CodeGeneration, BlockerType::Technical);
        assert!(specific.contains("smaller commits"));

        let fallback = guidance_message(TaskType::Design, BlockerType::Technical);
        assert!(fallback.contains("technical blocker"));
    }
}
