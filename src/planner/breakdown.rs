//! Objective-to-task breakdown templates.

use crate::model::{SprintObjective, Task, TaskType};

use super::parse::{EffortEstimator, ObjectiveCategory};

/// Hours represented by one objective effort point when splitting into
/// tasks.
const HOURS_PER_EFFORT_POINT: f64 = 4.0;

/// One step of a breakdown template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateStep {
    pub title: &'static str,
    pub task_type: TaskType,
    /// Fraction of the objective's hours this step receives.
    pub share: f64,
}

const IMPLEMENTATION_STEPS: &[TemplateStep] = &[
    TemplateStep { title: "Design the approach for", task_type: TaskType::Design, share: 0.20 },
    TemplateStep { title: "Implement", task_type: TaskType::CodeGeneration, share: 0.45 },
    TemplateStep { title: "Test", task_type: TaskType::Testing, share: 0.25 },
    TemplateStep { title: "Document", task_type: TaskType::Documentation, share: 0.10 },
];

const API_STEPS: &[TemplateStep] = &[
    TemplateStep { title: "Design the contract for", task_type: TaskType::Design, share: 0.15 },
    TemplateStep { title: "Implement", task_type: TaskType::CodeGeneration, share: 0.40 },
    TemplateStep { title: "Add input validation for", task_type: TaskType::CodeGeneration, share: 0.15 },
    TemplateStep { title: "Test", task_type: TaskType::Testing, share: 0.20 },
    TemplateStep { title: "Document", task_type: TaskType::Documentation, share: 0.10 },
];

const UI_STEPS: &[TemplateStep] = &[
    TemplateStep { title: "Mock up", task_type: TaskType::Design, share: 0.20 },
    TemplateStep { title: "Implement", task_type: TaskType::CodeGeneration, share: 0.45 },
    TemplateStep { title: "Style", task_type: TaskType::CodeGeneration, share: 0.15 },
    TemplateStep { title: "Test", task_type: TaskType::Testing, share: 0.20 },
];

const TESTING_STEPS: &[TemplateStep] = &[
    TemplateStep { title: "Write the test strategy for", task_type: TaskType::Design, share: 0.15 },
    TemplateStep { title: "Write unit tests for", task_type: TaskType::Testing, share: 0.35 },
    TemplateStep { title: "Write integration tests for", task_type: TaskType::Testing, share: 0.35 },
    TemplateStep { title: "Automate", task_type: TaskType::Deployment, share: 0.15 },
];

const GENERIC_STEPS: &[TemplateStep] = &[
    TemplateStep { title: "Plan", task_type: TaskType::Design, share: 0.20 },
    TemplateStep { title: "Execute", task_type: TaskType::General, share: 0.45 },
    TemplateStep { title: "Verify", task_type: TaskType::Testing, share: 0.20 },
    TemplateStep { title: "Write up", task_type: TaskType::Documentation, share: 0.15 },
];

/// Breakdown template for a category.
pub fn template_for(category: ObjectiveCategory) -> &'static [TemplateStep] {
    match category {
        ObjectiveCategory::Implementation => IMPLEMENTATION_STEPS,
        ObjectiveCategory::Api => API_STEPS,
        ObjectiveCategory::Ui => UI_STEPS,
        ObjectiveCategory::Testing => TESTING_STEPS,
        ObjectiveCategory::Generic => GENERIC_STEPS,
    }
}

/// Expand one objective into task drafts following its category template.
///
/// Each step receives its share of the objective's hours, floored at one
/// hour. Drafts carry empty ids; the registry mints real ones.
pub fn expand_objective(objective: &SprintObjective, category: ObjectiveCategory) -> Vec<Task> {
    let total_hours = f64::from(objective.estimated_effort) * HOURS_PER_EFFORT_POINT;
    template_for(category)
        .iter()
        .map(|step| {
            let effort = (total_hours * step.share).max(1.0).round();
            let title = format!("{} {}", step.title, objective.title);
            Task::new("", title, step.task_type, objective.priority, effort)
                .with_description(format!(
                    "Part of objective \"{}\" ({})",
                    objective.title, objective.id
                ))
                .with_parent_objective(objective.id.clone())
        })
        .collect()
}

/// Build task drafts from a custom human-supplied list, bucketing them over
/// the objectives positionally (ceil(N / objectives) tasks per objective, in
/// emission order).
pub fn custom_tasks(
    lines: &[String],
    objectives: &[SprintObjective],
    estimator: &dyn EffortEstimator,
) -> Vec<Task> {
    if objectives.is_empty() || lines.is_empty() {
        return Vec::new();
    }
    let per_objective = lines.len().div_ceil(objectives.len());
    lines
        .iter()
        .enumerate()
        .map(|(index, title)| {
            let objective = &objectives[(index / per_objective).min(objectives.len() - 1)];
            let effort = f64::from(estimator.effort(title));
            Task::new(
                "",
                title.clone(),
                estimator.task_type(title),
                objective.priority,
                effort,
            )
            .with_description(format!(
                "Part of objective \"{}\" ({})",
                objective.title, objective.id
            ))
            .with_parent_objective(objective.id.clone())
        })
        .collect()
}
