//! Free-text parsing for the planning conversation.
//!
//! Objective parsing, keyword-driven effort estimation, and estimate
//! adjustments all live here. Estimation and task-type inference sit behind
//! [`EffortEstimator`] so the keyword tables can be swapped without touching
//! the planner itself.

use once_cell::sync::Lazy;

use crate::model::{TaskPriority, TaskType};

/// Broad objective category; selects acceptance criteria and breakdown
/// templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveCategory {
    Implementation,
    Api,
    Ui,
    Testing,
    Generic,
}

/// Strategy seam for turning objective text into effort, category, and task
/// type. One default implementation; swap it to change the heuristics.
pub trait EffortEstimator: Send + Sync {
    /// Relative effort on a 1–10 scale.
    fn effort(&self, text: &str) -> u8;
    /// Category used for templates and acceptance criteria.
    fn category(&self, text: &str) -> ObjectiveCategory;
    /// Task type for a single task description.
    fn task_type(&self, text: &str) -> TaskType;
}

/// Keyword weight table: the highest matching weight wins.
static EFFORT_KEYWORDS: Lazy<Vec<(&'static str, u8)>> = Lazy::new(|| {
    // Stems, so "migration" and "migrate" both match.
    vec![
        ("migrat", 6),
        ("integrat", 6),
        ("implement", 5),
        ("build", 5),
        ("refactor", 4),
        ("creat", 4),
        ("api", 4),
        ("design", 3),
        ("test", 3),
        ("add", 3),
        ("fix", 2),
        ("updat", 2),
        ("document", 2),
    ]
});

/// The default keyword-table estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordEstimator;

impl EffortEstimator for KeywordEstimator {
    fn effort(&self, text: &str) -> u8 {
        let lower = text.to_lowercase();
        let mut effort = i16::from(
            EFFORT_KEYWORDS
                .iter()
                .filter(|(keyword, _)| lower.contains(keyword))
                .map(|(_, weight)| *weight)
                .max()
                .unwrap_or(3),
        );
        if lower.contains("simple") || lower.contains("basic") {
            effort -= 2;
        }
        if lower.contains("complex") {
            effort += 2;
        }
        if lower.contains("comprehensive") {
            effort += 3;
        }
        effort.clamp(1, 10) as u8
    }

    fn category(&self, text: &str) -> ObjectiveCategory {
        let lower = text.to_lowercase();
        if lower.contains("api") || lower.contains("endpoint") {
            ObjectiveCategory::Api
        } else if lower.contains("ui")
            || lower.contains("frontend")
            || lower.contains("interface")
        {
            ObjectiveCategory::Ui
        } else if lower.contains("test") || lower.contains("qa") {
            ObjectiveCategory::Testing
        } else if lower.contains("implement") || lower.contains("build") || lower.contains("create")
        {
            ObjectiveCategory::Implementation
        } else {
            ObjectiveCategory::Generic
        }
    }

    fn task_type(&self, text: &str) -> TaskType {
        let lower = text.to_lowercase();
        if lower.contains("test") || lower.contains("validate") {
            TaskType::Testing
        } else if lower.contains("document") || lower.contains("write up") {
            TaskType::Documentation
        } else if lower.contains("design") || lower.contains("mockup") || lower.contains("plan") {
            TaskType::Design
        } else if lower.contains("deploy") || lower.contains("release") {
            TaskType::Deployment
        } else if lower.contains("review") {
            TaskType::CodeReview
        } else if lower.contains("implement")
            || lower.contains("build")
            || lower.contains("fix")
            || lower.contains("style")
            || lower.contains("automate")
        {
            TaskType::CodeGeneration
        } else {
            TaskType::General
        }
    }
}

/// Strip a leading bullet marker from a line. Returns `None` for lines that
/// are empty once stripped.
pub fn strip_bullet(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let without_marker = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('*'))
        .or_else(|| trimmed.strip_prefix('•'))
        .map(str::trim_start)
        .unwrap_or(trimmed);
    // Numbered markers: "1. foo" or "2) foo".
    let without_number = {
        let digits: usize = without_marker
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if digits > 0 {
            let rest = &without_marker[digits..];
            rest.strip_prefix(". ")
                .or_else(|| rest.strip_prefix(") "))
                .unwrap_or(without_marker)
        } else {
            without_marker
        }
    };
    let cleaned = without_number.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// A parsed objective, not yet registered.
#[derive(Debug, Clone)]
pub struct ObjectiveDraft {
    pub title: String,
    pub priority: TaskPriority,
    pub effort: u8,
    pub category: ObjectiveCategory,
    pub acceptance_criteria: Vec<String>,
}

/// Priority by position: first objective is High, the next two Medium, the
/// rest Low.
fn priority_for_position(index: usize) -> TaskPriority {
    match index {
        0 => TaskPriority::High,
        1 | 2 => TaskPriority::Medium,
        _ => TaskPriority::Low,
    }
}

fn acceptance_criteria(category: ObjectiveCategory, title: &str) -> Vec<String> {
    match category {
        ObjectiveCategory::Implementation => vec![
            format!("{title} is implemented and merged"),
            "New code is covered by tests".to_string(),
            "No regressions in the existing suite".to_string(),
            "Usage is documented".to_string(),
        ],
        ObjectiveCategory::Api => vec![
            "Endpoints respond with the agreed contract".to_string(),
            "Input validation rejects malformed requests".to_string(),
            "Error responses carry actionable messages".to_string(),
            "API reference is updated".to_string(),
        ],
        ObjectiveCategory::Ui => vec![
            "Screens match the agreed mockups".to_string(),
            "Interactions work on supported viewports".to_string(),
            "Accessibility basics are covered".to_string(),
        ],
        ObjectiveCategory::Testing => vec![
            "Critical paths have automated coverage".to_string(),
            "Tests run green in CI".to_string(),
            "Flaky cases are quarantined or fixed".to_string(),
        ],
        ObjectiveCategory::Generic => vec![
            format!("{title} is complete"),
            "Outcome is reviewed by a second pair of eyes".to_string(),
            "Follow-up work is captured as tasks".to_string(),
        ],
    }
}

/// Parse free text into objective drafts, one per non-empty line.
pub fn parse_objectives(text: &str, estimator: &dyn EffortEstimator) -> Vec<ObjectiveDraft> {
    text.lines()
        .filter_map(strip_bullet)
        .enumerate()
        .map(|(index, title)| {
            let category = estimator.category(&title);
            ObjectiveDraft {
                priority: priority_for_position(index),
                effort: estimator.effort(&title),
                category,
                acceptance_criteria: acceptance_criteria(category, &title),
                title,
            }
        })
        .collect()
}

/// One requested estimate change: a title fragment and the new hours.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub title_fragment: String,
    pub hours: f64,
}

/// Parse estimate adjustments, one per line, in the form
/// `<title fragment>: <N>h` (the `h` suffix is optional).
pub fn parse_adjustments(text: &str) -> Vec<Adjustment> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let (fragment, value) = line.rsplit_once(':')?;
            let value = value.trim().trim_end_matches(['h', 'H']).trim();
            let hours: f64 = value.parse().ok()?;
            let fragment = strip_bullet(fragment).unwrap_or_else(|| fragment.trim().to_string());
            if fragment.is_empty() || hours <= 0.0 {
                None
            } else {
                Some(Adjustment {
                    title_fragment: fragment,
                    hours,
                })
            }
        })
        .collect()
}
