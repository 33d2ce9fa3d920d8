//! Estimation review: totals, size buckets, and risk flags.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::Task;

/// Aggregate view of the planned tasks' estimates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimationSummary {
    pub total_hours: f64,
    /// Tasks at or under 2 hours.
    pub small: usize,
    /// Tasks between 3 and 5 hours.
    pub medium: usize,
    /// Tasks at or over 6 hours.
    pub large: usize,
    pub distinct_types: usize,
    pub risk_flags: Vec<String>,
}

/// Summarize estimates over the planned tasks and flag risky shapes:
/// more than 30% large tasks, more than 100 total hours, or fewer than
/// three distinct task types.
pub fn summarize(tasks: &[Task]) -> EstimationSummary {
    let mut summary = EstimationSummary::default();
    let mut types = BTreeSet::new();
    for task in tasks {
        summary.total_hours += task.estimated_effort;
        if task.estimated_effort <= 2.0 {
            summary.small += 1;
        } else if task.estimated_effort < 6.0 {
            summary.medium += 1;
        } else {
            summary.large += 1;
        }
        types.insert(task.task_type);
    }
    summary.distinct_types = types.len();

    if !tasks.is_empty() {
        let large_share = summary.large as f64 / tasks.len() as f64;
        if large_share > 0.30 {
            summary.risk_flags.push(format!(
                "{:.0}% of tasks are large (6h+); consider splitting them",
                large_share * 100.0
            ));
        }
        if summary.total_hours > 100.0 {
            summary.risk_flags.push(format!(
                "{:.0}h planned in total; that is a lot for one sprint",
                summary.total_hours
            ));
        }
        if summary.distinct_types < 3 {
            summary
                .risk_flags
                .push("fewer than 3 distinct task types; the plan may be lopsided".to_string());
        }
    }
    summary
}

/// Render the summary as a human-facing review block.
pub fn render(summary: &EstimationSummary, tasks: &[Task]) -> String {
    let mut out = format!(
        "Estimation review: {} tasks, {:.0}h total ({} small / {} medium / {} large).\n",
        tasks.len(),
        summary.total_hours,
        summary.small,
        summary.medium,
        summary.large
    );
    if summary.risk_flags.is_empty() {
        out.push_str("No estimation risks flagged.\n");
    } else {
        for flag in &summary.risk_flags {
            out.push_str(&format!("Risk: {flag}\n"));
        }
    }
    out.push_str(
        "Reply \"approve\" to continue, \"details\" for a per-task walkthrough, \
         or adjust with lines like \"task title: 4h\".",
    );
    out
}

/// Render the per-task walkthrough.
pub fn render_walkthrough(tasks: &[Task]) -> String {
    let mut out = String::from("Per-task estimates:\n");
    for task in tasks {
        out.push_str(&format!(
            "- {} [{}] {:.0}h\n",
            task.title,
            task.task_type.as_str(),
            task.estimated_effort
        ));
    }
    out.push_str("Reply \"approve\" to continue or adjust with \"task title: 4h\".");
    out
}
