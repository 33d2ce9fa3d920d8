//! Shared data model: tasks, agents, blockers, objectives, alerts.

mod agent;
mod alert;
mod blocker;
mod objective;
mod task;

pub use agent::{AgentCapability, PerformanceRecord};
pub use alert::{Alert, AlertKind, AlertSeverity};
pub use blocker::{Blocker, BlockerType, ResolutionStrategy};
pub use objective::SprintObjective;
pub use task::{Task, TaskPriority, TaskStatus, TaskType};
