//! Error taxonomy for the orchestration core.
//!
//! Recoverability matters more than the error site here:
//! - Dangling-id variants (`TaskNotFound`, `AgentNotFound`, `BlockerNotFound`)
//!   are registry inconsistencies; monitoring ticks log and skip them, they
//!   are never fatal.
//! - Unparseable human replies are not errors at all: the planner answers
//!   with a clarification and stays in its phase.
//! - "No capable agent" is *not* an error: the assignment engine returns
//!   `None` and callers decide what that means.

use thiserror::Error;

/// Errors produced by the registry, monitor, and planner.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A task id that does not exist in the registry.
    #[error("task {0} not found")]
    TaskNotFound(String),

    /// An agent id that does not exist in the registry.
    #[error("agent {0} not found")]
    AgentNotFound(String),

    /// A blocker id that does not exist in the registry.
    #[error("blocker {0} not found")]
    BlockerNotFound(String),

    /// An agent with no free task slots was asked to take another task.
    #[error("agent {0} has no remaining capacity")]
    AgentAtCapacity(String),

    /// A task that already has an assignee was assigned again.
    #[error("task {task_id} is already assigned to {agent_id}")]
    AlreadyAssigned { task_id: String, agent_id: String },

    /// `initiate` was called while a planning session is in progress.
    #[error("a planning session is already in progress")]
    SessionActive,

    /// A planner reply arrived with no session to apply it to.
    #[error("no active planning session")]
    NoActiveSession,

    /// The outbound message transport reported a delivery failure.
    #[error("message delivery failed: {0}")]
    Send(String),
}
