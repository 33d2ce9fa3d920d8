//! Overseer: capability-based task orchestration for agent teams.
//!
//! Three tightly coupled components share one in-memory registry:
//! - the assignment engine scores task-to-agent matches across expertise,
//!   workload, availability, dependency affinity, and track record;
//! - the progress monitor runs periodic liveness and deep-scan loops that
//!   track risk, detect blockers, and attempt automated remediation;
//! - the sprint planner walks a human operator through a phased planning
//!   conversation that ends in capacity-validated assignments.
//!
//! Everything is in-memory for the process lifetime. Outbound human-facing
//! text goes through the [`message::MessageSink`] seam; transport, retry,
//! and persistence belong to the caller.

pub mod assignment;
pub mod config;
pub mod error;
pub mod message;
pub mod model;
pub mod monitor;
pub mod planner;
pub mod registry;
pub mod shutdown;

pub use config::OverseerConfig;
pub use error::OrchestratorError;
pub use registry::{SharedRegistry, TaskRegistry};
