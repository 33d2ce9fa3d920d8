//! Outbound human-facing messaging seam.
//!
//! The core composes text; an external transport delivers it. Everything
//! human-visible (planner prompts, escalations, guidance) funnels through
//! [`MessageSink::send_message`] so the transport stays swappable. Delivery
//! guarantees, retry, and formatting are the transport's responsibility.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OrchestratorError;

/// What a message is about, for transports that route or badge by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A planner prompt awaiting a human reply.
    PlanningPrompt,
    /// A clarification re-prompt after an unparseable reply.
    Clarification,
    /// Remediation guidance for a blocked task.
    Guidance,
    /// A decision request escalated to the human channel.
    Escalation,
    /// A critical alert forwarded to the human channel.
    Alert,
}

/// Metadata attached to an outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMeta {
    pub kind: MessageKind,
    /// Structured context (task/agent/blocker ids, phase names).
    #[serde(default)]
    pub context: Value,
}

impl MessageMeta {
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            context: Value::Null,
        }
    }

    pub fn with_context(kind: MessageKind, context: Value) -> Self {
        Self { kind, context }
    }
}

/// The single outbound capability the core consumes.
pub trait MessageSink: Send + Sync {
    /// Deliver one message to the human channel.
    fn send_message(&self, content: &str, meta: &MessageMeta) -> Result<(), OrchestratorError>;
}

/// A sink that records every message in memory. Used by tests and as a
/// stand-in when no transport is wired up yet.
#[derive(Debug, Default)]
pub struct MemorySink {
    sent: Mutex<Vec<(String, MessageMeta)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far, in order.
    pub fn messages(&self) -> Vec<(String, MessageMeta)> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Count of messages with the given kind.
    pub fn count_of(&self, kind: MessageKind) -> usize {
        self.messages().iter().filter(|(_, m)| m.kind == kind).count()
    }

    /// Content of the most recent message, if any.
    pub fn last_content(&self) -> Option<String> {
        self.messages().last().map(|(c, _)| c.clone())
    }
}

impl MessageSink for MemorySink {
    fn send_message(&self, content: &str, meta: &MessageMeta) -> Result<(), OrchestratorError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| OrchestratorError::Send("sink poisoned".to_string()))?;
        sent.push((content.to_string(), meta.clone()));
        Ok(())
    }
}
