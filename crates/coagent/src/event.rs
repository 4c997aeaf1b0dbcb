use serde::Serialize;

use crate::agent::{AgentStatus, LogMessage, QueuedMessage, SteerMode};
use crate::runtime::DrainOutcome;

/// Every observable transition of an agent. Each variant names its agent so a
/// multi-agent observer can route it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    StatusChanged {
        agent_id: String,
        status: AgentStatus,
    },
    MessageAppended {
        agent_id: String,
        message: LogMessage,
    },
    QueueMessageAdded {
        agent_id: String,
        message: QueuedMessage,
    },
    QueueMessageRemoved {
        agent_id: String,
        message_id: String,
    },
    QueueCleared {
        agent_id: String,
        removed: usize,
    },
    QueueProcessingStarted {
        agent_id: String,
    },
    QueueProcessingCompleted {
        agent_id: String,
        outcome: DrainOutcome,
        dispatched: usize,
    },
    SteerModeChanged {
        agent_id: String,
        mode: SteerMode,
    },
    AgentInterrupted {
        agent_id: String,
    },
}

impl AgentEvent {
    pub fn agent_id(&self) -> &str {
        match self {
            AgentEvent::StatusChanged { agent_id, .. }
            | AgentEvent::MessageAppended { agent_id, .. }
            | AgentEvent::QueueMessageAdded { agent_id, .. }
            | AgentEvent::QueueMessageRemoved { agent_id, .. }
            | AgentEvent::QueueCleared { agent_id, .. }
            | AgentEvent::QueueProcessingStarted { agent_id }
            | AgentEvent::QueueProcessingCompleted { agent_id, .. }
            | AgentEvent::SteerModeChanged { agent_id, .. }
            | AgentEvent::AgentInterrupted { agent_id } => agent_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AgentEvent::StatusChanged { .. } => "status_changed",
            AgentEvent::MessageAppended { .. } => "message_appended",
            AgentEvent::QueueMessageAdded { .. } => "queue_message_added",
            AgentEvent::QueueMessageRemoved { .. } => "queue_message_removed",
            AgentEvent::QueueCleared { .. } => "queue_cleared",
            AgentEvent::QueueProcessingStarted { .. } => "queue_processing_started",
            AgentEvent::QueueProcessingCompleted { .. } => "queue_processing_completed",
            AgentEvent::SteerModeChanged { .. } => "steer_mode_changed",
            AgentEvent::AgentInterrupted { .. } => "agent_interrupted",
        }
    }
}
