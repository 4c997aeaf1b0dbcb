use serde::{Deserialize, Serialize};

use crate::agent::{QueuedMessage, SteerMode};

/// Snapshot of an agent's queue for the operator UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    pub messages: Vec<QueuedMessage>,
    pub steer_mode: SteerMode,
    pub processing: bool,
    pub selected_index: Option<usize>,
}

/// What happened to a message passed through the steer policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SteerOutcome {
    Started {
        turn_id: String,
    },
    Queued {
        message: QueuedMessage,
    },
    Steered {
        message: QueuedMessage,
        /// Whether the running turn is being cancelled to make room.
        interrupted: bool,
    },
}

/// Why a drain loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainOutcome {
    Empty,
    TimedOut,
    HaltedOnError,
    AgentStopped,
    Failed,
}

/// Result of asking the agent for the next queued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DrainStep {
    Dispatched {
        message: QueuedMessage,
        turn_id: String,
    },
    /// A turn is running or being interrupted; nothing was dequeued.
    Busy,
    Empty,
    Stopped,
}
