use super::queue::Priority;
use super::types::{AgentStatus, SteerMode};

/// What to do with a message that arrives for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteerAction {
    /// Start a turn with the message right away.
    InjectNow,
    /// Defer the message behind the running turn.
    Enqueue,
    /// Queue the message at high priority and interrupt the running turn.
    InterruptAndInject,
}

impl SteerAction {
    /// Queue priority for actions that defer the message.
    pub fn priority(&self) -> Option<Priority> {
        match self {
            SteerAction::InjectNow => None,
            SteerAction::Enqueue => Some(Priority::Normal),
            SteerAction::InterruptAndInject => Some(Priority::High),
        }
    }
}

/// Classify an incoming message. Stopped agents are rejected by the caller
/// before the policy is consulted.
pub fn decide(status: AgentStatus, mode: SteerMode) -> SteerAction {
    if status == AgentStatus::Idle {
        return SteerAction::InjectNow;
    }
    match mode {
        SteerMode::Queue => SteerAction::Enqueue,
        SteerMode::Immediate => SteerAction::InterruptAndInject,
    }
}
