//! Status transition rules for a single agent.
//!
//! `idle | error | waiting_for_input → running` on turn start, `running →
//! idle | waiting_for_input | error` when the turn ends, and `any → stopped`.
//! `stopped` is terminal.

use std::fmt;

use super::types::AgentStatus;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    TurnStarted,
    TurnCompleted { awaiting_input: bool },
    TurnFailed,
    TurnCancelled,
    Stop,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transition::TurnStarted => "turn_started",
            Transition::TurnCompleted { .. } => "turn_completed",
            Transition::TurnFailed => "turn_failed",
            Transition::TurnCancelled => "turn_cancelled",
            Transition::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Next status for `transition` applied to `from`.
pub fn next_status(from: AgentStatus, transition: Transition) -> CoreResult<AgentStatus> {
    use AgentStatus::*;

    match (from, transition) {
        (_, Transition::Stop) => Ok(Stopped),
        (Stopped, _) => Err(CoreError::AgentStopped),
        (Running, Transition::TurnStarted) => Err(CoreError::TurnInFlight),
        (Idle | Error | WaitingForInput, Transition::TurnStarted) => Ok(Running),
        (Running, Transition::TurnCompleted { awaiting_input }) => {
            Ok(if awaiting_input { WaitingForInput } else { Idle })
        }
        (Running, Transition::TurnFailed) => Ok(Error),
        (Running, Transition::TurnCancelled) => Ok(Idle),
        (from, transition) => Err(CoreError::InvalidTransition {
            from,
            event: transition.to_string(),
        }),
    }
}
