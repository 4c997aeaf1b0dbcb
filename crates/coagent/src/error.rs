use coagent_engine::EngineError;
use thiserror::Error;

use crate::agent::AgentStatus;

/// Unified error type for the coagent runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No agent is registered under the given id.
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    /// Interrupt requested while no turn is running.
    #[error("agent is not running")]
    NotRunning,
    /// The agent was stopped and accepts no further work.
    #[error("agent stopped")]
    AgentStopped,
    /// A turn is already in flight for the agent.
    #[error("agent is busy with another turn")]
    TurnInFlight,
    /// The drain loop is already running for the agent.
    #[error("queue is already being processed")]
    AlreadyProcessing,
    /// A lifecycle transition that the state machine does not allow.
    #[error("invalid transition from {from} on {event}")]
    InvalidTransition { from: AgentStatus, event: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("engine error: {0}")]
    Engine(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for CoreError {
    fn from(error: EngineError) -> Self {
        CoreError::Engine(error.to_string())
    }
}

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;
