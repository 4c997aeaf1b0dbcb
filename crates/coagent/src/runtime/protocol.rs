use tokio::sync::oneshot;

use crate::agent::{AgentInfo, InterruptOutcome, LogMessage, Priority, QueuedMessage, SteerMode};
use crate::error::CoreResult;
use crate::runtime::types::{DrainOutcome, DrainStep, QueueState, SteerOutcome};

type Reply<T> = oneshot::Sender<T>;

/// Everything the agent actor reacts to. Operator requests carry a reply
/// channel; turn and drain notifications do not.
pub(crate) enum AgentCommand {
    SendMessage {
        text: String,
        force_steer: bool,
        reply: Reply<CoreResult<SteerOutcome>>,
    },
    QueueMessage {
        text: String,
        priority: Priority,
        reply: Reply<CoreResult<QueuedMessage>>,
    },
    StartTurn {
        prompt: String,
        reply: Reply<CoreResult<String>>,
    },
    SetSteerMode {
        mode: SteerMode,
        reply: Reply<CoreResult<()>>,
    },
    Interrupt {
        reply: Reply<CoreResult<InterruptOutcome>>,
    },
    ClearQueue {
        reply: Reply<CoreResult<usize>>,
    },
    RemoveQueued {
        message_id: String,
        reply: Reply<CoreResult<bool>>,
    },
    SelectQueued {
        index: Option<usize>,
        reply: Reply<CoreResult<Option<usize>>>,
    },
    QueueState {
        reply: Reply<QueueState>,
    },
    Info {
        reply: Reply<AgentInfo>,
    },
    Messages {
        reply: Reply<Vec<LogMessage>>,
    },
    ProcessQueue {
        reply: Reply<CoreResult<bool>>,
    },
    Stop {
        reply: Reply<CoreResult<()>>,
    },
    DrainNext {
        reply: Reply<CoreResult<DrainStep>>,
    },
    DrainFinished {
        outcome: DrainOutcome,
        dispatched: usize,
    },
    Turn(TurnReport),
}

/// Reported by the turn executor while and after a turn runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TurnReport {
    Progress {
        turn_id: String,
        entry: LogMessage,
    },
    Completed {
        turn_id: String,
        text: String,
        awaiting_input: bool,
    },
    Failed {
        turn_id: String,
        error: String,
    },
    Cancelled {
        turn_id: String,
    },
}

impl TurnReport {
    pub(crate) fn turn_id(&self) -> &str {
        match self {
            TurnReport::Progress { turn_id, .. }
            | TurnReport::Completed { turn_id, .. }
            | TurnReport::Failed { turn_id, .. }
            | TurnReport::Cancelled { turn_id } => turn_id,
        }
    }
}
