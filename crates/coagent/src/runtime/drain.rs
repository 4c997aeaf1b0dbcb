//! Background loop that feeds queued messages to an agent one turn at a time.
//!
//! The loop never touches the queue itself. Each step asks the actor to pop
//! the head and start its turn in one command, so a message is either
//! dispatched or still queued, never both, and `clear` can not race a pop.

use std::time::Duration;

use crate::agent::AgentStatus;
use crate::runtime::handle::AgentHandle;
use crate::runtime::protocol::AgentCommand;
use crate::runtime::types::{DrainOutcome, DrainStep};

pub(crate) fn spawn_drain(handle: AgentHandle, timeout: Duration, stop_on_error: bool) {
    tokio::spawn(async move {
        let (outcome, dispatched) = drain(&handle, timeout, stop_on_error).await;
        tracing::debug!(
            agent_id = handle.agent_id(),
            ?outcome,
            dispatched,
            "queue drain finished"
        );
        handle.notify(AgentCommand::DrainFinished {
            outcome,
            dispatched,
        });
    });
}

async fn drain(
    handle: &AgentHandle,
    timeout: Duration,
    stop_on_error: bool,
) -> (DrainOutcome, usize) {
    let mut dispatched = 0;
    loop {
        let step = match handle.drain_next().await {
            Ok(step) => step,
            Err(error) => {
                tracing::warn!(agent_id = handle.agent_id(), "queue drain failed: {error}");
                return (DrainOutcome::Failed, dispatched);
            }
        };

        let ran_turn = match step {
            DrainStep::Empty => return (DrainOutcome::Empty, dispatched),
            DrainStep::Stopped => return (DrainOutcome::AgentStopped, dispatched),
            DrainStep::Busy => false,
            DrainStep::Dispatched { message, turn_id } => {
                tracing::debug!(
                    agent_id = handle.agent_id(),
                    message_id = %message.id,
                    %turn_id,
                    "dispatched queued message"
                );
                dispatched += 1;
                true
            }
        };

        let Some(status) = handle.wait_until_at_rest(timeout).await else {
            tracing::warn!(
                agent_id = handle.agent_id(),
                "turn did not finish within {}s",
                timeout.as_secs()
            );
            return (DrainOutcome::TimedOut, dispatched);
        };

        match status {
            AgentStatus::Stopped => return (DrainOutcome::AgentStopped, dispatched),
            AgentStatus::Error if ran_turn && stop_on_error => {
                return (DrainOutcome::HaltedOnError, dispatched)
            }
            _ => {}
        }
    }
}
