use std::sync::Arc;
use std::time::Duration;

use coagent_engine::AgentEngine;
use tokio::sync::{mpsc, oneshot, watch};

use crate::agent::{
    AgentConfig, AgentInfo, AgentStatus, InterruptOutcome, LogMessage, Priority, QueuedMessage,
    SteerMode,
};
use crate::bus::Bus;
use crate::config::RuntimeConfig;
use crate::error::{CoreError, CoreResult};
use crate::runtime::actor::AgentActor;
use crate::runtime::protocol::AgentCommand;
use crate::runtime::types::{DrainStep, QueueState, SteerOutcome};

/// Cheap, cloneable address of one agent's actor.
#[derive(Clone)]
pub struct AgentHandle {
    agent_id: String,
    commands: mpsc::UnboundedSender<AgentCommand>,
    status_rx: watch::Receiver<AgentStatus>,
}

impl AgentHandle {
    pub(crate) fn new(
        agent_id: String,
        commands: mpsc::UnboundedSender<AgentCommand>,
        status_rx: watch::Receiver<AgentStatus>,
    ) -> Self {
        Self {
            agent_id,
            commands,
            status_rx,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Latest status published by the actor.
    pub fn status(&self) -> AgentStatus {
        *self.status_rx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<AgentStatus> {
        self.status_rx.clone()
    }

    /// Route a message through the steer policy.
    pub async fn send_message(&self, text: impl Into<String>) -> CoreResult<SteerOutcome> {
        let text = text.into();
        self.request(|reply| AgentCommand::SendMessage {
            text,
            force_steer: false,
            reply,
        })
        .await?
    }

    /// Queue at high priority and interrupt the running turn, whatever the
    /// steer mode.
    pub async fn send_steer_message(&self, text: impl Into<String>) -> CoreResult<SteerOutcome> {
        let text = text.into();
        self.request(|reply| AgentCommand::SendMessage {
            text,
            force_steer: true,
            reply,
        })
        .await?
    }

    pub async fn queue_message(
        &self,
        text: impl Into<String>,
        priority: Priority,
    ) -> CoreResult<QueuedMessage> {
        let text = text.into();
        self.request(|reply| AgentCommand::QueueMessage {
            text,
            priority,
            reply,
        })
        .await?
    }

    /// Start a turn directly, bypassing the steer policy. Returns the turn id.
    pub async fn start_turn(&self, prompt: impl Into<String>) -> CoreResult<String> {
        let prompt = prompt.into();
        self.request(|reply| AgentCommand::StartTurn { prompt, reply })
            .await?
    }

    pub async fn set_steer_mode(&self, mode: SteerMode) -> CoreResult<()> {
        self.request(|reply| AgentCommand::SetSteerMode { mode, reply })
            .await?
    }

    pub async fn interrupt(&self) -> CoreResult<InterruptOutcome> {
        self.request(|reply| AgentCommand::Interrupt { reply }).await?
    }

    pub async fn clear_queue(&self) -> CoreResult<usize> {
        self.request(|reply| AgentCommand::ClearQueue { reply }).await?
    }

    /// Returns whether an entry was removed.
    pub async fn remove_queued_message(&self, message_id: impl Into<String>) -> CoreResult<bool> {
        let message_id = message_id.into();
        self.request(|reply| AgentCommand::RemoveQueued { message_id, reply })
            .await?
    }

    pub async fn select_queued_message(&self, index: Option<usize>) -> CoreResult<Option<usize>> {
        self.request(|reply| AgentCommand::SelectQueued { index, reply })
            .await?
    }

    pub async fn queue_state(&self) -> CoreResult<QueueState> {
        self.request(|reply| AgentCommand::QueueState { reply }).await
    }

    pub async fn info(&self) -> CoreResult<AgentInfo> {
        self.request(|reply| AgentCommand::Info { reply }).await
    }

    pub async fn messages(&self) -> CoreResult<Vec<LogMessage>> {
        self.request(|reply| AgentCommand::Messages { reply }).await
    }

    /// Start the drain loop. `Ok(false)` when the queue was empty.
    pub async fn process_queue(&self) -> CoreResult<bool> {
        self.request(|reply| AgentCommand::ProcessQueue { reply })
            .await?
    }

    pub async fn stop(&self) -> CoreResult<()> {
        self.request(|reply| AgentCommand::Stop { reply }).await?
    }

    /// Wait for the agent to leave `running`. `None` if `limit` elapsed first.
    /// An actor that has gone away counts as stopped.
    pub async fn wait_until_at_rest(&self, limit: Duration) -> Option<AgentStatus> {
        let mut status_rx = self.status_rx.clone();
        let waited = tokio::time::timeout(limit, async move {
            match status_rx.wait_for(|status| !status.is_running()).await {
                Ok(status) => *status,
                Err(_) => AgentStatus::Stopped,
            }
        })
        .await;
        waited.ok()
    }

    pub(crate) async fn drain_next(&self) -> CoreResult<DrainStep> {
        self.request(|reply| AgentCommand::DrainNext { reply }).await?
    }

    pub(crate) fn notify(&self, command: AgentCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!(agent_id = %self.agent_id, "agent runtime already stopped");
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> AgentCommand,
    ) -> CoreResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .map_err(|_| CoreError::Internal("agent runtime stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| CoreError::Internal("agent runtime dropped response".to_string()))
    }
}

/// Spawn the actor task for one agent and return its handle.
pub fn spawn_agent_runtime(
    agent_id: String,
    config: AgentConfig,
    engine: Arc<dyn AgentEngine>,
    bus: Bus,
    runtime: RuntimeConfig,
) -> AgentHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(AgentStatus::Idle);

    let actor = AgentActor::new(
        agent_id.clone(),
        config,
        engine,
        bus,
        runtime,
        command_tx.downgrade(),
        command_rx,
        status_tx,
    );

    tokio::spawn(async move {
        actor.run().await;
    });

    AgentHandle::new(agent_id, command_tx, status_rx)
}
