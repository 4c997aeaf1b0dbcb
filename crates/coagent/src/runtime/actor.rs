
use std::sync::Arc;

use chrono::{DateTime, Utc};
use coagent_engine::{AgentEngine, TurnRequest};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::agent::{
    decide, next_status, AgentConfig, AgentInfo, AgentStatus, InterruptCoordinator,
    InterruptOutcome, LogMessage, MessageQueue, MessageRole, Priority, QueuedMessage, SteerAction,
    SteerMode, Transition,
};
use crate::bus::Bus;
use crate::config::RuntimeConfig;
use crate::error::{CoreError, CoreResult};
use crate::event::AgentEvent;
use crate::runtime::drain::spawn_drain;
use crate::runtime::executor::spawn_turn;
use crate::runtime::handle::AgentHandle;
use crate::runtime::protocol::{AgentCommand, TurnReport};
use crate::runtime::types::{DrainOutcome, DrainStep, QueueState, SteerOutcome};

/// Sole owner of one agent's state. Every mutation arrives as an
/// [`AgentCommand`] and is applied in order.
pub(crate) struct AgentActor {
    agent_id: String,
    config: AgentConfig,
    started_at: DateTime<Utc>,
    /// Released on stop; a stopped agent keeps only its log and queue.
    engine: Option<Arc<dyn AgentEngine>>,
    bus: Bus,
    runtime: RuntimeConfig,
    commands: mpsc::WeakUnboundedSender<AgentCommand>,
    command_rx: mpsc::UnboundedReceiver<AgentCommand>,
    status: AgentStatus,
    status_tx: watch::Sender<AgentStatus>,
    steer_mode: SteerMode,
    queue: MessageQueue,
    selected_index: Option<usize>,
    interrupt: InterruptCoordinator,
    inflight: Option<String>,
    draining: bool,
    messages: Vec<LogMessage>,
}

impl AgentActor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        agent_id: String,
        config: AgentConfig,
        engine: Arc<dyn AgentEngine>,
        bus: Bus,
        runtime: RuntimeConfig,
        commands: mpsc::WeakUnboundedSender<AgentCommand>,
        command_rx: mpsc::UnboundedReceiver<AgentCommand>,
        status_tx: watch::Sender<AgentStatus>,
    ) -> Self {
        let status = *status_tx.borrow();
        Self {
            agent_id,
            config,
            started_at: Utc::now(),
            engine: Some(engine),
            bus,
            runtime,
            commands,
            command_rx,
            status,
            status_tx,
            steer_mode: SteerMode::default(),
            queue: MessageQueue::new(),
            selected_index: None,
            interrupt: InterruptCoordinator::new(),
            inflight: None,
            draining: false,
            messages: Vec::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        tracing::info!(agent_id = %self.agent_id, name = %self.config.name, "agent runtime started");
        while let Some(command) = self.command_rx.recv().await {
            self.handle_command(command);
        }
        self.interrupt.cancel_current();
        tracing::info!(agent_id = %self.agent_id, "agent runtime exited");
    }

    fn handle_command(&mut self, command: AgentCommand) {
        match command {
            AgentCommand::SendMessage {
                text,
                force_steer,
                reply,
            } => {
                let _ = reply.send(self.handle_send_message(text, force_steer));
            }
            AgentCommand::QueueMessage {
                text,
                priority,
                reply,
            } => {
                let _ = reply.send(self.handle_queue_message(text, priority));
            }
            AgentCommand::StartTurn { prompt, reply } => {
                let result = require_text(prompt).and_then(|prompt| self.start_turn(prompt));
                let _ = reply.send(result);
            }
            AgentCommand::SetSteerMode { mode, reply } => {
                self.set_steer_mode(mode);
                let _ = reply.send(Ok(()));
            }
            AgentCommand::Interrupt { reply } => {
                let _ = reply.send(self.request_interrupt());
            }
            AgentCommand::ClearQueue { reply } => {
                let _ = reply.send(Ok(self.clear_queue()));
            }
            AgentCommand::RemoveQueued { message_id, reply } => {
                let _ = reply.send(Ok(self.remove_queued(&message_id)));
            }
            AgentCommand::SelectQueued { index, reply } => {
                self.selected_index = index;
                self.clamp_selection();
                let _ = reply.send(Ok(self.selected_index));
            }
            AgentCommand::QueueState { reply } => {
                let _ = reply.send(self.queue_state());
            }
            AgentCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            AgentCommand::Messages { reply } => {
                let _ = reply.send(self.messages.clone());
            }
            AgentCommand::ProcessQueue { reply } => {
                let _ = reply.send(self.process_queue());
            }
            AgentCommand::Stop { reply } => {
                self.stop();
                let _ = reply.send(Ok(()));
            }
            AgentCommand::DrainNext { reply } => {
                let _ = reply.send(self.drain_next());
            }
            AgentCommand::DrainFinished {
                outcome,
                dispatched,
            } => self.handle_drain_finished(outcome, dispatched),
            AgentCommand::Turn(report) => self.handle_turn_report(report),
        }
    }

    fn handle_send_message(&mut self, text: String, force_steer: bool) -> CoreResult<SteerOutcome> {
        let text = require_text(text)?;
        if self.status == AgentStatus::Stopped {
            return Err(CoreError::AgentStopped);
        }

        let action = if force_steer {
            SteerAction::InterruptAndInject
        } else {
            decide(self.status, self.steer_mode)
        };
        tracing::debug!(agent_id = %self.agent_id, status = %self.status, ?action, "steer decision");

        match action {
            SteerAction::InjectNow => {
                let turn_id = self.start_turn(text)?;
                Ok(SteerOutcome::Started { turn_id })
            }
            SteerAction::Enqueue => {
                let message = self.enqueue(text, Priority::Normal);
                self.kick_drain();
                Ok(SteerOutcome::Queued { message })
            }
            SteerAction::InterruptAndInject => {
                let message = self.enqueue(text, Priority::High);
                let interrupted = match self.request_interrupt() {
                    Ok(_) => true,
                    Err(CoreError::NotRunning) => false,
                    Err(error) => return Err(error),
                };
                self.kick_drain();
                Ok(SteerOutcome::Steered {
                    message,
                    interrupted,
                })
            }
        }
    }

    fn handle_queue_message(&mut self, text: String, priority: Priority) -> CoreResult<QueuedMessage> {
        let text = require_text(text)?;
        if self.status == AgentStatus::Stopped {
            return Err(CoreError::AgentStopped);
        }
        Ok(self.enqueue(text, priority))
    }

    fn enqueue(&mut self, text: String, priority: Priority) -> QueuedMessage {
        let message = self.queue.enqueue(text, priority);
        self.publish(AgentEvent::QueueMessageAdded {
            agent_id: self.agent_id.clone(),
            message: message.clone(),
        });
        message
    }

    fn start_turn(&mut self, prompt: String) -> CoreResult<String> {
        let next = next_status(self.status, Transition::TurnStarted)?;
        let engine = self.engine.clone().ok_or(CoreError::AgentStopped)?;
        let commands = self.upgrade_commands()?;

        let turn_id = Uuid::now_v7().to_string();
        self.append(LogMessage::new(MessageRole::User, prompt.clone()));
        self.set_status(next);
        self.inflight = Some(turn_id.clone());

        let request = TurnRequest {
            agent_id: self.agent_id.clone(),
            turn_id: turn_id.clone(),
            prompt,
            settings: self.config.engine_settings(),
        };
        spawn_turn(
            engine,
            request,
            self.interrupt.turn_token(),
            commands,
        );
        Ok(turn_id)
    }

    fn handle_turn_report(&mut self, report: TurnReport) {
        if self.inflight.as_deref() != Some(report.turn_id()) {
            tracing::debug!(
                agent_id = %self.agent_id,
                turn_id = report.turn_id(),
                "ignoring report for a turn that is no longer in flight"
            );
            return;
        }

        match report {
            TurnReport::Progress { entry, .. } => self.append(entry),
            TurnReport::Completed {
                text,
                awaiting_input,
                ..
            } => {
                if !text.is_empty() {
                    self.append(LogMessage::new(MessageRole::Assistant, text));
                }
                self.finish_turn(Transition::TurnCompleted { awaiting_input });
            }
            TurnReport::Failed { turn_id, error } => {
                tracing::warn!(agent_id = %self.agent_id, %turn_id, "turn failed: {error}");
                self.append(LogMessage::new(
                    MessageRole::System,
                    format!("turn failed: {error}"),
                ));
                self.finish_turn(Transition::TurnFailed);
            }
            TurnReport::Cancelled { .. } => {
                self.append(LogMessage::new(MessageRole::System, "turn interrupted"));
                self.finish_turn(Transition::TurnCancelled);
            }
        }
    }

    fn finish_turn(&mut self, transition: Transition) {
        self.inflight = None;
        let steered = self.interrupt.settle();
        match next_status(self.status, transition) {
            Ok(next) => self.set_status(next),
            Err(error) => {
                tracing::warn!(agent_id = %self.agent_id, "dropping turn outcome: {error}");
            }
        }
        // A pending steer always runs next, even with auto-drain off.
        if steered || self.runtime.auto_drain {
            self.kick_drain();
        }
    }

    fn set_steer_mode(&mut self, mode: SteerMode) {
        if self.steer_mode == mode {
            return;
        }
        self.steer_mode = mode;
        self.publish(AgentEvent::SteerModeChanged {
            agent_id: self.agent_id.clone(),
            mode,
        });
    }

    fn request_interrupt(&mut self) -> CoreResult<InterruptOutcome> {
        let outcome = self.interrupt.request(self.status)?;
        if outcome == InterruptOutcome::Requested {
            tracing::info!(agent_id = %self.agent_id, "interrupt requested");
            self.publish(AgentEvent::AgentInterrupted {
                agent_id: self.agent_id.clone(),
            });
        }
        Ok(outcome)
    }

    fn clear_queue(&mut self) -> usize {
        let removed = self.queue.clear();
        self.selected_index = None;
        self.publish(AgentEvent::QueueCleared {
            agent_id: self.agent_id.clone(),
            removed,
        });
        removed
    }

    fn remove_queued(&mut self, message_id: &str) -> bool {
        let Some(message) = self.queue.remove(message_id) else {
            return false;
        };
        self.publish(AgentEvent::QueueMessageRemoved {
            agent_id: self.agent_id.clone(),
            message_id: message.id,
        });
        self.clamp_selection();
        true
    }

    fn clamp_selection(&mut self) {
        let len = self.queue.len();
        self.selected_index = match self.selected_index {
            Some(index) if len > 0 => Some(index.min(len - 1)),
            _ => None,
        };
    }

    fn queue_state(&self) -> QueueState {
        QueueState {
            messages: self.queue.peek_ordered(),
            steer_mode: self.steer_mode,
            processing: self.draining,
            selected_index: self.selected_index,
        }
    }

    fn info(&self) -> AgentInfo {
        AgentInfo {
            id: self.agent_id.clone(),
            agent_type: self.config.agent_type,
            name: self.config.name.clone(),
            status: self.status,
            working_dir: self.config.working_dir.clone(),
            model: self.config.model.clone(),
            started_at: self.started_at,
            steer_mode: self.steer_mode,
            queue_length: self.queue.len(),
            interrupt_requested: self.interrupt.is_requested(),
        }
    }

    fn process_queue(&mut self) -> CoreResult<bool> {
        if self.status == AgentStatus::Stopped {
            return Err(CoreError::AgentStopped);
        }
        if self.draining {
            return Err(CoreError::AlreadyProcessing);
        }
        if self.status.is_running() {
            return Err(CoreError::TurnInFlight);
        }
        if self.queue.is_empty() {
            return Ok(false);
        }
        self.begin_drain()?;
        Ok(true)
    }

    /// Start the drain loop when there is queued work and nothing would
    /// otherwise pick it up.
    fn kick_drain(&mut self) {
        if self.draining || !self.status.is_at_rest() || self.queue.is_empty() {
            return;
        }
        if let Err(error) = self.begin_drain() {
            tracing::debug!(agent_id = %self.agent_id, "queue drain not started: {error}");
        }
    }

    fn begin_drain(&mut self) -> CoreResult<()> {
        let commands = self.upgrade_commands()?;
        self.draining = true;
        self.publish(AgentEvent::QueueProcessingStarted {
            agent_id: self.agent_id.clone(),
        });
        let handle = AgentHandle::new(self.agent_id.clone(), commands, self.status_tx.subscribe());
        spawn_drain(
            handle,
            self.runtime.drain_timeout,
            self.runtime.drain_stop_on_error,
        );
        Ok(())
    }

    /// Pop the head and start its turn in one step.
    fn drain_next(&mut self) -> CoreResult<DrainStep> {
        if self.status == AgentStatus::Stopped {
            return Ok(DrainStep::Stopped);
        }
        if self.status.is_running() || self.interrupt.is_requested() {
            return Ok(DrainStep::Busy);
        }
        self.upgrade_commands()?;
        let Some(message) = self.queue.pop_front() else {
            return Ok(DrainStep::Empty);
        };

        self.publish(AgentEvent::QueueMessageRemoved {
            agent_id: self.agent_id.clone(),
            message_id: message.id.clone(),
        });
        self.clamp_selection();

        let turn_id = self.start_turn(message.content.clone())?;
        Ok(DrainStep::Dispatched { message, turn_id })
    }

    fn handle_drain_finished(&mut self, outcome: DrainOutcome, dispatched: usize) {
        self.draining = false;
        self.publish(AgentEvent::QueueProcessingCompleted {
            agent_id: self.agent_id.clone(),
            outcome,
            dispatched,
        });
        // Work queued while the loop was wrapping up found it still running.
        if outcome == DrainOutcome::Empty {
            self.kick_drain();
        }
    }

    fn stop(&mut self) {
        if self.status == AgentStatus::Stopped {
            return;
        }
        self.interrupt.cancel_current();
        self.interrupt.settle();
        self.inflight = None;
        self.engine = None;
        self.set_status(AgentStatus::Stopped);
        self.append(LogMessage::new(MessageRole::System, "agent stopped"));
        tracing::info!(agent_id = %self.agent_id, "agent stopped");
    }

    fn set_status(&mut self, next: AgentStatus) {
        if self.status == next {
            return;
        }
        tracing::debug!(agent_id = %self.agent_id, from = %self.status, to = %next, "status changed");
        self.status = next;
        self.status_tx.send_replace(next);
        self.publish(AgentEvent::StatusChanged {
            agent_id: self.agent_id.clone(),
            status: next,
        });
    }

    fn append(&mut self, entry: LogMessage) {
        self.messages.push(entry.clone());
        self.publish(AgentEvent::MessageAppended {
            agent_id: self.agent_id.clone(),
            message: entry,
        });
    }

    fn publish(&self, event: AgentEvent) {
        self.bus.publish(event);
    }

    fn upgrade_commands(&self) -> CoreResult<mpsc::UnboundedSender<AgentCommand>> {
        self.commands
            .upgrade()
            .ok_or_else(|| CoreError::Internal("agent runtime is shutting down".to_string()))
    }
}

fn require_text(text: String) -> CoreResult<String> {
    if text.trim().is_empty() {
        return Err(CoreError::InvalidInput(
            "message text must not be empty".to_string(),
        ));
    }
    Ok(text)
}
