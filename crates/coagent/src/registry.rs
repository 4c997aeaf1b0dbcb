use std::collections::HashMap;
use std::sync::Arc;

use coagent_engine::EngineSet;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::agent::{AgentConfig, AgentInfo, LogMessage, Priority, QueuedMessage, SteerMode};
use crate::bus::Bus;
use crate::config::RuntimeConfig;
use crate::error::{CoreError, CoreResult};
use crate::runtime::{spawn_agent_runtime, AgentHandle, QueueState, SteerOutcome};

/// Every agent this process runs, addressed by id. Owned by the composition
/// root and shared with the transport.
#[derive(Clone)]
pub struct AgentRegistry {
    agents: Arc<Mutex<HashMap<String, AgentHandle>>>,
    engines: EngineSet,
    bus: Bus,
    config: RuntimeConfig,
}

impl AgentRegistry {
    pub fn new(engines: EngineSet, bus: Bus, config: RuntimeConfig) -> Self {
        Self {
            agents: Arc::new(Mutex::new(HashMap::new())),
            engines,
            bus,
            config,
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub async fn start_agent(&self, config: AgentConfig) -> CoreResult<AgentInfo> {
        if config.name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "agent name must not be empty".to_string(),
            ));
        }
        let engine = self.engines.get(config.agent_type).ok_or_else(|| {
            CoreError::InvalidInput(format!("no engine available for {}", config.agent_type))
        })?;

        let agent_id = Uuid::new_v4().to_string();
        let prompt = config
            .prompt
            .clone()
            .filter(|prompt| !prompt.trim().is_empty());
        tracing::info!(
            %agent_id,
            name = %config.name,
            agent_type = %config.agent_type,
            "starting agent"
        );

        let handle = spawn_agent_runtime(
            agent_id.clone(),
            config,
            engine,
            self.bus.clone(),
            self.config.clone(),
        );
        self.agents.lock().await.insert(agent_id, handle.clone());

        if let Some(prompt) = prompt {
            handle.send_message(prompt).await?;
        }
        handle.info().await
    }

    pub async fn stop_agent(&self, agent_id: &str) -> CoreResult<()> {
        self.handle(agent_id).await?.stop().await
    }

    /// Every known agent, oldest first. Stopped agents stay listed.
    pub async fn list_agents(&self) -> Vec<AgentInfo> {
        let handles: Vec<AgentHandle> = self.agents.lock().await.values().cloned().collect();
        let mut agents = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.info().await {
                Ok(info) => agents.push(info),
                Err(error) => {
                    tracing::warn!(agent_id = handle.agent_id(), "agent info unavailable: {error}");
                }
            }
        }
        agents.sort_by(|left, right| {
            left.started_at
                .cmp(&right.started_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        agents
    }

    pub async fn get_agent(&self, agent_id: &str) -> CoreResult<Option<AgentInfo>> {
        let handle = self.agents.lock().await.get(agent_id).cloned();
        match handle {
            Some(handle) => handle.info().await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn handle(&self, agent_id: &str) -> CoreResult<AgentHandle> {
        self.agents
            .lock()
            .await
            .get(agent_id)
            .cloned()
            .ok_or_else(|| CoreError::AgentNotFound(agent_id.to_string()))
    }

    pub async fn get_messages(&self, agent_id: &str) -> CoreResult<Vec<LogMessage>> {
        self.handle(agent_id).await?.messages().await
    }

    pub async fn send_message(&self, agent_id: &str, text: String) -> CoreResult<SteerOutcome> {
        self.handle(agent_id).await?.send_message(text).await
    }

    pub async fn send_steer_message(
        &self,
        agent_id: &str,
        text: String,
    ) -> CoreResult<SteerOutcome> {
        self.handle(agent_id).await?.send_steer_message(text).await
    }

    pub async fn queue_message(
        &self,
        agent_id: &str,
        text: String,
        priority: Option<Priority>,
    ) -> CoreResult<QueuedMessage> {
        self.handle(agent_id)
            .await?
            .queue_message(text, priority.unwrap_or_default())
            .await
    }

    pub async fn set_steer_mode(&self, agent_id: &str, mode: SteerMode) -> CoreResult<()> {
        self.handle(agent_id).await?.set_steer_mode(mode).await
    }

    pub async fn interrupt_agent(&self, agent_id: &str) -> CoreResult<()> {
        self.handle(agent_id).await?.interrupt().await.map(|_| ())
    }

    pub async fn clear_queue(&self, agent_id: &str) -> CoreResult<usize> {
        self.handle(agent_id).await?.clear_queue().await
    }

    pub async fn remove_queued_message(&self, agent_id: &str, message_id: &str) -> CoreResult<bool> {
        self.handle(agent_id)
            .await?
            .remove_queued_message(message_id)
            .await
    }

    pub async fn get_queue_state(&self, agent_id: &str) -> CoreResult<QueueState> {
        self.handle(agent_id).await?.queue_state().await
    }

    pub async fn process_queue(&self, agent_id: &str) -> CoreResult<bool> {
        self.handle(agent_id).await?.process_queue().await
    }

    pub async fn select_queued_message(
        &self,
        agent_id: &str,
        index: Option<usize>,
    ) -> CoreResult<Option<usize>> {
        self.handle(agent_id)
            .await?
            .select_queued_message(index)
            .await
    }
}
