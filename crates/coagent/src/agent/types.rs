use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use coagent_engine::{EngineKind, EngineSettings};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Running,
    Stopped,
    Error,
    WaitingForInput,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Running => "running",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Error => "error",
            AgentStatus::WaitingForInput => "waiting_for_input",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, AgentStatus::Running)
    }

    /// No turn is in flight and the agent can still take work.
    pub fn is_at_rest(&self) -> bool {
        !matches!(self, AgentStatus::Running | AgentStatus::Stopped)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How messages sent while the agent is busy are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteerMode {
    /// Interrupt the running turn and run the new message next.
    Immediate,
    /// Hold the message until the running turn ends.
    #[default]
    Queue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

/// One entry of an agent's append-only message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl LogMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Operator request to start a new agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub agent_type: EngineKind,
    pub name: String,
    pub working_dir: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl AgentConfig {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            working_dir: PathBuf::from(&self.working_dir),
            model: self.model.clone(),
        }
    }
}

/// Read-only projection of an agent handed to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub agent_type: EngineKind,
    pub name: String,
    pub status: AgentStatus,
    pub working_dir: String,
    pub model: Option<String>,
    pub started_at: DateTime<Utc>,
    pub steer_mode: SteerMode,
    pub queue_length: usize,
    pub interrupt_requested: bool,
}
