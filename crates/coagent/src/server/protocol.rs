//! JSON request/response protocol spoken over `/ws`.

use serde::{Deserialize, Serialize};

use crate::agent::{AgentConfig, AgentInfo, LogMessage, Priority, QueuedMessage, SteerMode};
use crate::error::CoreResult;
use crate::registry::AgentRegistry;
use crate::runtime::QueueState;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeMessage {
    StartAgent {
        config: AgentConfig,
    },
    StopAgent {
        agent_id: String,
    },
    ListAgents,
    GetAgent {
        agent_id: String,
    },
    SendMessage {
        agent_id: String,
        message: String,
    },
    QueueMessage {
        agent_id: String,
        message: String,
        #[serde(default)]
        priority: Option<Priority>,
    },
    SendSteerMessage {
        agent_id: String,
        message: String,
    },
    SetSteerMode {
        agent_id: String,
        mode: SteerMode,
    },
    InterruptAgent {
        agent_id: String,
    },
    ClearQueue {
        agent_id: String,
    },
    RemoveQueuedMessage {
        agent_id: String,
        message_id: String,
    },
    GetQueueState {
        agent_id: String,
    },
    ProcessQueue {
        agent_id: String,
    },
    SelectQueuedMessage {
        agent_id: String,
        #[serde(default)]
        index: Option<usize>,
    },
    GetMessages {
        agent_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeResponse {
    Agent { agent: AgentInfo },
    Agents { agents: Vec<AgentInfo> },
    AgentOptional { agent: Option<AgentInfo> },
    Success,
    Queued { message: QueuedMessage },
    QueueState { state: QueueState },
    Messages { messages: Vec<LogMessage> },
    Error { message: String },
}

impl RuntimeResponse {
    fn from_result<T>(result: CoreResult<T>, respond: impl FnOnce(T) -> Self) -> Self {
        match result {
            Ok(value) => respond(value),
            Err(error) => RuntimeResponse::Error {
                message: error.to_string(),
            },
        }
    }
}

/// Parse one text frame and run it. Malformed requests produce an error
/// response instead of closing the connection.
pub async fn handle_text(registry: &AgentRegistry, text: &str) -> RuntimeResponse {
    match serde_json::from_str::<RuntimeMessage>(text) {
        Ok(message) => dispatch(registry, message).await,
        Err(error) => {
            tracing::debug!("rejecting malformed request: {error}");
            RuntimeResponse::Error {
                message: format!("invalid request: {error}"),
            }
        }
    }
}

pub async fn dispatch(registry: &AgentRegistry, message: RuntimeMessage) -> RuntimeResponse {
    use RuntimeResponse as R;

    match message {
        RuntimeMessage::StartAgent { config } => {
            R::from_result(registry.start_agent(config).await, |agent| R::Agent { agent })
        }
        RuntimeMessage::StopAgent { agent_id } => {
            R::from_result(registry.stop_agent(&agent_id).await, |_| R::Success)
        }
        RuntimeMessage::ListAgents => R::Agents {
            agents: registry.list_agents().await,
        },
        RuntimeMessage::GetAgent { agent_id } => {
            R::from_result(registry.get_agent(&agent_id).await, |agent| {
                R::AgentOptional { agent }
            })
        }
        RuntimeMessage::SendMessage { agent_id, message } => {
            R::from_result(registry.send_message(&agent_id, message).await, |_| {
                R::Success
            })
        }
        RuntimeMessage::QueueMessage {
            agent_id,
            message,
            priority,
        } => R::from_result(
            registry.queue_message(&agent_id, message, priority).await,
            |message| R::Queued { message },
        ),
        RuntimeMessage::SendSteerMessage { agent_id, message } => R::from_result(
            registry.send_steer_message(&agent_id, message).await,
            |_| R::Success,
        ),
        RuntimeMessage::SetSteerMode { agent_id, mode } => {
            R::from_result(registry.set_steer_mode(&agent_id, mode).await, |_| {
                R::Success
            })
        }
        RuntimeMessage::InterruptAgent { agent_id } => {
            R::from_result(registry.interrupt_agent(&agent_id).await, |_| R::Success)
        }
        RuntimeMessage::ClearQueue { agent_id } => {
            R::from_result(registry.clear_queue(&agent_id).await, |_| R::Success)
        }
        RuntimeMessage::RemoveQueuedMessage {
            agent_id,
            message_id,
        } => R::from_result(
            registry.remove_queued_message(&agent_id, &message_id).await,
            |_| R::Success,
        ),
        RuntimeMessage::GetQueueState { agent_id } => {
            R::from_result(registry.get_queue_state(&agent_id).await, |state| {
                R::QueueState { state }
            })
        }
        RuntimeMessage::ProcessQueue { agent_id } => {
            R::from_result(registry.process_queue(&agent_id).await, |_| R::Success)
        }
        RuntimeMessage::SelectQueuedMessage { agent_id, index } => R::from_result(
            registry.select_queued_message(&agent_id, index).await,
            |_| R::Success,
        ),
        RuntimeMessage::GetMessages { agent_id } => {
            R::from_result(registry.get_messages(&agent_id).await, |messages| {
                R::Messages { messages }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use coagent_engine::{EngineKind, EngineSet, ScriptedEngine};
    use serde_json::json;

    use super::*;
    use crate::bus::Bus;
    use crate::config::RuntimeConfig;

    fn test_registry() -> AgentRegistry {
        AgentRegistry::new(
            EngineSet::new().with(Arc::new(ScriptedEngine::echo(EngineKind::Claude))),
            Bus::new(64),
            RuntimeConfig::default(),
        )
    }

    async fn start(registry: &AgentRegistry) -> AgentInfo {
        let response = handle_text(
            registry,
            r#"{"type":"start_agent","config":{"agent_type":"claude","name":"writer","working_dir":"/tmp"}}"#,
        )
        .await;
        match response {
            RuntimeResponse::Agent { agent } => agent,
            other => panic!("expected agent, got {other:?}"),
        }
    }

    #[test]
    fn parses_requests_with_optional_fields() {
        let message: RuntimeMessage = serde_json::from_value(json!({
            "type": "queue_message",
            "agent_id": "a1",
            "message": "later",
        }))
        .unwrap();
        assert_eq!(
            message,
            RuntimeMessage::QueueMessage {
                agent_id: "a1".to_string(),
                message: "later".to_string(),
                priority: None,
            }
        );

        let message: RuntimeMessage = serde_json::from_value(json!({
            "type": "set_steer_mode",
            "agent_id": "a1",
            "mode": "immediate",
        }))
        .unwrap();
        assert_eq!(
            message,
            RuntimeMessage::SetSteerMode {
                agent_id: "a1".to_string(),
                mode: SteerMode::Immediate,
            }
        );
    }

    #[test]
    fn responses_are_type_tagged() {
        assert_eq!(
            serde_json::to_value(RuntimeResponse::Success).unwrap(),
            json!({ "type": "success" })
        );
        assert_eq!(
            serde_json::to_value(RuntimeResponse::Error {
                message: "agent stopped".to_string()
            })
            .unwrap(),
            json!({ "type": "error", "message": "agent stopped" })
        );
    }

    #[tokio::test]
    async fn malformed_request_yields_error_response() {
        let registry = test_registry();

        for text in ["not json", r#"{"type":"launch_rocket"}"#, r#"{"type":"stop_agent"}"#] {
            assert!(matches!(
                handle_text(&registry, text).await,
                RuntimeResponse::Error { ref message } if message.starts_with("invalid request")
            ));
        }
    }

    #[tokio::test]
    async fn unknown_agent_maps_to_error_message() {
        let registry = test_registry();

        let response = dispatch(
            &registry,
            RuntimeMessage::ClearQueue {
                agent_id: "ghost".to_string(),
            },
        )
        .await;

        assert_eq!(
            response,
            RuntimeResponse::Error {
                message: "agent not found: ghost".to_string()
            }
        );
    }

    #[tokio::test]
    async fn queue_flow_over_protocol() {
        let registry = test_registry();
        let agent = start(&registry).await;

        let queued = dispatch(
            &registry,
            RuntimeMessage::QueueMessage {
                agent_id: agent.id.clone(),
                message: "later".to_string(),
                priority: Some(Priority::High),
            },
        )
        .await;
        let RuntimeResponse::Queued { message } = queued else {
            panic!("expected queued, got {queued:?}");
        };
        assert_eq!(message.priority, Priority::High);

        let state = dispatch(
            &registry,
            RuntimeMessage::GetQueueState {
                agent_id: agent.id.clone(),
            },
        )
        .await;
        assert!(matches!(
            state,
            RuntimeResponse::QueueState { ref state } if state.messages.len() == 1
        ));

        let removed = dispatch(
            &registry,
            RuntimeMessage::RemoveQueuedMessage {
                agent_id: agent.id.clone(),
                message_id: "missing".to_string(),
            },
        )
        .await;
        assert_eq!(removed, RuntimeResponse::Success);

        let interrupted = dispatch(
            &registry,
            RuntimeMessage::InterruptAgent {
                agent_id: agent.id.clone(),
            },
        )
        .await;
        assert_eq!(
            interrupted,
            RuntimeResponse::Error {
                message: "agent is not running".to_string()
            }
        );
    }

    #[tokio::test]
    async fn send_message_replies_success_and_starts_turn() {
        let registry = test_registry();
        let agent = start(&registry).await;

        let request = json!({
            "type": "send_message",
            "agent_id": agent.id,
            "message": "hi",
        });
        let response = handle_text(&registry, &request.to_string()).await;

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "type": "success" })
        );
        let log = registry.get_messages(&agent.id).await.expect("messages");
        assert_eq!(log[0].content, "hi");
    }

    #[tokio::test]
    async fn steer_message_replies_success() {
        let registry = test_registry();
        let agent = start(&registry).await;

        let response = dispatch(
            &registry,
            RuntimeMessage::SendSteerMessage {
                agent_id: agent.id.clone(),
                message: "change course".to_string(),
            },
        )
        .await;

        assert_eq!(response, RuntimeResponse::Success);
        assert_eq!(
            dispatch(
                &registry,
                RuntimeMessage::SendMessage {
                    agent_id: "ghost".to_string(),
                    message: "hi".to_string(),
                },
            )
            .await,
            RuntimeResponse::Error {
                message: "agent not found: ghost".to_string()
            }
        );
    }
}
