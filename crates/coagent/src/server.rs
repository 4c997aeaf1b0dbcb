use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

use crate::registry::AgentRegistry;

pub mod events;
pub mod protocol;
pub mod ws;

pub struct Server {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Server {
    /// Bind `addr` and serve `/ws`, `/events` and `/health` in the background.
    pub async fn start(registry: AgentRegistry, addr: SocketAddr) -> std::io::Result<Self> {
        let state = Arc::new(ServerState { registry });
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        let app = Router::new()
            .route("/health", get(health))
            .route("/ws", get(ws::ws_handler))
            .route("/events", get(events::stream_events))
            .with_state(state)
            .layer(cors);
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(error) = served {
                tracing::error!("server stopped with error: {error}");
            }
        });
        tracing::info!(%addr, "coagent server listening");

        Ok(Server {
            addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&mut self) -> Result<(), String> {
        if let Some(sender) = self.shutdown.take() {
            sender
                .send(())
                .map_err(|_| "failed to send server shutdown signal".to_string())
        } else {
            Ok(())
        }
    }

    /// Wait for the serve task to finish after [`Server::shutdown`].
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

async fn health() -> &'static str {
    "ok"
}

pub(crate) struct ServerState {
    pub(crate) registry: AgentRegistry,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use coagent_engine::{EngineKind, EngineSet, ScriptedEngine};
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    use super::*;
    use crate::agent::AgentConfig;
    use crate::bus::Bus;
    use crate::config::RuntimeConfig;

    fn test_registry() -> AgentRegistry {
        AgentRegistry::new(
            EngineSet::new().with(Arc::new(ScriptedEngine::echo(EngineKind::Claude))),
            Bus::new(64),
            RuntimeConfig::default(),
        )
    }

    async fn test_server() -> Server {
        Server::start(test_registry(), SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("start")
    }

    /// Read from `stream` until the accumulated text satisfies `done`.
    async fn read_until(stream: &mut TcpStream, buf: &mut String, done: impl Fn(&str) -> bool) {
        timeout(Duration::from_secs(2), async {
            let mut chunk = [0u8; 1024];
            while !done(buf.as_str()) {
                let read = stream.read(&mut chunk).await.expect("read");
                assert!(read > 0, "connection closed early: {buf}");
                buf.push_str(&String::from_utf8_lossy(&chunk[..read]));
            }
        })
        .await
        .expect("expected data in time");
    }

    #[tokio::test]
    async fn start_binds_random_port() {
        let mut server = test_server().await;
        assert_ne!(server.addr().port(), 0);
        server.shutdown().expect("shutdown");
        timeout(Duration::from_secs(2), server.join())
            .await
            .expect("server stopped");
    }

    type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn exchange(socket: &mut ClientSocket, text: String) -> Value {
        socket.send(Message::Text(text)).await.expect("send");
        let reply = timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("reply in time")
            .expect("open")
            .expect("frame");
        let Message::Text(reply) = reply else {
            panic!("expected text frame, got {reply:?}");
        };
        serde_json::from_str(&reply).expect("json reply")
    }

    #[tokio::test]
    async fn websocket_round_trip() {
        let mut server = test_server().await;
        let (mut socket, _) = connect_async(format!("ws://{}/ws", server.addr()))
            .await
            .expect("connect");

        let started = exchange(
            &mut socket,
            json!({
                "type": "start_agent",
                "config": {"agent_type": "claude", "name": "writer", "working_dir": "/tmp"}
            })
            .to_string(),
        )
        .await;
        assert_eq!(started["type"], "agent");
        assert_eq!(started["agent"]["status"], "idle");

        let malformed = exchange(&mut socket, "{oops".to_string()).await;
        assert_eq!(malformed["type"], "error");

        let listed = exchange(&mut socket, json!({"type": "list_agents"}).to_string()).await;
        assert_eq!(listed["type"], "agents");
        assert_eq!(listed["agents"][0]["name"], "writer");

        server.shutdown().expect("shutdown");
    }

    #[tokio::test]
    async fn event_stream_round_trip() {
        let registry = test_registry();
        let mut server = Server::start(registry.clone(), SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("start");
        let mut stream = TcpStream::connect(server.addr()).await.expect("connect");
        stream
            .write_all(
                b"GET /events HTTP/1.1\r\nHost: localhost\r\nAccept: text/event-stream\r\n\r\n",
            )
            .await
            .expect("request");

        let mut received = String::new();
        read_until(&mut stream, &mut received, |text| text.contains("\r\n\r\n")).await;
        assert!(received.starts_with("HTTP/1.1 200"), "{received}");
        assert!(received.contains("text/event-stream"), "{received}");

        let agent = registry
            .start_agent(AgentConfig {
                agent_type: EngineKind::Claude,
                name: "writer".to_string(),
                working_dir: "/tmp".to_string(),
                prompt: Some("hello".to_string()),
                model: None,
            })
            .await
            .expect("start agent");

        read_until(&mut stream, &mut received, |text| {
            text.contains("event: message_appended") && text.contains("echo: hello")
        })
        .await;
        assert!(received.contains("event: status_changed"), "{received}");
        assert!(received.contains(&agent.id), "{received}");

        server.shutdown().expect("shutdown");
    }
}
