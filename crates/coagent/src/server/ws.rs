use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use crate::server::protocol::handle_text;
use crate::server::ServerState;

pub(crate) async fn ws_handler(
    State(state): State<Arc<ServerState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

#[tracing::instrument(skip_all)]
async fn handle_socket(state: Arc<ServerState>, socket: WebSocket) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    tracing::debug!("runtime client connected");

    while let Some(Ok(message)) = ws_stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let response = handle_text(&state.registry, &text).await;
        let payload = match serde_json::to_string(&response) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!("failed to encode runtime response: {error}");
                continue;
            }
        };
        if ws_sink.send(Message::Text(payload)).await.is_err() {
            break;
        }
    }

    tracing::debug!("runtime client disconnected");
}
