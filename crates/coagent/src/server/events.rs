use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::server::ServerState;

#[tracing::instrument(skip_all)]
pub(crate) async fn stream_events(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.registry.bus().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|message| match message {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(payload) => Some(Ok(Event::default().event(event.name()).data(payload))),
            Err(error) => {
                tracing::warn!("failed to encode {} event: {error}", event.name());
                None
            }
        },
        // Lagged subscribers skip what they missed.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
