use tokio::sync::broadcast;

use crate::event::AgentEvent;

/// Fan-out of agent events to every subscriber.
///
/// Publishing never blocks; events are dropped when nobody is subscribed and
/// slow subscribers observe `Lagged` instead of holding back the runtime.
#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<AgentEvent>,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: AgentEvent) {
        tracing::trace!(agent_id = event.agent_id(), event = event.name(), "publish");
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentStatus;
    use tokio::time::{timeout, Duration};

    fn test_event() -> AgentEvent {
        AgentEvent::StatusChanged {
            agent_id: "agent-1".to_string(),
            status: AgentStatus::Running,
        }
    }

    #[tokio::test]
    async fn publish_and_receive_event() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(test_event());

        let received = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("timeout")
            .expect("recv");
        assert_eq!(received, test_event());
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_event() {
        let bus = Bus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(test_event());

        assert_eq!(rx1.recv().await.expect("recv1").agent_id(), "agent-1");
        assert_eq!(rx2.recv().await.expect("recv2").agent_id(), "agent-1");
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = Bus::new(0);
        bus.publish(test_event());
    }
}
