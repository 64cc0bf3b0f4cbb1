//! Broadcast event bus for distributing `RunEvent` to observers.
//!
//! Built on `tokio::sync::broadcast`. Publishing with no active subscribers
//! is a no-op, and the orchestrator never waits for a subscriber.

use cardflow_types::event::RunEvent;
use tokio::sync::broadcast;

/// Multi-consumer bus handed to the orchestrator at construction.
///
/// Cloning the bus clones the sender, so a renderer can keep its own handle
/// and subscribe whenever it likes.
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn streaming(content: &str) -> RunEvent {
        RunEvent::MessageStreaming {
            conversation_id: Uuid::now_v7(),
            message_id: Uuid::now_v7(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_and_subscribe_delivers_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(streaming("hello"));

        let received = rx.recv().await.unwrap();
        assert!(matches!(received, RunEvent::MessageStreaming { ref content, .. } if content == "hello"));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_receive_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.clone().subscribe();
        assert_eq!(bus.receiver_count(), 2);

        bus.publish(streaming("x"));

        assert_eq!(rx1.recv().await.unwrap().name(), "message-streaming");
        assert_eq!(rx2.recv().await.unwrap().name(), "message-streaming");
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.publish(streaming("a"));
        bus.publish(streaming("b"));
    }

    #[tokio::test]
    async fn test_lagged_receiver_handles_gracefully() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        for i in 0..10 {
            bus.publish(streaming(&format!("chunk {i}")));
        }

        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(n)) => assert!(n > 0),
            Ok(_) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_debug_format_works() {
        let bus = EventBus::default();
        let _rx = bus.subscribe();
        let debug = format!("{bus:?}");
        assert!(debug.contains("EventBus"));
        assert!(debug.contains("receiver_count"));
    }
}
