//! Topic-based event bus implementation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tokio::sync::broadcast;

use super::types::{ActionEvent, ReplicationPacket};

/// Topics for event routing
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Topic {
    /// Execution outcomes, presentation cues and sweeps
    Actions,
    /// Encoded replication batches for observers
    Replication,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Action(ActionEvent),
    Replication(ReplicationPacket),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Action(_) => Topic::Actions,
            Event::Replication(_) => Topic::Replication,
        }
    }

    /// Pretty JSON rendering for debug dumps.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Topic-based event bus
///
/// Consumers subscribe to specific topics and only receive events they care
/// about. Every topic channel is created up front, so publishing and
/// subscribing never lock.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<HashMap<Topic, broadcast::Sender<Event>>>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let channels = Topic::iter()
            .map(|topic| (topic, broadcast::channel(capacity.max(1)).0))
            .collect();

        Self {
            channels: Arc::new(channels),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if let Some(tx) = self.channels.get(&topic)
            && tx.send(event).is_err()
        {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!(%topic, "no subscribers");
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels
            .get(&topic)
            .map(broadcast::Sender::subscribe)
            .unwrap_or_else(|| broadcast::channel(1).1)
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use actions_core::{EntityId, GameTime};

    use super::*;

    #[tokio::test]
    async fn events_only_reach_their_topic() {
        let bus = EventBus::with_capacity(8);
        let mut actions = bus.subscribe(Topic::Actions);
        let mut replication = bus.subscribe(Topic::Replication);

        bus.publish(Event::Action(ActionEvent::Unhandled {
            performer: EntityId(1),
            action: EntityId(2),
        }));
        bus.publish(Event::Action(ActionEvent::CooldownsSwept {
            time: GameTime::ZERO,
            evicted: 0,
        }));

        assert_eq!(actions.recv().await.unwrap().topic(), Topic::Actions);
        assert!(replication.try_recv().is_err());
    }
}
