use spark_core::model::{ChatMessageId, GoalId, TaskId};
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber before it starts lagging.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Change notification emitted after a successful store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreEvent {
    TaskCreated(TaskId),
    TaskUpdated(TaskId),
    TaskDeleted(TaskId),
    GoalCreated(GoalId),
    GoalUpdated(GoalId),
    GoalDeleted(GoalId),
    ProfileSaved,
    PreferencesSaved,
    ChatMessagePosted(ChatMessageId),
    ChatCleared,
}

/// Fan-out channel shared by every store.
///
/// Publishing never waits on subscribers; a subscriber that falls more than
/// the channel capacity behind receives `RecvError::Lagged`.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: StoreEvent) {
        // No subscribers is fine.
        let delivered = self.tx.send(event).unwrap_or(0);
        tracing::trace!(?event, delivered, "store event");
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
