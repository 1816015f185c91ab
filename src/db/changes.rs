use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

/// Emitted after a write has been committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    AccountCreated(Uuid),
    PlantCreated(Uuid),
    PlantUpdated(Uuid),
    PlantDeleted(Uuid),
    CareEventCreated { plant_id: Uuid, id: Uuid },
}

pub struct ChangeFeed {
    tx: broadcast::Sender<StoreChange>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }

    pub fn publish(&self, change: StoreChange) {
        // No subscribers is fine.
        let _ = self.tx.send(change);
        tracing::trace!(?change, "store change published");
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
