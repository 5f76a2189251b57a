use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{FloorEvent, TableId};

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for floor events, one channel per table.
pub struct NotifyHub {
    channels: DashMap<TableId, broadcast::Sender<FloorEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a table. Creates the channel if needed.
    pub fn subscribe(&self, table_id: TableId) -> broadcast::Receiver<FloorEvent> {
        let sender = self
            .channels
            .entry(table_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send an event to its table's subscribers. No-op if nobody is listening.
    pub fn send(&self, event: FloorEvent) {
        if let Some(sender) = self.channels.get(&event.table_id()) {
            let _ = sender.send(event);
        }
    }

    /// Drop channels nobody listens to anymore.
    pub fn prune(&self) {
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableStatus;

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe(3);

        let event = FloorEvent::TableStatusChanged {
            table_id: 3,
            from: TableStatus::Free,
            to: TableStatus::Reserved,
        };
        hub.send(event.clone());

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn events_stay_on_their_table() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe(1);
        hub.send(FloorEvent::TableStatusChanged {
            table_id: 2,
            from: TableStatus::Free,
            to: TableStatus::Occupied,
        });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        hub.send(FloorEvent::TableStatusChanged {
            table_id: 9,
            from: TableStatus::Free,
            to: TableStatus::Occupied,
        });
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn prune_drops_abandoned_channels() {
        let hub = NotifyHub::new();
        let rx = hub.subscribe(1);
        let _keep = hub.subscribe(2);
        drop(rx);
        hub.prune();
        assert_eq!(hub.channel_count(), 1);
    }
}
