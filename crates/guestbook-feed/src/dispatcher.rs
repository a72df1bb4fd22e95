use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use guestbook_types::events::FeedEvent;

/// Capacity of the broadcast ring; slower receivers see `Lagged` and skip ahead.
const BROADCAST_CAPACITY: usize = 1024;

/// Fans ledger events out to every connected feed client.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<FeedEvent>,
    connections: RwLock<HashSet<Uuid>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: RwLock::new(HashSet::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish to all subscribers. No subscribers is not an error.
    pub fn broadcast(&self, event: FeedEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    pub async fn register_connection(&self) -> Uuid {
        let conn_id = Uuid::new_v4();
        self.inner.connections.write().await.insert(conn_id);
        conn_id
    }

    pub async fn unregister_connection(&self, conn_id: Uuid) {
        self.inner.connections.write().await.remove(&conn_id);
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.len()
    }
}
