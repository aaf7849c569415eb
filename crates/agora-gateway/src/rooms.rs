use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use agora_types::events::GatewayEvent;

/// Per-process room membership for the live delivery channel. Join and
/// broadcast are the whole surface, so a shared pub/sub backplane can stand
/// in for the in-memory maps in a multi-process deployment.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RoomRegistryInner>,
}

struct RoomRegistryInner {
    /// Per-connection outbound event channels: conn_id -> sender
    connections: RwLock<HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>>,

    /// Room membership: conversation id -> member conn_ids
    rooms: RwLock<HashMap<String, HashSet<Uuid>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RoomRegistryInner {
                connections: RwLock::new(HashMap::new()),
                rooms: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a connection. Returns (conn_id, receiver).
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.connections.write().await.insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Drop a connection and its membership in every room. There is no
    /// explicit leave operation; disconnection is it.
    pub async fn unregister(&self, conn_id: Uuid) {
        self.inner.connections.write().await.remove(&conn_id);

        let mut rooms = self.inner.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// Add a connection to a room. Joining the same room twice is a no-op.
    pub async fn join(&self, conn_id: Uuid, room: &str) {
        self.inner
            .rooms
            .write()
            .await
            .entry(room.to_string())
            .or_default()
            .insert(conn_id);
    }

    /// Send an event to every member of a room, the initiating connection
    /// included if it joined.
    pub async fn broadcast_to(&self, room: &str, event: GatewayEvent) {
        let rooms = self.inner.rooms.read().await;
        let Some(members) = rooms.get(room) else {
            return;
        };

        let connections = self.inner.connections.read().await;
        for conn_id in members {
            if let Some(tx) = connections.get(conn_id) {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Send an event to a single connection.
    pub async fn send_to(&self, conn_id: Uuid, event: GatewayEvent) {
        let connections = self.inner.connections.read().await;
        if let Some(tx) = connections.get(&conn_id) {
            let _ = tx.send(event);
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
