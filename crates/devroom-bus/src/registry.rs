//! Room membership and fan-out
//!
//! Rooms live in a concurrent map; each member is a handle around a
//! bounded channel whose receiver the owning client drains. Fan-out walks
//! the room and awaits each member's channel in turn, which preserves
//! sender-path FIFO without giving any cross-sender guarantee.

use crate::event::BusEvent;
use dashmap::DashMap;
use tokio::sync::mpsc;
use ulid::Ulid;

/// Unique connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub Ulid);

impl ConnectionId {
    /// Generate a new connection ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One registered connection: identity plus its delivery channel
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    sender: mpsc::Sender<BusEvent>,
}

impl Connection {
    /// Create a connection and the receiver its owner drains
    #[must_use]
    pub fn open(capacity: usize) -> (Self, mpsc::Receiver<BusEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                id: ConnectionId::new(),
                sender: tx,
            },
            rx,
        )
    }

    /// Connection ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Registry of rooms and their live connections
#[derive(Debug, Default)]
pub struct SessionRegistry {
    rooms: DashMap<String, Vec<Connection>>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under a room
    pub fn join(&self, room: &str, connection: Connection) {
        tracing::debug!(%room, connection = %connection.id, "connection joined room");
        self.rooms.entry(room.to_owned()).or_default().push(connection);
    }

    /// Deregister a connection; idempotent, unknown rooms and absent
    /// connections are ignored
    pub fn leave(&self, room: &str, connection: ConnectionId) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            let before = members.len();
            members.retain(|member| member.id != connection);
            if members.len() < before {
                tracing::debug!(%room, %connection, "connection left room");
            }
        }
    }

    /// Number of live connections in a room
    #[must_use]
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, |members| members.len())
    }

    /// Deliver an event to every member of the room except the sender.
    ///
    /// Returns the number of deliveries. Unknown or empty rooms deliver to
    /// nobody. Members whose receiver is gone are pruned instead of
    /// failing the publish.
    pub async fn publish(&self, room: &str, from: ConnectionId, event: &BusEvent) -> usize {
        // Snapshot the membership so no map shard is held across an await.
        let members: Vec<Connection> = match self.rooms.get(room) {
            Some(members) => members.value().clone(),
            None => return 0,
        };

        let mut delivered = 0;
        let mut stale = Vec::new();
        for member in &members {
            if member.id == from {
                continue;
            }
            match member.sender.send(event.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => stale.push(member.id),
            }
        }

        if !stale.is_empty() {
            tracing::debug!(%room, count = stale.len(), "pruning connections with closed receivers");
            if let Some(mut members) = self.rooms.get_mut(room) {
                members.retain(|member| !stale.contains(&member.id));
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn publish_skips_the_sender() {
        let registry = SessionRegistry::new();
        let (a, mut a_rx) = Connection::open(8);
        let (b, mut b_rx) = Connection::open(8);
        let a_id = a.id();
        registry.join("P1", a);
        registry.join("P1", b);

        let event = BusEvent::project_message("user-a", "hi");
        let delivered = registry.publish("P1", a_id, &event).await;

        assert_eq!(delivered, 1);
        assert_eq!(b_rx.try_recv().unwrap(), event);
        assert!(a_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_room_is_a_no_op() {
        let registry = SessionRegistry::new();
        let event = BusEvent::project_message("u", "m");
        let delivered = registry
            .publish("nowhere", ConnectionId::new(), &event)
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn rooms_scope_delivery() {
        let registry = SessionRegistry::new();
        let (a, _a_rx) = Connection::open(8);
        let (b, mut b_rx) = Connection::open(8);
        let (c, mut c_rx) = Connection::open(8);
        let a_id = a.id();
        registry.join("P1", a);
        registry.join("P1", b);
        registry.join("P2", c);

        registry
            .publish("P1", a_id, &BusEvent::project_message("u", "m"))
            .await;

        assert!(b_rx.try_recv().is_ok());
        assert!(c_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_is_idempotent() {
        let registry = SessionRegistry::new();
        let (a, _a_rx) = Connection::open(8);
        let a_id = a.id();
        registry.join("P1", a);

        registry.leave("P1", a_id);
        registry.leave("P1", a_id);
        registry.leave("ghost-room", a_id);

        assert_eq!(registry.member_count("P1"), 0);
    }

    #[tokio::test]
    async fn sender_path_fifo_is_preserved() {
        let registry = SessionRegistry::new();
        let (a, _a_rx) = Connection::open(8);
        let (b, mut b_rx) = Connection::open(8);
        let a_id = a.id();
        registry.join("P1", a);
        registry.join("P1", b);

        for n in 0..5 {
            registry
                .publish("P1", a_id, &BusEvent::project_message("u", &n.to_string()))
                .await;
        }
        for n in 0..5 {
            assert_eq!(b_rx.try_recv().unwrap().payload["message"], n.to_string());
        }
    }

    #[tokio::test]
    async fn closed_receivers_are_pruned() {
        let registry = SessionRegistry::new();
        let (a, _a_rx) = Connection::open(8);
        let (b, b_rx) = Connection::open(8);
        let a_id = a.id();
        registry.join("P1", a);
        registry.join("P1", b);
        drop(b_rx);

        let delivered = registry
            .publish("P1", a_id, &BusEvent::project_message("u", "m"))
            .await;

        assert_eq!(delivered, 0);
        assert_eq!(registry.member_count("P1"), 1);
    }
}
