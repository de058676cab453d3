//! Connection-group map: the engine's only view of live connections.
//!
//! Connections belong to exactly one logical group at a time -- the
//! lobby on connect, a room after create/join. Delivery is
//! fire-and-forget: a dead recipient never fails the caller and never
//! blocks delivery to the rest of the group.

use actix::prelude::*;
use dashmap::DashMap;
use tracing::warn;
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Group a fresh connection belongs to before joining a room.
pub const LOBBY: &str = "lobby";

pub type ConnId = Uuid;

/// Serialized frame pushed to a session actor.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Outbound(pub String);

/// Broadcast port consumed by the session engine.
pub trait RoomHub: Send + Sync {
    fn associate(&self, group: &str, conn: ConnId);
    fn dissociate(&self, conn: ConnId);
    /// Re-home a connection, e.g. lobby -> room on join.
    fn move_to_group(&self, group: &str, conn: ConnId);
    fn broadcast(&self, group: &str, msg: &ServerMsg);
    fn send(&self, conn: ConnId, msg: &ServerMsg);
}

#[derive(Default)]
pub struct WsHub {
    connections: DashMap<ConnId, Recipient<Outbound>>,
    groups: DashMap<String, DashMap<ConnId, ()>>,
    membership: DashMap<ConnId, String>,
}

impl WsHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly opened socket into the lobby group.
    pub fn register(&self, conn: ConnId, recipient: Recipient<Outbound>) {
        self.connections.insert(conn, recipient);
        self.associate(LOBBY, conn);
    }

    /// Drop a closed socket from the registry and its group.
    pub fn unregister(&self, conn: ConnId) {
        self.dissociate(conn);
        self.connections.remove(&conn);
    }

    fn encode(msg: &ServerMsg) -> Option<String> {
        match serde_json::to_string(msg) {
            Ok(payload) => Some(payload),
            Err(err) => {
                warn!(error = %err, "failed to serialize outbound message");
                None
            }
        }
    }
}

impl RoomHub for WsHub {
    fn associate(&self, group: &str, conn: ConnId) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(conn, ());
        self.membership.insert(conn, group.to_string());
    }

    fn dissociate(&self, conn: ConnId) {
        if let Some((_, group)) = self.membership.remove(&conn) {
            if let Some(members) = self.groups.get(&group) {
                members.remove(&conn);
            }
            // The emptiness check and the removal happen under one shard
            // lock; a concurrent associate can never be removed with the
            // group.
            self.groups.remove_if(&group, |_, members| members.is_empty());
        }
    }

    fn move_to_group(&self, group: &str, conn: ConnId) {
        self.dissociate(conn);
        self.associate(group, conn);
    }

    fn broadcast(&self, group: &str, msg: &ServerMsg) {
        let Some(payload) = Self::encode(msg) else {
            return;
        };
        if let Some(members) = self.groups.get(group) {
            for member in members.iter() {
                if let Some(recipient) = self.connections.get(member.key()) {
                    recipient.do_send(Outbound(payload.clone()));
                }
            }
        }
    }

    fn send(&self, conn: ConnId, msg: &ServerMsg) {
        let Some(payload) = Self::encode(msg) else {
            return;
        };
        if let Some(recipient) = self.connections.get(&conn) {
            recipient.do_send(Outbound(payload));
        }
    }
}
