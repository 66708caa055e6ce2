//! Room registry.
//!
//! # Responsibilities
//! - Map room ids to their controller and viewer sets
//! - Create rooms on first join, delete them on last leave
//! - Deliver a payload to a snapshot of one role set
//!
//! # Design Decisions
//! - `DashMap` shard locks serialize mutations per room key
//! - Emptiness is rechecked under the shard lock (`remove_if`), so a join
//!   racing a leave never loses its room
//! - Recipients are copied out before sending; no lock is held while delivering
//! - Delivery is `try_send`: a full or closed peer queue drops that frame

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::observability::metrics;
use crate::relay::connection::ConnectionId;
use crate::relay::message::{RelayFrame, RelayPayload, Role};

/// Outbound queue of one connection.
pub type PeerSender = mpsc::Sender<RelayFrame>;

/// Membership of one room.
#[derive(Debug, Default)]
pub struct Room {
    controllers: HashMap<ConnectionId, PeerSender>,
    viewers: HashMap<ConnectionId, PeerSender>,
}

impl Room {
    fn members(&self, role: Role) -> &HashMap<ConnectionId, PeerSender> {
        match role {
            Role::Controller => &self.controllers,
            Role::Viewer => &self.viewers,
        }
    }

    fn members_mut(&mut self, role: Role) -> &mut HashMap<ConnectionId, PeerSender> {
        match role {
            Role::Controller => &mut self.controllers,
            Role::Viewer => &mut self.viewers,
        }
    }

    pub fn count(&self, role: Role) -> usize {
        self.members(role).len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty() && self.viewers.is_empty()
    }
}

/// Controller and viewer counts of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberCounts {
    pub controllers: usize,
    pub viewers: usize,
}

/// Result of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
}

/// All rooms of this process.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the room for `room_id`, creating it empty if absent.
    ///
    /// The guard holds the room's shard lock until dropped.
    fn ensure_room(&self, room_id: &str) -> RefMut<'_, String, Room> {
        self.rooms.entry(room_id.to_owned()).or_default()
    }

    /// Register a connection. It stays registered until the returned
    /// [`Membership`] is dropped.
    pub fn join(
        self: &Arc<Self>,
        room_id: &str,
        role: Role,
        id: ConnectionId,
        sender: PeerSender,
    ) -> Membership {
        self.ensure_room(room_id)
            .members_mut(role)
            .insert(id, sender);
        metrics::set_relay_rooms(self.rooms.len());

        tracing::debug!(connection_id = %id, room = %room_id, role = %role, "Joined room");

        Membership {
            registry: Arc::clone(self),
            room_id: room_id.to_owned(),
            role,
            id,
        }
    }

    /// Remove a connection; delete the room once both sets are empty.
    ///
    /// Returns true if the connection was registered.
    pub fn leave(&self, room_id: &str, role: Role, id: ConnectionId) -> bool {
        let removed = match self.rooms.get_mut(room_id) {
            Some(mut room) => room.members_mut(role).remove(&id).is_some(),
            None => false,
        };

        if self.rooms.remove_if(room_id, |_, room| room.is_empty()).is_some() {
            tracing::debug!(room = %room_id, "Room emptied and removed");
        }
        metrics::set_relay_rooms(self.rooms.len());

        removed
    }

    pub fn contains_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn member_counts(&self, room_id: &str) -> Option<MemberCounts> {
        self.rooms.get(room_id).map(|room| MemberCounts {
            controllers: room.count(Role::Controller),
            viewers: room.count(Role::Viewer),
        })
    }

    /// Snapshot of the `role` set of a room.
    pub fn recipients(&self, room_id: &str, role: Role) -> Vec<(ConnectionId, PeerSender)> {
        self.rooms
            .get(room_id)
            .map(|room| {
                room.members(role)
                    .iter()
                    .map(|(id, sender)| (*id, sender.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deliver `payload` to every member of its audience in `room_id`.
    pub fn broadcast(
        &self,
        room_id: &str,
        payload: RelayPayload,
    ) -> Result<Delivery, serde_json::Error> {
        let audience = payload.audience();
        let frame = payload.into_frame()?;
        let mut delivery = Delivery::default();

        for (id, sender) in self.recipients(room_id, audience) {
            match sender.try_send(frame.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(connection_id = %id, room = %room_id, "Peer queue full, frame dropped");
                    delivery.dropped += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::trace!(connection_id = %id, room = %room_id, "Peer closing, frame dropped");
                    delivery.dropped += 1;
                }
            }
        }

        Ok(delivery)
    }
}

/// Scoped registration of one connection in one room.
///
/// Dropping it leaves the room exactly once.
#[derive(Debug)]
pub struct Membership {
    registry: Arc<RoomRegistry>,
    room_id: String,
    role: Role,
    id: ConnectionId,
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.registry.leave(&self.room_id, self.role, self.id);
        tracing::debug!(connection_id = %self.id, room = %self.room_id, "Left room");
    }
}
