//! Room registry: who hosts which rendezvous id and which joiners are in it.
//!
//! Every socket owns an outbox; the registry only routes frames between
//! outboxes and never touches a socket directly.

use log::{debug, info};
use pocket_uno::net::{
    HOST_PEER, PeerId,
    ids::room_code_of,
    relay::{RelayErrorCode, RelayFrame},
};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

pub type Outbox = UnboundedSender<RelayFrame>;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum RoomError {
    #[error("no room named {0}")]
    NotFound(String),
    #[error("room {0} is already hosted")]
    Taken(String),
    #[error("relay is hosting its limit of {0} rooms")]
    Full(usize),
    #[error("not a room name: {0}")]
    BadName(String),
}

impl RoomError {
    /// The error frame sent back to the requesting socket.
    #[must_use]
    pub fn frame(&self) -> RelayFrame {
        let code = match self {
            Self::NotFound(_) => RelayErrorCode::RoomNotFound,
            Self::Taken(_) => RelayErrorCode::RoomTaken,
            Self::Full(_) => RelayErrorCode::RelayFull,
            Self::BadName(_) => RelayErrorCode::BadFrame,
        };
        RelayFrame::error(code, self.to_string())
    }
}

#[derive(Debug)]
struct Room {
    host: Outbox,
    joiners: BTreeMap<PeerId, Outbox>,
    next_peer: PeerId,
}

#[derive(Debug)]
pub struct Rooms {
    rooms: HashMap<String, Room>,
    max_rooms: usize,
}

impl Rooms {
    #[must_use]
    pub fn new(max_rooms: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            max_rooms,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Joiners currently in `room`.
    #[must_use]
    pub fn peers(&self, room: &str) -> Vec<PeerId> {
        self.rooms
            .get(room)
            .map(|r| r.joiners.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Opens `room` with `host` as its owner.
    pub fn open(&mut self, room: &str, host: Outbox) -> Result<(), RoomError> {
        if room_code_of(room).is_none() {
            return Err(RoomError::BadName(room.to_string()));
        }
        if self.rooms.contains_key(room) {
            return Err(RoomError::Taken(room.to_string()));
        }
        if self.rooms.len() >= self.max_rooms {
            return Err(RoomError::Full(self.max_rooms));
        }
        self.rooms.insert(
            room.to_string(),
            Room {
                host,
                joiners: BTreeMap::new(),
                next_peer: HOST_PEER + 1,
            },
        );
        info!("room {room} opened ({} open)", self.rooms.len());
        Ok(())
    }

    /// Adds a joiner to `room`. The joiner hears `connected` before the
    /// host hears `peer_joined`, so nothing the host sends in response can
    /// overtake the handshake reply.
    pub fn join(&mut self, room: &str, outbox: Outbox) -> Result<PeerId, RoomError> {
        let entry = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| RoomError::NotFound(room.to_string()))?;
        let peer = entry.next_peer;
        entry.next_peer += 1;

        let _ = outbox.send(RelayFrame::Connected { peer });
        entry.joiners.insert(peer, outbox);
        let _ = entry.host.send(RelayFrame::PeerJoined { peer });
        info!("peer {peer} joined room {room}");
        Ok(peer)
    }

    /// Routes host data: to one joiner, or to every joiner but `except`.
    pub fn from_host(&self, room: &str, to: Option<PeerId>, except: Option<PeerId>, data: &str) {
        let Some(entry) = self.rooms.get(room) else {
            return;
        };
        for (&peer, outbox) in &entry.joiners {
            let wanted = match to {
                Some(target) => peer == target,
                None => Some(peer) != except,
            };
            if wanted {
                let frame = RelayFrame::Data {
                    from: HOST_PEER,
                    data: data.to_string(),
                };
                if outbox.send(frame).is_err() {
                    debug!("peer {peer} of room {room} is closing, dropping data");
                }
            }
        }
    }

    /// Routes joiner data to the host.
    pub fn to_host(&self, room: &str, peer: PeerId, data: &str) {
        let Some(entry) = self.rooms.get(room) else {
            debug!("room {room} is gone, dropping data from peer {peer}");
            return;
        };
        let frame = RelayFrame::Data {
            from: peer,
            data: data.to_string(),
        };
        if entry.host.send(frame).is_err() {
            debug!("host of room {room} is closing, dropping data");
        }
    }

    /// Host left: the room closes and every joiner is told the host is gone.
    pub fn close(&mut self, room: &str, host: &Outbox) {
        let owned = self
            .rooms
            .get(room)
            .is_some_and(|entry| entry.host.same_channel(host));
        if !owned {
            return;
        }
        if let Some(entry) = self.rooms.remove(room) {
            for outbox in entry.joiners.values() {
                let _ = outbox.send(RelayFrame::PeerLeft { peer: HOST_PEER });
            }
            info!(
                "room {room} closed, {} joiners dropped ({} open)",
                entry.joiners.len(),
                self.rooms.len()
            );
        }
    }

    /// Joiner left: the host is told which peer is gone.
    pub fn leave(&mut self, room: &str, peer: PeerId, outbox: &Outbox) {
        let Some(entry) = self.rooms.get_mut(room) else {
            return;
        };
        if !entry
            .joiners
            .get(&peer)
            .is_some_and(|mine| mine.same_channel(outbox))
        {
            return;
        }
        entry.joiners.remove(&peer);
        let _ = entry.host.send(RelayFrame::PeerLeft { peer });
        info!("peer {peer} left room {room}");
    }
}
