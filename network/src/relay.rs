// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process room relay.
//!
//! Behaves like the room server: every socket first receives the room id as
//! a text frame, binary frames are forwarded to the other member, existing
//! members hear `Joined` when someone enters and `Disconnected` when a member
//! leaves, and the keep-alive probe is echoed back.

use crate::protocol::{Frame, GameMessage, PING_PAYLOAD};
use crate::transport::{Connection, Connector, Transport, TransportError, TransportEvent};
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Maximum number of sockets in one room
pub const ROOM_CAPACITY: usize = 2;

struct Member {
    id: Uuid,
    tx: Sender<TransportEvent>,
}

#[derive(Default)]
struct Rooms {
    rooms: HashMap<String, Vec<Member>>,
}

impl Rooms {
    fn members(&self, room: &str) -> &[Member] {
        self.rooms.get(room).map(Vec::as_slice).unwrap_or(&[])
    }

    fn broadcast_except(&self, room: &str, sender: Uuid, event: TransportEvent) {
        for member in self.members(room).iter().filter(|m| m.id != sender) {
            let _ = member.tx.send(event.clone());
        }
    }

    fn remove(&mut self, room: &str, id: Uuid) -> Option<Member> {
        let members = self.rooms.get_mut(room)?;
        let idx = members.iter().position(|m| m.id == id)?;
        let member = members.remove(idx);
        if members.is_empty() {
            self.rooms.remove(room);
        }
        Some(member)
    }
}

/// Shared relay; clones talk to the same set of rooms
#[derive(Clone, Default)]
pub struct MemoryRelay {
    inner: Arc<Mutex<Rooms>>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sockets currently in `room`
    pub fn occupancy(&self, room: &str) -> usize {
        self.inner.lock().members(room).len()
    }

    /// Drop every socket in `room` as if the network failed.
    ///
    /// Members receive `Closed` and nothing else.
    pub fn sever(&self, room: &str) {
        let members = self.inner.lock().rooms.remove(room).unwrap_or_default();
        tracing::debug!(room_id = room, members = members.len(), "Severing room");
        for member in members {
            let _ = member.tx.send(TransportEvent::Closed);
        }
    }
}

fn notice(message: GameMessage) -> Option<TransportEvent> {
    match message.to_frame() {
        Ok(frame) => Some(TransportEvent::Frame(frame)),
        Err(e) => {
            tracing::error!("Failed to encode relay notice: {}", e);
            None
        }
    }
}

impl Connector for MemoryRelay {
    fn connect(&self, room: Option<&str>) -> Result<Connection, TransportError> {
        let room_id = room
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let id = Uuid::new_v4();
        let (tx, rx) = unbounded();

        let mut rooms = self.inner.lock();
        if rooms.members(&room_id).len() >= ROOM_CAPACITY {
            return Err(TransportError::RoomFull(room_id));
        }
        let _ = tx.send(TransportEvent::Frame(Frame::Text(room_id.clone())));
        if let Some(joined) = notice(GameMessage::Joined) {
            rooms.broadcast_except(&room_id, id, joined);
        }
        rooms
            .rooms
            .entry(room_id.clone())
            .or_default()
            .push(Member { id, tx });
        drop(rooms);

        tracing::debug!(room_id = %room_id, member = %id, "Joined relay room");
        Ok(Connection {
            transport: Box::new(MemoryTransport {
                relay: self.inner.clone(),
                room_id,
                id,
                closed: AtomicBool::new(false),
            }),
            events: rx,
        })
    }
}

struct MemoryTransport {
    relay: Arc<Mutex<Rooms>>,
    room_id: String,
    id: Uuid,
    closed: AtomicBool,
}

impl Transport for MemoryTransport {
    fn send(&self, frame: Frame) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let rooms = self.relay.lock();
        let Some(me) = rooms.members(&self.room_id).iter().find(|m| m.id == self.id) else {
            return Err(TransportError::Closed);
        };
        match frame {
            Frame::Text(text) if text == PING_PAYLOAD => {
                let _ = me.tx.send(TransportEvent::Frame(Frame::Text(text)));
            }
            frame => {
                rooms.broadcast_except(&self.room_id, self.id, TransportEvent::Frame(frame));
            }
        }
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut rooms = self.relay.lock();
        if rooms.remove(&self.room_id, self.id).is_some() {
            if let Some(left) = notice(GameMessage::Disconnected) {
                rooms.broadcast_except(&self.room_id, self.id, left);
            }
        }
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next_message(connection: &Connection) -> GameMessage {
        match connection.events.try_recv() {
            Ok(TransportEvent::Frame(Frame::Binary(bytes))) => GameMessage::from_bytes(&bytes).unwrap(),
            other => panic!("expected a binary frame, got {:?}", other),
        }
    }

    #[test]
    fn room_id_comes_first() {
        let relay = MemoryRelay::new();
        let host = relay.connect(None).unwrap();
        let Ok(TransportEvent::Frame(Frame::Text(room))) = host.events.try_recv() else {
            panic!("room id expected");
        };
        assert_eq!(relay.occupancy(&room), 1);

        let guest = relay.connect(Some(&room)).unwrap();
        assert_eq!(
            guest.events.try_recv(),
            Ok(TransportEvent::Frame(Frame::Text(room.clone())))
        );
        assert_eq!(next_message(&host), GameMessage::Joined);
        assert!(matches!(
            relay.connect(Some(&room)),
            Err(TransportError::RoomFull(_))
        ));
    }

    #[test]
    fn forwards_binary_and_echoes_ping() {
        let relay = MemoryRelay::new();
        let host = relay.connect(Some("r")).unwrap();
        let guest = relay.connect(Some("r")).unwrap();
        let _ = host.events.try_iter().count();
        let _ = guest.events.try_iter().count();

        guest
            .transport
            .send(GameMessage::RequestRematch.to_frame().unwrap())
            .unwrap();
        assert_eq!(next_message(&host), GameMessage::RequestRematch);
        assert!(guest.events.try_recv().is_err());

        host.transport.send(Frame::Text(PING_PAYLOAD.to_string())).unwrap();
        assert_eq!(
            host.events.try_recv(),
            Ok(TransportEvent::Frame(Frame::Text(PING_PAYLOAD.to_string())))
        );
        assert!(guest.events.try_recv().is_err());
    }

    #[test]
    fn leaving_notifies_the_other_member() {
        let relay = MemoryRelay::new();
        let host = relay.connect(Some("r")).unwrap();
        let guest = relay.connect(Some("r")).unwrap();
        let _ = host.events.try_iter().count();

        guest.transport.close();
        assert_eq!(next_message(&host), GameMessage::Disconnected);
        assert_eq!(relay.occupancy("r"), 1);
        assert_eq!(
            guest.transport.send(Frame::Text("x".into())),
            Err(TransportError::Closed)
        );
    }

    #[test]
    fn severing_closes_everyone() {
        let relay = MemoryRelay::new();
        let host = relay.connect(Some("r")).unwrap();
        let _ = host.events.try_iter().count();
        relay.sever("r");
        assert_eq!(host.events.try_recv(), Ok(TransportEvent::Closed));
        assert_eq!(relay.occupancy("r"), 0);
        assert_eq!(
            host.transport.send(Frame::Text(PING_PAYLOAD.into())),
            Err(TransportError::Closed)
        );
    }
}
