// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two peers playing through a room relay.
//!
//! Each side runs its own engine. The host deals, sends the state once with
//! `Initialize`, and from then on peers exchange numbered actions only. Our
//! own actions are applied optimistically before they are sent; the peer's
//! actions go through our engine, and one it rejects ends the game with
//! `Errored`. When a peer rejoins, whichever side still holds a snapshot
//! re-sends it.

use super::{GameSession, SessionCore, SessionError, SessionEvent, Submitted};
use crate::config::{HeartbeatConfig, SessionConfig};
use crate::connection::{ConnectionEvent, ConnectionStateMachine, ConnectionStatus, Heartbeat};
use crate::protocol::{Frame, GameMessage, ProtocolError, PING_PAYLOAD};
use crate::transport::{Connection, Connector, TransportEvent};
use onitama_core::{Action, Engine, GameSnapshot, Player};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

/// Which side of the room we opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created the room, plays Red and deals every game
    Host,
    /// Joined an existing room; learns its seat from `Initialize`
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => write!(f, "host"),
            Role::Guest => write!(f, "guest"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Rematch {
    local: bool,
    remote: bool,
}

pub struct RemoteSession {
    core: SessionCore,
    connector: Box<dyn Connector>,
    link: Option<Connection>,
    machine: ConnectionStateMachine,
    role: Role,
    player: Option<Player>,
    room_id: Option<String>,
    /// Next sequence number we send
    send_seq: u32,
    /// Next sequence number we expect
    recv_seq: u32,
    rematch: Rematch,
}

impl RemoteSession {
    /// Open a new room and wait for a guest
    pub fn host(
        engine: Arc<dyn Engine>,
        connector: Box<dyn Connector>,
        config: &SessionConfig,
        now: Instant,
    ) -> Result<Self, SessionError> {
        Self::open(engine, connector, config.heartbeat, Role::Host, None, now)
    }

    /// Join the room `room_id`
    pub fn join(
        engine: Arc<dyn Engine>,
        connector: Box<dyn Connector>,
        room_id: &str,
        config: &SessionConfig,
        now: Instant,
    ) -> Result<Self, SessionError> {
        Self::open(
            engine,
            connector,
            config.heartbeat,
            Role::Guest,
            Some(room_id.to_string()),
            now,
        )
    }

    fn open(
        engine: Arc<dyn Engine>,
        connector: Box<dyn Connector>,
        heartbeat: HeartbeatConfig,
        role: Role,
        room_id: Option<String>,
        now: Instant,
    ) -> Result<Self, SessionError> {
        let link = connector.connect(room_id.as_deref())?;
        tracing::info!(%role, room_id = ?room_id, "Opening remote session");
        Ok(Self {
            core: SessionCore::new(engine, "remote"),
            connector,
            link: Some(link),
            machine: ConnectionStateMachine::new(heartbeat, now),
            role,
            player: match role {
                Role::Host => Some(Player::Red),
                Role::Guest => None,
            },
            room_id,
            send_seq: 0,
            recv_seq: 0,
            rematch: Rematch::default(),
        })
    }

    pub fn status(&self) -> ConnectionStatus {
        self.machine.status()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Our seat, once known
    pub fn player(&self) -> Option<Player> {
        self.player
    }

    /// Room id, once the relay has told us
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// Handle everything the transport has delivered so far; returns the
    /// number of transport events consumed
    pub fn pump(&mut self, now: Instant) -> usize {
        let Some(link) = &self.link else {
            return 0;
        };
        let events: Vec<TransportEvent> = link.events.try_iter().collect();
        let count = events.len();
        for (idx, event) in events.iter().enumerate() {
            let initialize_follows = events[idx + 1..].iter().any(carries_initialize);
            self.on_event(event.clone(), initialize_follows, now);
            if self.link.is_none() {
                break;
            }
        }
        count
    }

    /// Keep-alive; call periodically
    pub fn tick(&mut self, now: Instant) {
        match self.machine.tick(now) {
            Heartbeat::Idle => {}
            Heartbeat::Probe => {
                let sent = self
                    .link
                    .as_ref()
                    .map(|link| link.transport.send(Frame::Text(PING_PAYLOAD.to_string())));
                if let Some(Err(e)) = sent {
                    tracing::warn!(error = %e, "Keep-alive probe failed");
                    self.lose_link();
                }
            }
            Heartbeat::TimedOut => {
                self.teardown();
                self.core.publish(SessionEvent::Connection(self.machine.status()));
                self.core.report("Connection timed out");
            }
        }
    }

    /// Open a fresh transport to the same room after `Disconnected` or
    /// `Errored`
    pub fn reconnect(&mut self, now: Instant) -> Result<(), SessionError> {
        self.machine.reconnect(now)?;
        self.teardown();
        self.send_seq = 0;
        self.recv_seq = 0;
        self.rematch = Rematch::default();
        self.core.publish(SessionEvent::Connection(self.machine.status()));

        match self.connector.connect(self.room_id.as_deref()) {
            Ok(link) => {
                tracing::info!(room_id = ?self.room_id, attempt = self.machine.attempt(), "Reconnected transport");
                self.link = Some(link);
                Ok(())
            }
            Err(e) => {
                self.transition(ConnectionEvent::Closed);
                self.core.report(format!("Reconnect failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Leave the room
    pub fn close(&mut self) {
        let before = self.machine.status();
        self.teardown();
        self.machine.shut_down();
        if before != self.machine.status() {
            self.core.publish(SessionEvent::Connection(self.machine.status()));
        }
    }

    fn teardown(&mut self) {
        if let Some(link) = self.link.take() {
            link.transport.close();
        }
    }

    /// The transport failed under us
    fn lose_link(&mut self) {
        self.link = None;
        self.transition(ConnectionEvent::Closed);
        self.core.report("Connection lost");
    }

    fn on_event(&mut self, event: TransportEvent, initialize_follows: bool, now: Instant) {
        self.machine.record_traffic(now);
        match event {
            TransportEvent::Closed => self.lose_link(),
            TransportEvent::Frame(Frame::Text(text)) if text == PING_PAYLOAD => {}
            TransportEvent::Frame(Frame::Text(text)) => {
                if self.machine.status() == ConnectionStatus::Connecting {
                    tracing::info!(room_id = %text, "Entered room");
                    self.room_id = Some(text);
                    self.transition(ConnectionEvent::Opened {
                        with_payload: initialize_follows,
                    });
                } else {
                    self.violation(ProtocolError::UnexpectedText(text));
                }
            }
            TransportEvent::Frame(Frame::Binary(_))
                if matches!(
                    self.machine.status(),
                    ConnectionStatus::Errored | ConnectionStatus::Disconnected
                ) =>
            {
                tracing::debug!(status = %self.machine.status(), "Dropped frame after the game ended");
            }
            TransportEvent::Frame(Frame::Binary(bytes)) => {
                let handled = GameMessage::from_bytes(&bytes).and_then(|message| self.on_message(message));
                if let Err(e) = handled {
                    self.violation(e);
                }
            }
        }
    }

    fn on_message(&mut self, message: GameMessage) -> Result<(), ProtocolError> {
        match message {
            GameMessage::Joined => {
                tracing::info!(room_id = ?self.room_id, "Peer joined");
                let state = match (self.core.state(), self.role) {
                    (Some(state), _) => state,
                    (None, Role::Host) => {
                        let state = self.core.engine().new_game();
                        self.core.start(state)
                    }
                    // The host deals
                    (None, Role::Guest) => return Ok(()),
                };
                self.send_initialize(&state);
                self.transition(ConnectionEvent::PeerPayload);
            }
            GameMessage::Disconnected => {
                self.transition(ConnectionEvent::PeerLeft);
                if self.machine.status() == ConnectionStatus::OpponentDisconnected {
                    self.core.report("Opponent disconnected");
                }
            }
            GameMessage::Initialize { state, room_id, player } => {
                if let Some(current) = self.player {
                    if current != player {
                        return Err(ProtocolError::RoleChanged {
                            current,
                            requested: player,
                        });
                    }
                }
                tracing::info!(%player, room_id = %room_id, turn = %state.turn, "Received initial state");
                self.player = Some(player);
                if self.room_id.is_none() {
                    self.room_id = Some(room_id);
                }
                let fresh = self.core.state().is_none() || self.rematch.local;
                self.send_seq = 0;
                self.recv_seq = 0;
                self.rematch = Rematch::default();
                if fresh {
                    self.core.start(state);
                } else {
                    self.core.replace(state);
                }
                self.transition(ConnectionEvent::PeerPayload);
            }
            GameMessage::Move { seq, action } => {
                if seq != self.recv_seq {
                    return Err(ProtocolError::SequenceGap {
                        expected: self.recv_seq,
                        got: seq,
                    });
                }
                let current = self.core.state().ok_or(ProtocolError::NotStarted("Move"))?;
                if Some(current.turn) == self.player {
                    return Err(ProtocolError::OutOfTurn);
                }
                match self.core.apply(&action) {
                    Ok(_) => {
                        tracing::debug!(seq, ?action, "Applied peer action");
                        self.recv_seq += 1;
                    }
                    Err(SessionError::Illegal(e)) => return Err(ProtocolError::PeerRejected(e)),
                    Err(e) => return Err(ProtocolError::PeerFault(e.to_string())),
                }
            }
            GameMessage::RequestRematch => {
                tracing::info!(role = %self.role, "Peer requested a rematch");
                self.rematch.remote = true;
                if self.rematch.local {
                    self.start_rematch();
                }
            }
            GameMessage::Error { message } => return Err(ProtocolError::PeerFault(message)),
        }
        Ok(())
    }

    /// Both sides asked; the host deals
    fn start_rematch(&mut self) {
        if self.role != Role::Host {
            return;
        }
        let state = self.core.engine().new_game();
        let state = self.core.start(state);
        self.rematch = Rematch::default();
        self.send_initialize(&state);
    }

    fn send_initialize(&mut self, state: &GameSnapshot) {
        let (Some(player), Some(room_id)) = (self.player, self.room_id.clone()) else {
            tracing::warn!("Cannot send state before seat and room are known");
            return;
        };
        self.send_seq = 0;
        self.recv_seq = 0;
        let message = GameMessage::Initialize {
            state: state.clone(),
            room_id,
            player: player.opposite(),
        };
        if let Err(e) = self.send(message) {
            tracing::warn!(error = %e, "Failed to send state");
        }
    }

    fn send(&mut self, message: GameMessage) -> Result<(), SessionError> {
        let frame = message
            .to_frame()
            .map_err(|e| SessionError::Protocol(e.to_string()))?;
        let sent = match &self.link {
            Some(link) => link.transport.send(frame),
            None => return Err(SessionError::Transport(crate::transport::TransportError::Closed)),
        };
        if let Err(e) = sent {
            self.lose_link();
            return Err(e.into());
        }
        Ok(())
    }

    /// The peer broke the continuation: tell it, leave the room, and surface
    /// the reason
    fn violation(&mut self, error: ProtocolError) {
        tracing::error!(error = %error, recv_seq = self.recv_seq, "Protocol violation");
        if !matches!(error, ProtocolError::PeerFault(_)) {
            let _ = self.send(GameMessage::Error {
                message: error.to_string(),
            });
        }
        self.teardown();
        self.transition(ConnectionEvent::ProtocolViolation(error.to_string()));
        self.core.report(error.to_string());
    }

    fn transition(&mut self, event: ConnectionEvent) {
        let before = self.machine.status();
        match self.machine.handle(event) {
            Ok(status) if status != before => self.core.publish(SessionEvent::Connection(status)),
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "Ignored connection event"),
        }
    }
}

fn carries_initialize(event: &TransportEvent) -> bool {
    match event {
        TransportEvent::Frame(Frame::Binary(bytes)) => {
            matches!(GameMessage::from_bytes(bytes), Ok(GameMessage::Initialize { .. }))
        }
        _ => false,
    }
}

impl GameSession for RemoteSession {
    fn state(&self) -> Option<Arc<GameSnapshot>> {
        self.core.state()
    }

    fn submit_action(&mut self, action: Action) -> Result<Submitted, SessionError> {
        if self.machine.status() != ConnectionStatus::Playing {
            return Err(SessionError::NotReady);
        }
        if self.rematch.local {
            return Err(SessionError::RematchPending);
        }
        let current = self.core.state().ok_or(SessionError::NotReady)?;
        if Some(current.turn) != self.player {
            return Err(SessionError::NotYourTurn);
        }
        self.core.apply(&action)?;

        let seq = self.send_seq;
        self.send_seq += 1;
        tracing::debug!(seq, ?action, "Sending action");
        if let Err(e) = self.send(GameMessage::Move { seq, action }) {
            // Already applied locally; the status change carries the failure
            tracing::warn!(seq, error = %e, "Action not delivered");
        }
        Ok(Submitted::Applied)
    }

    /// Ask the peer for a rematch; the new game arrives once both sides
    /// have asked
    fn reset(&mut self) -> Result<(), SessionError> {
        if self.machine.status() != ConnectionStatus::Playing {
            return Err(SessionError::NotReady);
        }
        if self.rematch.local {
            return Err(SessionError::RematchPending);
        }
        self.send(GameMessage::RequestRematch)?;
        self.rematch.local = true;
        if self.rematch.remote {
            self.start_rematch();
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.core.subscribe()
    }
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        self.close();
    }
}
