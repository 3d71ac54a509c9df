// SPDX-License-Identifier: MIT OR Apache-2.0

//! Game sessions.
//!
//! A session owns the authoritative snapshot and routes every action to its
//! authority: the engine directly (local), the engine plus a compute worker
//! (single player), or the engine plus a peer (remote). Subscribers receive
//! [`SessionEvent`]s over a broadcast channel; each accepted mutation
//! publishes exactly one `Snapshot` event.

mod local;
mod rankings;
mod remote;
mod single_player;

pub use local::LocalSession;
pub use rankings::{DestinationScore, MoveRankings};
pub use remote::{RemoteSession, Role};
pub use single_player::SinglePlayerSession;

use crate::connection::{ConnectionError, ConnectionStatus};
use crate::transport::TransportError;
use onitama_core::{resolve, Action, Card, Destinations, Engine, GameError, GameSnapshot, Player, Point};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Capacity of the subscriber channel
const EVENT_BUFFER: usize = 100;

/// Notifications for the UI layer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The snapshot was replaced
    Snapshot(Arc<GameSnapshot>),
    /// A transient message for the user
    Error(String),
    /// Connection overlay status
    Connection(ConnectionStatus),
    /// Advisory move rankings for training overlays
    Rankings(Arc<MoveRankings>),
    /// A new game began
    Started { against: String },
    /// The game ended
    Finished { winner: Player, against: String },
}

/// Accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// The snapshot already reflects the action
    Applied,
    /// Applied, and the opponent's reply is being computed
    AwaitingReply,
}

/// Reasons a session refuses a request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Game is not ready yet, try again")]
    NotReady,

    #[error("Still waiting for the previous move to be answered")]
    RequestInFlight,

    #[error("It is not your turn")]
    NotYourTurn,

    #[error("Waiting for the opponent to accept the rematch")]
    RematchPending,

    #[error(transparent)]
    Illegal(#[from] GameError),

    #[error("Connection problem: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Background worker is unavailable")]
    WorkerUnavailable,
}

/// Shape shared by every session mode
pub trait GameSession {
    /// Current snapshot, `None` until a game exists
    fn state(&self) -> Option<Arc<GameSnapshot>>;

    /// Propose an action to the session's authority
    fn submit_action(&mut self, action: Action) -> Result<Submitted, SessionError>;

    /// Start over with a fresh game
    fn reset(&mut self) -> Result<(), SessionError>;

    /// Listen for session events
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    fn can_undo(&self) -> bool {
        false
    }

    /// Roll back one full turn; returns whether anything changed
    fn undo(&mut self) -> bool {
        false
    }

    /// Destinations to highlight for a selection on the current snapshot
    fn highlight(&self, src: Option<Point>, card: Option<Card>) -> Destinations {
        match self.state() {
            Some(state) => resolve(src, card, &state.grid, state.turn, state.move_context()),
            None => Destinations::none(),
        }
    }
}

/// Snapshot ownership and event publishing shared by the session modes
pub(crate) struct SessionCore {
    engine: Arc<dyn Engine>,
    snapshot: Option<Arc<GameSnapshot>>,
    generation: u64,
    events: broadcast::Sender<SessionEvent>,
    against: String,
}

impl SessionCore {
    pub(crate) fn new(engine: Arc<dyn Engine>, against: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            engine,
            snapshot: None,
            generation: 0,
            events,
            against: against.into(),
        }
    }

    pub(crate) fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub(crate) fn state(&self) -> Option<Arc<GameSnapshot>> {
        self.snapshot.clone()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn report(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(generation = self.generation, "{}", message);
        self.publish(SessionEvent::Error(message));
    }

    /// Replace the snapshot wholesale and notify subscribers once
    pub(crate) fn replace(&mut self, state: GameSnapshot) -> Arc<GameSnapshot> {
        let state = Arc::new(state);
        self.snapshot = Some(state.clone());
        self.publish(SessionEvent::Snapshot(state.clone()));
        state
    }

    /// Begin a new generation with `state`; replies tagged with older
    /// generations no longer apply
    pub(crate) fn start(&mut self, state: GameSnapshot) -> Arc<GameSnapshot> {
        self.generation += 1;
        tracing::info!(generation = self.generation, against = %self.against, "Game started");
        let state = self.replace(state);
        self.publish(SessionEvent::Started {
            against: self.against.clone(),
        });
        state
    }

    /// Run `action` through the engine against the current snapshot
    pub(crate) fn apply(&mut self, action: &Action) -> Result<Arc<GameSnapshot>, SessionError> {
        let current = self.snapshot.clone().ok_or(SessionError::NotReady)?;
        let verdict = self.engine.apply(&current, action)?;
        let winner = verdict.winner();
        let state = self.replace(verdict.into_snapshot());
        if let Some(winner) = winner {
            tracing::info!(generation = self.generation, %winner, "Game finished");
            self.publish(SessionEvent::Finished {
                winner,
                against: self.against.clone(),
            });
        }
        Ok(state)
    }
}
