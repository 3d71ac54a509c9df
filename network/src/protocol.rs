// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire messages exchanged between peers through the room relay.
//!
//! Game messages travel as CBOR-encoded binary frames. Text frames carry only
//! the room identifier (first frame after connecting) and the keep-alive
//! probe. After the opening `Initialize`, peers exchange actions, never
//! states; each side re-derives the state through its own engine.

use onitama_core::{Action, GameError, GameSnapshot, Player};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text payload used as keep-alive probe and its echo
pub const PING_PAYLOAD: &str = "ping";

/// A raw frame as delivered by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Binary(Vec<u8>),
    Text(String),
}

/// Binary game messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameMessage {
    /// Relay notice: another member entered the room
    Joined,
    /// Relay notice: the other member left the room
    Disconnected,
    /// Full state, sent when a game starts or a peer (re)joins
    Initialize {
        state: GameSnapshot,
        room_id: String,
        /// Seat of the receiving peer
        player: Player,
    },
    /// One action, numbered per sender from zero after each `Initialize`
    Move { seq: u32, action: Action },
    /// Ask for a fresh game in the same room
    RequestRematch,
    /// The sender detected a fault and is dropping the game
    Error { message: String },
}

impl GameMessage {
    /// Encode as a binary frame
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        Ok(Frame::Binary(serde_cbor::to_vec(self)?))
    }

    /// Decode a binary frame payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_cbor::from_slice(bytes)?)
    }
}

/// Faults that break the continuation between two peers
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_cbor::Error),

    #[error("Unexpected text frame: {0:?}")]
    UnexpectedText(String),

    #[error("Move {got} arrived while expecting move {expected}")]
    SequenceGap { expected: u32, got: u32 },

    #[error("Peer tried to change our seat from {current} to {requested}")]
    RoleChanged { current: Player, requested: Player },

    #[error("Peer moved out of turn")]
    OutOfTurn,

    #[error("Peer move rejected: {0}")]
    PeerRejected(GameError),

    #[error("{0} received before the game started")]
    NotStarted(&'static str),

    #[error("Peer reported: {0}")]
    PeerFault(String),
}
