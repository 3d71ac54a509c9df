// SPDX-License-Identifier: MIT OR Apache-2.0

//! Onitama Core - Game Model and Move Highlighting
//!
//! This crate provides the core game functionality including:
//! - Board, piece and card representation
//! - The offset table shared by the highlighter and the rules engine
//! - Client-side move-legality prediction for UI highlighting
//! - The authoritative engine contract and a reference rules engine
//! - Stateless AI agents used by the background workers

#![deny(unsafe_code)]
#![deny(clippy::all)]

pub mod agents;
pub mod board;
pub mod cards;
pub mod engine;
pub mod movement;
pub mod resolver;
pub mod rules;
pub mod settings;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use thiserror::Error;

pub use board::{Grid, Piece, PieceKind};
pub use cards::{Card, CardDescription, CardDirection, CardSet};
pub use engine::{Engine, Verdict};
pub use resolver::{resolve, Destinations, MoveContext};
pub use rules::StandardRules;
pub use settings::GameSettings;

/// Width and height of the board
pub const BOARD_SIZE: i8 = 5;

/// One of the two seats at the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    /// Starts at the bottom row and moves first
    Red,
    /// Starts at the top row
    Blue,
}

impl Player {
    /// Returns the other player
    pub fn opposite(&self) -> Self {
        match self {
            Player::Red => Player::Blue,
            Player::Blue => Player::Red,
        }
    }

    /// Map a card offset to a board delta for this player.
    ///
    /// Cards are printed from Red's point of view; Blue sits on the other
    /// side of the table, so both components flip.
    pub fn orient(&self, offset: Point) -> Point {
        match self {
            Player::Red => offset,
            Player::Blue => -offset,
        }
    }

    /// Row this player's pieces start on
    pub fn home_row(&self) -> i8 {
        match self {
            Player::Red => BOARD_SIZE - 1,
            Player::Blue => 0,
        }
    }

    /// The temple square on this player's home row
    pub fn temple(&self) -> Point {
        Point::new(BOARD_SIZE / 2, self.home_row())
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Board-relative coordinate, 0-indexed, `y` grows towards Red's home row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    /// Column
    pub x: i8,
    /// Row
    pub y: i8,
}

impl Point {
    /// Create a new point
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// Check if the point lies on the 5x5 board
    pub fn in_bounds(&self) -> bool {
        (0..BOARD_SIZE).contains(&self.x) && (0..BOARD_SIZE).contains(&self.y)
    }

    /// Row-major cell index, only meaningful for in-bounds points
    pub(crate) fn index(&self) -> usize {
        (self.y as usize) * (BOARD_SIZE as usize) + (self.x as usize)
    }

    /// Inverse of [`Point::index`]
    pub(crate) fn from_index(idx: usize) -> Self {
        let size = BOARD_SIZE as usize;
        Self::new((idx % size) as i8, (idx / size) as i8)
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl Neg for Point {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// An action proposed to the authoritative engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// Move the piece at `src` to `dst` using `card`
    Move {
        card: Card,
        src: Point,
        dst: Point,
        /// Ask the engine to reveal the moving hidden piece
        #[serde(default)]
        reveal_requested: bool,
    },
    /// Give up a card without moving; only legal when no move exists
    Discard { card: Card },
}

impl Action {
    /// Plain move without a reveal request
    pub fn step(card: Card, src: Point, dst: Point) -> Self {
        Action::Move {
            card,
            src,
            dst,
            reveal_requested: false,
        }
    }

    /// The card this action spends
    pub fn card(&self) -> Card {
        match self {
            Action::Move { card, .. } | Action::Discard { card } => *card,
        }
    }
}

/// The two cards each player holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hands {
    pub red: [Card; 2],
    pub blue: [Card; 2],
}

impl Hands {
    /// Cards held by `player`
    pub fn of(&self, player: Player) -> &[Card; 2] {
        match player {
            Player::Red => &self.red,
            Player::Blue => &self.blue,
        }
    }

    pub(crate) fn of_mut(&mut self, player: Player) -> &mut [Card; 2] {
        match player {
            Player::Red => &mut self.red,
            Player::Blue => &mut self.blue,
        }
    }
}

/// Second half of a two-phase turn that is still owed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingExtraMove {
    /// Kind of piece that must move next
    pub actor: PieceKind,
    /// Card played in the first half; its tertiary offsets apply
    pub card: Card,
}

/// Source and destination of the most recent move, for animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LastMove {
    pub src: Point,
    pub dst: Point,
}

/// Authoritative game state, replaced wholesale on every update
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Board contents
    pub grid: Grid,
    /// Player to act
    pub turn: Player,
    /// Cards in each hand
    pub hands: Hands,
    /// Card waiting beside the board
    pub spare: Card,
    /// Set while the Wind Spirit still has to move this turn
    pub pending_extra_move: Option<PendingExtraMove>,
    /// Most recent move
    pub last_move: Option<LastMove>,
    /// Set once the game is over
    pub winner: Option<Player>,
}

impl GameSnapshot {
    /// Whether the game has ended
    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Cards held by the player to act
    pub fn current_hand(&self) -> &[Card; 2] {
        self.hands.of(self.turn)
    }

    /// Context the highlighter needs from this snapshot
    pub fn move_context(&self) -> MoveContext {
        MoveContext {
            pending_extra_move: self.pending_extra_move.is_some(),
        }
    }
}

/// Errors the rules engine reports for rejected actions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The game already has a winner
    #[error("Game already finished")]
    GameFinished,

    /// The card is not in the acting player's hand
    #[error("Card not in hand")]
    CardNotInHand,

    /// No piece of the acting player stands on the source square
    #[error("No piece at src")]
    NoPieceAtSource,

    /// The destination holds one of the mover's own pieces
    #[error("Destination occupied by your piece")]
    OwnPieceAtDestination,

    /// The destination is off the board
    #[error("Destination is out of bounds")]
    OutOfBounds,

    /// The card does not offer this delta for this piece
    #[error("Move not valid for card")]
    NotOnCard,

    /// Discard attempted while a move exists
    #[error("Valid moves exist")]
    ValidMovesExist,

    /// The Wind Spirit still has to move this turn
    #[error("The Wind Spirit must move before the turn ends")]
    ExtraMovePending,

    /// The Wind Spirit cannot be captured or displace this piece
    #[error("The Wind Spirit cannot be captured or swap with that piece")]
    WindSpiritBlocked,

    /// Reveal requested for a piece that cannot hide
    #[error("Only hidden pieces can be revealed")]
    NothingToReveal,
}
