// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authoritative engine interface

use crate::{Action, GameError, GameSnapshot, Player};

/// Result of applying an accepted action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The game goes on with this state
    Playing(GameSnapshot),
    /// The action ended the game
    Finished { winner: Player, state: GameSnapshot },
}

impl Verdict {
    /// The resulting state, whatever the outcome
    pub fn into_snapshot(self) -> GameSnapshot {
        match self {
            Verdict::Playing(state) | Verdict::Finished { state, .. } => state,
        }
    }

    /// Winner, if the game ended
    pub fn winner(&self) -> Option<Player> {
        match self {
            Verdict::Playing(_) => None,
            Verdict::Finished { winner, .. } => Some(*winner),
        }
    }
}

/// The rules engine every session defers to.
///
/// Implementations are pure: applying an action never mutates the input
/// state, so callers can keep history and roll back freely.
pub trait Engine: Send + Sync {
    /// Deal a fresh game
    fn new_game(&self) -> GameSnapshot;

    /// Validate and apply `action` to `state`
    fn apply(&self, state: &GameSnapshot, action: &Action) -> Result<Verdict, GameError>;

    /// Every action the engine would accept from `state`
    fn legal_actions(&self, state: &GameSnapshot) -> Vec<Action>;
}
