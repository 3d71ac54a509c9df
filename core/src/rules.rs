// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reference rules engine

use crate::{
    movement, Action, Card, CardSet, Engine, GameError, GameSettings, GameSnapshot, Grid, Hands,
    LastMove, PendingExtraMove, Piece, PieceKind, Player, Point, Verdict,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Standard rules with the optional Wind Spirit and hidden pieces
#[derive(Debug, Clone, Default)]
pub struct StandardRules {
    settings: GameSettings,
}

impl StandardRules {
    /// Create an engine for the given settings
    pub fn new(settings: GameSettings) -> Self {
        Self { settings }
    }

    /// Settings this engine deals with
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Whether the player to act has at least one move
    pub fn can_move(&self, state: &GameSnapshot) -> bool {
        !self.moves(state).is_empty()
    }

    /// Check a regular move and return the piece that would move
    fn check_step(
        &self,
        state: &GameSnapshot,
        card: Card,
        src: Point,
        dst: Point,
    ) -> Result<Piece, GameError> {
        let turn = state.turn;
        if !state.current_hand().contains(&card) {
            return Err(GameError::CardNotInHand);
        }
        let piece = state
            .grid
            .get(src)
            .filter(|piece| piece.is_owned_by(turn) || *piece == Piece::WindSpirit)
            .ok_or(GameError::NoPieceAtSource)?;
        let target = state.grid.get(dst);
        if piece != Piece::WindSpirit && target.map_or(false, |t| t.is_owned_by(turn)) {
            return Err(GameError::OwnPieceAtDestination);
        }
        if !dst.in_bounds() {
            return Err(GameError::OutOfBounds);
        }
        if !movement::targets(src, piece, card, turn, false).any(|t| t == dst) {
            return Err(GameError::NotOnCard);
        }
        match (piece, target) {
            (_, Some(Piece::WindSpirit)) => Err(GameError::WindSpiritBlocked),
            (Piece::WindSpirit, Some(Piece::King(_) | Piece::Ninja { .. })) => {
                Err(GameError::WindSpiritBlocked)
            }
            _ => Ok(piece),
        }
    }

    /// Check the Wind Spirit's owed second step
    fn check_wind_step(
        &self,
        state: &GameSnapshot,
        pending: PendingExtraMove,
        card: Card,
        src: Point,
        dst: Point,
    ) -> Result<(), GameError> {
        if card != pending.card {
            return Err(GameError::ExtraMovePending);
        }
        if state.grid.wind_spirit() != Some(src) {
            return Err(GameError::NoPieceAtSource);
        }
        if !dst.in_bounds() {
            return Err(GameError::OutOfBounds);
        }
        if !movement::targets(src, Piece::WindSpirit, card, state.turn, true).any(|t| t == dst) {
            return Err(GameError::NotOnCard);
        }
        if !wind_can_enter(&state.grid, dst) {
            return Err(GameError::WindSpiritBlocked);
        }
        Ok(())
    }

    /// Regular moves for the player to act, ignoring any pending step
    fn moves(&self, state: &GameSnapshot) -> Vec<Action> {
        let turn = state.turn;
        let mut moves = Vec::new();
        for &card in state.current_hand() {
            let movers = state
                .grid
                .pieces()
                .filter(|(_, piece)| piece.is_owned_by(turn) || *piece == Piece::WindSpirit);
            for (src, piece) in movers {
                for dst in movement::targets(src, piece, card, turn, false) {
                    if self.check_step(state, card, src, dst).is_ok() {
                        moves.push(Action::step(card, src, dst));
                    }
                }
            }
        }
        moves
    }

    fn apply_move(
        &self,
        state: &GameSnapshot,
        card: Card,
        src: Point,
        dst: Point,
        reveal_requested: bool,
    ) -> Result<Verdict, GameError> {
        let turn = state.turn;
        let piece = self.check_step(state, card, src, dst)?;
        if reveal_requested && piece.kind() != PieceKind::Hidden {
            return Err(GameError::NothingToReveal);
        }

        let mut next = state.clone();
        let captured = relocate(&mut next.grid, src, dst, piece);
        if let Piece::Ninja { owner, .. } = piece {
            if reveal_requested || captured.is_some() {
                next.grid.set(dst, Some(Piece::Ninja { owner, revealed: true }));
            }
        }
        next.last_move = Some(LastMove { src, dst });

        let opponent = turn.opposite();
        let king_taken = captured == Some(Piece::King(opponent));
        let temple_reached = piece == Piece::King(turn) && dst == opponent.temple();
        if king_taken || temple_reached {
            tracing::debug!(winner = %turn, %src, %dst, "Game won");
            next.winner = Some(turn);
            return Ok(Verdict::Finished {
                winner: turn,
                state: next,
            });
        }

        if card.set() == CardSet::WayOfTheWind && piece != Piece::WindSpirit {
            if let Some(spirit) = next.grid.wind_spirit() {
                let can_follow = movement::targets(spirit, Piece::WindSpirit, card, turn, true)
                    .any(|dst| wind_can_enter(&next.grid, dst));
                if can_follow {
                    tracing::trace!(%card, "Wind Spirit owes a second step");
                    next.pending_extra_move = Some(PendingExtraMove {
                        actor: PieceKind::Neutral,
                        card,
                    });
                    return Ok(Verdict::Playing(next));
                }
            }
        }

        end_turn(&mut next, card);
        Ok(Verdict::Playing(next))
    }

    fn apply_wind_step(
        &self,
        state: &GameSnapshot,
        pending: PendingExtraMove,
        card: Card,
        src: Point,
        dst: Point,
    ) -> Result<Verdict, GameError> {
        self.check_wind_step(state, pending, card, src, dst)?;
        let mut next = state.clone();
        relocate(&mut next.grid, src, dst, Piece::WindSpirit);
        next.last_move = Some(LastMove { src, dst });
        end_turn(&mut next, card);
        Ok(Verdict::Playing(next))
    }
}

impl Engine for StandardRules {
    fn new_game(&self) -> GameSnapshot {
        let mut deck = self.settings.deck();
        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        deck.shuffle(&mut rng);
        tracing::debug!(deck = deck.len(), seed = ?self.settings.seed, "Dealing new game");

        GameSnapshot {
            grid: Grid::starting(self.settings.wind_spirit(), self.settings.hidden_pieces),
            turn: Player::Red,
            hands: Hands {
                red: [deck[0], deck[1]],
                blue: [deck[2], deck[3]],
            },
            spare: deck[4],
            pending_extra_move: None,
            last_move: None,
            winner: None,
        }
    }

    fn apply(&self, state: &GameSnapshot, action: &Action) -> Result<Verdict, GameError> {
        if state.is_finished() {
            return Err(GameError::GameFinished);
        }
        match (*action, state.pending_extra_move) {
            (Action::Discard { .. }, Some(_)) => Err(GameError::ExtraMovePending),
            (Action::Move { card, src, dst, .. }, Some(pending)) => {
                self.apply_wind_step(state, pending, card, src, dst)
            }
            (
                Action::Move {
                    card,
                    src,
                    dst,
                    reveal_requested,
                },
                None,
            ) => self.apply_move(state, card, src, dst, reveal_requested),
            (Action::Discard { card }, None) => {
                if !state.current_hand().contains(&card) {
                    return Err(GameError::CardNotInHand);
                }
                if self.can_move(state) {
                    return Err(GameError::ValidMovesExist);
                }
                let mut next = state.clone();
                next.last_move = None;
                end_turn(&mut next, card);
                Ok(Verdict::Playing(next))
            }
        }
    }

    fn legal_actions(&self, state: &GameSnapshot) -> Vec<Action> {
        if state.is_finished() {
            return Vec::new();
        }
        if let Some(pending) = state.pending_extra_move {
            let Some(spirit) = state.grid.wind_spirit() else {
                return Vec::new();
            };
            return movement::targets(spirit, Piece::WindSpirit, pending.card, state.turn, true)
                .filter(|dst| wind_can_enter(&state.grid, *dst))
                .map(|dst| Action::step(pending.card, spirit, dst))
                .collect();
        }
        let moves = self.moves(state);
        if moves.is_empty() {
            return state
                .current_hand()
                .iter()
                .map(|&card| Action::Discard { card })
                .collect();
        }
        moves
    }
}

/// The Wind Spirit may enter empty squares and swap with students
fn wind_can_enter(grid: &Grid, dst: Point) -> bool {
    matches!(grid.get(dst), None | Some(Piece::Pawn(_)))
}

/// Move `piece` from `src` to `dst`, returning whatever was captured.
///
/// The Wind Spirit never captures; it trades places with the occupant.
fn relocate(grid: &mut Grid, src: Point, dst: Point, piece: Piece) -> Option<Piece> {
    let occupant = grid.take(dst);
    grid.set(dst, Some(piece));
    if piece == Piece::WindSpirit {
        grid.set(src, occupant);
        None
    } else {
        grid.set(src, None);
        occupant
    }
}

/// Swap the spent card with the spare and pass the turn
fn end_turn(state: &mut GameSnapshot, card: Card) {
    let spare = state.spare;
    if let Some(slot) = state
        .hands
        .of_mut(state.turn)
        .iter_mut()
        .find(|held| **held == card)
    {
        *slot = spare;
        state.spare = card;
    }
    state.pending_extra_move = None;
    state.turn = state.turn.opposite();
    state.grid.conceal(state.turn);
}
