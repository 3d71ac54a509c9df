// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offset selection shared by the highlighter and the rules engine.
//!
//! Both sides must agree on which of a card's offset lists a piece draws
//! from and how an offset becomes a board square. Everything that answers
//! either question goes through this module.

use crate::{Card, CardSet, Piece, Player, Point};

/// Which of a card's offset lists applies to a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetSet {
    /// The card's printed moves
    Base,
    /// The king-only alternate geometry
    King,
    /// The Wind Spirit's second-step geometry
    Wind,
    /// Nothing is legal
    Blocked,
}

/// Pick the offset list for `piece` moving with `card`.
///
/// The Wind Spirit only moves under a Way of the Wind card as the second
/// half of a turn; a king swaps to the king geometry when the card has one.
pub fn offset_set(piece: Piece, card: Card, pending_extra_move: bool) -> OffsetSet {
    match piece {
        Piece::WindSpirit if card.set() == CardSet::WayOfTheWind => {
            if pending_extra_move {
                OffsetSet::Wind
            } else {
                OffsetSet::Blocked
            }
        }
        Piece::King(_) if card.king_moves().is_some() => OffsetSet::King,
        Piece::Pawn(_) | Piece::King(_) | Piece::Ninja { .. } | Piece::WindSpirit => OffsetSet::Base,
    }
}

/// Offsets of `card` that apply to `piece`
pub fn offsets(piece: Piece, card: Card, pending_extra_move: bool) -> &'static [Point] {
    match offset_set(piece, card, pending_extra_move) {
        OffsetSet::Base => card.moves(),
        OffsetSet::King => card.king_moves().unwrap_or_default(),
        OffsetSet::Wind => card.wind_moves().unwrap_or_default(),
        OffsetSet::Blocked => &[],
    }
}

/// Absolute target squares for `piece` on `src`, before any occupancy check.
///
/// Squares off the board are dropped.
pub fn targets(
    src: Point,
    piece: Piece,
    card: Card,
    turn: Player,
    pending_extra_move: bool,
) -> impl Iterator<Item = Point> {
    offsets(piece, card, pending_extra_move)
        .iter()
        .map(move |offset| src + turn.orient(*offset))
        .filter(Point::in_bounds)
}
