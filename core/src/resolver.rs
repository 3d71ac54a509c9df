// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side move highlighting.
//!
//! [`resolve`] predicts the squares the authoritative engine would accept for
//! a selected piece and card. It is advisory: it never filters by occupancy,
//! so a square holding one of the mover's own pieces still lights up and is
//! left for the engine to reject on submission.

use crate::{movement, Card, Grid, Player, Point, BOARD_SIZE};

/// Multi-step context the highlighter needs from the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MoveContext {
    /// The Wind Spirit still owes its second step this turn
    pub pending_extra_move: bool,
}

/// Set of highlighted destination squares.
///
/// Stored as a 25-bit mask so equal inputs produce equal values, which lets
/// callers memoize on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Destinations {
    mask: u32,
}

impl Destinations {
    /// Nothing highlighted
    pub fn none() -> Self {
        Self::default()
    }

    fn insert(&mut self, point: Point) {
        if point.in_bounds() {
            self.mask |= 1 << point.index();
        }
    }

    /// Whether `dst` is highlighted
    pub fn is_valid(&self, dst: Point) -> bool {
        dst.in_bounds() && self.mask & (1 << dst.index()) != 0
    }

    /// Predicate form of [`Destinations::is_valid`]
    pub fn predicate(&self) -> impl Fn(Point) -> bool {
        let this = *self;
        move |dst| this.is_valid(dst)
    }

    /// Number of highlighted squares
    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// Highlighted squares in row-major order
    pub fn iter(&self) -> impl Iterator<Item = Point> {
        let mask = self.mask;
        (0..(BOARD_SIZE * BOARD_SIZE) as usize)
            .filter(move |idx| mask & (1 << idx) != 0)
            .map(Point::from_index)
    }
}

impl FromIterator<Point> for Destinations {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        let mut destinations = Destinations::none();
        for point in iter {
            destinations.insert(point);
        }
        destinations
    }
}

/// Compute the highlighted destinations for a selection.
///
/// Returns an empty set when nothing is selected or the source square is
/// empty. Otherwise the piece on `src` picks an offset list through
/// [`movement::offset_set`] and each offset is oriented for `turn`.
pub fn resolve(
    src: Option<Point>,
    card: Option<Card>,
    grid: &Grid,
    turn: Player,
    context: MoveContext,
) -> Destinations {
    let (Some(src), Some(card)) = (src, card) else {
        return Destinations::none();
    };
    let Some(piece) = grid.get(src) else {
        return Destinations::none();
    };
    movement::targets(src, piece, card, turn, context.pending_extra_move).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Piece;

    fn grid_with(point: Point, piece: Piece) -> Grid {
        let mut grid = Grid::empty();
        grid.set(point, Some(piece));
        grid
    }

    #[test]
    fn nothing_selected_highlights_nothing() {
        let grid = Grid::starting(false, false);
        let ctx = MoveContext::default();
        assert!(resolve(None, Some(Card::Tiger), &grid, Player::Red, ctx).is_empty());
        assert!(resolve(Some(Point::new(0, 4)), None, &grid, Player::Red, ctx).is_empty());
        assert!(resolve(Some(Point::new(2, 2)), Some(Card::Tiger), &grid, Player::Red, ctx).is_empty());
    }

    #[test]
    fn orientation_flips_for_blue() {
        let src = Point::new(2, 2);
        let grid = grid_with(src, Piece::Pawn(Player::Red));
        let ctx = MoveContext::default();

        let red = resolve(Some(src), Some(Card::Boar), &grid, Player::Red, ctx);
        assert!(red.is_valid(Point::new(2, 1)));
        assert!(!red.is_valid(Point::new(2, 3)));

        let blue = resolve(Some(src), Some(Card::Boar), &grid, Player::Blue, ctx);
        assert!(blue.is_valid(Point::new(2, 3)));
        assert!(!blue.is_valid(Point::new(2, 1)));
    }

    #[test]
    fn own_pieces_are_still_highlighted() {
        let grid = Grid::starting(false, false);
        let src = Point::new(1, 4);
        let destinations = resolve(Some(src), Some(Card::Boar), &grid, Player::Red, MoveContext::default());
        assert!(destinations.is_valid(Point::new(0, 4)));
        assert!(destinations.is_valid(Point::new(2, 4)));
    }

    #[test]
    fn identical_inputs_give_identical_sets() {
        let grid = Grid::starting(true, true);
        let ctx = MoveContext::default();
        let a = resolve(Some(Point::new(2, 4)), Some(Card::Lion), &grid, Player::Red, ctx);
        let b = resolve(Some(Point::new(2, 4)), Some(Card::Lion), &grid, Player::Red, ctx);
        assert_eq!(a, b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![Point::new(2, 2), Point::new(2, 3)]);
    }

    #[test]
    fn predicate_matches_membership() {
        let src = Point::new(0, 0);
        let grid = grid_with(src, Piece::Pawn(Player::Blue));
        let destinations = resolve(Some(src), Some(Card::Monkey), &grid, Player::Blue, MoveContext::default());
        let is_valid = destinations.predicate();
        assert!(is_valid(Point::new(1, 1)));
        assert!(!is_valid(Point::new(-1, -1)));
        assert_eq!(destinations.len(), 1);
    }
}
