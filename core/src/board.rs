// SPDX-License-Identifier: MIT OR Apache-2.0

//! Board representation and manipulation

use crate::{Player, Point, BOARD_SIZE};
use serde::{Deserialize, Serialize};

const SIZE: usize = BOARD_SIZE as usize;

/// Occupant of a square.
///
/// Ownership is part of the variant, so every match on a piece is exhaustive
/// and there is no way to build a neutral piece with an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Piece {
    /// Student
    Pawn(Player),
    /// Master; losing it loses the game
    King(Player),
    /// Hidden-capable piece
    Ninja { owner: Player, revealed: bool },
    /// Neutral piece moved as the second half of a Way of the Wind turn
    WindSpirit,
}

/// Kind of a piece with the owner stripped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    King,
    Hidden,
    Neutral,
}

impl Piece {
    /// Owning player, `None` for the neutral piece
    pub fn owner(&self) -> Option<Player> {
        match self {
            Piece::Pawn(owner) | Piece::King(owner) | Piece::Ninja { owner, .. } => Some(*owner),
            Piece::WindSpirit => None,
        }
    }

    /// Kind of this piece
    pub fn kind(&self) -> PieceKind {
        match self {
            Piece::Pawn(_) => PieceKind::Pawn,
            Piece::King(_) => PieceKind::King,
            Piece::Ninja { .. } => PieceKind::Hidden,
            Piece::WindSpirit => PieceKind::Neutral,
        }
    }

    /// Whether `player` owns this piece
    pub fn is_owned_by(&self, player: Player) -> bool {
        self.owner() == Some(player)
    }
}

/// The 5x5 grid of squares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    cells: [[Option<Piece>; SIZE]; SIZE],
}

impl Default for Grid {
    fn default() -> Self {
        Self::empty()
    }
}

impl Grid {
    /// Create a board with no pieces
    pub fn empty() -> Self {
        Self {
            cells: [[None; SIZE]; SIZE],
        }
    }

    /// Standard opening layout.
    ///
    /// Kings start on their temples with two pawns either side. The Wind
    /// Spirit starts in the centre; hidden pieces start one row in front of
    /// their king.
    pub fn starting(wind_spirit: bool, hidden_pieces: bool) -> Self {
        let mut grid = Self::empty();
        for player in [Player::Red, Player::Blue] {
            let row = player.home_row();
            for x in 0..BOARD_SIZE {
                let piece = if x == BOARD_SIZE / 2 {
                    Piece::King(player)
                } else {
                    Piece::Pawn(player)
                };
                grid.set(Point::new(x, row), Some(piece));
            }
            if hidden_pieces {
                let forward = player.orient(Point::new(0, -1));
                grid.set(
                    player.temple() + forward,
                    Some(Piece::Ninja {
                        owner: player,
                        revealed: false,
                    }),
                );
            }
        }
        if wind_spirit {
            grid.set(Point::new(BOARD_SIZE / 2, BOARD_SIZE / 2), Some(Piece::WindSpirit));
        }
        grid
    }

    /// Get the piece at the specified point
    pub fn get(&self, point: Point) -> Option<Piece> {
        if !point.in_bounds() {
            return None;
        }
        self.cells[point.y as usize][point.x as usize]
    }

    /// Replace the contents of a square; out-of-bounds writes are ignored
    pub fn set(&mut self, point: Point, piece: Option<Piece>) {
        if point.in_bounds() {
            self.cells[point.y as usize][point.x as usize] = piece;
        }
    }

    /// Remove and return the piece at `point`
    pub fn take(&mut self, point: Point) -> Option<Piece> {
        let piece = self.get(point);
        self.set(point, None);
        piece
    }

    /// All occupied squares in row-major order
    pub fn pieces(&self) -> impl Iterator<Item = (Point, Piece)> + '_ {
        (0..SIZE * SIZE).filter_map(move |idx| {
            let point = Point::from_index(idx);
            self.get(point).map(|piece| (point, piece))
        })
    }

    /// Squares holding `player`'s pieces
    pub fn pieces_of(&self, player: Player) -> impl Iterator<Item = (Point, Piece)> + '_ {
        self.pieces().filter(move |(_, piece)| piece.is_owned_by(player))
    }

    /// Location of `player`'s king, if still on the board
    pub fn king_of(&self, player: Player) -> Option<Point> {
        self.pieces()
            .find(|(_, piece)| *piece == Piece::King(player))
            .map(|(point, _)| point)
    }

    /// Location of the Wind Spirit, if in play
    pub fn wind_spirit(&self) -> Option<Point> {
        self.pieces()
            .find(|(_, piece)| *piece == Piece::WindSpirit)
            .map(|(point, _)| point)
    }

    /// Hide every revealed ninja belonging to `player`
    pub fn conceal(&mut self, player: Player) {
        for row in self.cells.iter_mut() {
            for cell in row.iter_mut() {
                if let Some(Piece::Ninja { owner, revealed }) = cell {
                    if *owner == player {
                        *revealed = false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_layout_has_one_king_each() {
        let grid = Grid::starting(false, false);
        assert_eq!(grid.king_of(Player::Red), Some(Point::new(2, 4)));
        assert_eq!(grid.king_of(Player::Blue), Some(Point::new(2, 0)));
        assert_eq!(grid.pieces_of(Player::Red).count(), 5);
        assert_eq!(grid.pieces_of(Player::Blue).count(), 5);
        assert_eq!(grid.wind_spirit(), None);
    }

    #[test]
    fn optional_pieces_are_placed() {
        let grid = Grid::starting(true, true);
        assert_eq!(grid.wind_spirit(), Some(Point::new(2, 2)));
        assert_eq!(
            grid.get(Point::new(2, 3)),
            Some(Piece::Ninja {
                owner: Player::Red,
                revealed: false
            })
        );
        assert_eq!(
            grid.get(Point::new(2, 1)),
            Some(Piece::Ninja {
                owner: Player::Blue,
                revealed: false
            })
        );
    }

    #[test]
    fn conceal_only_touches_owner() {
        let mut grid = Grid::empty();
        let red = Point::new(0, 0);
        let blue = Point::new(4, 4);
        grid.set(red, Some(Piece::Ninja { owner: Player::Red, revealed: true }));
        grid.set(blue, Some(Piece::Ninja { owner: Player::Blue, revealed: true }));

        grid.conceal(Player::Red);

        assert_eq!(grid.get(red), Some(Piece::Ninja { owner: Player::Red, revealed: false }));
        assert_eq!(grid.get(blue), Some(Piece::Ninja { owner: Player::Blue, revealed: true }));
    }

    #[test]
    fn out_of_bounds_access_is_inert() {
        let mut grid = Grid::empty();
        grid.set(Point::new(5, 0), Some(Piece::WindSpirit));
        assert_eq!(grid.get(Point::new(5, 0)), None);
        assert_eq!(grid.pieces().count(), 0);
    }
}
