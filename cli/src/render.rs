// SPDX-License-Identifier: MIT OR Apache-2.0

//! ASCII board rendering for the CLI.
//!
//! Squares are written as a file letter and a rank digit. Rank 1 is Red's
//! home row at the bottom of the board.

use anyhow::{anyhow, Result};
use onitama_core::{Card, Destinations, GameSnapshot, Piece, Player, Point, BOARD_SIZE};
use onitama_network::MoveRankings;

/// Render the board, marking `highlight` squares.
///
/// With `scores`, highlighted squares show the move quality from 0 (worst)
/// to 9 (best) instead of a plain marker.
pub fn render_board(
    state: &GameSnapshot,
    highlight: Destinations,
    scores: Option<(&MoveRankings, Card, Point)>,
) -> String {
    let mut output = String::new();
    output.push_str(&column_labels());

    for y in 0..BOARD_SIZE {
        let rank = BOARD_SIZE - y;
        output.push_str(&format!("{} ", rank));
        for x in 0..BOARD_SIZE {
            let point = Point::new(x, y);
            let symbol = match state.grid.get(point) {
                Some(piece) if highlight.is_valid(point) => piece_symbol(piece).to_ascii_uppercase(),
                Some(piece) => piece_symbol(piece),
                None if highlight.is_valid(point) => score_symbol(scores, point),
                None if point == Player::Red.temple() || point == Player::Blue.temple() => '^',
                None => '.',
            };
            output.push_str(&format!(" {}", symbol));
        }
        output.push_str(&format!("  {}\n", rank));
    }

    output.push_str(&column_labels());
    output
}

/// Hands, spare card and whose turn it is
pub fn render_cards(state: &GameSnapshot) -> String {
    let hand = |player: Player| {
        let [a, b] = state.hands.of(player);
        format!("{} / {}", a, b)
    };
    let mut output = format!(
        "Blue: {}\nRed:  {}\nSpare: {}\n",
        hand(Player::Blue),
        hand(Player::Red),
        state.spare
    );
    match (state.winner, state.pending_extra_move) {
        (Some(winner), _) => output.push_str(&format!("{} wins\n", winner)),
        (None, Some(pending)) => output.push_str(&format!(
            "{} to move the Wind Spirit with {}\n",
            state.turn, pending.card
        )),
        (None, None) => output.push_str(&format!("{} to move\n", state.turn)),
    }
    output
}

/// Red pieces are `r`/`k`/`n`, Blue pieces `b`/`q`/`m`; the Wind Spirit is
/// `w` and a hidden piece `?`. Highlighted targets are upper-cased.
fn piece_symbol(piece: Piece) -> char {
    match piece {
        Piece::Pawn(Player::Red) => 'r',
        Piece::King(Player::Red) => 'k',
        Piece::Ninja { owner: Player::Red, revealed: true } => 'n',
        Piece::Pawn(Player::Blue) => 'b',
        Piece::King(Player::Blue) => 'q',
        Piece::Ninja { owner: Player::Blue, revealed: true } => 'm',
        Piece::Ninja { revealed: false, .. } => '?',
        Piece::WindSpirit => 'w',
    }
}

fn score_symbol(scores: Option<(&MoveRankings, Card, Point)>, dst: Point) -> char {
    let Some((rankings, card, src)) = scores else {
        return '*';
    };
    rankings
        .for_selection(card, src)
        .iter()
        .find(|entry| entry.dst == dst)
        .and_then(|entry| char::from_digit((rankings.normalized(entry.score) * 9.0).round() as u32, 10))
        .unwrap_or('*')
}

fn column_labels() -> String {
    let mut labels = String::from(" ");
    for x in 0..BOARD_SIZE {
        labels.push(' ');
        labels.push(column_char(x));
    }
    labels.push('\n');
    labels
}

fn column_char(x: i8) -> char {
    (b'a' + x as u8) as char
}

/// Parse a square such as `c1` into a board point
pub fn parse_square(text: &str) -> Result<Point> {
    let mut chars = text.trim().chars();
    let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(anyhow!("Squares look like c1, got {:?}", text));
    };
    let x = (file.to_ascii_lowercase() as i32) - ('a' as i32);
    let rank = rank
        .to_digit(10)
        .ok_or_else(|| anyhow!("Invalid rank in {:?}", text))? as i32;
    let point = Point::new(x as i8, (BOARD_SIZE as i32 - rank) as i8);
    if !(0..BOARD_SIZE as i32).contains(&x) || !point.in_bounds() {
        return Err(anyhow!("{} is off the board", text));
    }
    Ok(point)
}

/// Inverse of [`parse_square`]
pub fn format_square(point: Point) -> String {
    format!("{}{}", column_char(point.x), BOARD_SIZE - point.y)
}
