// SPDX-License-Identifier: MIT OR Apache-2.0

//! Properties tying the highlighter to the rules engine

use onitama_core::{
    resolve, Action, Card, Engine, GameSettings, GameSnapshot, Grid, MoveContext, Piece, Player,
    Point, StandardRules,
};
use proptest::prelude::*;

/// Play `choices` as indices into the legal action list of a seeded game
fn play_out(seed: u64, hidden_pieces: bool, choices: &[usize]) -> (StandardRules, GameSnapshot) {
    let rules = StandardRules::new(GameSettings {
        seed: Some(seed),
        hidden_pieces,
        ..Default::default()
    });
    let mut state = rules.new_game();
    for choice in choices {
        let actions = rules.legal_actions(&state);
        if actions.is_empty() {
            break;
        }
        let action = actions[choice % actions.len()];
        state = rules
            .apply(&state, &action)
            .expect("legal action rejected")
            .into_snapshot();
        if state.is_finished() {
            break;
        }
    }
    (rules, state)
}

fn any_point() -> impl Strategy<Value = Point> {
    (0i8..5, 0i8..5).prop_map(|(x, y)| Point::new(x, y))
}

fn any_card() -> impl Strategy<Value = Card> {
    (0..Card::ALL.len()).prop_map(|idx| Card::ALL[idx])
}

fn any_player() -> impl Strategy<Value = Player> {
    prop_oneof![Just(Player::Red), Just(Player::Blue)]
}

#[test]
fn red_steps_up_blue_steps_down() {
    let src = Point::new(2, 2);
    let mut grid = Grid::empty();
    grid.set(src, Some(Piece::Pawn(Player::Red)));
    let ctx = MoveContext::default();

    // Boar carries the single forward step (0,-1)
    let red = resolve(Some(src), Some(Card::Boar), &grid, Player::Red, ctx);
    assert!(red.is_valid(Point::new(2, 1)));
    let blue = resolve(Some(src), Some(Card::Boar), &grid, Player::Blue, ctx);
    assert!(blue.is_valid(Point::new(2, 3)));
}

#[test]
fn wind_spirit_needs_the_pending_flag() {
    let src = Point::new(2, 2);
    let mut grid = Grid::empty();
    grid.set(src, Some(Piece::WindSpirit));

    let idle = resolve(Some(src), Some(Card::Spider), &grid, Player::Red, MoveContext::default());
    assert!(idle.is_empty());

    let pending = MoveContext {
        pending_extra_move: true,
    };
    let owed = resolve(Some(src), Some(Card::Spider), &grid, Player::Red, pending);
    assert_eq!(owed.iter().collect::<Vec<_>>(), vec![Point::new(2, 0), Point::new(2, 3)]);
}

#[test]
fn king_alternate_geometry_is_highlighted() {
    let src = Point::new(2, 4);
    let mut grid = Grid::empty();
    grid.set(src, Some(Piece::King(Player::Red)));
    let ctx = MoveContext::default();

    let king = resolve(Some(src), Some(Card::Eagle), &grid, Player::Red, ctx);
    assert_eq!(
        king.iter().collect::<Vec<_>>(),
        vec![Point::new(2, 3), Point::new(1, 4), Point::new(3, 4)]
    );

    grid.set(src, Some(Piece::Pawn(Player::Red)));
    let pawn = resolve(Some(src), Some(Card::Eagle), &grid, Player::Red, ctx);
    assert_eq!(pawn.iter().collect::<Vec<_>>(), vec![Point::new(1, 3), Point::new(3, 3)]);
}

proptest! {
    #[test]
    fn accepted_moves_are_always_highlighted(
        seed in any::<u64>(),
        hidden in any::<bool>(),
        choices in prop::collection::vec(any::<usize>(), 0..24),
    ) {
        let (rules, state) = play_out(seed, hidden, &choices);
        for action in rules.legal_actions(&state) {
            if let Action::Move { card, src, dst, .. } = action {
                let highlighted = resolve(
                    Some(src),
                    Some(card),
                    &state.grid,
                    state.turn,
                    state.move_context(),
                );
                prop_assert!(highlighted.is_valid(dst), "{:?} not highlighted", action);
            }
        }
    }

    #[test]
    fn highlighted_empty_squares_are_accepted(
        seed in any::<u64>(),
        choices in prop::collection::vec(any::<usize>(), 0..24),
    ) {
        let (rules, state) = play_out(seed, false, &choices);
        prop_assume!(!state.is_finished() && state.pending_extra_move.is_none());

        for card in *state.current_hand() {
            let movers: Vec<_> = state
                .grid
                .pieces()
                .filter(|(_, piece)| piece.is_owned_by(state.turn) || *piece == Piece::WindSpirit)
                .collect();
            for (src, _) in movers {
                let highlighted = resolve(Some(src), Some(card), &state.grid, state.turn, state.move_context());
                for dst in highlighted.iter().filter(|dst| state.grid.get(*dst).is_none()) {
                    let result = rules.apply(&state, &Action::step(card, src, dst));
                    prop_assert!(result.is_ok(), "{} {} -> {} rejected: {:?}", card, src, dst, result);
                }
            }
        }
    }

    #[test]
    fn same_inputs_same_highlight(
        src in any_point(),
        card in any_card(),
        turn in any_player(),
        pending in any::<bool>(),
        seed in any::<u64>(),
        choices in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        let (_, state) = play_out(seed, true, &choices);
        let ctx = MoveContext { pending_extra_move: pending };
        let first = resolve(Some(src), Some(card), &state.grid, turn, ctx);
        let second = resolve(Some(src), Some(card), &state.grid, turn, ctx);
        prop_assert_eq!(first, second);
        prop_assert!(first.iter().all(|dst| dst.in_bounds()));
    }

    #[test]
    fn blue_mirrors_red_through_the_source(
        src in any_point(),
        card in any_card(),
    ) {
        let mut grid = Grid::empty();
        grid.set(src, Some(Piece::Pawn(Player::Red)));
        let ctx = MoveContext::default();
        let red = resolve(Some(src), Some(card), &grid, Player::Red, ctx);
        let blue = resolve(Some(src), Some(card), &grid, Player::Blue, ctx);

        for dst in red.iter() {
            let mirrored = src + (src - dst);
            prop_assert!(!mirrored.in_bounds() || blue.is_valid(mirrored));
        }
        for dst in blue.iter() {
            let mirrored = src + (src - dst);
            prop_assert!(!mirrored.in_bounds() || red.is_valid(mirrored));
        }
    }

    #[test]
    fn empty_source_highlights_nothing(
        src in any_point(),
        card in any_card(),
        turn in any_player(),
        pending in any::<bool>(),
    ) {
        let grid = Grid::empty();
        let ctx = MoveContext { pending_extra_move: pending };
        prop_assert!(resolve(Some(src), Some(card), &grid, turn, ctx).is_empty());
        prop_assert!(resolve(None, Some(card), &grid, turn, ctx).is_empty());
        prop_assert!(resolve(Some(src), None, &grid, turn, ctx).is_empty());
    }
}
