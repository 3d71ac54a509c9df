// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stateless computer opponents.
//!
//! Every function here is a pure computation over a snapshot, so the
//! background workers can run them on any thread without shared state.

use crate::{Action, Engine, GameSnapshot, Piece, Player};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const WIN: i32 = 100_000;
const INFINITY: i32 = 1_000_000;

/// Random games played from each candidate action
const PLAYOUTS_PER_ACTION: usize = 24;

/// A playout that runs longer than this counts as a draw
const PLAYOUT_PLIES: usize = 100;

/// Opponent strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Search depth in plies
    pub fn depth(&self) -> u8 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    /// Agent used at this strength unless the config names one
    pub fn agent(&self) -> Agent {
        match self {
            Difficulty::Easy => Agent::Greedy,
            Difficulty::Medium | Difficulty::Hard => Agent::AlphaBeta,
        }
    }

    /// Name of the agent playing at this strength
    pub fn agent_name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Greedy",
            Difficulty::Medium => "AlphaBeta (shallow)",
            Difficulty::Hard => "AlphaBeta",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(name)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("Unknown difficulty: {}", other)),
        }
    }
}

/// Search strategy behind the computer opponent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agent {
    /// Best immediate outcome, one ply
    Greedy,
    /// Full-width search without pruning
    Minimax,
    AlphaBeta,
    /// Random playouts over the actions a shallow search does not lose with
    MonteCarlo,
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Agent::Greedy => "Greedy",
            Agent::Minimax => "Minimax",
            Agent::AlphaBeta => "AlphaBeta",
            Agent::MonteCarlo => "MonteCarlo",
        };
        f.write_str(name)
    }
}

impl FromStr for Agent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(Agent::Greedy),
            "minimax" => Ok(Agent::Minimax),
            "alphabeta" => Ok(Agent::AlphaBeta),
            "montecarlo" => Ok(Agent::MonteCarlo),
            other => Err(format!("Unknown agent: {}", other)),
        }
    }
}

/// A legal action with its search score from the mover's point of view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedAction {
    pub action: Action,
    pub score: f32,
}

/// Static evaluation of `state` for `player`
pub fn evaluate(state: &GameSnapshot, player: Player) -> i32 {
    if let Some(winner) = state.winner {
        return if winner == player { WIN } else { -WIN };
    }
    let mut score = 0;
    for (point, piece) in state.grid.pieces() {
        let (owner, value) = match piece {
            Piece::Pawn(owner) => (owner, 10),
            Piece::Ninja { owner, .. } => (owner, 12),
            Piece::King(owner) => {
                let goal = owner.opposite().temple();
                let distance = (goal.x - point.x).abs().max((goal.y - point.y).abs());
                (owner, 8 - i32::from(distance))
            }
            Piece::WindSpirit => continue,
        };
        score += if owner == player { value } else { -value };
    }
    score
}

/// Negamax with alpha-beta pruning.
///
/// A child that keeps the same player to act (the Wind Spirit's second step,
/// or a finished game) is scored from the same side without negation.
fn search(engine: &dyn Engine, state: &GameSnapshot, depth: u8, mut alpha: i32, beta: i32) -> i32 {
    if state.is_finished() {
        return evaluate(state, state.turn) + i32::from(depth);
    }
    if depth == 0 {
        return evaluate(state, state.turn);
    }
    let mut best = -INFINITY;
    for action in engine.legal_actions(state) {
        let Ok(verdict) = engine.apply(state, &action) else {
            continue;
        };
        let child = verdict.into_snapshot();
        let score = if child.turn == state.turn {
            search(engine, &child, depth - 1, alpha, beta)
        } else {
            -search(engine, &child, depth - 1, -beta, -alpha)
        };
        best = best.max(score);
        alpha = alpha.max(score);
        if alpha >= beta {
            break;
        }
    }
    if best == -INFINITY {
        evaluate(state, state.turn)
    } else {
        best
    }
}

/// Score every legal action of the player to act, in legal-action order
pub fn rank_actions(engine: &dyn Engine, state: &GameSnapshot, depth: u8) -> Vec<RankedAction> {
    let depth = depth.max(1);
    engine
        .legal_actions(state)
        .into_iter()
        .filter_map(|action| {
            let child = engine.apply(state, &action).ok()?.into_snapshot();
            let score = if child.turn == state.turn {
                search(engine, &child, depth - 1, -INFINITY, INFINITY)
            } else {
                -search(engine, &child, depth - 1, -INFINITY, INFINITY)
            };
            Some(RankedAction {
                action,
                score: score as f32,
            })
        })
        .collect()
}

/// Pick the best action at `difficulty`; ties go to the earliest action
pub fn choose_action(
    engine: &dyn Engine,
    state: &GameSnapshot,
    difficulty: Difficulty,
) -> Option<Action> {
    play(engine, state, difficulty.agent(), difficulty.depth())
}

/// Pick an action with `agent` searching `depth` plies
pub fn play(engine: &dyn Engine, state: &GameSnapshot, agent: Agent, depth: u8) -> Option<Action> {
    let chosen = match agent {
        Agent::Greedy => best_of(rank_actions(engine, state, 1)),
        Agent::Minimax => best_of(minimax_actions(engine, state, depth)),
        Agent::AlphaBeta => best_of(rank_actions(engine, state, depth)),
        Agent::MonteCarlo => monte_carlo(engine, state, depth),
    };
    tracing::debug!(%agent, depth, score = ?chosen.map(|b| b.score), "Agent chose action");
    chosen.map(|b| b.action)
}

fn best_of(ranked: Vec<RankedAction>) -> Option<RankedAction> {
    let mut best: Option<RankedAction> = None;
    for candidate in ranked {
        if best.map_or(true, |b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }
    best
}

/// Plain negamax value of `state` for the player to act
pub fn minimax(engine: &dyn Engine, state: &GameSnapshot, depth: u8) -> i32 {
    if state.is_finished() {
        return evaluate(state, state.turn) + i32::from(depth);
    }
    if depth == 0 {
        return evaluate(state, state.turn);
    }
    engine
        .legal_actions(state)
        .iter()
        .filter_map(|action| engine.apply(state, action).ok())
        .map(|verdict| {
            let child = verdict.into_snapshot();
            if child.turn == state.turn {
                minimax(engine, &child, depth - 1)
            } else {
                -minimax(engine, &child, depth - 1)
            }
        })
        .max()
        .unwrap_or_else(|| evaluate(state, state.turn))
}

fn minimax_actions(engine: &dyn Engine, state: &GameSnapshot, depth: u8) -> Vec<RankedAction> {
    let depth = depth.max(1);
    engine
        .legal_actions(state)
        .into_iter()
        .filter_map(|action| {
            let child = engine.apply(state, &action).ok()?.into_snapshot();
            let score = if child.turn == state.turn {
                minimax(engine, &child, depth - 1)
            } else {
                -minimax(engine, &child, depth - 1)
            };
            Some(RankedAction {
                action,
                score: score as f32,
            })
        })
        .collect()
}

/// Take a forced win when the shallow search sees one, otherwise score the
/// actions that do not lose by random playouts. The generator is seeded from
/// the position, so the same position always gets the same answer.
fn monte_carlo(engine: &dyn Engine, state: &GameSnapshot, depth: u8) -> Option<RankedAction> {
    let ranked = rank_actions(engine, state, depth);
    let winning = WIN as f32;
    if let Some(win) = best_of(ranked.iter().copied().filter(|r| r.score >= winning).collect()) {
        return Some(win);
    }
    let mut candidates: Vec<RankedAction> = ranked.iter().copied().filter(|r| r.score > -winning).collect();
    if candidates.is_empty() {
        candidates = ranked;
    }

    let mut hasher = DefaultHasher::new();
    state.hash(&mut hasher);
    let mut rng = StdRng::seed_from_u64(hasher.finish());
    let mover = state.turn;
    for candidate in &mut candidates {
        let Ok(verdict) = engine.apply(state, &candidate.action) else {
            continue;
        };
        let child = verdict.into_snapshot();
        let mut tally = 0i32;
        for _ in 0..PLAYOUTS_PER_ACTION {
            match playout(engine, child.clone(), &mut rng) {
                Some(winner) if winner == mover => tally += 1,
                Some(_) => tally -= 1,
                None => {}
            }
        }
        candidate.score = tally as f32;
    }
    tracing::trace!(candidates = candidates.len(), "Playouts finished");
    best_of(candidates)
}

/// Random play to the end; `None` when the game outlasts the ply limit
fn playout(engine: &dyn Engine, mut state: GameSnapshot, rng: &mut StdRng) -> Option<Player> {
    for _ in 0..PLAYOUT_PLIES {
        if let Some(winner) = state.winner {
            return Some(winner);
        }
        let actions = engine.legal_actions(&state);
        let action = actions.choose(rng)?;
        state = engine.apply(&state, action).ok()?.into_snapshot();
    }
    state.winner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Card, GameSettings, Grid, Hands, Point, StandardRules};

    fn position(grid: Grid) -> GameSnapshot {
        GameSnapshot {
            grid,
            turn: Player::Red,
            hands: Hands {
                red: [Card::Tiger, Card::Boar],
                blue: [Card::Monkey, Card::Crane],
            },
            spare: Card::Crab,
            pending_extra_move: None,
            last_move: None,
            winner: None,
        }
    }

    #[test]
    fn takes_a_winning_capture() {
        let rules = StandardRules::default();
        let mut grid = Grid::empty();
        grid.set(Point::new(0, 4), Some(Piece::King(Player::Red)));
        grid.set(Point::new(2, 3), Some(Piece::Pawn(Player::Red)));
        grid.set(Point::new(2, 1), Some(Piece::King(Player::Blue)));
        let state = position(grid);

        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(
                choose_action(&rules, &state, difficulty),
                Some(Action::step(Card::Tiger, Point::new(2, 3), Point::new(2, 1))),
                "{}",
                difficulty
            );
        }
    }

    #[test]
    fn choice_is_deterministic() {
        let rules = StandardRules::new(GameSettings {
            seed: Some(11),
            ..Default::default()
        });
        let state = rules.new_game();
        let first = choose_action(&rules, &state, Difficulty::Medium);
        assert!(first.is_some());
        assert_eq!(first, choose_action(&rules, &state, Difficulty::Medium));
    }

    #[test]
    fn rankings_cover_all_legal_actions() {
        let rules = StandardRules::default();
        let state = position(Grid::starting(false, false));
        let ranked = rank_actions(&rules, &state, 1);
        assert_eq!(ranked.len(), rules.legal_actions(&state).len());
    }

    #[test]
    fn every_agent_takes_a_winning_capture() {
        let rules = StandardRules::default();
        let mut grid = Grid::empty();
        grid.set(Point::new(0, 4), Some(Piece::King(Player::Red)));
        grid.set(Point::new(2, 3), Some(Piece::Pawn(Player::Red)));
        grid.set(Point::new(2, 1), Some(Piece::King(Player::Blue)));
        let state = position(grid);

        for agent in [Agent::Greedy, Agent::Minimax, Agent::AlphaBeta, Agent::MonteCarlo] {
            assert_eq!(
                play(&rules, &state, agent, 2),
                Some(Action::step(Card::Tiger, Point::new(2, 3), Point::new(2, 1))),
                "{}",
                agent
            );
        }
    }

    #[test]
    fn minimax_agrees_with_pruned_search() {
        let rules = StandardRules::new(GameSettings {
            seed: Some(4),
            ..Default::default()
        });
        let state = rules.new_game();
        for depth in 1..=2 {
            let pruned = rank_actions(&rules, &state, depth);
            let full = minimax_actions(&rules, &state, depth);
            let best = |ranked: &[RankedAction]| ranked.iter().map(|r| r.score).fold(f32::MIN, f32::max);
            assert_eq!(best(&pruned), best(&full), "depth {}", depth);
        }
    }

    #[test]
    fn monte_carlo_is_repeatable() {
        let rules = StandardRules::new(GameSettings {
            seed: Some(6),
            ..Default::default()
        });
        let state = rules.new_game();
        let first = play(&rules, &state, Agent::MonteCarlo, 1);
        assert!(first.is_some());
        assert_eq!(first, play(&rules, &state, Agent::MonteCarlo, 1));
    }

    #[test]
    fn difficulty_parses() {
        assert_eq!("Hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("nightmare".parse::<Difficulty>().is_err());
        assert_eq!("MonteCarlo".parse::<Agent>(), Ok(Agent::MonteCarlo));
        assert_eq!(Difficulty::Easy.agent(), Agent::Greedy);
    }
}
