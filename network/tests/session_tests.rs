// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local and single-player session behaviour

mod common;

use common::{any_legal_action, config, drain, engine, init_logging, snapshot_count, REPLY_TIMEOUT};
use onitama_core::agents::{Agent, Difficulty};
use onitama_core::{
    resolve, Action, Card, Engine, GameError, GameSettings, GameSnapshot, Grid, Hands, Player, Point, StandardRules,
    Verdict,
};
use onitama_network::{GameSession, LocalSession, SessionError, SessionEvent, SinglePlayerSession, Submitted};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn easy_config(seed: u64) -> onitama_network::SessionConfig {
    onitama_network::SessionConfig {
        difficulty: Difficulty::Easy,
        ..config(seed)
    }
}

#[test]
fn local_action_publishes_exactly_one_snapshot() {
    init_logging();
    let engine = engine(1);
    let mut session = LocalSession::new(engine.clone());
    let mut events = session.subscribe();
    let before = session.state().unwrap();

    let action = any_legal_action(&session, engine.as_ref());
    assert_eq!(session.submit_action(action), Ok(Submitted::Applied));

    let seen = drain(&mut events);
    assert_eq!(snapshot_count(&seen), 1);
    let after = session.state().unwrap();
    assert_ne!(*after, *before);
    if after.pending_extra_move.is_none() {
        assert_eq!(after.turn, Player::Blue);
    }
}

#[test]
fn local_rejection_leaves_the_snapshot_alone() {
    init_logging();
    let mut session = LocalSession::new(engine(2));
    let mut events = session.subscribe();
    let before = session.state().unwrap();
    let card = before.current_hand()[0];

    let result = session.submit_action(Action::step(card, Point::new(1, 2), Point::new(1, 1)));
    assert_eq!(result, Err(SessionError::Illegal(GameError::NoPieceAtSource)));
    assert_eq!(session.state().unwrap(), before);
    assert!(drain(&mut events).is_empty());
}

#[test]
fn local_reset_deals_again() {
    init_logging();
    let engine = engine(3);
    let mut session = LocalSession::new(engine.clone());
    let action = any_legal_action(&session, engine.as_ref());
    session.submit_action(action).unwrap();

    let mut events = session.subscribe();
    session.reset().unwrap();
    let seen = drain(&mut events);
    assert!(seen.iter().any(|e| matches!(e, SessionEvent::Started { against } if against == "local")));
    assert_eq!(*session.state().unwrap(), engine.new_game());
    assert!(!session.can_undo());
    assert!(!session.undo());
}

#[test]
fn highlight_agrees_with_the_engine() {
    init_logging();
    let engine = engine(4);
    let session = LocalSession::new(engine.clone());
    let state = session.state().unwrap();
    let legal = engine.legal_actions(&state);

    for card in *state.current_hand() {
        for (src, _) in state.grid.pieces_of(Player::Red) {
            let lit = session.highlight(Some(src), Some(card));
            assert_eq!(lit, resolve(Some(src), Some(card), &state.grid, state.turn, state.move_context()));
            for dst in lit.iter().filter(|dst| state.grid.get(*dst).is_none()) {
                assert!(legal.contains(&Action::step(card, src, dst)), "{card} {src} -> {dst}");
            }
        }
    }
    assert!(session.highlight(None, Some(state.current_hand()[0])).is_empty());
}

#[test]
fn ai_answers_and_hands_the_turn_back() {
    init_logging();
    let engine = engine(5);
    let mut session = SinglePlayerSession::new(engine.clone(), &easy_config(5)).unwrap();
    let mut events = session.subscribe();
    assert_eq!(session.human(), Player::Red);

    let mut outcome = Submitted::Applied;
    while outcome == Submitted::Applied && session.state().unwrap().turn == Player::Red {
        let action = any_legal_action(&session, engine.as_ref());
        outcome = session.submit_action(action).unwrap();
    }
    assert_eq!(outcome, Submitted::AwaitingReply);
    assert!(session.is_waiting());

    let again = any_legal_action(&session, engine.as_ref());
    assert_eq!(session.submit_action(again), Err(SessionError::RequestInFlight));

    assert!(session.wait_for_ai(REPLY_TIMEOUT));
    let state = session.state().unwrap();
    assert!(state.turn == Player::Red || state.is_finished());
    assert!(!session.is_waiting());

    let seen = drain(&mut events);
    assert!(snapshot_count(&seen) >= 2);
}

#[test]
fn waiting_with_nothing_outstanding_returns_at_once() {
    init_logging();
    let engine = engine(6);
    let mut session = SinglePlayerSession::new(engine.clone(), &easy_config(6)).unwrap();
    while session.state().unwrap().turn == Player::Red {
        let action = any_legal_action(&session, engine.as_ref());
        session.submit_action(action).unwrap();
    }
    assert!(session.wait_for_ai(REPLY_TIMEOUT));
    assert!(!session.wait_for_ai(Duration::from_millis(10)));
}

#[test]
fn reply_after_reset_is_discarded() {
    init_logging();
    let engine = engine(7);
    let mut session = SinglePlayerSession::new(engine.clone(), &easy_config(7)).unwrap();
    while !session.is_waiting() {
        let action = any_legal_action(&session, engine.as_ref());
        session.submit_action(action).unwrap();
    }

    session.reset().unwrap();
    let fresh = session.state().unwrap();
    assert_eq!(*fresh, engine.new_game());
    assert!(!session.is_waiting());

    // Give the worker time to answer the abandoned request
    std::thread::sleep(Duration::from_millis(500));
    session.pump();
    assert_eq!(session.state().unwrap(), fresh);
}

#[test]
fn undo_rolls_back_a_full_turn() {
    init_logging();
    let engine = engine(8);
    let mut session = SinglePlayerSession::new(engine.clone(), &easy_config(8)).unwrap();
    let start = session.state().unwrap();
    assert!(!session.can_undo());

    let action = any_legal_action(&session, engine.as_ref());
    session.submit_action(action).unwrap();
    session.wait_for_ai(REPLY_TIMEOUT);
    assert!(session.can_undo());

    assert!(session.undo());
    if !session.can_undo() {
        assert_eq!(session.state().unwrap(), start);
    }
    while session.undo() {}
    assert_eq!(session.state().unwrap(), start);
    assert!(!session.is_waiting());
}

#[test]
fn undo_while_thinking_drops_the_reply() {
    init_logging();
    let engine = engine(9);
    let mut session = SinglePlayerSession::new(engine.clone(), &easy_config(9)).unwrap();
    let start = session.state().unwrap();
    while !session.is_waiting() {
        let action = any_legal_action(&session, engine.as_ref());
        session.submit_action(action).unwrap();
    }

    while session.undo() {}
    std::thread::sleep(Duration::from_millis(500));
    session.pump();
    assert_eq!(session.state().unwrap(), start);
}

#[test]
fn training_publishes_rankings_for_the_human() {
    init_logging();
    let engine = engine(10);
    let mut session = SinglePlayerSession::training(engine.clone(), &easy_config(10)).unwrap();
    assert!(session.is_training());
    let mut events = session.subscribe();

    assert!(session.wait_for_rankings(REPLY_TIMEOUT));
    let rankings = session.rankings().unwrap();
    assert!(!rankings.stale);
    assert!(!rankings.is_empty());
    assert!(rankings.max >= rankings.min);

    let state = session.state().unwrap();
    let action = engine.legal_actions(&state)[0];
    let Action::Move { card, src, dst, .. } = action else {
        panic!("opening position always has moves");
    };
    assert!(rankings.for_selection(card, src).iter().any(|s| s.dst == dst));

    session.submit_action(action).unwrap();
    let seen = drain(&mut events);
    assert!(seen
        .iter()
        .any(|e| matches!(e, SessionEvent::Rankings(r) if !r.stale)));
    if session.is_waiting() {
        assert!(seen
            .iter()
            .all(|e| !matches!(e, SessionEvent::Rankings(r) if r.stale)));
    }
}

/// Standard rules that always deal `start`
struct FixedDeal {
    rules: StandardRules,
    start: GameSnapshot,
}

impl Engine for FixedDeal {
    fn new_game(&self) -> GameSnapshot {
        self.start.clone()
    }

    fn apply(&self, state: &GameSnapshot, action: &Action) -> Result<Verdict, GameError> {
        self.rules.apply(state, action)
    }

    fn legal_actions(&self, state: &GameSnapshot) -> Vec<Action> {
        self.rules.legal_actions(state)
    }
}

/// Standard rules whose search blows up, taking the worker thread with it
struct CrashingSearch(StandardRules);

impl Engine for CrashingSearch {
    fn new_game(&self) -> GameSnapshot {
        self.0.new_game()
    }

    fn apply(&self, state: &GameSnapshot, action: &Action) -> Result<Verdict, GameError> {
        self.0.apply(state, action)
    }

    fn legal_actions(&self, _state: &GameSnapshot) -> Vec<Action> {
        panic!("search crashed");
    }
}

#[test]
fn undo_after_a_wind_turn_restores_the_turn_start() {
    init_logging();
    let start = GameSnapshot {
        grid: Grid::starting(true, false),
        turn: Player::Red,
        hands: Hands {
            red: [Card::Rhinoceros, Card::Boar],
            blue: [Card::Monkey, Card::Crane],
        },
        spare: Card::Crab,
        pending_extra_move: None,
        last_move: None,
        winner: None,
    };
    let engine = Arc::new(FixedDeal {
        rules: StandardRules::default(),
        start: start.clone(),
    });
    let mut session = SinglePlayerSession::new(engine, &easy_config(12)).unwrap();

    let pawn = Action::step(Card::Rhinoceros, Point::new(0, 4), Point::new(0, 3));
    assert_eq!(session.submit_action(pawn), Ok(Submitted::Applied));
    assert!(session.state().unwrap().pending_extra_move.is_some());
    let wind = Action::step(Card::Rhinoceros, Point::new(2, 2), Point::new(2, 3));
    assert_eq!(session.submit_action(wind), Ok(Submitted::AwaitingReply));
    assert!(session.wait_for_ai(REPLY_TIMEOUT));

    assert!(session.undo());
    assert_eq!(*session.state().unwrap(), start);
    assert!(!session.can_undo());
    assert!(!session.is_waiting());
}

#[test]
fn crashed_worker_is_reported() {
    init_logging();
    let rules = StandardRules::new(GameSettings {
        seed: Some(13),
        ..Default::default()
    });
    let mut session = SinglePlayerSession::new(Arc::new(CrashingSearch(rules.clone())), &easy_config(13)).unwrap();
    let mut events = session.subscribe();
    while !session.is_waiting() {
        let action = any_legal_action(&session, &rules);
        session.submit_action(action).unwrap();
    }

    let deadline = Instant::now() + REPLY_TIMEOUT;
    while session.is_waiting() && Instant::now() < deadline {
        session.pump();
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!session.is_waiting());
    let unavailable = SessionError::WorkerUnavailable.to_string();
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, SessionEvent::Error(message) if *message == unavailable)));

    // Later pumps stay quiet
    session.pump();
    assert!(drain(&mut events).is_empty());
}

#[test]
fn configured_agent_replaces_the_difficulty_default() {
    init_logging();
    let engine = engine(14);
    let config = onitama_network::SessionConfig {
        agent: Some(Agent::MonteCarlo),
        ..easy_config(14)
    };
    let mut session = SinglePlayerSession::new(engine.clone(), &config).unwrap();
    assert_eq!(session.agent(), Agent::MonteCarlo);
    let mut events = session.subscribe();
    session.reset().unwrap();
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, SessionEvent::Started { against } if against == "MonteCarlo (depth 1)")));

    while !session.is_waiting() {
        let action = any_legal_action(&session, engine.as_ref());
        session.submit_action(action).unwrap();
    }
    assert!(session.wait_for_ai(REPLY_TIMEOUT));
    let state = session.state().unwrap();
    assert!(state.turn == Player::Red || state.is_finished());
}
