// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for session integration tests

#![allow(dead_code)]

use once_cell::sync::Lazy;
use onitama_core::{Engine, GameSettings, StandardRules};
use onitama_network::{GameSession, SessionConfig, SessionEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// How long tests wait on a worker before giving up
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(20);

// Only warnings and errors unless RUST_LOG says otherwise
static INIT_LOGGING: Lazy<()> = Lazy::new(|| {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

pub fn init_logging() {
    Lazy::force(&INIT_LOGGING);
}

/// Deterministic engine
pub fn engine(seed: u64) -> Arc<dyn Engine> {
    Arc::new(StandardRules::new(GameSettings {
        seed: Some(seed),
        ..Default::default()
    }))
}

/// Config with a seeded deck
pub fn config(seed: u64) -> SessionConfig {
    SessionConfig {
        game: GameSettings {
            seed: Some(seed),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// First legal action for the side to move
pub fn any_legal_action(session: &dyn GameSession, engine: &dyn Engine) -> onitama_core::Action {
    let state = session.state().expect("session has a game");
    engine
        .legal_actions(&state)
        .into_iter()
        .next()
        .expect("at least one legal action")
}

/// Everything published so far
pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

pub fn snapshot_count(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Snapshot(_)))
        .count()
}
