// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{GameSession, SessionCore, SessionError, SessionEvent, Submitted};
use onitama_core::{Action, Engine, GameSnapshot};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Two players sharing one session with synchronous engine calls
pub struct LocalSession {
    core: SessionCore,
}

impl LocalSession {
    /// Create a session and deal the first game
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        let mut core = SessionCore::new(engine, "local");
        let state = core.engine().new_game();
        core.start(state);
        Self { core }
    }
}

impl GameSession for LocalSession {
    fn state(&self) -> Option<Arc<GameSnapshot>> {
        self.core.state()
    }

    fn submit_action(&mut self, action: Action) -> Result<Submitted, SessionError> {
        self.core.apply(&action)?;
        Ok(Submitted::Applied)
    }

    fn reset(&mut self) -> Result<(), SessionError> {
        let state = self.core.engine().new_game();
        self.core.start(state);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.core.subscribe()
    }
}
