// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human versus computer, with an optional training overlay.
//!
//! The human plays Red. After each human action the session hands the new
//! snapshot to the AI worker and waits for the reply on the worker channel;
//! callers drive delivery with [`SinglePlayerSession::pump`] or one of the
//! blocking `wait_*` helpers. Every request carries a fresh ticket and only
//! the ticket currently outstanding is honoured, so a reply computed for a
//! game that was reset or undone is dropped.

use super::{GameSession, MoveRankings, SessionCore, SessionError, SessionEvent, Submitted};
use crate::config::SessionConfig;
use crate::worker::{ComputeWorker, Ticket, WorkerError, WorkerReply, WorkerRequest};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use onitama_core::agents::{Agent, Difficulty};
use onitama_core::{Action, Engine, GameSnapshot, Player};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Search depth used for training rankings
const TRAINING_DEPTH: u8 = 2;

pub struct SinglePlayerSession {
    core: SessionCore,
    human: Player,
    difficulty: Difficulty,
    agent: Agent,
    ai: ComputeWorker,
    trainer: Option<ComputeWorker>,
    /// Snapshots from the start of each human turn, newest last
    history: Vec<Arc<GameSnapshot>>,
    next_ticket: Ticket,
    in_flight: Option<Ticket>,
    ranking_ticket: Option<Ticket>,
    rankings: Option<Arc<MoveRankings>>,
}

impl SinglePlayerSession {
    /// Play against the AI at the configured difficulty
    pub fn new(engine: Arc<dyn Engine>, config: &SessionConfig) -> Result<Self, WorkerError> {
        Self::build(engine, config, false)
    }

    /// Same as [`SinglePlayerSession::new`], plus move rankings for every
    /// human turn
    pub fn training(engine: Arc<dyn Engine>, config: &SessionConfig) -> Result<Self, WorkerError> {
        Self::build(engine, config, true)
    }

    fn build(engine: Arc<dyn Engine>, config: &SessionConfig, training: bool) -> Result<Self, WorkerError> {
        let difficulty = config.difficulty;
        let agent = config.agent();
        let ai = ComputeWorker::spawn("onitama-ai", engine.clone())?;
        let trainer = if training {
            Some(ComputeWorker::spawn("onitama-trainer", engine.clone())?)
        } else {
            None
        };

        let mut session = Self {
            core: SessionCore::new(engine, opponent_name(difficulty, config.agent)),
            human: Player::Red,
            difficulty,
            agent,
            ai,
            trainer,
            history: Vec::new(),
            next_ticket: 0,
            in_flight: None,
            ranking_ticket: None,
            rankings: None,
        };
        session.deal();
        Ok(session)
    }

    pub fn human(&self) -> Player {
        self.human
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn agent(&self) -> Agent {
        self.agent
    }

    pub fn is_training(&self) -> bool {
        self.trainer.is_some()
    }

    /// The AI is thinking
    pub fn is_waiting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Latest rankings, possibly flagged stale
    pub fn rankings(&self) -> Option<Arc<MoveRankings>> {
        self.rankings.clone()
    }

    /// Deliver every reply that has already arrived; returns how many were
    /// handled. A worker that stopped with a request outstanding is reported
    /// as [`SessionError::WorkerUnavailable`].
    pub fn pump(&mut self) -> usize {
        let (mut replies, ai_stopped) = collect_replies(self.ai.replies());
        let mut trainer_stopped = false;
        if let Some(trainer) = &self.trainer {
            let (more, stopped) = collect_replies(trainer.replies());
            replies.extend(more);
            trainer_stopped = stopped;
        }
        let count = replies.len();
        for reply in replies {
            self.handle_worker_reply(reply);
        }
        if ai_stopped && self.in_flight.take().is_some() {
            let name = self.ai.name().to_string();
            self.worker_lost(&name);
        }
        if trainer_stopped && self.ranking_ticket.take().is_some() {
            let name = self.trainer.as_ref().map(|t| t.name().to_string()).unwrap_or_default();
            self.worker_lost(&name);
        }
        count
    }

    /// Block until the outstanding AI reply is handled or `timeout` passes.
    /// Returns `false` on timeout or when nothing is outstanding.
    pub fn wait_for_ai(&mut self, timeout: Duration) -> bool {
        let replies = self.ai.replies().clone();
        self.wait_on(&replies, timeout, |session| session.in_flight.is_none())
    }

    /// Block until the outstanding ranking request is answered
    pub fn wait_for_rankings(&mut self, timeout: Duration) -> bool {
        let Some(replies) = self.trainer.as_ref().map(|t| t.replies().clone()) else {
            return false;
        };
        self.wait_on(&replies, timeout, |session| session.ranking_ticket.is_none())
    }

    fn wait_on(
        &mut self,
        replies: &Receiver<WorkerReply>,
        timeout: Duration,
        done: impl Fn(&Self) -> bool,
    ) -> bool {
        if done(self) {
            return false;
        }
        let deadline = std::time::Instant::now() + timeout;
        while !done(self) {
            let left = deadline.saturating_duration_since(std::time::Instant::now());
            match replies.recv_timeout(left) {
                Ok(reply) => self.handle_worker_reply(reply),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    self.in_flight = None;
                    self.ranking_ticket = None;
                    self.core.report(SessionError::WorkerUnavailable.to_string());
                    return false;
                }
            }
        }
        true
    }

    /// Apply a worker reply if it answers the request currently outstanding
    pub fn handle_worker_reply(&mut self, reply: WorkerReply) {
        match reply {
            WorkerReply::Move { ticket, action } => {
                if self.in_flight != Some(ticket) {
                    tracing::debug!(ticket, in_flight = ?self.in_flight, "Discarding stale AI reply");
                    return;
                }
                self.in_flight = None;
                let Some(action) = action else {
                    self.core.report("AI found no legal action");
                    return;
                };
                tracing::debug!(ticket, generation = self.core.generation(), ?action, "AI replied");
                match self.core.apply(&action) {
                    Ok(state) => {
                        self.after_change(&state);
                    }
                    Err(e) => self.core.report(format!("AI action rejected: {}", e)),
                }
            }
            WorkerReply::Rankings { ticket, rankings } => {
                if self.ranking_ticket != Some(ticket) {
                    tracing::debug!(ticket, "Discarding stale rankings");
                    return;
                }
                self.ranking_ticket = None;
                let rankings = Arc::new(MoveRankings::from_ranked(&rankings));
                self.rankings = Some(rankings.clone());
                self.core.publish(SessionEvent::Rankings(rankings));
            }
        }
    }

    fn worker_lost(&mut self, name: &str) {
        tracing::error!(worker = name, "Worker stopped with a request outstanding");
        self.core.report(SessionError::WorkerUnavailable.to_string());
    }

    fn deal(&mut self) {
        self.history.clear();
        self.in_flight = None;
        self.ranking_ticket = None;
        self.rankings = None;
        let state = self.core.engine().new_game();
        let state = self.core.start(state);
        self.after_change(&state);
    }

    fn ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Decide who acts next on `state`
    fn after_change(&mut self, state: &Arc<GameSnapshot>) -> Submitted {
        if state.is_finished() {
            return Submitted::Applied;
        }
        if state.turn == self.human {
            self.request_rankings(state);
            return Submitted::Applied;
        }
        match self.dispatch_ai(state) {
            Ok(()) => Submitted::AwaitingReply,
            Err(e) => {
                self.core.report(e.to_string());
                Submitted::Applied
            }
        }
    }

    fn dispatch_ai(&mut self, state: &GameSnapshot) -> Result<(), SessionError> {
        let ticket = self.ticket();
        self.in_flight = Some(ticket);
        tracing::debug!(ticket, generation = self.core.generation(), "Requesting AI move");
        let request = WorkerRequest::ChooseMove {
            ticket,
            state: state.clone(),
            agent: self.agent,
            depth: self.difficulty.depth(),
        };
        if self.ai.request(request).is_err() {
            self.in_flight = None;
            return Err(SessionError::WorkerUnavailable);
        }
        Ok(())
    }

    fn request_rankings(&mut self, state: &GameSnapshot) {
        if self.trainer.is_none() {
            return;
        }
        if let Some(previous) = &self.rankings {
            let stale = Arc::new(previous.as_stale());
            self.rankings = Some(stale.clone());
            self.core.publish(SessionEvent::Rankings(stale));
        }
        let ticket = self.ticket();
        self.ranking_ticket = Some(ticket);
        let request = WorkerRequest::RankMoves {
            ticket,
            state: state.clone(),
            depth: TRAINING_DEPTH,
        };
        let sent = self.trainer.as_ref().map(|t| t.request(request));
        if let Some(Err(e)) = sent {
            self.ranking_ticket = None;
            self.core.report(format!("Rankings unavailable: {}", e));
        }
    }
}

fn opponent_name(difficulty: Difficulty, agent: Option<Agent>) -> String {
    match agent {
        Some(agent) => format!("{} (depth {})", agent, difficulty.depth()),
        None => difficulty.agent_name().to_string(),
    }
}

/// Everything queued on `replies`, and whether its worker has gone away
fn collect_replies(replies: &Receiver<WorkerReply>) -> (Vec<WorkerReply>, bool) {
    let mut collected = Vec::new();
    loop {
        match replies.try_recv() {
            Ok(reply) => collected.push(reply),
            Err(TryRecvError::Empty) => return (collected, false),
            Err(TryRecvError::Disconnected) => return (collected, true),
        }
    }
}

impl GameSession for SinglePlayerSession {
    fn state(&self) -> Option<Arc<GameSnapshot>> {
        self.core.state()
    }

    fn submit_action(&mut self, action: Action) -> Result<Submitted, SessionError> {
        if self.in_flight.is_some() {
            return Err(SessionError::RequestInFlight);
        }
        let current = self.core.state().ok_or(SessionError::NotReady)?;
        if current.turn != self.human {
            return Err(SessionError::NotYourTurn);
        }
        let state = self.core.apply(&action)?;
        // Undo steps back whole turns, never into a pending Wind Spirit step
        if current.pending_extra_move.is_none() {
            self.history.push(current);
        }
        Ok(self.after_change(&state))
    }

    fn reset(&mut self) -> Result<(), SessionError> {
        self.deal();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.core.subscribe()
    }

    fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Restore the snapshot from before the last human action, dropping the
    /// AI reply to it whether or not it has arrived
    fn undo(&mut self) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };
        self.in_flight = None;
        self.ranking_ticket = None;
        let state = self.core.replace((*previous).clone());
        tracing::info!(generation = self.core.generation(), remaining = self.history.len(), "Undo");
        self.after_change(&state);
        true
    }
}
