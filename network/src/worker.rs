// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background compute workers for the AI opponent and move rankings.
//!
//! A worker is a plain thread fed through a crossbeam channel. It keeps no
//! game state between requests: every request carries the snapshot it is
//! about, and every reply echoes the ticket it answers so the session can
//! drop replies that arrive after a reset.

use crossbeam_channel::{unbounded, Receiver, Sender};
use onitama_core::agents::{self, Agent, RankedAction};
use onitama_core::{Action, Engine, GameSnapshot};
use std::sync::Arc;
use std::thread;
use thiserror::Error;

/// Identifies one request
pub type Ticket = u64;

#[derive(Debug, Clone)]
pub enum WorkerRequest {
    /// Pick the AI's action
    ChooseMove {
        ticket: Ticket,
        state: GameSnapshot,
        agent: Agent,
        depth: u8,
    },
    /// Score every legal action
    RankMoves {
        ticket: Ticket,
        state: GameSnapshot,
        depth: u8,
    },
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum WorkerReply {
    /// `None` when the position has no legal action
    Move { ticket: Ticket, action: Option<Action> },
    Rankings {
        ticket: Ticket,
        rankings: Vec<RankedAction>,
    },
}

impl WorkerReply {
    pub fn ticket(&self) -> Ticket {
        match self {
            WorkerReply::Move { ticket, .. } | WorkerReply::Rankings { ticket, .. } => *ticket,
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Worker thread has stopped")]
    Disconnected,
}

/// Handle to one worker thread
pub struct ComputeWorker {
    name: String,
    requests: Sender<WorkerRequest>,
    replies: Receiver<WorkerReply>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ComputeWorker {
    /// Spawn a named worker thread over `engine`
    pub fn spawn(name: &str, engine: Arc<dyn Engine>) -> Result<Self, WorkerError> {
        let (req_tx, req_rx) = unbounded::<WorkerRequest>();
        let (reply_tx, reply_rx) = unbounded::<WorkerReply>();
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run_worker(&thread_name, engine.as_ref(), req_rx, reply_tx))?;

        Ok(Self {
            name: name.to_string(),
            requests: req_tx,
            replies: reply_rx,
            handle: Some(handle),
        })
    }

    /// Queue a request; the reply arrives on [`ComputeWorker::replies`]
    pub fn request(&self, request: WorkerRequest) -> Result<(), WorkerError> {
        self.requests
            .send(request)
            .map_err(|_| WorkerError::Disconnected)
    }

    /// Receiver of replies, in request order
    pub fn replies(&self) -> &Receiver<WorkerReply> {
        &self.replies
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ComputeWorker {
    fn drop(&mut self) {
        let _ = self.requests.send(WorkerRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(worker = %self.name, "Worker thread panicked");
            }
        }
    }
}

fn run_worker(
    name: &str,
    engine: &dyn Engine,
    requests: Receiver<WorkerRequest>,
    replies: Sender<WorkerReply>,
) {
    tracing::debug!(worker = name, "Worker started");
    for request in requests.iter() {
        let reply = match request {
            WorkerRequest::ChooseMove {
                ticket,
                state,
                agent,
                depth,
            } => {
                let action = agents::play(engine, &state, agent, depth);
                WorkerReply::Move { ticket, action }
            }
            WorkerRequest::RankMoves {
                ticket,
                state,
                depth,
            } => WorkerReply::Rankings {
                ticket,
                rankings: agents::rank_actions(engine, &state, depth),
            },
            WorkerRequest::Shutdown => break,
        };
        if replies.send(reply).is_err() {
            break;
        }
    }
    tracing::debug!(worker = name, "Worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use onitama_core::{GameSettings, StandardRules};
    use std::time::Duration;

    #[test]
    fn answers_with_the_same_ticket() {
        let engine: Arc<dyn Engine> = Arc::new(StandardRules::new(GameSettings {
            seed: Some(5),
            ..Default::default()
        }));
        let worker = ComputeWorker::spawn("test-ai", engine.clone()).unwrap();
        let state = engine.new_game();

        worker
            .request(WorkerRequest::ChooseMove {
                ticket: 7,
                state: state.clone(),
                agent: Agent::Greedy,
                depth: 1,
            })
            .unwrap();
        worker
            .request(WorkerRequest::RankMoves {
                ticket: 8,
                state: state.clone(),
                depth: 1,
            })
            .unwrap();

        let first = worker.replies().recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(first.ticket(), 7);
        let WorkerReply::Move { action: Some(action), .. } = first else {
            panic!("expected a move");
        };
        assert!(engine.apply(&state, &action).is_ok());

        let second = worker.replies().recv_timeout(Duration::from_secs(10)).unwrap();
        let WorkerReply::Rankings { ticket, rankings } = second else {
            panic!("expected rankings");
        };
        assert_eq!(ticket, 8);
        assert_eq!(rankings.len(), engine.legal_actions(&state).len());
    }
}
