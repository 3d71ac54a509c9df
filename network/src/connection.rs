// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle for remote play.
//!
//! The machine is driven by discrete events from the session and by `tick`
//! for keep-alive. It never touches a transport itself; it only decides what
//! the status is and when a probe is due.

use crate::config::HeartbeatConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// Status shown by the connection overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Transport being opened
    Connecting,
    /// Transport open, no peer yet
    Waiting,
    /// Both sides exchanged the initial state
    Playing,
    /// The peer left mid-game
    OpponentDisconnected,
    /// Our side of the transport is gone
    Disconnected,
    /// The peer broke the protocol
    Errored,
}

impl ConnectionStatus {
    /// The transport is up and heartbeats apply
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Waiting | ConnectionStatus::Playing | ConnectionStatus::OpponentDisconnected
        )
    }

    /// Only these states accept `reconnect()`
    pub fn can_reconnect(&self) -> bool {
        matches!(self, ConnectionStatus::Disconnected | ConnectionStatus::Errored)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Inputs to the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Transport opened; `with_payload` when the peer's initial payload came
    /// in the same handshake
    Opened { with_payload: bool },
    /// Initial payload from the peer (its state, or its arrival in the room)
    PeerPayload,
    /// Relay reported that the peer left
    PeerLeft,
    /// Transport closed without a local request
    Closed,
    /// No traffic within the timeout window
    HeartbeatTimeout,
    /// Unparseable frame or a peer action our engine rejects
    ProtocolViolation(String),
}

/// Result of a keep-alive check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heartbeat {
    /// Nothing to do
    Idle,
    /// Send a probe now
    Probe,
    /// The connection is considered lost
    TimedOut,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("{event} is not valid while {from}")]
    InvalidTransition { from: ConnectionStatus, event: String },

    #[error("Reconnect is only possible when disconnected or errored, not while {0}")]
    ReconnectRefused(ConnectionStatus),
}

/// Connection state for one remote session
#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    status: ConnectionStatus,
    heartbeat: HeartbeatConfig,
    last_traffic: Instant,
    last_probe: Instant,
    attempt: u64,
}

impl ConnectionStateMachine {
    /// Start in `Connecting`
    pub fn new(heartbeat: HeartbeatConfig, now: Instant) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            heartbeat,
            last_traffic: now,
            last_probe: now,
            attempt: 0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Number of explicit reconnects so far
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Note that something arrived from the transport
    pub fn record_traffic(&mut self, now: Instant) {
        self.last_traffic = now;
    }

    /// Apply `event`, returning the new status.
    ///
    /// `PeerPayload` while `OpponentDisconnected` means the peer came back
    /// to the room, so play resumes. Rejected events leave the status
    /// unchanged.
    pub fn handle(&mut self, event: ConnectionEvent) -> Result<ConnectionStatus, ConnectionError> {
        use ConnectionEvent as E;
        use ConnectionStatus as S;

        let next = match (self.status, &event) {
            (_, E::ProtocolViolation(reason)) => {
                tracing::error!(from = %self.status, reason = %reason, "Protocol violation");
                S::Errored
            }
            (S::Connecting, E::Opened { with_payload: false }) => S::Waiting,
            (S::Connecting, E::Opened { with_payload: true }) => S::Playing,
            (S::Waiting | S::Playing | S::OpponentDisconnected, E::PeerPayload) => S::Playing,
            (S::Playing, E::PeerLeft) => S::OpponentDisconnected,
            (S::Waiting | S::OpponentDisconnected, E::PeerLeft) => self.status,
            (S::Connecting | S::Waiting | S::Playing | S::OpponentDisconnected, E::Closed) => {
                S::Disconnected
            }
            (S::Waiting | S::Playing | S::OpponentDisconnected, E::HeartbeatTimeout) => {
                S::Disconnected
            }
            (from, _) => {
                tracing::warn!(from = %from, event = ?event, "Rejected connection event");
                return Err(ConnectionError::InvalidTransition {
                    from,
                    event: format!("{:?}", event),
                });
            }
        };

        if next != self.status {
            tracing::info!(from = %self.status, status = %next, "Connection status changed");
            self.status = next;
        }
        Ok(next)
    }

    /// Leave the machine `Disconnected` after a deliberate local close
    pub fn shut_down(&mut self) {
        if self.status != ConnectionStatus::Disconnected {
            tracing::info!(from = %self.status, "Connection closed locally");
            self.status = ConnectionStatus::Disconnected;
        }
    }

    /// Go back to `Connecting` from `Disconnected` or `Errored`
    pub fn reconnect(&mut self, now: Instant) -> Result<(), ConnectionError> {
        if !self.status.can_reconnect() {
            tracing::warn!(status = %self.status, "Reconnect refused");
            return Err(ConnectionError::ReconnectRefused(self.status));
        }
        self.attempt += 1;
        self.status = ConnectionStatus::Connecting;
        self.last_traffic = now;
        self.last_probe = now;
        tracing::info!(attempt = self.attempt, "Reconnecting");
        Ok(())
    }

    /// Keep-alive bookkeeping; call periodically
    pub fn tick(&mut self, now: Instant) -> Heartbeat {
        if !self.status.is_live() {
            return Heartbeat::Idle;
        }
        if now.saturating_duration_since(self.last_traffic) >= self.heartbeat.timeout {
            tracing::warn!(status = %self.status, "Heartbeat timed out");
            self.status = ConnectionStatus::Disconnected;
            return Heartbeat::TimedOut;
        }
        if now.saturating_duration_since(self.last_probe) >= self.heartbeat.interval {
            self.last_probe = now;
            return Heartbeat::Probe;
        }
        Heartbeat::Idle
    }
}
