// SPDX-License-Identifier: MIT OR Apache-2.0

//! Onitama client sessions
//!
//! This crate sits between a UI and the rules engine:
//! - Game sessions for local, single-player and remote play
//! - The connection state machine behind the remote overlay
//! - Wire protocol and transport contract for room relays, in memory and
//!   over TCP
//! - Background compute workers for the AI and training rankings

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod protocol;
pub mod relay;
pub mod session;
pub mod tcp;
pub mod transport;
pub mod worker;

pub use config::{HeartbeatConfig, SessionConfig};
pub use connection::{ConnectionEvent, ConnectionStateMachine, ConnectionStatus};
pub use relay::MemoryRelay;
pub use tcp::{TcpConnector, TcpRelay};
pub use session::{
    GameSession, LocalSession, MoveRankings, RemoteSession, Role, SessionError, SessionEvent,
    SinglePlayerSession, Submitted,
};
pub use transport::{Connection, Connector, Transport, TransportError, TransportEvent};
