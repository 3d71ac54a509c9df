// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport contract used by remote sessions

use crate::protocol::Frame;
use crossbeam_channel::Receiver;
use thiserror::Error;

/// Something that happened on an open transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A frame arrived
    Frame(Frame),
    /// The transport went away without a local `close()`
    Closed,
}

/// Failures reported by transports
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport is closed")]
    Closed,

    #[error("Room {0} is full")]
    RoomFull(String),

    #[error("Could not connect: {0}")]
    Connect(String),
}

/// Sending half of an open connection.
///
/// Incoming traffic is delivered through the event receiver handed out with
/// the transport, in arrival order.
pub trait Transport: Send {
    /// Queue a frame for the peer
    fn send(&self, frame: Frame) -> Result<(), TransportError>;

    /// Close the connection; no further events are delivered
    fn close(&self);
}

/// A freshly opened connection
pub struct Connection {
    pub transport: Box<dyn Transport>,
    pub events: Receiver<TransportEvent>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens connections to a room.
///
/// `None` asks the server for a new room; the room id arrives as the first
/// text frame either way.
pub trait Connector: Send {
    fn connect(&self, room: Option<&str>) -> Result<Connection, TransportError>;
}
