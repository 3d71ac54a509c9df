// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room relay over TCP.
//!
//! Frames travel as a one-byte kind (`0` text, `1` binary), a big-endian
//! `u32` length and the payload. A client opens with one text frame naming
//! the room to join, empty for a new room; after that the socket carries the
//! same traffic a [`MemoryRelay`] connection does. The server keeps its rooms
//! in a `MemoryRelay`, so both relays behave the same.

use crate::protocol::{Frame, GameMessage};
use crate::relay::MemoryRelay;
use crate::transport::{Connection, Connector, Transport, TransportError, TransportEvent};
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Largest payload accepted from the wire
pub const MAX_FRAME_LEN: usize = 1 << 20;

const TEXT_KIND: u8 = 0;
const BINARY_KIND: u8 = 1;

/// Read one frame; `Ok(None)` when the stream ends cleanly between frames
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Option<Frame>> {
    let kind = match reader.read_u8().await {
        Ok(kind) => kind,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    let len = reader.read_u32().await? as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds {}", len, MAX_FRAME_LEN),
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    match kind {
        TEXT_KIND => String::from_utf8(payload)
            .map(|text| Some(Frame::Text(text)))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
        BINARY_KIND => Ok(Some(Frame::Binary(payload))),
        other => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unknown frame kind {}", other),
        )),
    }
}

/// Write one frame and flush it
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> io::Result<()> {
    let (kind, payload) = match frame {
        Frame::Text(text) => (TEXT_KIND, text.as_bytes()),
        Frame::Binary(bytes) => (BINARY_KIND, bytes.as_slice()),
    };
    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "frame too large"));
    }
    writer.write_u8(kind).await?;
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// TCP front end over a set of relay rooms
pub struct TcpRelay {
    listener: TcpListener,
    rooms: MemoryRelay,
}

impl TcpRelay {
    /// Listen on `addr`
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(address = %listener.local_addr()?, "Relay listening");
        Ok(Self {
            listener,
            rooms: MemoryRelay::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The rooms behind the socket, shared with the running server
    pub fn rooms(&self) -> &MemoryRelay {
        &self.rooms
    }

    /// Accept sockets until the listener fails
    pub async fn run(self) -> io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            tracing::debug!(%peer, "Accepted relay socket");
            let rooms = self.rooms.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_socket(stream, rooms).await {
                    tracing::warn!(%peer, error = %e, "Relay socket failed");
                }
            });
        }
    }
}

async fn serve_socket(stream: TcpStream, rooms: MemoryRelay) -> io::Result<()> {
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();
    let room = match read_frame(&mut reader).await? {
        Some(Frame::Text(room)) if room.is_empty() => None,
        Some(Frame::Text(room)) => Some(room),
        Some(Frame::Binary(_)) => {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "expected a room request"));
        }
        None => return Ok(()),
    };

    let Connection { transport, events } = match rooms.connect(room.as_deref()) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::info!(room_id = ?room, error = %e, "Refused relay socket");
            let refusal = GameMessage::Error {
                message: e.to_string(),
            };
            if let Ok(frame) = refusal.to_frame() {
                write_frame(&mut writer, &frame).await?;
            }
            return writer.shutdown().await;
        }
    };

    // Room events arrive on a blocking channel
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<TransportEvent>();
    tokio::task::spawn_blocking(move || {
        for event in events.iter() {
            if out_tx.send(event).is_err() {
                break;
            }
        }
    });
    let outgoing = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            match event {
                TransportEvent::Frame(frame) => {
                    if let Err(e) = write_frame(&mut writer, &frame).await {
                        tracing::debug!(error = %e, "Relay write failed");
                        break;
                    }
                }
                TransportEvent::Closed => break,
            }
        }
        let _ = writer.shutdown().await;
    });

    let incoming = loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame)) => {
                if transport.send(frame).is_err() {
                    break Ok(());
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    transport.close();
    drop(transport);
    let _ = outgoing.await;
    incoming
}

/// Opens connections to a [`TcpRelay`].
///
/// `connect` returns at once; the socket is opened on `handle` and a failure
/// shows up as [`TransportEvent::Closed`], the same as a dropped link.
#[derive(Clone)]
pub struct TcpConnector {
    address: String,
    handle: Handle,
}

impl TcpConnector {
    /// `address` is `host:port`, optionally prefixed with `tcp://`
    pub fn new(address: &str, handle: Handle) -> Self {
        let address = address.strip_prefix("tcp://").unwrap_or(address).to_string();
        Self { address, handle }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Connector for TcpConnector {
    fn connect(&self, room: Option<&str>) -> Result<Connection, TransportError> {
        let (event_tx, event_rx) = unbounded();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        self.handle.spawn(run_client(
            self.address.clone(),
            room.unwrap_or_default().to_string(),
            frame_rx,
            event_tx,
            closed.clone(),
        ));
        tracing::debug!(address = %self.address, room_id = ?room, "Opening relay socket");

        Ok(Connection {
            transport: Box::new(TcpTransport {
                frames: Mutex::new(Some(frame_tx)),
                closed,
            }),
            events: event_rx,
        })
    }
}

async fn run_client(
    address: String,
    room: String,
    mut frames: mpsc::UnboundedReceiver<Frame>,
    events: Sender<TransportEvent>,
    closed: Arc<AtomicBool>,
) {
    let result: io::Result<()> = async {
        let stream = TcpStream::connect(&address).await?;
        stream.set_nodelay(true)?;
        let (mut reader, mut writer) = stream.into_split();
        write_frame(&mut writer, &Frame::Text(room)).await?;

        let writing = async {
            while let Some(frame) = frames.recv().await {
                write_frame(&mut writer, &frame).await?;
            }
            writer.shutdown().await
        };
        let reading = async {
            while let Some(frame) = read_frame(&mut reader).await? {
                if events.send(TransportEvent::Frame(frame)).is_err() {
                    break;
                }
            }
            Ok::<(), io::Error>(())
        };
        tokio::select! {
            result = writing => result,
            result = reading => result,
        }
    }
    .await;

    if closed.load(Ordering::SeqCst) {
        return;
    }
    match result {
        Ok(()) => tracing::info!(%address, "Relay closed the socket"),
        Err(e) => tracing::warn!(%address, error = %e, "Relay socket failed"),
    }
    let _ = events.send(TransportEvent::Closed);
}

struct TcpTransport {
    frames: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    closed: Arc<AtomicBool>,
}

impl Transport for TcpTransport {
    fn send(&self, frame: Frame) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        match self.frames.lock().as_ref() {
            Some(frames) => frames.send(frame).map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping the sender ends the writer, which shuts the socket
        self.frames.lock().take();
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
    }
}
