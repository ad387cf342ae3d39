//! Transport abstraction for the server connection.
//!
//! The shared `NetClient` in `werewolf-client` only needs something that can
//! be split into a frame reader and a frame writer. Native builds use the
//! WebSocket transport; tests use [`MemoryTransport`].

use std::future::Future;

use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not open the connection in the first place.
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The remote peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// An I/O or protocol-level error on an open connection.
    #[error("{0}")]
    Io(String),
}

/// Read half of a connection. Yields one text frame per call.
pub trait FrameReader: Send + 'static {
    /// Returns `Ok(None)` once the peer closed cleanly.
    fn recv(&mut self) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;
}

/// Write half of a connection.
pub trait FrameWriter: Send + 'static {
    fn send(&mut self, frame: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the connection politely. The default does nothing.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send {
        async { Ok(()) }
    }
}

/// A bidirectional connection that can be split so reading and writing run
/// in separate tasks.
pub trait Transport: Send + 'static {
    type Reader: FrameReader;
    type Writer: FrameWriter;

    fn split(self) -> (Self::Reader, Self::Writer);
}

// ---------------------------------------------------------------------------
// In-memory transport
// ---------------------------------------------------------------------------

/// Channel-backed transport. The other end is a [`MemoryPeer`] that plays the
/// server.
pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

/// Server side of a [`MemoryTransport`].
pub struct MemoryPeer {
    /// Frames the client wrote, in order.
    pub received: mpsc::UnboundedReceiver<String>,
    sender: Option<mpsc::UnboundedSender<String>>,
}

impl MemoryTransport {
    pub fn pair() -> (MemoryTransport, MemoryPeer) {
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, received) = mpsc::unbounded_channel();
        (
            MemoryTransport { inbound, outbound },
            MemoryPeer {
                received,
                sender: Some(to_client),
            },
        )
    }
}

impl MemoryPeer {
    /// Push a raw frame to the client.
    pub fn push(&self, frame: impl Into<String>) -> Result<(), TransportError> {
        self.sender
            .as_ref()
            .ok_or(TransportError::ConnectionClosed)?
            .send(frame.into())
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Hang up. The client's reader sees a clean close.
    pub fn hang_up(&mut self) {
        self.sender = None;
    }
}

impl Transport for MemoryTransport {
    type Reader = MemoryReader;
    type Writer = MemoryWriter;

    fn split(self) -> (MemoryReader, MemoryWriter) {
        (
            MemoryReader {
                inbound: self.inbound,
            },
            MemoryWriter {
                outbound: self.outbound,
            },
        )
    }
}

pub struct MemoryReader {
    inbound: mpsc::UnboundedReceiver<String>,
}

impl FrameReader for MemoryReader {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.inbound.recv().await)
    }
}

pub struct MemoryWriter {
    outbound: mpsc::UnboundedSender<String>,
}

impl FrameWriter for MemoryWriter {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::ConnectionClosed)
    }
}
