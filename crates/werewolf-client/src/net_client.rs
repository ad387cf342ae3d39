//! The process-wide connection to the game server.
//!
//! A single [`NetClient`] is created at startup and cloned into every screen.
//! Screens never own the socket: they [`emit`](NetClient::emit) outbound
//! events and hold a [`Subscription`] for the inbound kinds they care about.
//! Dropping the subscription deregisters it.
//!
//! Events emitted before a transport is attached are queued and flushed once
//! [`attach`](NetClient::attach) spawns the writer task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use werewolf_core::protocol::{ClientEvent, EventKind, ServerEvent, parse_server_frame};
use werewolf_core::transport::{FrameReader, FrameWriter, Transport};

use crate::error::ClientError;

/// Instructions for the writer task.
#[derive(Debug)]
enum Outbound {
    Event(ClientEvent),
    Close,
}

#[derive(Clone)]
pub struct NetClient {
    inner: Arc<Inner>,
}

struct Inner {
    outgoing: mpsc::UnboundedSender<Outbound>,
    /// Held until a transport is attached; doubles as the pre-connect queue.
    pending: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,
    hub: Mutex<Hub>,
    next_id: AtomicU64,
}

#[derive(Default)]
struct Hub {
    subscribers: Vec<Subscriber>,
    closed: bool,
}

struct Subscriber {
    id: u64,
    kinds: Vec<EventKind>,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl Default for NetClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NetClient {
    /// Create an unconnected handle. Emits are queued until
    /// [`attach`](Self::attach).
    pub fn new() -> Self {
        let (outgoing, pending) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                outgoing,
                pending: Mutex::new(Some(pending)),
                hub: Mutex::new(Hub::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Connect over WebSocket and attach.
    #[cfg(feature = "native")]
    pub async fn connect_ws(&self, url: &str) -> Result<(), ClientError> {
        let transport = werewolf_core::ws_transport::WsTransport::connect(url).await?;
        tracing::info!(%url, "connected to game server");
        self.attach(transport)
    }

    /// Split `transport` and spawn the reader and writer tasks.
    ///
    /// Anything emitted so far is written first, in order.
    pub fn attach<T: Transport>(&self, transport: T) -> Result<(), ClientError> {
        let Some(outbox) = self.inner.pending.lock().take() else {
            return Err(ClientError::AlreadyConnected);
        };
        let (reader, writer) = transport.split();
        spawn_reader_task(reader, self.clone());
        spawn_writer_task(writer, outbox);
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.inner.pending.lock().is_none()
    }

    /// Fire-and-forget send.
    ///
    /// Once the writer task has stopped the event is dropped with a warning.
    pub fn emit(&self, event: ClientEvent) {
        tracing::debug!(event = event.name(), "emit");
        if let Err(mpsc::error::SendError(Outbound::Event(event))) =
            self.inner.outgoing.send(Outbound::Event(event))
        {
            tracing::warn!(event = event.name(), "connection gone; dropping event");
        }
    }

    /// Register interest in `kinds`. Events of other kinds never reach the
    /// returned subscription.
    ///
    /// Subscribing after the connection closed yields a subscription that
    /// reports the close immediately.
    pub fn subscribe(&self, kinds: &[EventKind]) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut hub = self.inner.hub.lock();
        if !hub.closed {
            hub.subscribers.push(Subscriber {
                id,
                kinds: kinds.to_vec(),
                tx,
            });
        }
        Subscription {
            id,
            rx,
            client: self.clone(),
        }
    }

    /// Route one inbound event to every subscription that wants it.
    pub fn deliver(&self, event: ServerEvent) {
        let kind = event.kind();
        let mut hub = self.inner.hub.lock();
        let mut delivered = 0usize;
        hub.subscribers.retain(|sub| {
            if !sub.kinds.contains(&kind) {
                return true;
            }
            if sub.tx.send(event.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                false
            }
        });
        if delivered == 0 {
            tracing::debug!(%kind, "no subscriber for event");
        }
    }

    /// Ask the writer to close the connection. Subscriptions see the close
    /// once the reader notices it.
    pub fn close(&self) {
        let _ = self.inner.outgoing.send(Outbound::Close);
        if !self.is_attached() {
            self.shut_down();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.hub.lock().subscribers.len()
    }

    /// Drain events queued before any transport was attached.
    ///
    /// Lets tests and offline tooling see exactly what would be written.
    pub fn take_outbox(&self) -> Vec<ClientEvent> {
        let mut pending = self.inner.pending.lock();
        let Some(rx) = pending.as_mut() else {
            return Vec::new();
        };
        let mut events = Vec::new();
        while let Ok(outbound) = rx.try_recv() {
            if let Outbound::Event(event) = outbound {
                events.push(event);
            }
        }
        events
    }

    /// Mark the hub closed and end every subscription.
    fn shut_down(&self) {
        let mut hub = self.inner.hub.lock();
        hub.closed = true;
        hub.subscribers.clear();
    }

    fn unsubscribe(&self, id: u64) {
        self.inner.hub.lock().subscribers.retain(|sub| sub.id != id);
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Scoped receiver for a set of inbound event kinds.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<ServerEvent>,
    client: NetClient,
}

impl Subscription {
    /// Next event, or `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<ServerEvent, TryRecvError> {
        self.rx.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.client.unsubscribe(self.id);
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

fn spawn_reader_task<R: FrameReader>(mut reader: R, client: NetClient) {
    tokio::spawn(async move {
        loop {
            match reader.recv().await {
                Ok(Some(frame)) => {
                    if let Some(event) = parse_server_frame(&frame) {
                        client.deliver(event);
                    }
                }
                Ok(None) => {
                    tracing::info!("server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "connection error");
                    break;
                }
            }
        }
        client.shut_down();
    });
}

fn spawn_writer_task<W: FrameWriter>(mut writer: W, mut outbox: mpsc::UnboundedReceiver<Outbound>) {
    tokio::spawn(async move {
        while let Some(outbound) = outbox.recv().await {
            let event = match outbound {
                Outbound::Event(event) => event,
                Outbound::Close => {
                    if let Err(e) = writer.close().await {
                        tracing::debug!(error = %e, "close failed");
                    }
                    break;
                }
            };
            let frame = match event.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(event = event.name(), error = %e, "failed to encode event");
                    continue;
                }
            };
            if let Err(e) = writer.send(frame).await {
                tracing::warn!(error = %e, "write failed; stopping writer");
                break;
            }
        }
    });
}
