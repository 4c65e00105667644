//! Streaming tunnel between a streaming handler and the transport.
//!
//! Every streaming dispatch spawns one forwarder task:
//!
//! ```text
//! Handler ─► mpsc::Receiver<O> ─► Forwarder (encode) ─► mpsc::Sender<Bytes> ─► Transport
//!    ▲                                                                            │
//!    └──────────────────────── close signal (mpsc::Sender<bool>) ◄────────────────┘
//! ```
//!
//! The forwarder owns the transport-facing sender, so the output closes exactly
//! once: when the handler closes its channel, when an item fails to encode, or
//! when the transport drops its receiver. Cancellation is cooperative. The
//! tunnel only relays the signal to the handler, and the output stays open
//! until the handler reacts by closing its own channel. A handler that ignores
//! the signal keeps the forwarder parked on its channel.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::codec::Format;
use crate::error::Result;
use crate::handler::{HandlerStream, Reply};

/// Default capacity of the transport-facing channel.
pub const DEFAULT_STREAM_CAPACITY: usize = 100;

/// How a forwarder ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The handler closed its output channel.
    Completed { items: usize },
    /// An item failed to encode; the stream was cut short.
    EncodeFailed { items: usize, reason: String },
    /// The transport dropped its receiver.
    ConsumerGone { items: usize },
}

impl StreamEnd {
    /// Number of encoded items handed to the transport.
    pub fn items(&self) -> usize {
        match self {
            StreamEnd::Completed { items }
            | StreamEnd::EncodeFailed { items, .. }
            | StreamEnd::ConsumerGone { items } => *items,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StreamEnd::Completed { .. })
    }
}

/// Transport side of a streaming response.
///
/// Read encoded items with [`recv`](Self::recv) until it returns `None`.
/// Call [`cancel`](Self::cancel) when the client goes away.
#[derive(Debug)]
pub struct StreamingTunnel {
    out: mpsc::Receiver<Bytes>,
    cancel: mpsc::Sender<bool>,
    forwarder: JoinHandle<StreamEnd>,
}

impl StreamingTunnel {
    /// Next encoded item, or `None` once the stream is closed.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.out.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> std::result::Result<Bytes, mpsc::error::TryRecvError> {
        self.out.try_recv()
    }

    /// Ask the handler to stop producing.
    ///
    /// Returns `false` if the handler already dropped its close receiver.
    /// A signal still waiting to be read counts as delivered.
    pub fn cancel(&self) -> bool {
        match self.cancel.try_send(true) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// A clone of the handler's close-signal sender.
    pub fn cancel_handle(&self) -> mpsc::Sender<bool> {
        self.cancel.clone()
    }

    /// Wait for the forwarder to end and report how.
    ///
    /// Undelivered items are dropped. If the handler never closes its channel
    /// this waits forever, same as reading the output would.
    pub async fn finish(self) -> Result<StreamEnd> {
        drop(self.out);
        Ok(self.forwarder.await?)
    }

    /// Split into the raw output channel, close-signal sender and forwarder handle.
    pub fn into_parts(self) -> (mpsc::Receiver<Bytes>, mpsc::Sender<bool>, JoinHandle<StreamEnd>) {
        (self.out, self.cancel, self.forwarder)
    }
}

/// Start forwarding a handler stream. Must run inside a tokio runtime.
pub(crate) fn spawn_forwarder<O: Reply>(
    stream: HandlerStream<O>,
    format: Format,
    capacity: usize,
    route: String,
) -> StreamingTunnel {
    let (items, cancel) = stream.into_parts();
    let (tx, out) = mpsc::channel(capacity.max(1));

    let forwarder = tokio::spawn(forward_loop(items, tx, format, route));

    StreamingTunnel {
        out,
        cancel,
        forwarder,
    }
}

/// Copy handler values to the transport until one side closes.
async fn forward_loop<O: Reply>(
    mut items: mpsc::Receiver<O>,
    out: mpsc::Sender<Bytes>,
    format: Format,
    route: String,
) -> StreamEnd {
    let mut forwarded = 0usize;

    while let Some(item) = items.recv().await {
        let buf = match item.encode(format) {
            Ok(buf) => buf,
            Err(e) => {
                tracing::error!(route = %route, error = %e, "failed to encode stream item, closing stream");
                return StreamEnd::EncodeFailed {
                    items: forwarded,
                    reason: e.to_string(),
                };
            }
        };

        if out.send(Bytes::from(buf)).await.is_err() {
            tracing::debug!(route = %route, "stream consumer is gone");
            return StreamEnd::ConsumerGone { items: forwarded };
        }
        forwarded += 1;
    }

    tracing::debug!(route = %route, items = forwarded, "publisher is closed, closing outgoing channel");
    StreamEnd::Completed { items: forwarded }
}
