//! Output of a streaming handler.
//!
//! A streaming handler returns a [`HandlerStream`]: the receiving side of the
//! channel it produces into, plus the sending side of its close-signal
//! channel. The handler keeps the other two halves, usually as a
//! [`StreamSender`] moved into the task that produces values.
//!
//! # Example
//!
//! ```ignore
//! fn subscribe(req: Subscribe) -> Result<HandlerStream<Update>, FeedError> {
//!     let (mut sender, stream) = HandlerStream::channel(16);
//!     tokio::spawn(async move {
//!         for seq in 0..req.count {
//!             if sender.is_cancelled() || sender.send(Update { seq }).await.is_err() {
//!                 break;
//!             }
//!         }
//!         // dropping the sender closes the stream
//!     });
//!     Ok(stream)
//! }
//! ```

use tokio::sync::mpsc;

/// Default buffer of the close-signal channel built by [`HandlerStream::channel`].
pub const CLOSE_SIGNAL_CAPACITY: usize = 1;

/// Handler-owned output channel and close-signal channel.
#[derive(Debug)]
pub struct HandlerStream<O> {
    items: mpsc::Receiver<O>,
    close: mpsc::Sender<bool>,
}

impl<O> HandlerStream<O> {
    /// Assemble from channels the handler built itself.
    pub fn new(items: mpsc::Receiver<O>, close: mpsc::Sender<bool>) -> Self {
        Self { items, close }
    }

    /// Build both channel pairs. `capacity` bounds the handler's output channel
    /// (clamped to at least 1).
    pub fn channel(capacity: usize) -> (StreamSender<O>, Self) {
        let (items_tx, items_rx) = mpsc::channel(capacity.max(1));
        let (close_tx, close_rx) = mpsc::channel(CLOSE_SIGNAL_CAPACITY);
        (
            StreamSender {
                items: items_tx,
                close: close_rx,
            },
            Self::new(items_rx, close_tx),
        )
    }

    pub(crate) fn into_parts(self) -> (mpsc::Receiver<O>, mpsc::Sender<bool>) {
        (self.items, self.close)
    }
}

/// Producer half kept by the handler.
#[derive(Debug)]
pub struct StreamSender<O> {
    items: mpsc::Sender<O>,
    close: mpsc::Receiver<bool>,
}

impl<O> StreamSender<O> {
    /// Send one value, waiting for room in the output channel.
    ///
    /// # Errors
    ///
    /// Gives the value back if the forwarder is gone.
    pub async fn send(&self, item: O) -> Result<(), mpsc::error::SendError<O>> {
        self.items.send(item).await
    }

    /// Resolve once the consumer asked to stop, or dropped its cancel handle.
    pub async fn closed(&mut self) {
        let _ = self.close.recv().await;
    }

    /// Non-blocking check for a pending close signal.
    pub fn is_cancelled(&mut self) -> bool {
        match self.close.try_recv() {
            Ok(_) | Err(mpsc::error::TryRecvError::Disconnected) => true,
            Err(mpsc::error::TryRecvError::Empty) => false,
        }
    }

    /// Split back into the raw channel halves.
    pub fn into_parts(self) -> (mpsc::Sender<O>, mpsc::Receiver<bool>) {
        (self.items, self.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_flow_in_order() {
        let (sender, stream) = HandlerStream::channel(4);
        let (mut items, _close) = stream.into_parts();

        sender.send(1u32).await.unwrap();
        sender.send(2u32).await.unwrap();
        drop(sender);

        assert_eq!(items.recv().await, Some(1));
        assert_eq!(items.recv().await, Some(2));
        assert_eq!(items.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_signal_reaches_sender() {
        let (mut sender, stream) = HandlerStream::<u32>::channel(4);
        let (_items, close) = stream.into_parts();

        assert!(!sender.is_cancelled());
        close.send(true).await.unwrap();
        assert!(sender.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_cancel_handle_counts_as_closed() {
        let (mut sender, stream) = HandlerStream::<u32>::channel(4);
        drop(stream);

        // returns instead of hanging
        sender.closed().await;
        assert!(sender.send(1).await.is_err());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (sender, _stream) = HandlerStream::<u32>::channel(0);
        assert_eq!(sender.items.max_capacity(), 1);
    }
}
