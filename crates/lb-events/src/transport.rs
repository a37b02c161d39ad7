//! Outbound side of a live connection.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

/// Default number of frames buffered per connection.
pub const DEFAULT_BUFFER: usize = 64;

/// Frame handed to the socket writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A serialized event.
    Text(String),
    /// Close the socket.
    Close,
}

/// Sink for one connection. Sends never block.
pub trait Transport: Send + Sync {
    /// Queues a text frame. Returns `false` if the frame was dropped.
    fn send(&self, text: String) -> bool;

    /// Asks the writer to close the socket.
    fn close(&self);
}

/// [`Transport`] backed by a bounded channel drained by the socket task.
///
/// A full buffer means the peer is not reading; frames are dropped rather
/// than stalling the sender. Closing is signalled outside the buffer as
/// well, so it cannot be lost to a full queue.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Outbound>,
    closed: Arc<watch::Sender<bool>>,
}

impl ChannelTransport {
    /// Creates a transport and the receiver the socket writer drains.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);
        (
            Self {
                tx,
                closed: Arc::new(closed),
            },
            rx,
        )
    }

    /// Flag that turns `true` once [`Transport::close`] was called. The
    /// socket writer watches it next to the frame queue.
    #[must_use]
    pub fn closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

impl Transport for ChannelTransport {
    fn send(&self, text: String) -> bool {
        match self.tx.try_send(Outbound::Text(text)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("connection buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    fn close(&self) {
        self.closed.send_replace(true);
        let _ = self.tx.try_send(Outbound::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_buffer_drops_instead_of_blocking() {
        let (transport, mut rx) = ChannelTransport::new(1);
        assert!(transport.send("a".to_string()));
        assert!(!transport.send("b".to_string()));

        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("a".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_receiver_reports_drop() {
        let (transport, rx) = ChannelTransport::new(4);
        drop(rx);
        assert!(!transport.send("a".to_string()));
    }

    #[test]
    fn close_survives_full_buffer() {
        let (transport, mut rx) = ChannelTransport::new(1);
        let closed = transport.closed();
        assert!(transport.send("a".to_string()));

        transport.close();

        assert!(*closed.borrow());
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("a".to_string()));
        assert!(rx.try_recv().is_err());
    }
}
