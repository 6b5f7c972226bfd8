//! Channel-backed Client Sender adapter.
//!
//! Wraps a bounded `tokio::sync::mpsc` sender; a real deployment swaps
//! this for a websocket adapter that writes frames to the wire, behind
//! the same `ClientSenderPort` seam (§1, §6).

use tokio::sync::mpsc;

use crate::application::messages::ClientMessage;
use crate::application::ports::ClientSenderPort;

/// Default outbound buffer size: generous enough to absorb a burst of
/// fills during `ProcessPriceUpdate` without dropping messages under
/// normal load, per §5's non-blocking send requirement.
pub const DEFAULT_BUFFER_SIZE: usize = 1_024;

/// A `ClientSenderPort` backed by a bounded channel, paired with a
/// receiver the transport layer drains to forward frames to the client.
#[derive(Debug)]
pub struct ChannelClientSender {
    tx: mpsc::Sender<ClientMessage>,
}

impl ChannelClientSender {
    /// Create a sender/receiver pair with the default buffer size.
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<ClientMessage>) {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a sender/receiver pair with an explicit buffer size.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<ClientMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl ClientSenderPort for ChannelClientSender {
    fn try_send(&self, message: ClientMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "dropping client message, outbound buffer full or receiver gone");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_messages_in_order() {
        let (sender, mut rx) = ChannelClientSender::new();
        assert!(sender.try_send(ClientMessage::ConnectionStatus {
            message: "hello".to_string()
        }));
        assert!(sender.try_send(ClientMessage::ConnectionStatus {
            message: "world".to_string()
        }));
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        match (first, second) {
            (ClientMessage::ConnectionStatus { message: a }, ClientMessage::ConnectionStatus { message: b }) => {
                assert_eq!(a, "hello");
                assert_eq!(b, "world");
            }
            other => panic!("unexpected pair: {other:?}"),
        }
    }

    #[tokio::test]
    async fn drops_when_buffer_is_full() {
        let (sender, mut rx) = ChannelClientSender::with_capacity(1);
        assert!(sender.try_send(ClientMessage::ConnectionStatus {
            message: "first".to_string()
        }));
        assert!(!sender.try_send(ClientMessage::ConnectionStatus {
            message: "second".to_string()
        }));
        let received = rx.recv().await.unwrap();
        match received {
            ClientMessage::ConnectionStatus { message } => assert_eq!(message, "first"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn returns_false_once_receiver_is_dropped() {
        let (sender, rx) = ChannelClientSender::new();
        drop(rx);
        assert!(!sender.try_send(ClientMessage::ConnectionStatus {
            message: "gone".to_string()
        }));
    }
}
