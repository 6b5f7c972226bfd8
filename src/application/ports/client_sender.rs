//! Client Sender Port (Driven Port, §6): delivers typed messages to one
//! client. No broadcast — the duplex transport itself is out of scope
//! (§1); this trait is the seam a websocket adapter plugs into.

use crate::application::messages::ClientMessage;

/// Delivers messages to exactly one connected client.
///
/// Sends are non-blocking (§5): if the client's send buffer is full, the
/// implementation drops the message and logs it rather than blocking the
/// session worker.
pub trait ClientSenderPort: Send + Sync {
    /// Attempt to deliver `message`. Returns `true` if the message was
    /// accepted for delivery, `false` if it was dropped (buffer full or
    /// client disconnected).
    fn try_send(&self, message: ClientMessage) -> bool;
}
