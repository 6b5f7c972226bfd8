//! Client Sender Adapters
//!
//! The duplex transport itself is out of scope (§1); this channel-backed
//! adapter exists so the engine is runnable standalone. A real deployment
//! swaps it for a websocket adapter that forwards the receiver side to
//! the wire, behind the same `ClientSenderPort` seam.

pub mod channel;

pub use channel::{ChannelClientSender, DEFAULT_BUFFER_SIZE};
