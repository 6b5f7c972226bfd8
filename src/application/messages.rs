//! Typed client-transport messages (§6).
//!
//! The duplex transport itself is an external collaborator (§1); this
//! module defines the message shapes that travel over it in both
//! directions. Wire representation is `{"kind": "...", ...data}`, matching
//! "typed message objects with a string kind and an opaque data payload."

use serde::{Deserialize, Serialize};

use crate::domain::candle::{Candle, Interval};
use crate::domain::order_execution::value_objects::{OrderSide, OrderType};
use crate::domain::order_execution::{Order, Trade};
use crate::domain::shared::{OrderId, Price, Quantity, SimTime, Symbol};
use crate::domain::simulation::Speed;

/// A consistent snapshot of `GetStatus()` (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// `Stopped` | `Playing` | `Paused`, rendered as the wire tag.
    pub state: String,
    /// Traded symbol, absent before the first `Start`.
    pub symbol: Option<Symbol>,
    /// Display timeframe tag.
    pub display_interval: Option<Interval>,
    /// Base interval actually fetched.
    pub base_interval: Option<Interval>,
    /// Current replay speed.
    pub speed: Option<Speed>,
    /// Simulated-time start of the current/last session.
    pub start_time: Option<SimTime>,
    /// Current simulated time.
    pub current_sim_time: Option<SimTime>,
    /// Time of the last emitted base candle.
    pub current_price_time: Option<SimTime>,
    /// Close of the last emitted base candle.
    pub current_price: Option<Price>,
    /// The active simulation's id.
    pub current_simulation_id: Option<crate::domain::shared::SimulationId>,
    /// Whether the session is currently `Playing`.
    pub is_running: bool,
    /// Left open per §9: conceptually `(currentSimTime - startTime) /
    /// totalWindow`, unbounded under prefetch. Always `None` here.
    pub progress: Option<f64>,
}

/// Messages the engine emits to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Sent once at connection.
    ConnectionStatus {
        /// Human-readable connection message.
        message: String,
    },
    /// One per emitted base candle (§4.2 emission loop step 2).
    SimulationUpdate {
        /// Traded symbol.
        symbol: Symbol,
        /// The complete base candle just emitted.
        base_candle: Candle,
        /// Simulated time of this emission (the candle's `endTime`).
        simulation_time: SimTime,
        /// Left open per §9; always `None`.
        progress: Option<f64>,
        /// `Playing` | `Paused` | `Stopped`, rendered as the wire tag.
        state: String,
        /// Current replay speed.
        speed: Speed,
    },
    /// Emitted on every control transition.
    StatusUpdate {
        /// The full status snapshot.
        status: StatusSnapshot,
        /// Human-readable description of the transition.
        message: String,
    },
    /// A market or limit order was accepted and persisted as pending.
    OrderPlaced {
        /// The newly placed order.
        order: Order,
    },
    /// An order filled.
    OrderExecuted {
        /// The now-`executed` order.
        order: Order,
        /// The trade recording the fill.
        trade: Trade,
    },
    /// An order was cancelled.
    OrderCancelled {
        /// The now-`cancelled` order.
        order: Order,
    },
    /// A recoverable failure surfaced to the client without closing the
    /// transport (§7).
    Error {
        /// Human-readable description.
        message: String,
        /// Machine-readable error tag.
        error: String,
    },
}

/// Control messages the client sends to the engine (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ControlMessage {
    /// `simulation_control_start`.
    SimulationControlStart {
        /// Symbol to replay.
        symbol: Symbol,
        /// Simulated-time start, milliseconds since epoch.
        start_time: SimTime,
        /// Initial display timeframe.
        interval: Interval,
        /// Initial replay speed.
        speed: Speed,
        /// Initial cash funding.
        initial_funding: Price,
    },
    /// `simulation_control_stop`.
    SimulationControlStop,
    /// `simulation_control_pause`.
    SimulationControlPause,
    /// `simulation_control_resume`.
    SimulationControlResume,
    /// `simulation_control_get_status`.
    SimulationControlGetStatus,
    /// `simulation_control_set_speed`.
    SimulationControlSetSpeed {
        /// New replay speed.
        speed: Speed,
    },
    /// `simulation_control_set_timeframe`.
    SimulationControlSetTimeframe {
        /// New display timeframe.
        timeframe: Interval,
    },
    /// `order_place`.
    OrderPlace {
        /// Traded symbol.
        symbol: Symbol,
        /// Buy or sell.
        side: OrderSide,
        /// Market or limit.
        #[serde(rename = "type")]
        order_type: OrderType,
        /// Requested quantity.
        quantity: Quantity,
        /// Trigger price, required for limit orders.
        limit_price: Option<Price>,
    },
    /// `order_cancel`.
    OrderCancel {
        /// The order to cancel.
        order_id: OrderId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_serializes_with_kind_tag() {
        let msg = ClientMessage::ConnectionStatus {
            message: "connected".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "connection_status");
        assert_eq!(json["data"]["message"], "connected");
    }

    #[test]
    fn control_message_start_roundtrips() {
        let msg = ControlMessage::SimulationControlStart {
            symbol: Symbol::new("BTC"),
            start_time: SimTime::from_millis(0),
            interval: Interval::OneMinute,
            speed: 60,
            initial_funding: Price::from_f64(10_000.0),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: ControlMessage = serde_json::from_str(&json).unwrap();
        match parsed {
            ControlMessage::SimulationControlStart { speed, .. } => assert_eq!(speed, 60),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn order_place_tag_is_snake_case() {
        let msg = ControlMessage::OrderPlace {
            symbol: Symbol::new("BTC"),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::from_i64(1),
            limit_price: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "order_place");
    }
}
