//! Order Book: an in-memory, per-session, price-priority index of open
//! limit orders (§4.4).
//!
//! Two `BinaryHeap`s hold the resting orders — buys ordered so the highest
//! `limitPrice` pops first, sells so the lowest pops first — with ties
//! broken by insertion order. Removal uses lazy deletion: `Remove` marks the
//! order's id as tombstoned in O(1) and the heaps discard tombstoned
//! entries the next time they're popped, which keeps `Add`/`Remove` cheap
//! without needing an indexed heap structure.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use rust_decimal::Decimal;

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::{OrderSide, OrderStatus as Status, OrderType};
use crate::domain::order_execution::Order;
use crate::domain::shared::{OrderId, Price, Symbol};

#[derive(Debug, Clone, Eq, PartialEq)]
struct BuyEntry {
    price: Decimal,
    seq: u64,
    order_id: OrderId,
}

impl Ord for BuyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.price
            .cmp(&other.price)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for BuyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct SellEntry {
    price: Decimal,
    seq: u64,
    order_id: OrderId,
}

impl Ord for SellEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the *lowest* price is the heap max (pops first).
        other
            .price
            .cmp(&self.price)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for SellEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The two price-priority heaps resting for a single symbol, plus the
/// tombstone set used for that symbol's lazy deletion (§4.4: "Per symbol:
/// two priority structures").
#[derive(Debug, Default)]
struct SymbolBook {
    buys: BinaryHeap<BuyEntry>,
    sells: BinaryHeap<SellEntry>,
    tombstoned: HashSet<OrderId>,
}

/// The in-memory price-priority order book for one session.
///
/// Partitioned per symbol (§4.4): each symbol gets its own buy/sell heap
/// pair, so an order resting for one symbol can never fire against a price
/// update for another. Owned exclusively by the Order Execution Engine for
/// one client; never shared across sessions (§4.4 Concurrency).
#[derive(Debug, Default)]
pub struct OrderBook {
    books: HashMap<Symbol, SymbolBook>,
    orders: HashMap<OrderId, Order>,
    next_seq: u64,
}

impl OrderBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-tombstoned) resting orders, across all symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the book holds no live orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Insert a resting limit order into its symbol's priority structures.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidParameters` if `order` is not a pending
    /// limit order with a `limitPrice`, or if its id is already present.
    pub fn add(&mut self, order: Order) -> Result<(), OrderError> {
        if order.order_type != OrderType::Limit {
            return Err(OrderError::InvalidParameters {
                field: "orderType".to_string(),
                message: "only limit orders rest in the book".to_string(),
            });
        }
        if order.status != Status::Pending {
            return Err(OrderError::InvalidParameters {
                field: "status".to_string(),
                message: "only pending orders may be added to the book".to_string(),
            });
        }
        let Some(limit_price) = order.limit_price() else {
            return Err(OrderError::InvalidParameters {
                field: "limitPrice".to_string(),
                message: "limit order missing limitPrice".to_string(),
            });
        };
        if self.orders.contains_key(&order.id) {
            return Err(OrderError::InvalidParameters {
                field: "id".to_string(),
                message: format!("order {} already present in book", order.id),
            });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let symbol_book = self.books.entry(order.symbol.clone()).or_default();
        match order.side {
            OrderSide::Buy => symbol_book.buys.push(BuyEntry {
                price: limit_price.amount(),
                seq,
                order_id: order.id.clone(),
            }),
            OrderSide::Sell => symbol_book.sells.push(SellEntry {
                price: limit_price.amount(),
                seq,
                order_id: order.id.clone(),
            }),
        }
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    /// Remove an order by id, if present.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no live order with this id rests
    /// in the book.
    pub fn remove(&mut self, order_id: &OrderId) -> Result<Order, OrderError> {
        let order = self
            .orders
            .remove(order_id)
            .ok_or_else(|| OrderError::NotFound(order_id.clone()))?;
        if let Some(symbol_book) = self.books.get_mut(&order.symbol) {
            symbol_book.tombstoned.insert(order_id.clone());
        }
        Ok(order)
    }

    /// Re-insert an order that was previously removed (used when a
    /// persistence failure during cancellation needs to restore
    /// memory/disk consistency, §4.3 `CancelOrder`).
    ///
    /// # Errors
    ///
    /// Propagates `add`'s validation errors.
    pub fn reinsert(&mut self, order: Order) -> Result<(), OrderError> {
        if let Some(symbol_book) = self.books.get_mut(&order.symbol) {
            symbol_book.tombstoned.remove(&order.id);
        }
        self.add(order)
    }

    /// Pop every order for `symbol` eligible to execute at `price`, in
    /// execution order (§4.3 `ProcessPriceUpdate`/§4.4 `PopEligible`): buys
    /// with `limitPrice >= price` highest-first, then sells with
    /// `limitPrice <= price` lowest-first. Orders resting for any other
    /// symbol are untouched.
    pub fn pop_eligible(&mut self, symbol: &Symbol, price: Price) -> Vec<Order> {
        let Some(symbol_book) = self.books.get_mut(symbol) else {
            return Vec::new();
        };
        let mut eligible = Vec::new();
        let market = price.amount();

        while let Some(top) = symbol_book.buys.peek() {
            if symbol_book.tombstoned.remove(&top.order_id) {
                symbol_book.buys.pop();
                continue;
            }
            if market > top.price {
                // highest buy limit is below market: no buy can fire.
                break;
            }
            let entry = symbol_book.buys.pop().expect("peeked Some");
            if let Some(order) = self.orders.remove(&entry.order_id) {
                eligible.push(order);
            }
        }

        while let Some(top) = symbol_book.sells.peek() {
            if symbol_book.tombstoned.remove(&top.order_id) {
                symbol_book.sells.pop();
                continue;
            }
            if market < top.price {
                // lowest sell limit is above market: no sell can fire.
                break;
            }
            let entry = symbol_book.sells.pop().expect("peeked Some");
            if let Some(order) = self.orders.remove(&entry.order_id) {
                eligible.push(order);
            }
        }

        eligible
    }

    /// Bulk-insert previously persisted open orders, as `LoadPendingOrders`
    /// does on session start/resume (§4.3). Non-pending and non-limit rows
    /// are silently skipped.
    pub fn load_batch(&mut self, orders: impl IntoIterator<Item = Order>) {
        for order in orders {
            if order.order_type == OrderType::Limit && order.status == Status::Pending {
                let _ = self.add(order);
            }
        }
    }
}
