//! Order Execution Engine (§4.3): validates, persists, and fills
//! market/limit orders against a supplied price.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::application::messages::ClientMessage;
use crate::application::ports::{ClientSenderPort, OrderRepository, PersistenceError, PositionRepository, TradeRepository};
use crate::domain::order_execution::value_objects::{OrderSide, OrderStatus};
use crate::domain::order_execution::{Order, OrderBook, OrderError, Trade};
use crate::domain::shared::{OrderId, Price, Quantity, SimTime, SimulationId, Symbol, UserId};

impl From<PersistenceError> for OrderError {
    fn from(err: PersistenceError) -> Self {
        Self::PersistenceFailure {
            operation: "persistence".to_string(),
            message: err.to_string(),
        }
    }
}

/// The transactional order engine for one client session.
///
/// Owns the session's `OrderBook` (guarded by a mutex per §4.4's
/// concurrency note: "a single mutex protects both sides") and drives the
/// persistence ports and client sender.
pub struct OrderExecutionEngine<O, T, P, C>
where
    O: OrderRepository,
    T: TradeRepository,
    P: PositionRepository,
    C: ClientSenderPort,
{
    orders: Arc<O>,
    trades: Arc<T>,
    positions: Arc<P>,
    sender: Arc<C>,
    book: Mutex<OrderBook>,
}

impl<O, T, P, C> OrderExecutionEngine<O, T, P, C>
where
    O: OrderRepository,
    T: TradeRepository,
    P: PositionRepository,
    C: ClientSenderPort,
{
    /// Construct a new engine with an empty order book.
    pub fn new(orders: Arc<O>, trades: Arc<T>, positions: Arc<P>, sender: Arc<C>) -> Self {
        Self {
            orders,
            trades,
            positions,
            sender,
            book: Mutex::new(OrderBook::new()),
        }
    }

    /// Number of live resting orders in the book (diagnostic).
    pub async fn book_len(&self) -> usize {
        self.book.lock().await.len()
    }

    /// `ExecuteMarketOrder` (§4.3): validate, persist as pending, execute
    /// immediately against `current_price`, commit, notify.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidParameters` on bad inputs,
    /// `OrderError::InsufficientFunds`/`InsufficientPosition` if the funds
    /// check fails, or `OrderError::PersistenceFailure` if a transaction
    /// step fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute_market_order(
        &self,
        user_id: UserId,
        simulation_id: SimulationId,
        symbol: Symbol,
        base_currency: Symbol,
        side: OrderSide,
        quantity: Quantity,
        current_price: Price,
        simulation_time: SimTime,
    ) -> Result<(Order, Trade), OrderError> {
        current_price
            .validate_for_order()
            .map_err(|e| OrderError::InvalidParameters {
                field: "currentPrice".to_string(),
                message: e.to_string(),
            })?;

        self.check_funds(&user_id, &simulation_id, &symbol, &base_currency, side, quantity, current_price)
            .await?;

        let order = Order::new_market(
            user_id,
            simulation_id,
            symbol,
            base_currency,
            side,
            quantity,
            simulation_time,
        )?;

        self.orders.create(&order).await?;
        self.sender.try_send(ClientMessage::OrderPlaced { order: order.clone() });

        let (order, trade) = self.execute_pending(order, current_price, simulation_time).await?;
        Ok((order, trade))
    }

    /// `PlaceLimitOrder` (§4.3): validate, persist as pending, rest in the
    /// book. Execution happens later via `process_price_update`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidParameters` on bad inputs,
    /// `OrderError::InsufficientFunds`/`InsufficientPosition` if the funds
    /// check against `limit_price` fails, or `OrderError::PersistenceFailure`.
    #[allow(clippy::too_many_arguments)]
    pub async fn place_limit_order(
        &self,
        user_id: UserId,
        simulation_id: SimulationId,
        symbol: Symbol,
        base_currency: Symbol,
        side: OrderSide,
        quantity: Quantity,
        limit_price: Price,
        simulation_time: SimTime,
    ) -> Result<Order, OrderError> {
        self.check_funds(&user_id, &simulation_id, &symbol, &base_currency, side, quantity, limit_price)
            .await?;

        let order = Order::new_limit(
            user_id,
            simulation_id,
            symbol,
            base_currency,
            side,
            quantity,
            limit_price,
            simulation_time,
        )?;

        self.orders.create(&order).await?;
        self.book.lock().await.add(order.clone())?;
        self.sender.try_send(ClientMessage::OrderPlaced { order: order.clone() });
        Ok(order)
    }

    /// `CancelOrder` (§4.3): remove from the book, flip to `cancelled`,
    /// notify. If the persistence update fails, the order is reinserted
    /// into the book to preserve memory/disk consistency (§9 open
    /// question, decided in `DESIGN.md`: reinsert on failure).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no resting order has this id.
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, OrderError> {
        let mut order = self.book.lock().await.remove(order_id)?;
        order.mark_cancelled()?;

        if let Err(err) = self.orders.update(&order).await {
            order.status = OrderStatus::Pending;
            let _ = self.book.lock().await.reinsert(order);
            return Err(err.into());
        }

        self.sender.try_send(ClientMessage::OrderCancelled { order: order.clone() });
        Ok(order)
    }

    /// `ProcessPriceUpdate` (§4.3): execute every order resting for
    /// `symbol` in the book that is eligible at `price`, in price-priority
    /// order, each in its own transaction against `price` (not the
    /// resting limit price — §4.3: "the limit price is the execution
    /// trigger, not the execution price"). Orders resting for any other
    /// symbol are untouched by this call (§4.4: "Per symbol: two priority
    /// structures").
    ///
    /// Execution failures for individual fills are logged and skipped
    /// rather than aborting the remaining eligible orders, matching §7's
    /// propagation policy that the Replay Engine never halts on a
    /// non-fatal per-order failure.
    pub async fn process_price_update(&self, symbol: &Symbol, price: Price, simulation_time: SimTime) -> Vec<(Order, Trade)> {
        let eligible = self.book.lock().await.pop_eligible(symbol, price);
        let mut filled = Vec::with_capacity(eligible.len());
        for order in eligible {
            match self.execute_pending(order, price, simulation_time).await {
                Ok(result) => filled.push(result),
                Err(err) => {
                    tracing::error!(error = %err, "order execution failed during ProcessPriceUpdate");
                }
            }
        }
        filled
    }

    /// `LoadPendingOrders` (§4.3): reload open limit orders from
    /// persistence into the Order Book, as done on session start/resume.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::PersistenceFailure` if the repository query
    /// fails.
    pub async fn load_pending_orders(&self, simulation_id: &SimulationId) -> Result<(), OrderError> {
        let pending = self.orders.find_pending_limit_orders(simulation_id).await?;
        self.book.lock().await.load_batch(pending);
        Ok(())
    }

    async fn execute_pending(
        &self,
        mut order: Order,
        price: Price,
        simulation_time: SimTime,
    ) -> Result<(Order, Trade), OrderError> {
        order.mark_executed(price, simulation_time)?;
        self.orders.update(&order).await?;

        let trade = Trade::from_executed_order(&order, price, simulation_time);
        self.trades.create(&trade).await?;

        self.positions
            .update_or_create_position(
                &order.user_id,
                &order.simulation_id,
                &order.base_currency,
                &order.base_currency,
                trade.cash_delta(),
                Price::new(Decimal::ONE),
                trade.fee,
            )
            .await?;
        self.positions
            .update_or_create_position(
                &order.user_id,
                &order.simulation_id,
                &order.symbol,
                &order.base_currency,
                trade.symbol_quantity_delta(),
                price,
                Price::ZERO,
            )
            .await?;

        self.sender.try_send(ClientMessage::OrderExecuted {
            order: order.clone(),
            trade: trade.clone(),
        });
        Ok((order, trade))
    }

    #[allow(clippy::too_many_arguments)]
    async fn check_funds(
        &self,
        user_id: &UserId,
        simulation_id: &SimulationId,
        symbol: &Symbol,
        base_currency: &Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
    ) -> Result<(), OrderError> {
        let notional = quantity.amount() * price.amount();
        let fee = notional * crate::domain::order_execution::aggregate::FEE_RATE;
        match side {
            OrderSide::Buy => {
                let cash = self
                    .positions
                    .find(user_id, simulation_id, base_currency, base_currency)
                    .await?
                    .map_or(Decimal::ZERO, |p| p.quantity);
                let required = notional + fee;
                if cash < required {
                    return Err(OrderError::InsufficientFunds {
                        required: required.to_string(),
                        available: cash.to_string(),
                    });
                }
            }
            OrderSide::Sell => {
                let held = self
                    .positions
                    .find(user_id, simulation_id, symbol, base_currency)
                    .await?
                    .map_or(Decimal::ZERO, |p| p.quantity);
                if held < quantity.amount() {
                    return Err(OrderError::InsufficientPosition {
                        required: quantity.amount().to_string(),
                        available: held.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::in_memory::{
        InMemoryOrderRepository, InMemoryPositionRepository, InMemoryTradeRepository,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSender {
        count: AtomicUsize,
    }

    impl ClientSenderPort for RecordingSender {
        fn try_send(&self, _message: ClientMessage) -> bool {
            self.count.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn engine() -> OrderExecutionEngine<
        InMemoryOrderRepository,
        InMemoryTradeRepository,
        InMemoryPositionRepository,
        RecordingSender,
    > {
        OrderExecutionEngine::new(
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(InMemoryTradeRepository::new()),
            Arc::new(InMemoryPositionRepository::new()),
            Arc::new(RecordingSender::default()),
        )
    }

    async fn seed_cash(
        engine: &OrderExecutionEngine<
            InMemoryOrderRepository,
            InMemoryTradeRepository,
            InMemoryPositionRepository,
            RecordingSender,
        >,
        user_id: &UserId,
        simulation_id: &SimulationId,
        base_currency: &Symbol,
        amount: f64,
    ) {
        engine
            .positions
            .create(crate::domain::order_execution::Position::initial_cash(
                user_id.clone(),
                simulation_id.clone(),
                base_currency.clone(),
                Price::from_f64(amount),
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn s3_market_buy_execution() {
        let engine = engine();
        let user_id = UserId::generate();
        let simulation_id = SimulationId::generate();
        let base = Symbol::new("USD");
        seed_cash(&engine, &user_id, &simulation_id, &base, 10_000.0).await;

        let (order, trade) = engine
            .execute_market_order(
                user_id.clone(),
                simulation_id.clone(),
                Symbol::new("BTC"),
                base.clone(),
                OrderSide::Buy,
                Quantity::from_i64(1),
                Price::from_f64(100.0),
                SimTime::from_millis(60_000),
            )
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Executed);
        assert_eq!(trade.price, Price::from_f64(100.0));
        assert_eq!(trade.fee.amount(), Decimal::new(1, 1));

        let cash = engine.positions.find(&user_id, &simulation_id, &base, &base).await.unwrap().unwrap();
        assert_eq!(cash.quantity, Decimal::new(98_999, 1));

        let symbol_position = engine
            .positions
            .find(&user_id, &simulation_id, &Symbol::new("BTC"), &base)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(symbol_position.quantity, Decimal::new(1, 0));
        assert_eq!(symbol_position.average_price, Decimal::new(100, 0));
    }

    #[tokio::test]
    async fn market_buy_rejects_insufficient_funds() {
        let engine = engine();
        let user_id = UserId::generate();
        let simulation_id = SimulationId::generate();
        let base = Symbol::new("USD");
        seed_cash(&engine, &user_id, &simulation_id, &base, 10.0).await;

        let result = engine
            .execute_market_order(
                user_id,
                simulation_id,
                Symbol::new("BTC"),
                base,
                OrderSide::Buy,
                Quantity::from_i64(1),
                Price::from_f64(100.0),
                SimTime::from_millis(0),
            )
            .await;
        assert!(matches!(result, Err(OrderError::InsufficientFunds { .. })));
    }

    #[tokio::test]
    async fn s4_limit_buy_triggers_at_observed_price_not_limit() {
        let engine = engine();
        let user_id = UserId::generate();
        let simulation_id = SimulationId::generate();
        let base = Symbol::new("USD");
        seed_cash(&engine, &user_id, &simulation_id, &base, 10_000.0).await;

        engine
            .place_limit_order(
                user_id,
                simulation_id,
                Symbol::new("BTC"),
                base,
                OrderSide::Buy,
                Quantity::from_i64(1),
                Price::from_f64(95.0),
                SimTime::from_millis(0),
            )
            .await
            .unwrap();

        assert!(engine.process_price_update(&Symbol::new("BTC"), Price::from_f64(99.0), SimTime::from_millis(60_000)).await.is_empty());
        assert!(engine.process_price_update(&Symbol::new("BTC"), Price::from_f64(96.0), SimTime::from_millis(120_000)).await.is_empty());
        let filled = engine.process_price_update(&Symbol::new("BTC"), Price::from_f64(94.0), SimTime::from_millis(180_000)).await;

        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].1.price, Price::from_f64(94.0));
    }

    #[tokio::test]
    async fn s5_price_priority_two_buy_limits() {
        let engine = engine();
        let user_id = UserId::generate();
        let simulation_id = SimulationId::generate();
        let base = Symbol::new("USD");
        seed_cash(&engine, &user_id, &simulation_id, &base, 10_000.0).await;

        engine
            .place_limit_order(
                user_id.clone(),
                simulation_id.clone(),
                Symbol::new("BTC"),
                base.clone(),
                OrderSide::Buy,
                Quantity::from_i64(1),
                Price::from_f64(95.0),
                SimTime::from_millis(0),
            )
            .await
            .unwrap();
        engine
            .place_limit_order(
                user_id,
                simulation_id,
                Symbol::new("BTC"),
                base,
                OrderSide::Buy,
                Quantity::from_i64(1),
                Price::from_f64(97.0),
                SimTime::from_millis(0),
            )
            .await
            .unwrap();

        let first = engine.process_price_update(&Symbol::new("BTC"), Price::from_f64(96.0), SimTime::from_millis(60_000)).await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].0.limit_price(), Some(Price::from_f64(97.0)));

        let second = engine.process_price_update(&Symbol::new("BTC"), Price::from_f64(94.0), SimTime::from_millis(120_000)).await;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].0.limit_price(), Some(Price::from_f64(95.0)));
    }

    #[tokio::test]
    async fn process_price_update_only_fires_orders_resting_for_that_symbol() {
        let engine = engine();
        let user_id = UserId::generate();
        let simulation_id = SimulationId::generate();
        let base = Symbol::new("USD");
        seed_cash(&engine, &user_id, &simulation_id, &base, 10_000.0).await;

        // Two buy limits at the same trigger price, resting for different
        // symbols: a price update for one must never fire the other's
        // order (§4.3 `ProcessPriceUpdate`/§4.4 "Per symbol: two priority
        // structures").
        engine
            .place_limit_order(
                user_id.clone(),
                simulation_id.clone(),
                Symbol::new("BTC"),
                base.clone(),
                OrderSide::Buy,
                Quantity::from_i64(1),
                Price::from_f64(95.0),
                SimTime::from_millis(0),
            )
            .await
            .unwrap();
        engine
            .place_limit_order(
                user_id,
                simulation_id,
                Symbol::new("ETH"),
                base,
                OrderSide::Buy,
                Quantity::from_i64(1),
                Price::from_f64(95.0),
                SimTime::from_millis(0),
            )
            .await
            .unwrap();
        assert_eq!(engine.book_len().await, 2);

        let filled_eth = engine.process_price_update(&Symbol::new("ETH"), Price::from_f64(90.0), SimTime::from_millis(60_000)).await;
        assert_eq!(filled_eth.len(), 1);
        assert_eq!(filled_eth[0].0.symbol, Symbol::new("ETH"));
        assert_eq!(engine.book_len().await, 1, "the BTC order is still resting");

        let filled_btc = engine.process_price_update(&Symbol::new("BTC"), Price::from_f64(90.0), SimTime::from_millis(120_000)).await;
        assert_eq!(filled_btc.len(), 1);
        assert_eq!(filled_btc[0].0.symbol, Symbol::new("BTC"));
        assert_eq!(engine.book_len().await, 0);
    }

    #[tokio::test]
    async fn cancel_after_place_leaves_order_cancelled_and_absent_from_book() {
        let engine = engine();
        let user_id = UserId::generate();
        let simulation_id = SimulationId::generate();
        let base = Symbol::new("USD");
        seed_cash(&engine, &user_id, &simulation_id, &base, 10_000.0).await;

        let order = engine
            .place_limit_order(
                user_id,
                simulation_id,
                Symbol::new("BTC"),
                base,
                OrderSide::Buy,
                Quantity::from_i64(1),
                Price::from_f64(95.0),
                SimTime::from_millis(0),
            )
            .await
            .unwrap();

        let cancelled = engine.cancel_order(&order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(engine.book_len().await, 0);
        assert!(engine.process_price_update(&Symbol::new("BTC"), Price::from_f64(1.0), SimTime::from_millis(1)).await.is_empty());
    }

    #[tokio::test]
    async fn sell_rejects_insufficient_position() {
        let engine = engine();
        let user_id = UserId::generate();
        let simulation_id = SimulationId::generate();
        let base = Symbol::new("USD");
        seed_cash(&engine, &user_id, &simulation_id, &base, 10_000.0).await;

        let result = engine
            .execute_market_order(
                user_id,
                simulation_id,
                Symbol::new("BTC"),
                base,
                OrderSide::Sell,
                Quantity::from_i64(1),
                Price::from_f64(100.0),
                SimTime::from_millis(0),
            )
            .await;
        assert!(matches!(result, Err(OrderError::InsufficientPosition { .. })));
    }

    #[tokio::test]
    async fn load_pending_orders_rebuilds_book() {
        let engine = engine();
        let user_id = UserId::generate();
        let simulation_id = SimulationId::generate();
        let base = Symbol::new("USD");
        seed_cash(&engine, &user_id, &simulation_id, &base, 10_000.0).await;

        engine
            .place_limit_order(
                user_id,
                simulation_id.clone(),
                Symbol::new("BTC"),
                base,
                OrderSide::Buy,
                Quantity::from_i64(1),
                Price::from_f64(95.0),
                SimTime::from_millis(0),
            )
            .await
            .unwrap();

        let fresh_engine = engine();
        // copy the persisted order into the fresh engine's repository
        let persisted = engine.orders.find_pending_limit_orders(&simulation_id).await.unwrap();
        assert_eq!(persisted.len(), 1);
        for order in persisted {
            fresh_engine.orders.create(&order).await.unwrap();
        }
        fresh_engine.load_pending_orders(&simulation_id).await.unwrap();
        assert_eq!(fresh_engine.book_len().await, 1);
    }
}
