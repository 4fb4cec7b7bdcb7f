//! Order admission, funds reservation, matching loop, deal execution and
//! cancellation — the component that owns the exchange's correctness
//! invariants.

use super::book::Book;
use super::types::{BookSnapshot, MatchingError, PlaceOutcome};
use crate::models::{Instrument, Order, OrderStatus, OrderType, PlaceOrderRequest, Side, Trade, RUB};
use crate::services::ledger::Ledger;
use crate::services::trade_log::TradeLog;
use crate::store::Store;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

pub struct Matcher {
    ledger: Ledger,
    books: DashMap<String, Arc<Mutex<Book>>>,
    instruments: DashMap<String, Instrument>,
    trade_log: TradeLog,
    orders: DashMap<Uuid, Order>,
    store: Arc<dyn Store>,
}

impl Matcher {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let instruments = DashMap::new();
        instruments.insert(
            RUB.to_string(),
            Instrument {
                ticker: RUB.to_string(),
                name: "Russian Ruble".to_string(),
                is_listed: true,
            },
        );

        Self {
            ledger: Ledger::new(),
            books: DashMap::new(),
            instruments,
            trade_log: TradeLog::new(),
            orders: DashMap::new(),
            store,
        }
    }

    /// Reload instruments, balances and resting orders from the store at
    /// startup, so a process restart doesn't silently lose open orders.
    pub async fn recover_from_store(&self) -> Result<(), MatchingError> {
        for instrument in self
            .store
            .list_instruments()
            .await
            .map_err(|e| MatchingError::SystemError(e.to_string()))?
        {
            self.instruments.insert(instrument.ticker.clone(), instrument);
        }

        for balance in self
            .store
            .list_balances()
            .await
            .map_err(|e| MatchingError::SystemError(e.to_string()))?
        {
            if balance.amount > Decimal::ZERO {
                let _ = self.ledger.credit(balance.user_id, &balance.ticker, balance.amount);
            }
        }

        for order in self
            .store
            .list_open_orders()
            .await
            .map_err(|e| MatchingError::SystemError(e.to_string()))?
        {
            self.orders.insert(order.id, order.clone());
            if order.order_type == OrderType::Limit {
                self.book_for(&order.ticker).lock().await.insert(order);
            }
        }

        info!("recovered {} resting orders from store", self.orders.len());
        Ok(())
    }

    fn book_for(&self, ticker: &str) -> Arc<Mutex<Book>> {
        self.books
            .entry(ticker.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Book::new(ticker))))
            .clone()
    }

    // ------------------------------------------------------------------
    // Instrument catalogue (co-located with the ledger it gates; the HTTP
    // role-gating for these endpoints lives in the API layer)
    // ------------------------------------------------------------------

    pub fn list_instruments(&self) -> Vec<Instrument> {
        self.instruments.iter().map(|i| i.clone()).collect()
    }

    pub fn add_instrument(&self, ticker: &str, name: &str) -> Result<Instrument, MatchingError> {
        if self.instruments.contains_key(ticker) {
            return Err(MatchingError::Conflict(format!("instrument {ticker} already exists")));
        }
        let instrument = Instrument {
            ticker: ticker.to_string(),
            name: name.to_string(),
            is_listed: true,
        };
        self.instruments.insert(ticker.to_string(), instrument.clone());

        let store = self.store.clone();
        let to_persist = instrument.clone();
        tokio::spawn(async move {
            if let Err(e) = store.save_instrument(&to_persist).await {
                error!("failed to persist instrument {}: {}", to_persist.ticker, e);
            }
        });

        Ok(instrument)
    }

    pub fn delete_instrument(&self, ticker: &str) -> Result<(), MatchingError> {
        if ticker == RUB {
            return Err(MatchingError::BadRequest("RUB cannot be deleted".into()));
        }
        if self.instruments.remove(ticker).is_none() {
            return Err(MatchingError::UnknownInstrument(ticker.to_string()));
        }
        self.books.remove(ticker);
        self.ledger.remove_ticker(ticker);
        self.orders.retain(|_, o| o.ticker != ticker);

        let store = self.store.clone();
        let ticker = ticker.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.delete_instrument(&ticker).await {
                error!("failed to persist instrument deletion {}: {}", ticker, e);
            }
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ledger passthrough (balance reads and admin deposit/withdraw; role
    // gating happens in the API layer)
    // ------------------------------------------------------------------

    pub fn balance(&self, user: Uuid, ticker: &str) -> Decimal {
        self.ledger.balance(user, ticker)
    }

    pub fn all_balances(&self, user: Uuid) -> std::collections::HashMap<String, Decimal> {
        self.ledger.all_for_user(user)
    }

    /// Sum of every user's free balance in `ticker`. Used by conservation
    /// checks, not the request path.
    pub fn total_free_balance(&self, ticker: &str) -> Decimal {
        self.ledger.sum_for_ticker(ticker)
    }

    pub fn deposit(&self, user: Uuid, ticker: &str, amount: Decimal) -> Result<(), MatchingError> {
        if !self.instruments.contains_key(ticker) {
            return Err(MatchingError::UnknownInstrument(ticker.to_string()));
        }
        self.ledger.credit(user, ticker, amount)?;
        self.spawn_balance_persist(user, ticker);
        Ok(())
    }

    pub fn withdraw(&self, user: Uuid, ticker: &str, amount: Decimal) -> Result<(), MatchingError> {
        if !self.instruments.contains_key(ticker) {
            return Err(MatchingError::UnknownInstrument(ticker.to_string()));
        }
        self.ledger.debit(user, ticker, amount)?;
        self.spawn_balance_persist(user, ticker);
        Ok(())
    }

    pub fn delete_user_balances(&self, user: Uuid) {
        self.ledger.remove_user(user);
        self.orders.retain(|_, o| o.user_id != user);
    }

    fn spawn_balance_persist(&self, user: Uuid, ticker: &str) {
        let store = self.store.clone();
        let amount = self.ledger.balance(user, ticker);
        let ticker = ticker.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.save_balance(user, &ticker, amount).await {
                error!("failed to persist balance for {}/{}: {}", user, ticker, e);
            }
        });
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    pub fn order(&self, user: Uuid, id: Uuid) -> Result<Order, MatchingError> {
        self.orders
            .get(&id)
            .map(|o| o.clone())
            .filter(|o| o.user_id == user)
            .ok_or(MatchingError::UnknownOrder(id))
    }

    pub fn list_orders(&self, user: Uuid) -> Vec<Order> {
        self.orders.iter().filter(|o| o.user_id == user).map(|o| o.clone()).collect()
    }

    /// Every order known to the matcher, any user, any status. Used by
    /// conservation checks and admin tooling, not the request path.
    pub fn all_orders(&self) -> Vec<Order> {
        self.orders.iter().map(|o| o.clone()).collect()
    }

    pub async fn snapshot(&self, ticker: &str, depth: usize) -> Result<BookSnapshot, MatchingError> {
        if !self.instruments.contains_key(ticker) {
            return Err(MatchingError::UnknownInstrument(ticker.to_string()));
        }
        // No entry yet means an empty book; an empty snapshot is correct
        // without locking anything.
        match self.books.get(ticker).map(|b| b.clone()) {
            Some(book_lock) => Ok(book_lock.lock().await.snapshot(depth)),
            None => Ok(BookSnapshot {
                ticker: ticker.to_string(),
                bids: Vec::new(),
                asks: Vec::new(),
            }),
        }
    }

    pub fn history(&self, ticker: &str, limit: usize) -> Vec<Trade> {
        self.trade_log.history(ticker, limit)
    }

    /// Admit, reserve funds for, and attempt to match an incoming order.
    pub async fn place(&self, user: Uuid, req: PlaceOrderRequest) -> Result<PlaceOutcome, MatchingError> {
        let instrument = self
            .instruments
            .get(&req.ticker)
            .map(|i| i.clone())
            .ok_or_else(|| MatchingError::UnknownInstrument(req.ticker.clone()))?;
        if !instrument.is_listed {
            return Err(MatchingError::UnknownInstrument(req.ticker.clone()));
        }
        if !self.instruments.contains_key(RUB) {
            return Err(MatchingError::SystemError("RUB instrument missing".into()));
        }
        if req.qty <= Decimal::ZERO || req.qty != req.qty.trunc() {
            return Err(MatchingError::BadRequest("qty must be a positive integer".into()));
        }
        if let Some(price) = req.price {
            if price <= Decimal::ZERO {
                return Err(MatchingError::BadRequest("price must be positive".into()));
            }
        }

        let order_type = req.order_type();
        let book_lock = self.book_for(&req.ticker);
        let mut book = book_lock.lock().await;

        match (req.direction, order_type) {
            (Side::Buy, OrderType::Limit) => {
                let required = req.price.unwrap() * req.qty;
                self.ledger.reserve(user, RUB, required)?;
            }
            (Side::Buy, OrderType::Market) => {
                if self.ledger.balance(user, RUB) <= Decimal::ZERO {
                    return Err(MatchingError::InsufficientFunds);
                }
            }
            (Side::Sell, _) => {
                self.ledger.reserve(user, &req.ticker, req.qty)?;
            }
        }

        let now = Utc::now();
        let mut taker = Order {
            id: Uuid::new_v4(),
            user_id: user,
            ticker: req.ticker.clone(),
            side: req.direction,
            order_type,
            qty: req.qty,
            price: req.price,
            filled_qty: Decimal::ZERO,
            status: OrderStatus::Open,
            created_at: now,
            updated_at: now,
        };

        if order_type == OrderType::Limit {
            book.insert(taker.clone());
        }
        self.orders.insert(taker.id, taker.clone());

        let mut trades = Vec::new();

        loop {
            if taker.remaining() <= Decimal::ZERO {
                break;
            }
            let candidates = book.best_opposite(taker.side, taker.price);
            let Some(counter_id) = candidates
                .into_iter()
                .find(|id| book.get(id).map(|o| o.user_id != user).unwrap_or(false))
            else {
                break;
            };
            let mut counter = book.get(&counter_id).expect("looked up above").clone();

            let mut deal_qty = taker.remaining().min(counter.remaining());
            let deal_price = counter.price.expect("only LIMIT orders rest");

            if taker.side == Side::Buy && taker.order_type == OrderType::Market {
                let affordable = (self.ledger.balance(user, RUB) / deal_price).floor();
                if affordable <= Decimal::ZERO {
                    break;
                }
                deal_qty = deal_qty.min(affordable);
            }

            let trade = self.execute_deal(&mut taker, &mut counter, deal_qty, deal_price, now);
            trades.push(trade);

            book.update(counter.clone());
            if taker.order_type == OrderType::Limit {
                book.update(taker.clone());
            }
        }

        // Finalize taker status.
        if taker.remaining() <= Decimal::ZERO {
            taker.status = OrderStatus::Filled;
        } else if taker.order_type == OrderType::Market {
            taker.status = if taker.filled_qty == Decimal::ZERO {
                OrderStatus::Cancelled
            } else {
                OrderStatus::PartiallyFilled
            };
        } else {
            taker.status = if taker.filled_qty == Decimal::ZERO {
                OrderStatus::Open
            } else {
                OrderStatus::PartiallyFilled
            };
        }
        taker.updated_at = Utc::now();

        self.orders.insert(taker.id, taker.clone());
        if taker.order_type == OrderType::Limit {
            book.update(taker.clone());
        }
        drop(book);

        self.spawn_order_persist(taker.clone());
        for trade in &trades {
            self.spawn_trade_persist(trade.clone());
        }

        debug!(
            order_id = %taker.id, status = ?taker.status, filled = %taker.filled_qty,
            "order placed"
        );

        Ok(PlaceOutcome {
            order_id: taker.id,
            trades,
        })
    }

    /// One deal at price `p` for `q` units between the taker and a resting
    /// counter-order. Credits both legs, refunds buyer price-improvement,
    /// debits a market buyer's cash, and records the trade.
    fn execute_deal(
        &self,
        taker: &mut Order,
        counter: &mut Order,
        q: Decimal,
        p: Decimal,
        now: chrono::DateTime<Utc>,
    ) -> Trade {
        let (buyer, seller) = if taker.side == Side::Buy {
            (&mut *taker, &mut *counter)
        } else {
            (&mut *counter, &mut *taker)
        };

        let ticker = buyer.ticker.clone();
        let _ = self.ledger.credit(buyer.user_id, &ticker, q);
        let _ = self.ledger.credit(seller.user_id, RUB, q * p);

        if buyer.order_type == OrderType::Limit {
            let refund = q * (buyer.price.unwrap() - p);
            if refund > Decimal::ZERO {
                let _ = self.ledger.credit(buyer.user_id, RUB, refund);
            }
        } else {
            let _ = self.ledger.debit(buyer.user_id, RUB, q * p);
        }

        let buyer_id = buyer.id;
        let seller_id = seller.id;
        let buyer_user = buyer.user_id;
        let seller_user = seller.user_id;

        for order in [&mut *taker, &mut *counter] {
            order.filled_qty += q;
            order.status = if order.remaining() <= Decimal::ZERO {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            order.updated_at = now;
        }

        let trade = Trade {
            id: self.trade_log.next_id(),
            ticker: taker.ticker.clone(),
            price: p,
            qty: q,
            buyer_id: buyer_user,
            seller_id: seller_user,
            buy_order_id: buyer_id,
            sell_order_id: seller_id,
            timestamp: now,
        };
        self.trade_log.append(trade.clone());
        trade
    }

    pub async fn cancel(&self, user: Uuid, order_id: Uuid) -> Result<(), MatchingError> {
        let mut order = self
            .orders
            .get(&order_id)
            .map(|o| o.clone())
            .filter(|o| o.user_id == user)
            .ok_or(MatchingError::UnknownOrder(order_id))?;

        if order.order_type == OrderType::Market || !order.status.is_restable() {
            return Err(MatchingError::BadState);
        }

        let book_lock = self.book_for(&order.ticker);
        let mut book = book_lock.lock().await;

        let remaining = order.remaining();
        match order.side {
            Side::Sell => self.ledger.release(user, &order.ticker, remaining)?,
            Side::Buy => self.ledger.release(user, RUB, remaining * order.price.unwrap())?,
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        self.orders.insert(order.id, order.clone());
        book.update(order.clone());
        drop(book);

        self.spawn_order_persist(order);
        Ok(())
    }

    fn spawn_order_persist(&self, order: Order) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.save_order(&order).await {
                error!("failed to persist order {}: {}", order.id, e);
            }
        });
    }

    fn spawn_trade_persist(&self, trade: Trade) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.save_trade(&trade).await {
                error!("failed to persist trade {}: {}", trade.id, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn matcher_with_xyz() -> Matcher {
        let m = Matcher::new(Arc::new(MemoryStore::new()));
        m.add_instrument("XYZ", "XYZ Corp").unwrap();
        m
    }

    fn limit(side: Side, ticker: &str, qty: Decimal, price: Decimal) -> PlaceOrderRequest {
        PlaceOrderRequest {
            direction: side,
            ticker: ticker.to_string(),
            qty,
            price: Some(price),
        }
    }

    fn market(side: Side, ticker: &str, qty: Decimal) -> PlaceOrderRequest {
        PlaceOrderRequest {
            direction: side,
            ticker: ticker.to_string(),
            qty,
            price: None,
        }
    }

    #[tokio::test]
    async fn limit_cross_applies_maker_price_improvement() {
        let m = matcher_with_xyz();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        m.deposit(u1, RUB, dec!(1000)).unwrap();
        m.deposit(u2, "XYZ", dec!(10)).unwrap();

        m.place(u2, limit(Side::Sell, "XYZ", dec!(10), dec!(50))).await.unwrap();
        let outcome = m.place(u1, limit(Side::Buy, "XYZ", dec!(5), dec!(60))).await.unwrap();

        assert_eq!(outcome.trades.len(), 1);
        let trade = &outcome.trades[0];
        assert_eq!(trade.price, dec!(50));
        assert_eq!(trade.qty, dec!(5));
        assert_eq!(trade.buyer_id, u1);
        assert_eq!(trade.seller_id, u2);

        assert_eq!(m.balance(u1, RUB), dec!(750));
        assert_eq!(m.balance(u1, "XYZ"), dec!(5));
        assert_eq!(m.balance(u2, "XYZ"), dec!(5));
        assert_eq!(m.balance(u2, RUB), dec!(250));

        let u1_order = m.order(u1, outcome.order_id).unwrap();
        assert_eq!(u1_order.status, OrderStatus::Filled);
    }

    #[tokio::test]
    async fn market_buy_partial_fill_leaves_residual_cancelled() {
        let m = matcher_with_xyz();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        m.deposit(u1, RUB, dec!(500)).unwrap();
        m.deposit(u2, "XYZ", dec!(10)).unwrap();

        let sell = m.place(u2, limit(Side::Sell, "XYZ", dec!(10), dec!(100))).await.unwrap();
        let buy = m.place(u1, market(Side::Buy, "XYZ", dec!(10))).await.unwrap();

        assert_eq!(buy.trades.len(), 1);
        assert_eq!(buy.trades[0].qty, dec!(5));

        assert_eq!(m.balance(u1, RUB), dec!(0));
        assert_eq!(m.balance(u1, "XYZ"), dec!(5));
        assert_eq!(m.balance(u2, "XYZ"), dec!(5));
        assert_eq!(m.balance(u2, RUB), dec!(500));

        let buy_order = m.order(u1, buy.order_id).unwrap();
        assert_eq!(buy_order.status, OrderStatus::PartiallyFilled);
        assert_eq!(buy_order.filled_qty, dec!(5));

        let sell_order = m.order(u2, sell.order_id).unwrap();
        assert_eq!(sell_order.status, OrderStatus::PartiallyFilled);
        assert_eq!(sell_order.filled_qty, dec!(5));
    }

    #[tokio::test]
    async fn matching_skips_own_resting_order() {
        let m = matcher_with_xyz();
        let u1 = Uuid::new_v4();
        m.deposit(u1, RUB, dec!(1000)).unwrap();
        m.deposit(u1, "XYZ", dec!(10)).unwrap();

        let sell = m.place(u1, limit(Side::Sell, "XYZ", dec!(10), dec!(50))).await.unwrap();
        let buy = m.place(u1, limit(Side::Buy, "XYZ", dec!(10), dec!(60))).await.unwrap();

        assert!(buy.trades.is_empty());
        assert_eq!(m.order(u1, buy.order_id).unwrap().status, OrderStatus::Open);
        assert_eq!(m.order(u1, sell.order_id).unwrap().status, OrderStatus::Open);
        assert_eq!(m.balance(u1, RUB), dec!(400));
    }

    #[tokio::test]
    async fn cancel_releases_reserved_funds() {
        let m = matcher_with_xyz();
        let u1 = Uuid::new_v4();
        m.deposit(u1, RUB, dec!(1000)).unwrap();

        let outcome = m.place(u1, limit(Side::Buy, "XYZ", dec!(4), dec!(100))).await.unwrap();
        assert_eq!(m.balance(u1, RUB), dec!(600));

        m.cancel(u1, outcome.order_id).await.unwrap();

        assert_eq!(m.balance(u1, RUB), dec!(1000));
        assert_eq!(m.order(u1, outcome.order_id).unwrap().status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn equal_price_matches_earliest_order_first() {
        let m = matcher_with_xyz();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let u3 = Uuid::new_v4();
        m.deposit(u1, RUB, dec!(500)).unwrap();
        m.deposit(u2, "XYZ", dec!(5)).unwrap();
        m.deposit(u3, "XYZ", dec!(5)).unwrap();

        let first = m.place(u2, limit(Side::Sell, "XYZ", dec!(5), dec!(50))).await.unwrap();
        let second = m.place(u3, limit(Side::Sell, "XYZ", dec!(5), dec!(50))).await.unwrap();
        let buy = m.place(u1, limit(Side::Buy, "XYZ", dec!(5), dec!(50))).await.unwrap();

        assert_eq!(buy.trades.len(), 1);
        assert_eq!(buy.trades[0].seller_id, u2);
        assert_eq!(m.order(u2, first.order_id).unwrap().status, OrderStatus::Filled);
        assert_eq!(m.order(u3, second.order_id).unwrap().status, OrderStatus::Open);
    }

    #[tokio::test]
    async fn cancel_of_filled_order_fails_with_bad_state() {
        let m = matcher_with_xyz();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        m.deposit(u1, RUB, dec!(1000)).unwrap();
        m.deposit(u2, "XYZ", dec!(10)).unwrap();

        m.place(u2, limit(Side::Sell, "XYZ", dec!(10), dec!(50))).await.unwrap();
        let buy = m.place(u1, limit(Side::Buy, "XYZ", dec!(10), dec!(50))).await.unwrap();

        assert!(matches!(m.cancel(u1, buy.order_id).await, Err(MatchingError::BadState)));
    }

    #[tokio::test]
    async fn market_buy_stops_when_funds_run_out_mid_loop() {
        let m = matcher_with_xyz();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        m.deposit(u1, RUB, dec!(120)).unwrap();
        m.deposit(u2, "XYZ", dec!(10)).unwrap();

        m.place(u2, limit(Side::Sell, "XYZ", dec!(10), dec!(50))).await.unwrap();
        let buy = m.place(u1, market(Side::Buy, "XYZ", dec!(10))).await.unwrap();

        // 120 RUB buys exactly 2 units at 50; the loop stops there rather
        // than raising an error.
        assert_eq!(buy.trades[0].qty, dec!(2));
        assert_eq!(m.balance(u1, RUB), dec!(20));
        assert_eq!(m.order(u1, buy.order_id).unwrap().status, OrderStatus::PartiallyFilled);
    }
}
