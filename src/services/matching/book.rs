//! Per-instrument resting order book with price/time priority.
//!
//! Bids are kept ascending by price (`BTreeMap` natural order) and walked in
//! reverse to get highest-first; asks are kept ascending and walked forward.
//! `rust_decimal::Decimal` implements `Ord` directly, so no scaled-integer
//! key wrapper is needed.

use super::types::{BookSnapshot, Level};
use crate::models::{Order, OrderStatus, Side};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, VecDeque};
use uuid::Uuid;

pub struct Book {
    ticker: String,
    bids: BTreeMap<Decimal, VecDeque<Uuid>>,
    asks: BTreeMap<Decimal, VecDeque<Uuid>>,
    orders: HashMap<Uuid, Order>,
}

impl Book {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: HashMap::new(),
        }
    }

    fn side_levels(&self, side: Side) -> &BTreeMap<Decimal, VecDeque<Uuid>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_levels_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, VecDeque<Uuid>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Resting counter-orders in match priority for a taker on `taker_side`.
    /// A BUY taker matches against asks ascending by price; a SELL taker
    /// matches against bids descending by price. `taker_price` filters out
    /// price levels the taker's limit would never cross; `None` (market
    /// taker) imposes no filter.
    pub fn best_opposite(&self, taker_side: Side, taker_price: Option<Decimal>) -> Vec<Uuid> {
        let counter_side = taker_side.opposite();
        let levels = self.side_levels(counter_side);
        let mut ids = Vec::new();

        match taker_side {
            Side::Buy => {
                for (&price, queue) in levels.iter() {
                    if let Some(limit) = taker_price {
                        if price > limit {
                            break;
                        }
                    }
                    ids.extend(queue.iter().copied());
                }
            }
            Side::Sell => {
                for (&price, queue) in levels.iter().rev() {
                    if let Some(limit) = taker_price {
                        if price < limit {
                            break;
                        }
                    }
                    ids.extend(queue.iter().copied());
                }
            }
        }
        ids
    }

    pub fn get(&self, id: &Uuid) -> Option<&Order> {
        self.orders.get(id)
    }

    /// Insert a resting LIMIT order. Caller must ensure status is OPEN or
    /// PARTIALLY_FILLED.
    pub fn insert(&mut self, order: Order) {
        let price = order
            .price
            .expect("only LIMIT orders rest in the book");
        let side = order.side;
        let id = order.id;
        self.orders.insert(id, order);
        self.side_levels_mut(side)
            .entry(price)
            .or_insert_with(VecDeque::new)
            .push_back(id);
    }

    /// Reflect a new filled quantity / status for a resting order. Removes
    /// it from the book once its status becomes terminal.
    pub fn update(&mut self, order: Order) {
        let id = order.id;
        let side = order.side;
        let price = order.price;
        let terminal = order.status.is_terminal();

        self.orders.insert(id, order);

        if terminal {
            if let Some(price) = price {
                let levels = self.side_levels_mut(side);
                if let Some(queue) = levels.get_mut(&price) {
                    queue.retain(|o| *o != id);
                    if queue.is_empty() {
                        levels.remove(&price);
                    }
                }
            }
            self.orders.remove(&id);
        }
    }

    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(&price, queue)| Level {
                price,
                qty: self.level_qty(queue),
            })
            .collect();

        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|(&price, queue)| Level {
                price,
                qty: self.level_qty(queue),
            })
            .collect();

        BookSnapshot {
            ticker: self.ticker.clone(),
            bids,
            asks,
        }
    }

    fn level_qty(&self, queue: &VecDeque<Uuid>) -> Decimal {
        queue
            .iter()
            .filter_map(|id| self.orders.get(id))
            .map(|o| o.remaining())
            .sum()
    }

    #[cfg(test)]
    pub fn resting_ids(&self, side: Side) -> Vec<Uuid> {
        self.side_levels(side)
            .values()
            .flat_map(|q| q.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderType;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn limit_order(side: Side, price: Decimal, qty: Decimal) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ticker: "XYZ".into(),
            side,
            order_type: OrderType::Limit,
            qty,
            price: Some(price),
            filled_qty: Decimal::ZERO,
            status: OrderStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn price_time_priority_orders_asks_ascending() {
        let mut book = Book::new("XYZ");
        let a = limit_order(Side::Sell, dec!(51), dec!(5));
        let b = limit_order(Side::Sell, dec!(50), dec!(5));
        book.insert(a.clone());
        book.insert(b.clone());

        let order = book.best_opposite(Side::Buy, None);
        assert_eq!(order, vec![b.id, a.id]);
    }

    #[test]
    fn fifo_within_a_level() {
        let mut book = Book::new("XYZ");
        let first = limit_order(Side::Sell, dec!(50), dec!(5));
        let second = limit_order(Side::Sell, dec!(50), dec!(5));
        book.insert(first.clone());
        book.insert(second.clone());

        assert_eq!(book.best_opposite(Side::Buy, None), vec![first.id, second.id]);
    }

    #[test]
    fn limit_price_filters_levels() {
        let mut book = Book::new("XYZ");
        let cheap = limit_order(Side::Sell, dec!(50), dec!(5));
        let pricey = limit_order(Side::Sell, dec!(60), dec!(5));
        book.insert(cheap.clone());
        book.insert(pricey.clone());

        assert_eq!(book.best_opposite(Side::Buy, Some(dec!(55))), vec![cheap.id]);
    }

    #[test]
    fn update_to_terminal_removes_from_book() {
        let mut book = Book::new("XYZ");
        let mut order = limit_order(Side::Sell, dec!(50), dec!(5));
        book.insert(order.clone());

        order.filled_qty = dec!(5);
        order.status = OrderStatus::Filled;
        book.update(order.clone());

        assert!(book.best_opposite(Side::Buy, None).is_empty());
        assert!(book.get(&order.id).is_none());
    }

    #[test]
    fn snapshot_aggregates_by_price_level() {
        let mut book = Book::new("XYZ");
        book.insert(limit_order(Side::Buy, dec!(100), dec!(1)));
        book.insert(limit_order(Side::Buy, dec!(100), dec!(2)));
        book.insert(limit_order(Side::Sell, dec!(102), dec!(3)));

        let snap = book.snapshot(10);
        assert_eq!(snap.bids.len(), 1);
        assert_eq!(snap.bids[0].qty, dec!(3));
        assert_eq!(snap.asks[0].qty, dec!(3));
    }
}
