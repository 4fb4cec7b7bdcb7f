//! Append-only trade history, indexed by instrument.

use crate::models::Trade;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

pub struct TradeLog {
    trades: RwLock<Vec<Trade>>,
    next_id: AtomicI64,
}

impl TradeLog {
    pub fn new() -> Self {
        Self {
            trades: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn append(&self, trade: Trade) {
        self.trades.write().push(trade);
    }

    /// Newest-first slice, truncated to `limit`.
    pub fn history(&self, ticker: &str, limit: usize) -> Vec<Trade> {
        self.trades
            .read()
            .iter()
            .rev()
            .filter(|t| t.ticker == ticker)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Trade> {
        self.trades.read().clone()
    }
}

impl Default for TradeLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn trade(id: i64, ticker: &str) -> Trade {
        Trade {
            id,
            ticker: ticker.to_string(),
            price: dec!(50),
            qty: dec!(1),
            buyer_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            buy_order_id: Uuid::new_v4(),
            sell_order_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn history_is_newest_first_and_filtered_by_ticker() {
        let log = TradeLog::new();
        log.append(trade(1, "XYZ"));
        log.append(trade(2, "ABC"));
        log.append(trade(3, "XYZ"));

        let xyz = log.history("XYZ", 10);
        assert_eq!(xyz.iter().map(|t| t.id).collect::<Vec<_>>(), vec![3, 1]);
    }

    #[test]
    fn history_respects_limit() {
        let log = TradeLog::new();
        for i in 0..5 {
            log.append(trade(i, "XYZ"));
        }
        assert_eq!(log.history("XYZ", 2).len(), 2);
    }
}
