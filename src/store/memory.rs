//! Recording in-memory `Store` used by tests. Exercises the same interface
//! the matcher writes through, without a live database.

use super::{Store, StoreError};
use crate::models::{Balance, Instrument, Order, Trade, User};
use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    instruments: DashMap<String, Instrument>,
    balances: DashMap<(Uuid, String), Decimal>,
    orders: DashMap<Uuid, Order>,
    trades: DashMap<i64, Trade>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_api_key(&self, api_key: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.api_key == api_key)
            .map(|u| u.clone()))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        self.users.remove(&id);
        self.balances.retain(|k, _| k.0 != id);
        Ok(())
    }

    async fn list_instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        Ok(self.instruments.iter().map(|i| i.clone()).collect())
    }

    async fn save_instrument(&self, instrument: &Instrument) -> Result<(), StoreError> {
        self.instruments.insert(instrument.ticker.clone(), instrument.clone());
        Ok(())
    }

    async fn delete_instrument(&self, ticker: &str) -> Result<(), StoreError> {
        self.instruments.remove(ticker);
        self.balances.retain(|k, _| k.1 != ticker);
        self.orders.retain(|_, o| o.ticker != ticker);
        Ok(())
    }

    async fn save_balance(&self, user_id: Uuid, ticker: &str, amount: Decimal) -> Result<(), StoreError> {
        self.balances.insert((user_id, ticker.to_string()), amount);
        Ok(())
    }

    async fn list_balances(&self) -> Result<Vec<Balance>, StoreError> {
        Ok(self
            .balances
            .iter()
            .map(|entry| Balance {
                user_id: entry.key().0,
                ticker: entry.key().1.clone(),
                amount: *entry.value(),
            })
            .collect())
    }

    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn list_open_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .iter()
            .filter(|o| o.status.is_restable())
            .map(|o| o.clone())
            .collect())
    }

    async fn save_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        self.trades.insert(trade.id, trade.clone());
        Ok(())
    }
}
