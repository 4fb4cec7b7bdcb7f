//! Transactional store abstraction.
//!
//! Persistence choice is deliberately not named by the matching core: it
//! only ever speaks to this trait. `PgStore` is the production
//! implementation (Postgres via sqlx); `MemoryStore` is a recording fake
//! used by tests so the matching core is exercised without a live database.

pub mod memory;
pub mod pg;

use crate::models::{Balance, Instrument, Order, Trade, User};
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;
    async fn find_user_by_api_key(&self, api_key: &str) -> Result<Option<User>, StoreError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_instruments(&self) -> Result<Vec<Instrument>, StoreError>;
    async fn save_instrument(&self, instrument: &Instrument) -> Result<(), StoreError>;
    async fn delete_instrument(&self, ticker: &str) -> Result<(), StoreError>;

    async fn save_balance(&self, user_id: Uuid, ticker: &str, amount: Decimal) -> Result<(), StoreError>;
    async fn list_balances(&self) -> Result<Vec<Balance>, StoreError>;

    async fn save_order(&self, order: &Order) -> Result<(), StoreError>;
    async fn list_open_orders(&self) -> Result<Vec<Order>, StoreError>;

    async fn save_trade(&self, trade: &Trade) -> Result<(), StoreError>;
}
