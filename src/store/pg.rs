//! Postgres-backed `Store` implementation. Uses runtime-checked `sqlx`
//! queries (`query`/`query_as`), not the compile-time `query!` macros, since
//! those require a live database or an offline cache generated by `cargo`.

use super::{Store, StoreError};
use crate::models::{Balance, Instrument, Order, Trade, User};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn backend_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl Store for PgStore {
    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, role, api_key, created_at)
            VALUES ($1, $2, $3::user_role, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.role)
        .bind(&user.api_key)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn find_user_by_api_key(&self, api_key: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>("SELECT id, name, role, api_key, created_at FROM users WHERE api_key = $1")
            .bind(api_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>("SELECT id, name, role, api_key, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM balances WHERE user_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn list_instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        sqlx::query_as::<_, Instrument>("SELECT ticker, name, is_listed FROM instruments")
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)
    }

    async fn save_instrument(&self, instrument: &Instrument) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO instruments (ticker, name, is_listed)
            VALUES ($1, $2, $3)
            ON CONFLICT (ticker) DO UPDATE SET name = $2, is_listed = $3
            "#,
        )
        .bind(&instrument.ticker)
        .bind(&instrument.name)
        .bind(instrument.is_listed)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn delete_instrument(&self, ticker: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM orders WHERE ticker = $1")
            .bind(ticker)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        sqlx::query("DELETE FROM balances WHERE ticker = $1")
            .bind(ticker)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        sqlx::query("DELETE FROM instruments WHERE ticker = $1")
            .bind(ticker)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn save_balance(&self, user_id: Uuid, ticker: &str, amount: Decimal) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO balances (user_id, ticker, amount)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, ticker) DO UPDATE SET amount = $3
            "#,
        )
        .bind(user_id)
        .bind(ticker)
        .bind(amount)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn list_balances(&self) -> Result<Vec<Balance>, StoreError> {
        sqlx::query_as::<_, Balance>("SELECT user_id, ticker, amount FROM balances")
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)
    }

    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, ticker, side, order_type, qty, price, filled_qty, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4::side, $5::order_type, $6, $7, $8, $9::order_status, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                filled_qty = $8,
                status = $9::order_status,
                updated_at = $11
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(&order.ticker)
        .bind(order.side)
        .bind(order.order_type)
        .bind(order.qty)
        .bind(order.price)
        .bind(order.filled_qty)
        .bind(order.status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn list_open_orders(&self) -> Result<Vec<Order>, StoreError> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, ticker, side, order_type, qty, price, filled_qty, status, created_at, updated_at
            FROM orders
            WHERE status IN ('open', 'partially_filled')
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)
    }

    async fn save_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, ticker, price, qty, buyer_id, seller_id, buy_order_id, sell_order_id, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(trade.id)
        .bind(&trade.ticker)
        .bind(trade.price)
        .bind(trade.qty)
        .bind(trade.buyer_id)
        .bind(trade.seller_id)
        .bind(trade.buy_order_id)
        .bind(trade.sell_order_id)
        .bind(trade.timestamp)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }
}
