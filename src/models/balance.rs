use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Balance {
    pub user_id: Uuid,
    pub ticker: String,
    pub amount: Decimal,
}

/// Ticker -> amount mapping returned by `GET /balance`.
pub type BalanceMap = HashMap<String, Decimal>;

#[derive(Debug, Deserialize)]
pub struct BalanceAdjustRequest {
    pub user_id: Uuid,
    pub ticker: String,
    pub amount: Decimal,
}
