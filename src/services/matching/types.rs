//! Shared types for the matching core.

use crate::models::Trade;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Domain errors raised by the Ledger, Book and Matcher.
///
/// Transport concerns (auth, routing) live in `api::error::ApiError`, which
/// wraps this type for the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("unknown user: {0}")]
    UnknownUser(Uuid),

    #[error("unknown order: {0}")]
    UnknownOrder(Uuid),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("order is not in a cancellable state")]
    BadState,

    #[error("duplicate: {0}")]
    Conflict(String),

    #[error("system error: {0}")]
    SystemError(String),
}

/// Outcome of a single `place` call: the resulting taker order plus any
/// trades it produced, in execution order.
#[derive(Debug, Clone)]
pub struct PlaceOutcome {
    pub order_id: Uuid,
    pub trades: Vec<Trade>,
}

/// One price level of an aggregated L2 snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Level {
    pub price: Decimal,
    pub qty: Decimal,
}

/// Aggregated order-book snapshot returned by `Book::snapshot`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BookSnapshot {
    pub ticker: String,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}
