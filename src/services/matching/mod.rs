//! Order matching: a per-ticker price-time-priority book, funds reservation
//! against the ledger, and deal execution.
//!
//! ```text
//! API Handler
//!   -> Matcher::place / Matcher::cancel   (per-ticker tokio::sync::Mutex<Book>)
//!        -> Ledger                         (reserve / credit / debit)
//!        -> Book                           (resting orders, price-time priority)
//!        -> TradeLog                       (append-only trade history)
//!        -> Store (async, fire-and-forget) (Postgres mirror)
//! ```

mod book;
mod matcher;
mod types;

pub use matcher::Matcher;
pub use types::{BookSnapshot, Level, MatchingError, PlaceOutcome};
