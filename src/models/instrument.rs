use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The settlement currency. Never the traded side of an order, only the cash leg.
pub const RUB: &str = "RUB";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Instrument {
    pub ticker: String,
    pub name: String,
    pub is_listed: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateInstrumentRequest {
    pub ticker: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstrumentResponse {
    pub ticker: String,
    pub name: String,
}

impl From<Instrument> for InstrumentResponse {
    fn from(i: Instrument) -> Self {
        Self {
            ticker: i.ticker,
            name: i.name,
        }
    }
}
