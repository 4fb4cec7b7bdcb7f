pub mod ledger;
pub mod matching;
pub mod trade_log;
