//! Per-user, per-ticker balances.
//!
//! The free balance is the sole authoritative "available" figure; a resting
//! order's reservation is never stored separately, it is implied by the
//! debit that happened when the order was admitted (see Matcher::place).

use crate::services::matching::types::MatchingError;
use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct Ledger {
    balances: DashMap<(Uuid, String), Decimal>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
        }
    }

    pub fn balance(&self, user: Uuid, ticker: &str) -> Decimal {
        self.balances
            .get(&(user, ticker.to_string()))
            .map(|v| *v)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn credit(&self, user: Uuid, ticker: &str, amount: Decimal) -> Result<(), MatchingError> {
        if amount <= Decimal::ZERO {
            return Err(MatchingError::BadRequest("credit amount must be positive".into()));
        }
        *self
            .balances
            .entry((user, ticker.to_string()))
            .or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    pub fn debit(&self, user: Uuid, ticker: &str, amount: Decimal) -> Result<(), MatchingError> {
        if amount <= Decimal::ZERO {
            return Err(MatchingError::BadRequest("debit amount must be positive".into()));
        }
        let mut entry = self.balances.entry((user, ticker.to_string())).or_insert(Decimal::ZERO);
        if *entry < amount {
            return Err(MatchingError::InsufficientFunds);
        }
        *entry -= amount;
        Ok(())
    }

    /// Equivalent to `debit`; kept as a distinct name so call sites in the
    /// Matcher read like the reservation they represent.
    pub fn reserve(&self, user: Uuid, ticker: &str, amount: Decimal) -> Result<(), MatchingError> {
        self.debit(user, ticker, amount)
    }

    /// Equivalent to `credit`; used on cancel/refund paths.
    pub fn release(&self, user: Uuid, ticker: &str, amount: Decimal) -> Result<(), MatchingError> {
        self.credit(user, ticker, amount)
    }

    pub fn all_for_user(&self, user: Uuid) -> std::collections::HashMap<String, Decimal> {
        self.balances
            .iter()
            .filter(|entry| entry.key().0 == user)
            .map(|entry| (entry.key().1.clone(), *entry.value()))
            .collect()
    }

    /// Sum of every user's free balance in `ticker`. Used by conservation
    /// checks, not the request path.
    pub fn sum_for_ticker(&self, ticker: &str) -> Decimal {
        self.balances
            .iter()
            .filter(|entry| entry.key().1 == ticker)
            .map(|entry| *entry.value())
            .sum()
    }

    pub fn remove_ticker(&self, ticker: &str) {
        self.balances.retain(|k, _| k.1 != ticker);
    }

    pub fn remove_user(&self, user: Uuid) {
        self.balances.retain(|k, _| k.0 != user);
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn credit_then_debit() {
        let ledger = Ledger::new();
        let user = Uuid::new_v4();
        ledger.credit(user, "RUB", dec!(100)).unwrap();
        assert_eq!(ledger.balance(user, "RUB"), dec!(100));

        ledger.debit(user, "RUB", dec!(40)).unwrap();
        assert_eq!(ledger.balance(user, "RUB"), dec!(60));
    }

    #[test]
    fn debit_more_than_available_fails() {
        let ledger = Ledger::new();
        let user = Uuid::new_v4();
        ledger.credit(user, "RUB", dec!(10)).unwrap();
        assert!(matches!(
            ledger.debit(user, "RUB", dec!(20)),
            Err(MatchingError::InsufficientFunds)
        ));
        assert_eq!(ledger.balance(user, "RUB"), dec!(10));
    }

    #[test]
    fn balance_of_unknown_row_is_zero() {
        let ledger = Ledger::new();
        assert_eq!(ledger.balance(Uuid::new_v4(), "RUB"), Decimal::ZERO);
    }
}
