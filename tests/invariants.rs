//! Property tests for the conservation and non-negativity invariants under
//! concurrent order placement.

use std::sync::Arc;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use rust_decimal::Decimal;
use tokio::runtime::Runtime;
use uuid::Uuid;

use toy_exchange::models::{OrderType, PlaceOrderRequest, Side, RUB};
use toy_exchange::services::matching::Matcher;
use toy_exchange::store::MemoryStore;

const TICKER: &str = "XYZ";

fn net_deposits_rub(deposits: &[(usize, i64)]) -> Decimal {
    deposits.iter().map(|(_, amt)| Decimal::from(*amt)).sum()
}

/// Outstanding reservation for `ticker`: remaining*price for resting
/// BUY+LIMIT orders (RUB leg) plus remaining for resting SELL orders (asset
/// leg), matching the ledger accounting in `Matcher::place`.
fn outstanding_reservation(matcher: &Matcher, ticker: &str) -> (Decimal, Decimal) {
    let mut rub_reserved = Decimal::ZERO;
    let mut asset_reserved = Decimal::ZERO;
    for order in matcher.all_orders() {
        if order.ticker != ticker || order.order_type != OrderType::Limit || !order.status.is_restable() {
            continue;
        }
        match order.side {
            Side::Buy => rub_reserved += order.remaining() * order.price.unwrap(),
            Side::Sell => asset_reserved += order.remaining(),
        }
    }
    (rub_reserved, asset_reserved)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn conservation_holds_under_concurrent_placement(
        seed_deposits in prop::collection::vec((0usize..4, 1i64..500), 1..6),
        orders in prop::collection::vec(
            (0usize..4, any::<bool>(), 1i64..20, prop::option::of(1i64..100)),
            0..30,
        ),
    ) -> Result<(), TestCaseError> {
        let rt = Runtime::new().unwrap();
        rt.block_on(async move {
            let matcher = Arc::new(Matcher::new(Arc::new(MemoryStore::new())));
            matcher.add_instrument(TICKER, "XYZ Corp").unwrap();

            let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

            for (idx, amount) in &seed_deposits {
                matcher.deposit(users[*idx], RUB, Decimal::from(*amount)).unwrap();
                matcher.deposit(users[*idx], TICKER, Decimal::from(*amount)).unwrap();
            }

            let mut handles = Vec::new();
            for (idx, is_buy, qty, price) in orders {
                let matcher = matcher.clone();
                let user = users[idx];
                let req = PlaceOrderRequest {
                    direction: if is_buy { Side::Buy } else { Side::Sell },
                    ticker: TICKER.to_string(),
                    qty: Decimal::from(qty),
                    price: price.map(Decimal::from),
                };
                handles.push(tokio::spawn(async move {
                    let _ = matcher.place(user, req).await;
                }));
            }
            for h in handles {
                let _ = h.await;
            }

            // Non-negativity: every free balance the matcher reports must be >= 0.
            for user in &users {
                for ticker in [RUB, TICKER] {
                    prop_assert!(matcher.balance(*user, ticker) >= Decimal::ZERO);
                }
            }

            // Conservation: free RUB + outstanding RUB reservations equals the
            // RUB ever deposited (no admin withdrawals in this test, no fees).
            let (rub_reserved, asset_reserved) = outstanding_reservation(&matcher, TICKER);
            let free_rub = matcher.total_free_balance(RUB);
            let free_asset = matcher.total_free_balance(TICKER);

            prop_assert_eq!(free_rub + rub_reserved, net_deposits_rub(&seed_deposits));
            prop_assert_eq!(
                free_asset + asset_reserved,
                net_deposits_rub(&seed_deposits)
            );
            Ok(())
        })
    }
}
