//! Trade-model integration tests
//!
//! Balance conservation and split-order arithmetic, including the
//! property form: for any executed trade the two signed legs cancel
//! against the trade amounts exactly.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::ExchangeRate;
use domain_exchange::{SignedLegs, SplitOrder, TradeDirection};

proptest! {
    /// Balance conservation: balance_after - balance_before equals the
    /// signed trade amount on both legs, for any starting balances.
    #[test]
    fn signed_legs_conserve_balances(
        foreign_minor in 1i64..1_000_000_000i64,
        local_minor in 1i64..1_000_000_000i64,
        start_foreign in -1_000_000i64..1_000_000i64,
        start_local in -1_000_000i64..1_000_000i64,
        buy in proptest::bool::ANY,
    ) {
        let direction = if buy { TradeDirection::Buy } else { TradeDirection::Sell };
        let foreign_amount = Decimal::new(foreign_minor, 2);
        let local_amount = Decimal::new(local_minor, 2);
        let legs = SignedLegs::for_trade(direction, foreign_amount, local_amount).unwrap();

        let foreign_before = Decimal::new(start_foreign, 2);
        let local_before = Decimal::new(start_local, 2);
        let foreign_after = foreign_before + legs.foreign_delta;
        let local_after = local_before + legs.local_delta;

        // after - before - signed_amount = 0 on each leg
        prop_assert_eq!(foreign_after - foreign_before - legs.foreign_delta, Decimal::ZERO);
        prop_assert_eq!(local_after - local_before - legs.local_delta, Decimal::ZERO);

        // The legs always oppose
        prop_assert!(legs.foreign_delta.is_sign_positive() != legs.local_delta.is_sign_positive());

        // Magnitudes equal the unsigned trade amounts
        prop_assert_eq!(legs.foreign_delta.abs(), foreign_amount);
        prop_assert_eq!(legs.local_delta.abs(), local_amount);
    }

    /// Split totals equal the sum of their legs under any decomposition.
    #[test]
    fn split_order_conserves_totals(
        amounts in proptest::collection::vec(1i64..10_000_000i64, 1..6),
    ) {
        let rate = ExchangeRate::new(dec!(35.50)).unwrap();
        let parts: Vec<(Decimal, ExchangeRate)> = amounts
            .iter()
            .map(|minor| (Decimal::new(*minor, 2), rate))
            .collect();
        let order = SplitOrder::decompose(&parts).unwrap();

        let expected_foreign: Decimal = parts.iter().map(|(amount, _)| *amount).sum();
        prop_assert_eq!(order.total_foreign(), expected_foreign);

        let expected_local: Decimal = parts
            .iter()
            .map(|(amount, rate)| rate.convert(*amount))
            .sum();
        prop_assert_eq!(order.total_local(), expected_local);

        // Sequences number from 1 without gaps
        for (i, leg) in order.legs.iter().enumerate() {
            prop_assert_eq!(leg.group_sequence, (i + 1) as i32);
        }
    }
}

/// A buy followed by its reversal leaves both inventories where they
/// started.
#[test]
fn reversal_restores_inventory() {
    let buy = SignedLegs::for_trade(TradeDirection::Buy, dec!(1000), dec!(35500)).unwrap();
    let unwind = SignedLegs::for_trade(TradeDirection::Sell, dec!(1000), dec!(35500)).unwrap();

    assert_eq!(buy.foreign_delta + unwind.foreign_delta, Decimal::ZERO);
    assert_eq!(buy.local_delta + unwind.local_delta, Decimal::ZERO);
}
