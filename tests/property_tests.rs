//! Property-based tests for the discount calculator.
//!
//! These tests use proptest to verify invariants across a wide range of
//! inputs, helping to catch edge cases that unit tests might miss. The
//! calculator is a pure function, so no database is involved.

use proptest::prelude::*;
use rust_decimal::Decimal;

use coupon_api::services::discounts::{compute, CartItemInput, DiscountRule};

// Strategies for generating test data
fn money_strategy() -> impl Strategy<Value = Decimal> {
    // Amounts up to 1,000,000.00 with two decimal places.
    (0i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn percent_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=100).prop_map(Decimal::from)
}

fn quantity_strategy() -> impl Strategy<Value = i32> {
    0i32..100
}

fn item(quantity: i32, price: Decimal) -> CartItemInput {
    CartItemInput {
        product_id: Some(1),
        quantity,
        price,
    }
}

proptest! {
    #[test]
    fn percentage_discount_respects_cap_and_total(
        total in money_strategy(),
        percent in percent_strategy(),
        cap in money_strategy(),
    ) {
        let rule = DiscountRule::Percentage {
            percent,
            max_discount: Some(cap),
        };
        let amount = compute(&rule, total, &[]).amount();

        prop_assert!(amount >= Decimal::ZERO);
        prop_assert!(amount <= cap, "amount {} exceeds cap {}", amount, cap);
        prop_assert!(amount <= total, "amount {} exceeds total {}", amount, total);
    }

    #[test]
    fn fixed_discount_never_exceeds_cart_total(
        total in money_strategy(),
        value in money_strategy(),
    ) {
        let rule = DiscountRule::FixedAmount { amount: value };
        let amount = compute(&rule, total, &[]).amount();

        prop_assert!(amount >= Decimal::ZERO);
        prop_assert!(amount <= total);
        prop_assert!(amount <= value);
    }

    #[test]
    fn bogo_on_identical_items_frees_every_second_unit(
        quantity in quantity_strategy(),
        price in money_strategy(),
    ) {
        let items = [item(quantity, price)];
        let total = price * Decimal::from(quantity);
        let amount = compute(&DiscountRule::BuyOneGetOne, total, &items).amount();

        let expected = Decimal::from(quantity / 2) * price;
        prop_assert_eq!(amount, expected.round_dp(2));
        prop_assert!(amount <= total);
    }

    #[test]
    fn free_shipping_ignores_cart_contents(total in money_strategy()) {
        let amount = compute(&DiscountRule::FreeShipping, total, &[]).amount();
        prop_assert_eq!(amount, Decimal::new(10000, 2));
    }

    #[test]
    fn final_amount_formula_is_never_negative(
        total in money_strategy(),
        original in money_strategy(),
        value in money_strategy(),
    ) {
        let rule = DiscountRule::FixedAmount { amount: value };
        let discount = compute(&rule, total, &[]).amount();
        let final_amount = (original - discount).max(Decimal::ZERO);

        prop_assert!(final_amount >= Decimal::ZERO);
        prop_assert!(final_amount <= original);
    }

    #[test]
    fn hundred_percent_discounts_the_whole_cart(total in money_strategy()) {
        let rule = DiscountRule::Percentage {
            percent: Decimal::from(100),
            max_discount: None,
        };
        let amount = compute(&rule, total, &[]).amount();
        prop_assert_eq!(amount, total.round_dp(2));
    }
}
