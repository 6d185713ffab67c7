mod common;

use chrono::Utc;
use common::*;
use rust_decimal_macros::dec;
use sea_orm::ActiveValue::Set;
use serde_json::json;

use coupon_api::{
    entities::{
        coupon::CouponType,
        coupon_usage_log::UsageAction,
        product::{ProductCategory, ThemeType},
    },
    services::coupons::{ApplyCouponInput, ValidateCouponInput},
};

fn apply_input(code: &str, user_id: i32, order_id: &str) -> ApplyCouponInput {
    ApplyCouponInput {
        code: code.to_string(),
        user_id,
        order_id: order_id.to_string(),
        cart_items: Vec::new(),
        original_amount: dec!(0),
        client: Default::default(),
    }
}

#[tokio::test]
async fn applying_a_coupon_records_a_redemption() {
    let app = TestApp::new().await;
    let poster_id = seed_product(&app, ThemeType::Bts, ProductCategory::Poster, dec!(1500)).await;

    let mut coupon = coupon_defaults("BTS20OFF", CouponType::Percentage);
    coupon.discount_value = Set(Some(dec!(20)));
    coupon.min_purchase_amount = Set(Some(dec!(2000)));
    coupon.max_discount_amount = Set(Some(dec!(4000)));
    coupon.usage_limit = Set(Some(100));
    coupon.usage_limit_per_user = Set(2);
    coupon.applicable_themes = Set(Some(json!(["BTS"])));
    seed_coupon(&app, coupon).await;

    let mut input = apply_input("BTS20OFF", 7, "ORD-1001");
    input.cart_items = vec![cart_item(poster_id, 2, dec!(1500))];
    input.original_amount = dec!(3000);

    let result = app.state.coupons.apply_coupon(input).await;

    assert!(result.success, "unexpected failure: {}", result.message);
    assert_eq!(result.message, "Coupon applied successfully");
    assert!(result.redemption_id.is_some());
    assert_eq!(result.discount_applied, Some(dec!(600)));
    assert_eq!(result.original_amount, Some(dec!(3000)));
    assert_eq!(result.final_amount, Some(dec!(2400)));

    // The summary reflects the usage count seen by the eligibility gate,
    // before this redemption was written.
    let details = result.coupon_details.expect("coupon details missing");
    assert_eq!(details.usage_count, 0);
}

#[tokio::test]
async fn usage_count_is_visible_to_the_next_validation() {
    let app = TestApp::new().await;
    let poster_id = seed_product(&app, ThemeType::Bts, ProductCategory::Poster, dec!(1500)).await;

    let mut coupon = coupon_defaults("BTS20OFF", CouponType::Percentage);
    coupon.discount_value = Set(Some(dec!(20)));
    coupon.usage_limit_per_user = Set(2);
    seed_coupon(&app, coupon).await;

    let mut input = apply_input("BTS20OFF", 7, "ORD-1002");
    input.cart_items = vec![cart_item(poster_id, 2, dec!(1500))];
    input.original_amount = dec!(3000);
    let applied = app.state.coupons.apply_coupon(input).await;
    assert!(applied.success, "unexpected failure: {}", applied.message);

    let revalidated = app
        .state
        .coupons
        .validate_coupon(ValidateCouponInput {
            code: "BTS20OFF".to_string(),
            user_id: Some(7),
            ..Default::default()
        })
        .await;

    assert!(revalidated.valid);
    assert_eq!(
        revalidated.coupon.expect("summary missing").usage_count,
        1
    );
}

#[tokio::test]
async fn per_user_limit_blocks_a_second_application() {
    let app = TestApp::new().await;
    let sticker_id =
        seed_product(&app, ThemeType::Anime, ProductCategory::Sticker, dec!(500)).await;

    let mut coupon = coupon_defaults("ONCEEACH", CouponType::FixedAmount);
    coupon.discount_value = Set(Some(dec!(100)));
    coupon.usage_limit_per_user = Set(1);
    seed_coupon(&app, coupon).await;

    let mut first = apply_input("ONCEEACH", 7, "ORD-2001");
    first.cart_items = vec![cart_item(sticker_id, 1, dec!(500))];
    first.original_amount = dec!(500);
    assert!(app.state.coupons.apply_coupon(first).await.success);

    let mut second = apply_input("ONCEEACH", 7, "ORD-2002");
    second.cart_items = vec![cart_item(sticker_id, 1, dec!(500))];
    second.original_amount = dec!(500);
    let result = app.state.coupons.apply_coupon(second).await;

    assert!(!result.success);
    assert_eq!(
        result.message,
        "You have already used this coupon the maximum number of times"
    );
    assert!(result.redemption_id.is_none());
}

#[tokio::test]
async fn total_usage_limit_blocks_across_users() {
    let app = TestApp::new().await;
    let sticker_id =
        seed_product(&app, ThemeType::Anime, ProductCategory::Sticker, dec!(500)).await;

    let mut coupon = coupon_defaults("ONEONLY", CouponType::FixedAmount);
    coupon.discount_value = Set(Some(dec!(100)));
    coupon.usage_limit = Set(Some(1));
    seed_coupon(&app, coupon).await;

    let mut first = apply_input("ONEONLY", 1, "ORD-3001");
    first.cart_items = vec![cart_item(sticker_id, 1, dec!(500))];
    first.original_amount = dec!(500);
    assert!(app.state.coupons.apply_coupon(first).await.success);

    let mut second = apply_input("ONEONLY", 2, "ORD-3002");
    second.cart_items = vec![cart_item(sticker_id, 1, dec!(500))];
    second.original_amount = dec!(500);
    let result = app.state.coupons.apply_coupon(second).await;

    assert!(!result.success);
    assert_eq!(result.message, "Coupon has expired or reached usage limit");
}

#[tokio::test]
async fn missing_inputs_fail_before_validation() {
    let app = TestApp::new().await;
    let sticker_id =
        seed_product(&app, ThemeType::Anime, ProductCategory::Sticker, dec!(500)).await;

    let mut coupon = coupon_defaults("PRESENT", CouponType::FixedAmount);
    coupon.discount_value = Set(Some(dec!(100)));
    seed_coupon(&app, coupon).await;

    // Blank order id.
    let mut no_order = apply_input("PRESENT", 1, "  ");
    no_order.cart_items = vec![cart_item(sticker_id, 1, dec!(500))];
    no_order.original_amount = dec!(500);
    let result = app.state.coupons.apply_coupon(no_order).await;
    assert!(!result.success);
    assert_eq!(result.message, "Missing required fields");

    // Empty cart.
    let mut no_cart = apply_input("PRESENT", 1, "ORD-4001");
    no_cart.original_amount = dec!(500);
    let result = app.state.coupons.apply_coupon(no_cart).await;
    assert!(!result.success);
    assert_eq!(result.message, "Missing required fields");

    // Zero original amount.
    let mut no_amount = apply_input("PRESENT", 1, "ORD-4002");
    no_amount.cart_items = vec![cart_item(sticker_id, 1, dec!(500))];
    let result = app.state.coupons.apply_coupon(no_amount).await;
    assert!(!result.success);
    assert_eq!(result.message, "Missing required fields");

    // Nothing was recorded for any of them.
    assert_eq!(usage_log_count(&app, Some(UsageAction::Apply)).await, 3);
    let history = app
        .state
        .coupons
        .user_history(1)
        .await
        .expect("history query failed");
    assert!(history.is_empty());
}

#[tokio::test]
async fn final_amount_never_goes_below_zero() {
    let app = TestApp::new().await;
    let sticker_id =
        seed_product(&app, ThemeType::Anime, ProductCategory::Sticker, dec!(1000)).await;

    let mut coupon = coupon_defaults("BIGCUT", CouponType::FixedAmount);
    coupon.discount_value = Set(Some(dec!(800)));
    seed_coupon(&app, coupon).await;

    // The caller declares an original amount smaller than the cart total
    // the discount was computed from.
    let mut input = apply_input("BIGCUT", 3, "ORD-5001");
    input.cart_items = vec![cart_item(sticker_id, 1, dec!(1000))];
    input.original_amount = dec!(500);

    let result = app.state.coupons.apply_coupon(input).await;

    assert!(result.success, "unexpected failure: {}", result.message);
    assert_eq!(result.discount_applied, Some(dec!(800)));
    assert_eq!(result.final_amount, Some(dec!(0)));
}

#[tokio::test]
async fn apply_failures_propagate_the_validation_message() {
    let app = TestApp::new().await;
    let poster_id = seed_product(&app, ThemeType::Anime, ProductCategory::Poster, dec!(2000)).await;

    let mut coupon = coupon_defaults("ARMYLOVE", CouponType::FixedAmount);
    coupon.discount_value = Set(Some(dec!(800)));
    coupon.applicable_themes = Set(Some(json!(["BTS"])));
    coupon.applicable_categories = Set(Some(json!(["KEYCHAIN", "ACCESSORIES"])));
    seed_coupon(&app, coupon).await;

    let mut input = apply_input("ARMYLOVE", 1, "ORD-6001");
    input.cart_items = vec![cart_item(poster_id, 1, dec!(2000))];
    input.original_amount = dec!(2000);

    let result = app.state.coupons.apply_coupon(input).await;

    assert!(!result.success);
    assert_eq!(
        result.message,
        "This coupon is not applicable to the items in your cart"
    );
}

#[tokio::test]
async fn user_history_lists_redemptions_newest_first() {
    let app = TestApp::new().await;
    let sticker_id =
        seed_product(&app, ThemeType::Anime, ProductCategory::Sticker, dec!(500)).await;

    let mut coupon = coupon_defaults("REPEAT", CouponType::FixedAmount);
    coupon.discount_value = Set(Some(dec!(50)));
    coupon.usage_limit_per_user = Set(5);
    seed_coupon(&app, coupon).await;

    for order in ["ORD-7001", "ORD-7002"] {
        let mut input = apply_input("REPEAT", 9, order);
        input.cart_items = vec![cart_item(sticker_id, 1, dec!(500))];
        input.original_amount = dec!(500);
        assert!(app.state.coupons.apply_coupon(input).await.success);
    }

    let history = app
        .state
        .coupons
        .user_history(9)
        .await
        .expect("history query failed");

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].coupon_code, "REPEAT");
    assert_eq!(history[0].discount_applied, dec!(50));
    assert_eq!(history[0].final_amount, dec!(450));
    assert!(history.iter().all(|entry| entry.is_used));
    assert!(history.iter().all(|entry| entry.used_at.is_some()));
    assert!(history
        .iter()
        .all(|entry| entry.created_at <= Utc::now()));
}

#[tokio::test]
async fn analytics_aggregate_redemptions() {
    let app = TestApp::new().await;
    let sticker_id =
        seed_product(&app, ThemeType::Anime, ProductCategory::Sticker, dec!(500)).await;

    let mut popular = coupon_defaults("POPULAR", CouponType::FixedAmount);
    popular.discount_value = Set(Some(dec!(50)));
    popular.usage_limit_per_user = Set(5);
    seed_coupon(&app, popular).await;

    let mut idle = coupon_defaults("IDLE", CouponType::Percentage);
    idle.discount_value = Set(Some(dec!(10)));
    idle.is_active = Set(false);
    seed_coupon(&app, idle).await;

    for (user, order) in [(1, "ORD-8001"), (2, "ORD-8002")] {
        let mut input = apply_input("POPULAR", user, order);
        input.cart_items = vec![cart_item(sticker_id, 1, dec!(500))];
        input.original_amount = dec!(500);
        assert!(app.state.coupons.apply_coupon(input).await.success);
    }

    let analytics = app
        .state
        .coupons
        .usage_analytics()
        .await
        .expect("analytics query failed");

    assert_eq!(analytics.total_coupons, 2);
    assert_eq!(analytics.active_coupons, 1);
    assert_eq!(analytics.total_redemptions, 2);
    assert_eq!(analytics.most_used_coupons.len(), 1);
    assert_eq!(analytics.most_used_coupons[0].code, "POPULAR");
    assert_eq!(analytics.most_used_coupons[0].usage_count, 2);
}
