use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::entities::coupon::{CouponType, Model as CouponModel};

/// Flat shipping cost discounted by free-shipping coupons. Real shipping
/// is not computed here; the storefront charges a flat rate.
pub const FREE_SHIPPING_COST: Decimal = dec!(100.00);

const BOGO_DESCRIPTION: &str = "Buy one get one free on applicable items";
const FREE_SHIPPING_DESCRIPTION: &str = "Free shipping";

/// A single cart line as supplied by the caller.
///
/// Prices are taken at face value: the engine computes totals and
/// discounts from what the caller sends rather than re-pricing items
/// from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemInput {
    #[serde(default)]
    pub product_id: Option<i32>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub price: Decimal,
}

fn default_quantity() -> i32 {
    1
}

/// Sum of price × quantity over the cart.
pub fn cart_total(items: &[CartItemInput]) -> Decimal {
    items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum()
}

/// A coupon's discount semantics, projected out of the flat row into a
/// closed variant per kind so each case carries only the fields it uses.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscountRule {
    Percentage {
        percent: Decimal,
        max_discount: Option<Decimal>,
    },
    FixedAmount {
        amount: Decimal,
    },
    FreeShipping,
    BuyOneGetOne,
}

impl From<&CouponModel> for DiscountRule {
    fn from(coupon: &CouponModel) -> Self {
        match coupon.coupon_type {
            CouponType::Percentage => DiscountRule::Percentage {
                percent: coupon.discount_value.unwrap_or_default(),
                max_discount: coupon.max_discount_amount,
            },
            CouponType::FixedAmount => DiscountRule::FixedAmount {
                amount: coupon.discount_value.unwrap_or_default(),
            },
            CouponType::FreeShipping => DiscountRule::FreeShipping,
            CouponType::BuyOneGetOne => DiscountRule::BuyOneGetOne,
        }
    }
}

/// Computed discount, tagged per coupon kind for the response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountBreakdown {
    Percentage {
        percentage: Decimal,
        discount_amount: Decimal,
        max_discount: Option<Decimal>,
    },
    FixedAmount {
        fixed_amount: Decimal,
        discount_amount: Decimal,
    },
    FreeShipping {
        discount_amount: Decimal,
        description: String,
    },
    BuyOneGetOne {
        discount_amount: Decimal,
        description: String,
    },
}

impl DiscountBreakdown {
    pub fn amount(&self) -> Decimal {
        match self {
            DiscountBreakdown::Percentage {
                discount_amount, ..
            }
            | DiscountBreakdown::FixedAmount {
                discount_amount, ..
            }
            | DiscountBreakdown::FreeShipping {
                discount_amount, ..
            }
            | DiscountBreakdown::BuyOneGetOne {
                discount_amount, ..
            } => *discount_amount,
        }
    }
}

/// Computes the discount for an eligible coupon.
///
/// `applicable_items` are the cart lines matching the coupon's
/// restriction sets (all resolvable lines when the coupon is
/// unrestricted); only BOGO uses them. Amounts are rounded to two
/// decimal places with banker's rounding and never go below zero;
/// percentage, fixed and BOGO discounts are additionally clamped to the
/// cart total. Free shipping is a flat amount independent of the cart.
pub fn compute(
    rule: &DiscountRule,
    cart_total: Decimal,
    applicable_items: &[CartItemInput],
) -> DiscountBreakdown {
    match rule {
        DiscountRule::Percentage {
            percent,
            max_discount,
        } => {
            let mut amount = cart_total * (*percent / dec!(100));
            if let Some(cap) = max_discount {
                amount = amount.min(*cap);
            }
            DiscountBreakdown::Percentage {
                percentage: *percent,
                discount_amount: clamp(amount, cart_total),
                max_discount: *max_discount,
            }
        }
        DiscountRule::FixedAmount { amount } => DiscountBreakdown::FixedAmount {
            fixed_amount: *amount,
            discount_amount: clamp((*amount).min(cart_total), cart_total),
        },
        DiscountRule::FreeShipping => DiscountBreakdown::FreeShipping {
            discount_amount: FREE_SHIPPING_COST,
            description: FREE_SHIPPING_DESCRIPTION.to_string(),
        },
        DiscountRule::BuyOneGetOne => {
            let mut amount = Decimal::ZERO;
            for item in applicable_items {
                // Every second unit of a line is free; lines pair with
                // themselves at their own price.
                let free_units = item.quantity / 2;
                amount += Decimal::from(free_units) * item.price;
            }
            DiscountBreakdown::BuyOneGetOne {
                discount_amount: clamp(amount, cart_total),
                description: BOGO_DESCRIPTION.to_string(),
            }
        }
    }
}

fn clamp(amount: Decimal, cart_total: Decimal) -> Decimal {
    amount.max(Decimal::ZERO).min(cart_total).round_dp(2)
}
