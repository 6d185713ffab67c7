use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::entities::coupon::Model as CouponModel;
use crate::errors::ServiceError;
use crate::repositories::coupon_repository::CouponRepository;
use crate::repositories::product_repository::ProductRepository;
use crate::services::discounts::{self, CartItemInput, DiscountBreakdown, DiscountRule};

pub const MSG_NOT_FOUND: &str = "Coupon code not found or inactive";
pub const MSG_EXPIRED: &str = "Coupon has expired or reached usage limit";
pub const MSG_MAX_USES: &str = "You have already used this coupon the maximum number of times";
pub const MSG_NOT_APPLICABLE: &str = "This coupon is not applicable to the items in your cart";

/// Outcome of an eligibility check.
#[derive(Debug, Clone)]
pub enum Eligibility {
    Eligible(EligibleCoupon),
    Ineligible { message: String },
}

/// An eligible coupon together with everything the apply path needs:
/// the computed breakdown is carried forward so application never
/// re-derives the discount from scratch.
#[derive(Debug, Clone)]
pub struct EligibleCoupon {
    pub coupon: CouponModel,
    pub cart_total: Decimal,
    /// `None` in code-only validation mode (no cart supplied).
    pub breakdown: Option<DiscountBreakdown>,
}

/// Decides whether a coupon can be used right now, by this user, for
/// this cart. Checks run in a fixed order and stop at the first failure.
#[derive(Debug, Clone)]
pub struct EligibilityChecker {
    coupons: CouponRepository,
    products: ProductRepository,
}

impl EligibilityChecker {
    pub fn new(coupons: CouponRepository, products: ProductRepository) -> Self {
        Self { coupons, products }
    }

    /// Runs the full check chain for a normalized coupon code.
    #[instrument(skip(self, cart_items))]
    pub async fn check(
        &self,
        code: &str,
        user_id: Option<i32>,
        cart_items: &[CartItemInput],
    ) -> Result<Eligibility, ServiceError> {
        let Some(coupon) = self.coupons.find_active_by_code(code).await? else {
            return Ok(ineligible(MSG_NOT_FOUND));
        };

        if !self.coupons.is_coupon_valid(&coupon).await? {
            return Ok(ineligible(MSG_EXPIRED));
        }

        if let Some(user_id) = user_id {
            if !self.coupons.can_user_use(&coupon, user_id).await? {
                return Ok(ineligible(MSG_MAX_USES));
            }
        }

        // Code-only validation: no cart to price against.
        if cart_items.is_empty() {
            return Ok(Eligibility::Eligible(EligibleCoupon {
                coupon,
                cart_total: Decimal::ZERO,
                breakdown: None,
            }));
        }

        let cart_total = discounts::cart_total(cart_items);

        if let Some(min_purchase) = coupon.min_purchase_amount {
            if cart_total < min_purchase {
                return Ok(ineligible(format!(
                    "Minimum purchase amount of ${:.2} required",
                    min_purchase
                )));
            }
        }

        let applicable_items = self.applicable_items(&coupon, cart_items).await?;

        if coupon.has_restrictions() && applicable_items.is_empty() {
            return Ok(ineligible(MSG_NOT_APPLICABLE));
        }

        let breakdown = discounts::compute(&DiscountRule::from(&coupon), cart_total, &applicable_items);
        debug!(
            "Coupon {} eligible: cart total {}, discount {}",
            coupon.code,
            cart_total,
            breakdown.amount()
        );

        Ok(Eligibility::Eligible(EligibleCoupon {
            coupon,
            cart_total,
            breakdown: Some(breakdown),
        }))
    }

    /// Cart lines the coupon applies to: lines whose product resolves in
    /// the catalog and satisfies a restriction set, or every resolvable
    /// line when the coupon is unrestricted. Lines without a product id
    /// or with an unknown product never match.
    async fn applicable_items(
        &self,
        coupon: &CouponModel,
        cart_items: &[CartItemInput],
    ) -> Result<Vec<CartItemInput>, ServiceError> {
        let restrictions = coupon.restrictions();
        let mut applicable = Vec::new();

        for item in cart_items {
            let Some(product_id) = item.product_id else {
                continue;
            };
            let Some(product) = self.products.find_by_id(product_id).await? else {
                continue;
            };

            if restrictions.is_empty() || restrictions.matches(&product) {
                applicable.push(item.clone());
            }
        }

        Ok(applicable)
    }
}

fn ineligible(message: impl Into<String>) -> Eligibility {
    Eligibility::Ineligible {
        message: message.into(),
    }
}
