use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use super::product::{ProductCategory, ThemeType};

/// Kind of discount a coupon grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum CouponType {
    #[sea_orm(string_value = "PERCENTAGE")]
    #[serde(rename = "PERCENTAGE")]
    Percentage,
    #[sea_orm(string_value = "FIXED_AMOUNT")]
    #[serde(rename = "FIXED_AMOUNT")]
    FixedAmount,
    #[sea_orm(string_value = "FREE_SHIPPING")]
    #[serde(rename = "FREE_SHIPPING")]
    FreeShipping,
    #[sea_orm(string_value = "BOGO")]
    #[serde(rename = "BOGO")]
    BuyOneGetOne,
}

/// Coupon entity
///
/// Codes are stored trimmed and upper-cased; lookups must normalize the
/// same way. The three `applicable_*` columns hold JSON arrays and are
/// OR-ed together: a cart item matching any one of them qualifies. A
/// coupon with all three empty applies to every product.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Unique coupon code (normalized upper-case)
    #[sea_orm(unique)]
    #[validate(length(
        min = 1,
        max = 50,
        message = "Coupon code must be between 1 and 50 characters"
    ))]
    pub code: String,

    /// Display name
    #[validate(length(
        min = 1,
        max = 200,
        message = "Coupon name must be between 1 and 200 characters"
    ))]
    pub name: String,

    /// Description shown to shoppers
    pub description: Option<String>,

    /// Kind of discount this coupon grants
    pub coupon_type: CouponType,

    /// Percentage points or currency amount depending on `coupon_type`;
    /// unused for free-shipping and BOGO coupons
    pub discount_value: Option<Decimal>,

    /// Minimum cart total required to redeem
    pub min_purchase_amount: Option<Decimal>,

    /// Cap on the computed discount (percentage coupons only)
    pub max_discount_amount: Option<Decimal>,

    /// Start of the validity window (inclusive)
    pub valid_from: DateTime<Utc>,

    /// End of the validity window; the coupon stays valid through this
    /// instant and expires after it
    pub valid_until: Option<DateTime<Utc>>,

    /// Total number of redemptions allowed across all users
    pub usage_limit: Option<i32>,

    /// Redemptions allowed per user
    pub usage_limit_per_user: i32,

    /// JSON array of theme names this coupon is restricted to
    pub applicable_themes: Option<Json>,

    /// JSON array of category names this coupon is restricted to
    pub applicable_categories: Option<Json>,

    /// JSON array of product ids this coupon is restricted to
    pub applicable_product_ids: Option<Json>,

    /// Is the coupon active
    pub is_active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::coupon_redemption::Entity")]
    Redemptions,
}

impl Related<super::coupon_redemption::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Redemptions.def()
    }
}

/// Parsed restriction sets of a coupon.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CouponRestrictions {
    pub themes: Vec<ThemeType>,
    pub categories: Vec<ProductCategory>,
    pub product_ids: Vec<i32>,
}

impl CouponRestrictions {
    /// A coupon with no restriction sets applies to every product.
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty() && self.categories.is_empty() && self.product_ids.is_empty()
    }

    /// Whether the given product satisfies any of the restriction sets.
    pub fn matches(&self, product: &super::product::Model) -> bool {
        self.product_ids.contains(&product.id)
            || self.themes.contains(&product.theme)
            || self.categories.contains(&product.category)
    }
}

impl Model {
    /// Parses the JSON restriction columns. Malformed entries are dropped
    /// rather than failing the whole validation.
    pub fn restrictions(&self) -> CouponRestrictions {
        CouponRestrictions {
            themes: parse_restriction(self.applicable_themes.as_ref(), &self.code, "themes"),
            categories: parse_restriction(
                self.applicable_categories.as_ref(),
                &self.code,
                "categories",
            ),
            product_ids: parse_restriction(
                self.applicable_product_ids.as_ref(),
                &self.code,
                "product ids",
            ),
        }
    }

    pub fn has_restrictions(&self) -> bool {
        !self.restrictions().is_empty()
    }

    /// Whether `now` falls inside the coupon's validity window. Usage
    /// limits are enforced separately, against the redemption history.
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        if now < self.valid_from {
            return false;
        }
        match self.valid_until {
            Some(until) => now <= until,
            None => true,
        }
    }
}

fn parse_restriction<T: serde::de::DeserializeOwned>(
    value: Option<&Json>,
    code: &str,
    what: &str,
) -> Vec<T> {
    match value {
        Some(json) => serde_json::from_value(json.clone()).unwrap_or_else(|err| {
            debug!("coupon {}: unparsable applicable {}: {}", code, what, err);
            Vec::new()
        }),
        None => Vec::new(),
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        // Codes are matched case-insensitively; normalize once at write time.
        if let ActiveValue::Set(code) = active_model.code.clone() {
            active_model.code = Set(code.trim().to_uppercase());
        }

        if insert {
            if let ActiveValue::NotSet = active_model.is_active {
                active_model.is_active = Set(true);
            }

            if let ActiveValue::NotSet = active_model.usage_limit_per_user {
                active_model.usage_limit_per_user = Set(1);
            }

            if let ActiveValue::NotSet = active_model.valid_from {
                active_model.valid_from = Set(Utc::now());
            }

            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        }

        Ok(active_model)
    }
}
