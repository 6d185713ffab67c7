use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// Coupon redemption entity
///
/// One row per successful `apply`. Rows are created already marked used
/// and are never mutated afterwards; a coupon's usage count is derived by
/// counting them.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupon_redemptions")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Redeemed coupon
    pub coupon_id: i32,

    /// Redeeming user
    pub user_id: i32,

    /// External order reference
    pub order_id: String,

    /// Discount granted on this order
    pub discount_applied: Decimal,

    /// Order amount before the discount
    pub original_amount: Decimal,

    /// Order amount after the discount, floored at zero
    pub final_amount: Decimal,

    /// Whether the redemption counts against usage limits
    pub is_used: bool,

    /// When the coupon was used
    pub used_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::coupon::Entity",
        from = "Column::CouponId",
        to = "super::coupon::Column::Id"
    )]
    Coupon,
}

impl Related<super::coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coupon.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.is_used {
                active_model.is_used = Set(false);
            }

            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        }

        Ok(active_model)
    }
}
