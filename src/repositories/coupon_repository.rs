use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::entities::coupon::{self, Entity as Coupon, Model as CouponModel};
use crate::entities::coupon_redemption::{self, Entity as CouponRedemption};
use crate::entities::product::{ProductCategory, ThemeType};
use crate::errors::ServiceError;
use crate::repositories::{BaseRepository, Repository};

/// Aggregate usage statistics across all coupons.
#[derive(Debug, Clone, Serialize)]
pub struct CouponAnalytics {
    pub total_coupons: u64,
    pub active_coupons: u64,
    pub total_redemptions: u64,
    pub most_used_coupons: Vec<MostUsedCoupon>,
}

#[derive(Debug, Clone, Serialize, FromQueryResult)]
pub struct MostUsedCoupon {
    pub code: String,
    pub name: String,
    pub usage_count: i64,
}

/// Read-only access to coupon definitions and their redemption history.
///
/// Usage counts are derived aggregates (counts of used redemption rows)
/// rather than counter columns. All limit enforcement goes through
/// `usage_count`/`user_usage_count`, so an atomic-counter implementation
/// could replace the aggregation without touching the business rules.
/// Note that counting is not race-free: two concurrent appliers can both
/// observe a count under the limit before either inserts its redemption.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    base: BaseRepository,
}

impl CouponRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find an active coupon by its normalized code.
    pub async fn find_active_by_code(
        &self,
        code: &str,
    ) -> Result<Option<CouponModel>, ServiceError> {
        Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .filter(coupon::Column::IsActive.eq(true))
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::from)
    }

    /// Number of used redemptions recorded against a coupon.
    pub async fn usage_count(&self, coupon_id: i32) -> Result<u64, ServiceError> {
        CouponRedemption::find()
            .filter(coupon_redemption::Column::CouponId.eq(coupon_id))
            .filter(coupon_redemption::Column::IsUsed.eq(true))
            .count(self.base.get_db())
            .await
            .map_err(ServiceError::from)
    }

    /// Number of used redemptions a single user has recorded against a coupon.
    pub async fn user_usage_count(
        &self,
        coupon_id: i32,
        user_id: i32,
    ) -> Result<u64, ServiceError> {
        CouponRedemption::find()
            .filter(coupon_redemption::Column::CouponId.eq(coupon_id))
            .filter(coupon_redemption::Column::UserId.eq(user_id))
            .filter(coupon_redemption::Column::IsUsed.eq(true))
            .count(self.base.get_db())
            .await
            .map_err(ServiceError::from)
    }

    /// Whether a coupon is currently redeemable: active, inside its
    /// validity window, and under its total usage limit.
    pub async fn is_coupon_valid(&self, coupon: &CouponModel) -> Result<bool, ServiceError> {
        if !coupon.is_active || !coupon.is_within_window(Utc::now()) {
            return Ok(false);
        }

        if let Some(limit) = coupon.usage_limit {
            let used = self.usage_count(coupon.id).await?;
            if used >= limit as u64 {
                debug!("Coupon {} has reached its usage limit", coupon.code);
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Whether a user still has redemptions left for a coupon. Assumes
    /// coupon-level validity has already been checked.
    pub async fn can_user_use(
        &self,
        coupon: &CouponModel,
        user_id: i32,
    ) -> Result<bool, ServiceError> {
        let used = self.user_usage_count(coupon.id, user_id).await?;
        Ok(used < coupon.usage_limit_per_user as u64)
    }

    /// List coupons currently inside their validity window, optionally
    /// narrowed to those restricted to a theme and/or category. When a
    /// filter is given, coupons without that restriction are excluded,
    /// including fully unrestricted ones.
    pub async fn list_available(
        &self,
        theme: Option<ThemeType>,
        category: Option<ProductCategory>,
    ) -> Result<Vec<CouponModel>, ServiceError> {
        let now = Utc::now();

        let coupons = Coupon::find()
            .filter(coupon::Column::IsActive.eq(true))
            .filter(coupon::Column::ValidFrom.lte(now))
            .filter(
                Condition::any()
                    .add(coupon::Column::ValidUntil.is_null())
                    .add(coupon::Column::ValidUntil.gt(now)),
            )
            .order_by_asc(coupon::Column::Id)
            .all(self.base.get_db())
            .await?;

        if theme.is_none() && category.is_none() {
            return Ok(coupons);
        }

        let filtered = coupons
            .into_iter()
            .filter(|c| {
                let restrictions = c.restrictions();
                if let Some(theme) = theme {
                    if !restrictions.themes.contains(&theme) {
                        return false;
                    }
                }
                if let Some(category) = category {
                    if !restrictions.categories.contains(&category) {
                        return false;
                    }
                }
                true
            })
            .collect();

        Ok(filtered)
    }

    /// Usage statistics: coupon counts, total redemptions, and the ten
    /// most-redeemed coupons.
    pub async fn usage_analytics(&self) -> Result<CouponAnalytics, ServiceError> {
        let db = self.base.get_db();

        let total_coupons = Coupon::find().count(db).await?;
        let active_coupons = Coupon::find()
            .filter(coupon::Column::IsActive.eq(true))
            .count(db)
            .await?;
        let total_redemptions = CouponRedemption::find()
            .filter(coupon_redemption::Column::IsUsed.eq(true))
            .count(db)
            .await?;

        let redemption_count =
            Expr::col((coupon_redemption::Entity, coupon_redemption::Column::Id)).count();
        let most_used_coupons = CouponRedemption::find()
            .select_only()
            .column(coupon::Column::Code)
            .column(coupon::Column::Name)
            .column_as(redemption_count.clone(), "usage_count")
            .inner_join(Coupon)
            .filter(coupon_redemption::Column::IsUsed.eq(true))
            .group_by(coupon::Column::Id)
            .group_by(coupon::Column::Code)
            .group_by(coupon::Column::Name)
            .order_by(redemption_count, Order::Desc)
            .limit(10)
            .into_model::<MostUsedCoupon>()
            .all(db)
            .await?;

        Ok(CouponAnalytics {
            total_coupons,
            active_coupons,
            total_redemptions,
            most_used_coupons,
        })
    }
}
