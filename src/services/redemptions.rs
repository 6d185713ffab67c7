use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::entities::coupon::{Entity as Coupon, Model as CouponModel};
use crate::entities::coupon_redemption::{
    self, Entity as CouponRedemption, Model as RedemptionModel,
};
use crate::errors::ServiceError;

/// One row of a user's redemption history, joined with its coupon.
#[derive(Debug, Clone, Serialize)]
pub struct RedemptionHistoryEntry {
    pub id: i32,
    pub coupon_code: String,
    pub coupon_name: String,
    pub order_id: String,
    pub discount_applied: Decimal,
    pub original_amount: Decimal,
    pub final_amount: Decimal,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Records redemptions and serves redemption history.
///
/// Redemption rows are immutable once written: they are inserted already
/// marked used, and the usage counts that gate future validations are
/// derived by counting them.
#[derive(Debug, Clone)]
pub struct RedemptionService {
    db: Arc<DatabaseConnection>,
}

impl RedemptionService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persists a redemption for a successful application.
    ///
    /// The row is written inside a transaction; a persistence failure
    /// rolls back fully, leaving no partial redemption visible. On
    /// commit the next usage-count query sees the new row.
    #[instrument(skip(self, coupon), fields(coupon_code = %coupon.code))]
    pub async fn record(
        &self,
        coupon: &CouponModel,
        user_id: i32,
        order_id: &str,
        discount_amount: Decimal,
        original_amount: Decimal,
    ) -> Result<RedemptionModel, ServiceError> {
        let final_amount = (original_amount - discount_amount).max(Decimal::ZERO);

        let txn = self.db.begin().await?;

        let redemption = coupon_redemption::ActiveModel {
            coupon_id: Set(coupon.id),
            user_id: Set(user_id),
            order_id: Set(order_id.to_string()),
            discount_applied: Set(discount_amount),
            original_amount: Set(original_amount),
            final_amount: Set(final_amount),
            is_used: Set(true),
            used_at: Set(Some(Utc::now())),
            ..Default::default()
        };

        let redemption = redemption.insert(&txn).await?;
        txn.commit().await?;

        info!(
            "Recorded redemption {} of coupon {} for user {} on order {}",
            redemption.id, coupon.code, user_id, order_id
        );

        Ok(redemption)
    }

    /// A user's redemptions, newest first, joined with coupon code and name.
    pub async fn user_history(
        &self,
        user_id: i32,
    ) -> Result<Vec<RedemptionHistoryEntry>, ServiceError> {
        let rows = CouponRedemption::find()
            .filter(coupon_redemption::Column::UserId.eq(user_id))
            .order_by_desc(coupon_redemption::Column::CreatedAt)
            .find_also_related(Coupon)
            .all(&*self.db)
            .await?;

        let history = rows
            .into_iter()
            .map(|(redemption, coupon)| {
                let (coupon_code, coupon_name) = coupon
                    .map(|c| (c.code, c.name))
                    .unwrap_or_default();
                RedemptionHistoryEntry {
                    id: redemption.id,
                    coupon_code,
                    coupon_name,
                    order_id: redemption.order_id,
                    discount_applied: redemption.discount_applied,
                    original_amount: redemption.original_amount,
                    final_amount: redemption.final_amount,
                    is_used: redemption.is_used,
                    used_at: redemption.used_at,
                    created_at: redemption.created_at,
                }
            })
            .collect();

        Ok(history)
    }
}
