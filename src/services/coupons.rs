use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};

use crate::entities::coupon::{CouponType, Model as CouponModel};
use crate::entities::coupon_usage_log::UsageAction;
use crate::entities::product::{ProductCategory, ThemeType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::coupon_repository::{CouponAnalytics, CouponRepository};
use crate::repositories::product_repository::ProductRepository;
use crate::services::discounts::{CartItemInput, DiscountBreakdown};
use crate::services::eligibility::{Eligibility, EligibilityChecker};
use crate::services::redemptions::{RedemptionHistoryEntry, RedemptionService};
use crate::services::usage_log::{ClientMeta, UsageLogService};

const MSG_CODE_REQUIRED: &str = "Coupon code is required";
const MSG_MISSING_FIELDS: &str = "Missing required fields";
const MSG_VALID: &str = "Coupon is valid";
const MSG_VALID_APPLICABLE: &str = "Coupon is valid and applicable";
const MSG_APPLIED: &str = "Coupon applied successfully";
const MSG_VALIDATE_ERROR: &str = "Error validating coupon";
const MSG_APPLY_ERROR: &str = "Error applying coupon";

/// Input to [`CouponService::validate_coupon`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidateCouponInput {
    pub code: String,
    pub user_id: Option<i32>,
    #[serde(default)]
    pub cart_items: Vec<CartItemInput>,
    #[serde(default)]
    pub client: ClientMeta,
}

/// Input to [`CouponService::apply_coupon`].
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyCouponInput {
    pub code: String,
    pub user_id: i32,
    pub order_id: String,
    #[serde(default)]
    pub cart_items: Vec<CartItemInput>,
    pub original_amount: Decimal,
    #[serde(default)]
    pub client: ClientMeta,
}

/// Coupon fields exposed to callers in validation/application payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponSummary {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub coupon_type: CouponType,
    pub discount_value: Option<Decimal>,
    pub min_purchase_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub valid_until: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub usage_limit: Option<i32>,
}

/// Outcome of `validate`: business-rule failures land here as
/// `valid: false` with a user-presentable message, never as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<DiscountBreakdown>,
    pub message: String,
}

impl ValidationResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            coupon: None,
            discount: None,
            message: message.into(),
        }
    }
}

/// Outcome of `apply`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_applied: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_details: Option<CouponSummary>,
    pub message: String,
}

impl ApplicationResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            redemption_id: None,
            discount_applied: None,
            original_amount: None,
            final_amount: None,
            coupon_details: None,
            message: message.into(),
        }
    }
}

/// The coupon engine's public surface: `validate` and `apply`.
///
/// `apply` always re-runs validation and consumes the breakdown that
/// validation computed, so the eligibility gate and the charged amount
/// can never disagree within one call. There is no reservation step
/// between the eligibility read and the redemption write, so concurrent
/// applications of the same coupon can exceed its usage limit.
#[derive(Debug, Clone)]
pub struct CouponService {
    repository: CouponRepository,
    eligibility: EligibilityChecker,
    redemptions: RedemptionService,
    usage_logs: UsageLogService,
    event_sender: Arc<EventSender>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        let repository = CouponRepository::new(db.clone());
        let products = ProductRepository::new(db.clone());
        Self {
            eligibility: EligibilityChecker::new(repository.clone(), products),
            repository,
            redemptions: RedemptionService::new(db.clone()),
            usage_logs: UsageLogService::new(db),
            event_sender,
        }
    }

    /// Codes are matched case-insensitively and ignore surrounding
    /// whitespace.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Validates a coupon code for an optional user and cart.
    ///
    /// With an empty cart this is code-only validation: the result
    /// carries the coupon summary but no discount. Business-rule and
    /// infrastructure failures alike come back as `valid: false`;
    /// infrastructure causes are logged, not surfaced.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn validate_coupon(&self, input: ValidateCouponInput) -> ValidationResult {
        let code = Self::normalize_code(&input.code);

        let result = match self.validate_inner(&code, input.user_id, &input.cart_items).await {
            Ok(result) => result,
            Err(err) => {
                error!("Coupon validation failed unexpectedly: {}", err);
                ValidationResult::failure(MSG_VALIDATE_ERROR)
            }
        };

        self.usage_logs
            .record_attempt(
                &code,
                input.user_id,
                UsageAction::Validate,
                result.valid,
                (!result.valid).then(|| result.message.clone()),
                &input.client,
            )
            .await;

        match (result.valid, &result.coupon) {
            (true, Some(summary)) => {
                self.event_sender
                    .send_or_log(Event::CouponValidated {
                        coupon_id: summary.id,
                        user_id: input.user_id,
                    })
                    .await;
            }
            _ => {
                self.event_sender
                    .send_or_log(Event::CouponRejected {
                        code: code.clone(),
                        user_id: input.user_id,
                        reason: result.message.clone(),
                    })
                    .await;
            }
        }

        result
    }

    async fn validate_inner(
        &self,
        code: &str,
        user_id: Option<i32>,
        cart_items: &[CartItemInput],
    ) -> Result<ValidationResult, ServiceError> {
        if code.is_empty() {
            return Ok(ValidationResult::failure(MSG_CODE_REQUIRED));
        }

        match self.eligibility.check(code, user_id, cart_items).await? {
            Eligibility::Ineligible { message } => Ok(ValidationResult::failure(message)),
            Eligibility::Eligible(eligible) => {
                let summary = self.coupon_summary(&eligible.coupon).await?;
                let message = if eligible.breakdown.is_some() {
                    MSG_VALID_APPLICABLE
                } else {
                    MSG_VALID
                };
                Ok(ValidationResult {
                    valid: true,
                    coupon: Some(summary),
                    discount: eligible.breakdown,
                    message: message.to_string(),
                })
            }
        }
    }

    /// Applies a coupon to an order, recording a redemption on success.
    ///
    /// Requires every input to be present; re-validates the code with
    /// the same cart and charges the discount the validation pass
    /// computed. Validation failures propagate with their message
    /// unchanged; a persistence failure during recording rolls back and
    /// surfaces as a generic failure.
    #[instrument(skip(self, input), fields(code = %input.code, order_id = %input.order_id))]
    pub async fn apply_coupon(&self, input: ApplyCouponInput) -> ApplicationResult {
        let code = Self::normalize_code(&input.code);

        let result = match self.apply_inner(&code, &input).await {
            Ok(result) => result,
            Err(err) => {
                error!("Coupon application failed unexpectedly: {}", err);
                ApplicationResult::failure(MSG_APPLY_ERROR)
            }
        };

        self.usage_logs
            .record_attempt(
                &code,
                Some(input.user_id),
                UsageAction::Apply,
                result.success,
                (!result.success).then(|| result.message.clone()),
                &input.client,
            )
            .await;

        match (result.success, &result.coupon_details, result.redemption_id) {
            (true, Some(summary), Some(redemption_id)) => {
                self.event_sender
                    .send_or_log(Event::CouponApplied {
                        coupon_id: summary.id,
                        redemption_id,
                        user_id: input.user_id,
                        order_id: input.order_id.clone(),
                    })
                    .await;
            }
            _ => {
                self.event_sender
                    .send_or_log(Event::CouponRejected {
                        code: code.clone(),
                        user_id: Some(input.user_id),
                        reason: result.message.clone(),
                    })
                    .await;
            }
        }

        result
    }

    async fn apply_inner(
        &self,
        code: &str,
        input: &ApplyCouponInput,
    ) -> Result<ApplicationResult, ServiceError> {
        if code.is_empty()
            || input.order_id.trim().is_empty()
            || input.cart_items.is_empty()
            || input.original_amount.is_zero()
        {
            return Ok(ApplicationResult::failure(MSG_MISSING_FIELDS));
        }

        let eligible = match self
            .eligibility
            .check(code, Some(input.user_id), &input.cart_items)
            .await?
        {
            Eligibility::Ineligible { message } => {
                return Ok(ApplicationResult::failure(message));
            }
            Eligibility::Eligible(eligible) => eligible,
        };

        // The summary reflects the usage count the eligibility gate saw,
        // not the count after this redemption.
        let summary = self.coupon_summary(&eligible.coupon).await?;

        let breakdown = eligible.breakdown.as_ref().ok_or_else(|| {
            ServiceError::InternalError(
                "discount breakdown missing for a non-empty cart".to_string(),
            )
        })?;
        let discount_amount = breakdown.amount();

        let redemption = self
            .redemptions
            .record(
                &eligible.coupon,
                input.user_id,
                &input.order_id,
                discount_amount,
                input.original_amount,
            )
            .await?;

        Ok(ApplicationResult {
            success: true,
            redemption_id: Some(redemption.id),
            discount_applied: Some(redemption.discount_applied),
            original_amount: Some(redemption.original_amount),
            final_amount: Some(redemption.final_amount),
            coupon_details: Some(summary),
            message: MSG_APPLIED.to_string(),
        })
    }

    async fn coupon_summary(&self, coupon: &CouponModel) -> Result<CouponSummary, ServiceError> {
        let usage_count = self.repository.usage_count(coupon.id).await?;
        Ok(CouponSummary {
            id: coupon.id,
            code: coupon.code.clone(),
            name: coupon.name.clone(),
            description: coupon.description.clone(),
            coupon_type: coupon.coupon_type,
            discount_value: coupon.discount_value,
            min_purchase_amount: coupon.min_purchase_amount,
            max_discount_amount: coupon.max_discount_amount,
            valid_until: coupon.valid_until,
            usage_count,
            usage_limit: coupon.usage_limit,
        })
    }

    /// Coupons currently available to shoppers, optionally filtered by
    /// theme/category restriction membership.
    pub async fn list_available_coupons(
        &self,
        theme: Option<ThemeType>,
        category: Option<ProductCategory>,
    ) -> Result<Vec<CouponModel>, ServiceError> {
        self.repository.list_available(theme, category).await
    }

    /// Aggregate usage statistics.
    pub async fn usage_analytics(&self) -> Result<CouponAnalytics, ServiceError> {
        self.repository.usage_analytics().await
    }

    /// A user's redemption history, newest first.
    pub async fn user_history(
        &self,
        user_id: i32,
    ) -> Result<Vec<RedemptionHistoryEntry>, ServiceError> {
        self.redemptions.user_history(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_normalize_to_trimmed_uppercase() {
        assert_eq!(CouponService::normalize_code("  bts20off "), "BTS20OFF");
        assert_eq!(CouponService::normalize_code("FREESHIP"), "FREESHIP");
        assert_eq!(CouponService::normalize_code(" "), "");
    }
}
