use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// Operation a usage-log row records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum UsageAction {
    #[sea_orm(string_value = "validate")]
    Validate,
    #[sea_orm(string_value = "apply")]
    Apply,
}

/// Coupon usage log entity
///
/// Append-only audit trail of validate/apply attempts. The code is kept
/// as a raw string rather than a foreign key so entries survive attempts
/// against codes that never resolved to a coupon. Never read back by the
/// engine.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupon_usage_logs")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Attempted coupon code, as normalized by the engine
    pub coupon_code: String,

    /// User making the attempt, when known
    pub user_id: Option<i32>,

    /// Which operation was attempted
    pub action: UsageAction,

    /// Whether the attempt succeeded
    pub success: bool,

    /// Failure message, for unsuccessful attempts
    pub error_message: Option<String>,

    /// Client IP address
    pub ip_address: Option<String>,

    /// Client user agent
    pub user_agent: Option<String>,

    /// When the attempt happened
    pub timestamp: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.timestamp {
                active_model.timestamp = Set(Utc::now());
            }
        }

        Ok(active_model)
    }
}
