use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::entities::coupon_usage_log::{self, UsageAction};

/// Client metadata attached to audit entries by the boundary layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Append-only audit trail of coupon validate/apply attempts.
///
/// Auditing must never fail the operation being audited: write failures
/// are logged and swallowed.
#[derive(Debug, Clone)]
pub struct UsageLogService {
    db: Arc<DatabaseConnection>,
}

impl UsageLogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn record_attempt(
        &self,
        code: &str,
        user_id: Option<i32>,
        action: UsageAction,
        success: bool,
        error_message: Option<String>,
        client: &ClientMeta,
    ) {
        let entry = coupon_usage_log::ActiveModel {
            coupon_code: Set(code.to_string()),
            user_id: Set(user_id),
            action: Set(action),
            success: Set(success),
            error_message: Set(error_message),
            ip_address: Set(client.ip_address.clone()),
            user_agent: Set(client.user_agent.clone()),
            ..Default::default()
        };

        if let Err(err) = entry.insert(&*self.db).await {
            warn!("Failed to write coupon usage log entry: {}", err);
        }
    }
}
