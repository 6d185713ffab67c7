#![allow(dead_code)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectOptions, ConnectionTrait, Database, DbBackend,
    Schema,
};

use coupon_api::{
    config::AppConfig,
    entities::{
        coupon::{self, CouponType},
        coupon_redemption, coupon_usage_log,
        product::{self, ProductCategory, ThemeType},
    },
    events,
    services::discounts::CartItemInput,
    AppState,
};

/// Helper harness for spinning up an application state backed by an
/// in-memory SQLite database.
pub struct TestApp {
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        // A single connection keeps every query on the same in-memory
        // database instance.
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let db = Database::connect(options)
            .await
            .expect("failed to open in-memory database");

        let schema = Schema::new(DbBackend::Sqlite);
        let statements = vec![
            schema.create_table_from_entity(product::Entity),
            schema.create_table_from_entity(coupon::Entity),
            schema.create_table_from_entity(coupon_redemption::Entity),
            schema.create_table_from_entity(coupon_usage_log::Entity),
        ];
        for statement in statements {
            db.execute(db.get_database_backend().build(&statement))
                .await
                .expect("failed to create table");
        }

        let (event_sender, mut event_rx) = events::event_channel(64);
        let event_task = tokio::spawn(async move { while event_rx.recv().await.is_some() {} });

        let config = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        let state = AppState::new(db, config, event_sender);

        Self {
            state,
            _event_task: event_task,
        }
    }
}

/// Insert a product and return its generated id.
pub async fn seed_product(
    app: &TestApp,
    theme: ThemeType,
    category: ProductCategory,
    price: Decimal,
) -> i32 {
    let product = product::ActiveModel {
        name: Set(format!("Test {:?} ({:?})", category, theme)),
        category: Set(category),
        theme: Set(theme),
        price: Set(price),
        ..Default::default()
    };

    product
        .insert(&*app.state.db)
        .await
        .expect("failed to seed product")
        .id
}

/// An active coupon valid from yesterday for thirty days; tests override
/// the fields they care about.
pub fn coupon_defaults(code: &str, coupon_type: CouponType) -> coupon::ActiveModel {
    coupon::ActiveModel {
        code: Set(code.to_string()),
        name: Set(format!("{} test coupon", code)),
        coupon_type: Set(coupon_type),
        valid_from: Set(Utc::now() - Duration::days(1)),
        valid_until: Set(Some(Utc::now() + Duration::days(30))),
        ..Default::default()
    }
}

pub async fn seed_coupon(app: &TestApp, model: coupon::ActiveModel) -> coupon::Model {
    model
        .insert(&*app.state.db)
        .await
        .expect("failed to seed coupon")
}

/// Insert a used redemption row directly, bypassing the engine.
pub async fn seed_redemption(app: &TestApp, coupon_id: i32, user_id: i32) {
    let redemption = coupon_redemption::ActiveModel {
        coupon_id: Set(coupon_id),
        user_id: Set(user_id),
        order_id: Set(format!("SEED-{}-{}", coupon_id, user_id)),
        discount_applied: Set(Decimal::ZERO),
        original_amount: Set(Decimal::ZERO),
        final_amount: Set(Decimal::ZERO),
        is_used: Set(true),
        used_at: Set(Some(Utc::now())),
        ..Default::default()
    };

    redemption
        .insert(&*app.state.db)
        .await
        .expect("failed to seed redemption");
}

pub fn cart_item(product_id: i32, quantity: i32, price: Decimal) -> CartItemInput {
    CartItemInput {
        product_id: Some(product_id),
        quantity,
        price,
    }
}

/// Count usage-log rows, optionally narrowed to one action.
pub async fn usage_log_count(
    app: &TestApp,
    action: Option<coupon_usage_log::UsageAction>,
) -> u64 {
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

    let mut query = coupon_usage_log::Entity::find();
    if let Some(action) = action {
        query = query.filter(coupon_usage_log::Column::Action.eq(action));
    }
    query
        .count(&*app.state.db)
        .await
        .expect("failed to count usage log entries")
}
