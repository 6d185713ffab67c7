use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Merchandise theme a product belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum ThemeType {
    #[sea_orm(string_value = "BTS")]
    Bts,
    #[sea_orm(string_value = "ANIME")]
    Anime,
    #[sea_orm(string_value = "KPOP")]
    Kpop,
    #[sea_orm(string_value = "MANGA")]
    Manga,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

/// Product category within the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductCategory {
    #[sea_orm(string_value = "KEYCHAIN")]
    Keychain,
    #[sea_orm(string_value = "BRACELET")]
    Bracelet,
    #[sea_orm(string_value = "STICKER")]
    Sticker,
    #[sea_orm(string_value = "POSTER")]
    Poster,
    #[sea_orm(string_value = "CLOTHING")]
    Clothing,
    #[sea_orm(string_value = "ACCESSORIES")]
    Accessories,
}

/// Product entity
///
/// Products are read-only as far as the coupon engine is concerned; the
/// engine only looks them up to resolve theme/category restrictions.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Product name
    #[validate(length(
        min = 1,
        max = 200,
        message = "Product name must be between 1 and 200 characters"
    ))]
    pub name: String,

    /// Product description
    pub description: Option<String>,

    /// Product category
    pub category: ProductCategory,

    /// Merchandise theme
    pub theme: ThemeType,

    /// Unit price
    pub price: Decimal,

    /// URL to the primary product image
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,

    /// Units in stock
    pub stock_quantity: i32,

    /// Is the product active
    pub is_active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
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
            if let ActiveValue::NotSet = active_model.is_active {
                active_model.is_active = Set(true);
            }

            if let ActiveValue::NotSet = active_model.stock_quantity {
                active_model.stock_quantity = Set(0);
            }

            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
        }

        Ok(active_model)
    }
}
