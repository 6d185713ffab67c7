use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;

use crate::entities::product::{
    Column, Entity as Product, Model as ProductModel, ProductCategory, ThemeType,
};
use crate::errors::ServiceError;
use crate::repositories::{BaseRepository, Repository};

/// Read-only catalog access.
///
/// The coupon engine never writes products; it resolves cart items to
/// their theme and category when evaluating restriction sets.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a product by ID, active or not.
    pub async fn find_by_id(&self, id: i32) -> Result<Option<ProductModel>, ServiceError> {
        Product::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(ServiceError::from)
    }

    /// List active products, optionally narrowed to a theme and/or category.
    pub async fn list_active(
        &self,
        theme: Option<ThemeType>,
        category: Option<ProductCategory>,
    ) -> Result<Vec<ProductModel>, ServiceError> {
        let mut query = Product::find().filter(Column::IsActive.eq(true));

        if let Some(theme) = theme {
            query = query.filter(Column::Theme.eq(theme));
        }

        if let Some(category) = category {
            query = query.filter(Column::Category.eq(category));
        }

        query
            .order_by_asc(Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(ServiceError::from)
    }
}
