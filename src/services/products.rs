use crate::{
    db::{DbPool, SearchBuilder},
    entities::product::{self, Entity as ProductEntity},
    errors::{DbResultExt, ServiceError},
    events::{Event, EventSender},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

pub(crate) fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_positive() && !price.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("price_must_be_positive"))
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(custom = "validate_positive_price")]
    #[schema(value_type = f64, example = 5.0)]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    #[serde(default)]
    pub stock: i32,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Product name must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(custom = "validate_positive_price")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilters {
    /// Case-insensitive match on name, description or category
    pub search: Option<String>,
    /// Exact category
    pub category: Option<String>,
}

/// Product catalog
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filters: &ProductFilters) -> Result<Vec<product::Model>, ServiceError> {
        let search = SearchBuilder::new(filters.search.as_deref())
            .add_like(product::Column::Name)
            .add_like(product::Column::Description)
            .add_like(product::Column::Category)
            .build();
        let category = filters
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        ProductEntity::find()
            .apply_if(search, |q, cond| q.filter(cond))
            .apply_if(category, |q, c| q.filter(product::Column::Category.eq(c)))
            .order_by_asc(product::Column::Id)
            .all(&*self.db_pool)
            .await
            .or_db_error("list_products")
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<Option<product::Model>, ServiceError> {
        ProductEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .or_db_error("get_product")
    }

    /// Distinct non-empty categories in alphabetical order
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<String>, ServiceError> {
        ProductEntity::find()
            .select_only()
            .column(product::Column::Category)
            .distinct()
            .filter(product::Column::Category.is_not_null())
            .filter(product::Column::Category.ne(""))
            .order_by_asc(product::Column::Category)
            .into_tuple::<String>()
            .all(&*self.db_pool)
            .await
            .or_db_error("list_categories")
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateProductRequest) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let created = product::ActiveModel {
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            category: Set(request.category),
            price: Set(request.price),
            stock: Set(request.stock),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .or_db_error("create_product")?;

        info!(product_id = created.id, "Product created");
        super::publish(&self.event_sender, Event::ProductCreated(created.id)).await;
        Ok(created)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;

        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {id} not found")))?;

        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(category) = request.category {
            active.category = Set(Some(category));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(stock) = request.stock {
            active.stock = Set(stock);
        }

        let updated = active.update(db).await.or_db_error("update_product")?;
        info!(product_id = id, "Product updated");
        super::publish(&self.event_sender, Event::ProductUpdated(id)).await;
        Ok(updated)
    }

    /// Returns false when the product did not exist. A product still referenced
    /// by inventory or order items is a Conflict.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<bool, ServiceError> {
        let result = ProductEntity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .or_db_error("delete_product")?;
        if result.rows_affected == 0 {
            return Ok(false);
        }
        info!(product_id = id, "Product deleted");
        super::publish(&self.event_sender, Event::ProductDeleted(id)).await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_must_be_strictly_positive() {
        assert!(validate_positive_price(&dec!(0.01)).is_ok());
        assert!(validate_positive_price(&dec!(0)).is_err());
        assert!(validate_positive_price(&dec!(-3.5)).is_err());
    }

    #[test]
    fn create_request_validation() {
        let request = CreateProductRequest {
            name: "Cassava Flour".into(),
            description: None,
            category: Some("Flour".into()),
            price: dec!(5.0),
            stock: -1,
        };
        assert!(request.validate().is_err());
    }
}
