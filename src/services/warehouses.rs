use crate::{
    db::{DbPool, SearchBuilder},
    entities::warehouse::{self, Entity as WarehouseEntity},
    errors::{DbResultExt, ServiceError},
    events::{Event, EventSender},
};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryFilter, QueryOrder, QueryTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateWarehouseRequest {
    #[validate(length(min = 1, max = 255, message = "Warehouse name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "Location is required"))]
    pub location: String,
    #[validate(range(min = 0, message = "Capacity cannot be negative"))]
    pub capacity: i32,
    #[validate(range(min = 0, message = "Used space cannot be negative"))]
    #[serde(default)]
    pub used: i32,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateWarehouseRequest {
    #[validate(length(min = 1, max = 255, message = "Warehouse name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Location must not be empty"))]
    pub location: Option<String>,
    #[validate(range(min = 0, message = "Capacity cannot be negative"))]
    pub capacity: Option<i32>,
    #[validate(range(min = 0, message = "Used space cannot be negative"))]
    pub used: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WarehouseFilters {
    /// Case-insensitive match on name or location
    pub search: Option<String>,
}

fn check_used_within_capacity(used: i32, capacity: i32) -> Result<(), ServiceError> {
    if used > capacity {
        return Err(ServiceError::ValidationError(format!(
            "Used space {used} exceeds capacity {capacity}"
        )));
    }
    Ok(())
}

/// Storage locations. `used` is maintained by callers, independently of
/// inventory rows; see `AnalyticsService::warehouse_utilization` for drift.
#[derive(Clone)]
pub struct WarehouseService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl WarehouseService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filters: &WarehouseFilters,
    ) -> Result<Vec<warehouse::Model>, ServiceError> {
        let search = SearchBuilder::new(filters.search.as_deref())
            .add_like(warehouse::Column::Name)
            .add_like(warehouse::Column::Location)
            .build();

        WarehouseEntity::find()
            .apply_if(search, |q, cond| q.filter(cond))
            .order_by_asc(warehouse::Column::Id)
            .all(&*self.db_pool)
            .await
            .or_db_error("list_warehouses")
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<Option<warehouse::Model>, ServiceError> {
        WarehouseEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .or_db_error("get_warehouse")
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        request: CreateWarehouseRequest,
    ) -> Result<warehouse::Model, ServiceError> {
        request.validate()?;
        check_used_within_capacity(request.used, request.capacity)?;

        let created = warehouse::ActiveModel {
            name: Set(request.name.trim().to_string()),
            location: Set(request.location.trim().to_string()),
            capacity: Set(request.capacity),
            used: Set(request.used),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .or_db_error("create_warehouse")?;

        info!(warehouse_id = created.id, "Warehouse created");
        super::publish(&self.event_sender, Event::WarehouseCreated(created.id)).await;
        Ok(created)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateWarehouseRequest,
    ) -> Result<warehouse::Model, ServiceError> {
        request.validate()?;

        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Warehouse {id} not found")))?;

        check_used_within_capacity(
            request.used.unwrap_or(existing.used),
            request.capacity.unwrap_or(existing.capacity),
        )?;

        let mut active: warehouse::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(location) = request.location {
            active.location = Set(location.trim().to_string());
        }
        if let Some(capacity) = request.capacity {
            active.capacity = Set(capacity);
        }
        if let Some(used) = request.used {
            active.used = Set(used);
        }

        let updated = active
            .update(&*self.db_pool)
            .await
            .or_db_error("update_warehouse")?;
        info!(warehouse_id = id, "Warehouse updated");
        super::publish(&self.event_sender, Event::WarehouseUpdated(id)).await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<bool, ServiceError> {
        let result = WarehouseEntity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .or_db_error("delete_warehouse")?;
        if result.rows_affected == 0 {
            return Ok(false);
        }
        info!(warehouse_id = id, "Warehouse deleted");
        super::publish(&self.event_sender, Event::WarehouseDeleted(id)).await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, true)]
    #[case(800, 1000, true)]
    #[case(1000, 1000, true)]
    #[case(1001, 1000, false)]
    fn used_must_fit_capacity(#[case] used: i32, #[case] capacity: i32, #[case] ok: bool) {
        assert_eq!(check_used_within_capacity(used, capacity).is_ok(), ok);
    }
}
