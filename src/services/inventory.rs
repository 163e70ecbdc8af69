use crate::{
    db::{self, DbPool},
    entities::{
        inventory::{self, Entity as InventoryEntity},
        product::{self, Entity as ProductEntity},
        warehouse::{self, Entity as WarehouseEntity},
    },
    errors::{DbResultExt, ServiceError},
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QueryTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::products::validate_positive_price;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateInventoryRequest {
    pub product_id: i32,
    pub warehouse_id: i32,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    /// Defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateInventoryRequest {
    pub product_id: Option<i32>,
    pub warehouse_id: Option<i32>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    pub date: Option<NaiveDate>,
}

/// Quantity correction with an optional new catalog price for the product
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AdjustInventoryRequest {
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    #[validate(custom = "validate_positive_price")]
    #[schema(value_type = Option<f64>, example = 5.5)]
    pub price: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct InventoryFilters {
    pub product_id: Option<i32>,
    pub warehouse_id: Option<i32>,
}

/// An inventory entry together with what it refers to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDetails {
    #[serde(flatten)]
    pub entry: inventory::Model,
    pub product: Option<product::Model>,
    pub warehouse: Option<warehouse::Model>,
}

/// Outcome of [`InventoryService::update_inventory`]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAdjustment {
    pub inventory: inventory::Model,
    pub product: product::Model,
    pub price_changed: bool,
}

/// Quantity-at-location records
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filters: &InventoryFilters,
    ) -> Result<Vec<InventoryDetails>, ServiceError> {
        let db = &*self.db_pool;
        let entries = InventoryEntity::find()
            .apply_if(filters.product_id, |q, id| {
                q.filter(inventory::Column::ProductId.eq(id))
            })
            .apply_if(filters.warehouse_id, |q, id| {
                q.filter(inventory::Column::WarehouseId.eq(id))
            })
            .order_by_asc(inventory::Column::Id)
            .all(db)
            .await
            .or_db_error("list_inventory")?;

        let product_ids: HashSet<i32> = entries.iter().map(|e| e.product_id).collect();
        let warehouse_ids: HashSet<i32> = entries.iter().map(|e| e.warehouse_id).collect();

        let products: HashMap<i32, product::Model> = ProductEntity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await
            .or_db_error("list_inventory")?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let warehouses: HashMap<i32, warehouse::Model> = WarehouseEntity::find()
            .filter(warehouse::Column::Id.is_in(warehouse_ids))
            .all(db)
            .await
            .or_db_error("list_inventory")?
            .into_iter()
            .map(|w| (w.id, w))
            .collect();

        Ok(entries
            .into_iter()
            .map(|entry| InventoryDetails {
                product: products.get(&entry.product_id).cloned(),
                warehouse: warehouses.get(&entry.warehouse_id).cloned(),
                entry,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<Option<inventory::Model>, ServiceError> {
        InventoryEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .or_db_error("get_inventory")
    }

    #[instrument(skip(self, request), fields(product_id = request.product_id, warehouse_id = request.warehouse_id))]
    pub async fn create(
        &self,
        request: CreateInventoryRequest,
    ) -> Result<inventory::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "create_inventory").await?;

        ensure_references(&txn, request.product_id, request.warehouse_id).await?;

        let created = inventory::ActiveModel {
            product_id: Set(request.product_id),
            warehouse_id: Set(request.warehouse_id),
            quantity: Set(request.quantity),
            date: Set(request.date.unwrap_or_else(|| Utc::now().date_naive())),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .or_db_error("create_inventory")?;

        db::commit(txn, "create_inventory", started).await?;

        info!(inventory_id = created.id, quantity = created.quantity, "Inventory recorded");
        super::publish(
            &self.event_sender,
            Event::InventoryRecorded {
                inventory_id: created.id,
                product_id: created.product_id,
                warehouse_id: created.warehouse_id,
                quantity: created.quantity,
            },
        )
        .await;
        Ok(created)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateInventoryRequest,
    ) -> Result<inventory::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "update_inventory_entry").await?;

        let existing = InventoryEntity::find_by_id(id)
            .one(&txn)
            .await
            .or_db_error("update_inventory_entry")?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory entry {id} not found")))?;

        ensure_references(
            &txn,
            request.product_id.unwrap_or(existing.product_id),
            request.warehouse_id.unwrap_or(existing.warehouse_id),
        )
        .await?;

        let mut active: inventory::ActiveModel = existing.into();
        if let Some(product_id) = request.product_id {
            active.product_id = Set(product_id);
        }
        if let Some(warehouse_id) = request.warehouse_id {
            active.warehouse_id = Set(warehouse_id);
        }
        if let Some(quantity) = request.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(date) = request.date {
            active.date = Set(date);
        }

        let updated = active
            .update(&txn)
            .await
            .or_db_error("update_inventory_entry")?;
        db::commit(txn, "update_inventory_entry", started).await?;

        info!(inventory_id = id, "Inventory entry updated");
        Ok(updated)
    }

    /// Sets the entry's quantity and, when given, the product's catalog price,
    /// in one transaction. Past order items keep their captured unit price.
    #[instrument(skip(self, request), fields(quantity = request.quantity))]
    pub async fn update_inventory(
        &self,
        id: i32,
        request: AdjustInventoryRequest,
    ) -> Result<InventoryAdjustment, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "adjust_inventory").await?;

        let entry = InventoryEntity::find_by_id(id)
            .one(&txn)
            .await
            .or_db_error("adjust_inventory")?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory entry {id} not found")))?;
        let old_quantity = entry.quantity;

        let product = ProductEntity::find_by_id(entry.product_id)
            .one(&txn)
            .await
            .or_db_error("adjust_inventory")?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", entry.product_id))
            })?;

        let (product, price_changed) = match request.price {
            Some(price) if price != product.price => {
                let mut active: product::ActiveModel = product.into();
                active.price = Set(price);
                (
                    active.update(&txn).await.or_db_error("adjust_inventory")?,
                    true,
                )
            }
            _ => (product, false),
        };

        let mut active: inventory::ActiveModel = entry.into();
        active.quantity = Set(request.quantity);
        let inventory = active.update(&txn).await.or_db_error("adjust_inventory")?;

        db::commit(txn, "adjust_inventory", started).await?;

        info!(
            inventory_id = id,
            old_quantity,
            new_quantity = inventory.quantity,
            price_changed,
            "Inventory adjusted"
        );
        super::publish(
            &self.event_sender,
            Event::InventoryAdjusted {
                inventory_id: id,
                product_id: inventory.product_id,
                old_quantity,
                new_quantity: inventory.quantity,
            },
        )
        .await;
        if price_changed {
            super::publish(&self.event_sender, Event::ProductUpdated(product.id)).await;
        }

        Ok(InventoryAdjustment {
            inventory,
            product,
            price_changed,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<bool, ServiceError> {
        let result = InventoryEntity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .or_db_error("delete_inventory")?;
        if result.rows_affected == 0 {
            return Ok(false);
        }
        info!(inventory_id = id, "Inventory entry deleted");
        super::publish(&self.event_sender, Event::InventoryDeleted(id)).await;
        Ok(true)
    }
}

async fn ensure_references<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    warehouse_id: i32,
) -> Result<(), ServiceError> {
    if ProductEntity::find_by_id(product_id)
        .one(conn)
        .await
        .or_db_error("check_inventory_references")?
        .is_none()
    {
        return Err(ServiceError::NotFound(format!(
            "Product {product_id} not found"
        )));
    }
    if WarehouseEntity::find_by_id(warehouse_id)
        .one(conn)
        .await
        .or_db_error("check_inventory_references")?
        .is_none()
    {
        return Err(ServiceError::NotFound(format!(
            "Warehouse {warehouse_id} not found"
        )));
    }
    Ok(())
}
