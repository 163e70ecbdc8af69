use crate::{
    db::{self, DbPool, SearchBuilder},
    entities::{
        order::{self, Entity as OrderEntity, OrderStatus},
        order_item::{self, Entity as OrderItemEntity},
        product::{self, Entity as ProductEntity},
    },
    errors::{DbResultExt, ServiceError},
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QueryTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::identifiers::{allocate_display_id, ORDER_PREFIX};

/// One product line of an order request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderLineRequest {
    pub product_id: i32,
    #[validate(range(min = 1, message = "Quantity must be a positive integer"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 255, message = "Customer is required"))]
    pub customer: String,
    pub delivery_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateOrderRequest {
    #[validate(length(min = 1, max = 255, message = "Customer must not be empty"))]
    pub customer: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderFilters {
    /// Case-insensitive match on order number or customer
    pub search: Option<String>,
    pub status: Option<OrderStatus>,
}

/// An order item with its catalog product
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDetails {
    #[serde(flatten)]
    pub item: order_item::Model,
    pub product: Option<product::Model>,
}

/// An order with its items
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<OrderItemDetails>,
}

/// Sum of quantity x unit price over the lines
pub fn order_total<'a, I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = &'a order_item::Model>,
{
    lines.into_iter().map(order_item::Model::line_total).sum()
}

/// Orders and their items
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filters: &OrderFilters) -> Result<Vec<order::Model>, ServiceError> {
        let search = SearchBuilder::new(filters.search.as_deref())
            .add_like(order::Column::OrderNumber)
            .add_like(order::Column::Customer)
            .build();

        OrderEntity::find()
            .apply_if(search, |q, cond| q.filter(cond))
            .apply_if(filters.status, |q, status| {
                q.filter(order::Column::Status.eq(status))
            })
            .order_by_desc(order::Column::OrderDate)
            .order_by_desc(order::Column::Id)
            .all(&*self.db_pool)
            .await
            .or_db_error("list_orders")
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<Option<order::Model>, ServiceError> {
        OrderEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .or_db_error("get_order")
    }

    #[instrument(skip(self))]
    pub async fn get_order_details(&self, id: i32) -> Result<Option<OrderDetails>, ServiceError> {
        let db = &*self.db_pool;
        let Some(order) = OrderEntity::find_by_id(id)
            .one(db)
            .await
            .or_db_error("get_order_details")?
        else {
            return Ok(None);
        };
        let items = load_item_details(db, id).await?;
        Ok(Some(OrderDetails { order, items }))
    }

    /// Creates the order and its items atomically. Unit prices come from the
    /// catalog at submission time and the total is derived from them.
    #[instrument(skip(self, request), fields(customer = %request.customer, lines = request.items.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderDetails, ServiceError> {
        request.validate()?;
        for line in &request.items {
            line.validate()?;
        }
        let customer = request.customer.trim().to_string();
        if customer.is_empty() {
            return Err(ServiceError::ValidationError(
                "Customer is required".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "create_order").await?;

        let prices = catalog_prices(&txn, request.items.iter().map(|l| l.product_id)).await?;
        let total_amount: Decimal = request
            .items
            .iter()
            .map(|line| Decimal::from(line.quantity) * prices[&line.product_id].price)
            .sum();

        let order_number =
            allocate_display_id::<OrderEntity, _>(&txn, order::Column::OrderNumber, ORDER_PREFIX)
                .await?;

        let order = order::ActiveModel {
            order_number: Set(order_number),
            customer: Set(customer),
            total_amount: Set(total_amount),
            order_date: Set(Utc::now()),
            delivery_date: Set(request.delivery_date),
            status: Set(OrderStatus::Processing),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .or_db_error("create_order")?;

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = &prices[&line.product_id];
            let item = order_item::ActiveModel {
                order_id: Set(order.id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                unit_price: Set(product.price),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .or_db_error("create_order_item")?;
            items.push(OrderItemDetails {
                item,
                product: Some(product.clone()),
            });
        }

        db::commit(txn, "create_order", started).await?;

        counter!("agrichain_orders.created", 1);
        info!(
            order_id = order.id,
            order_number = %order.order_number,
            total_amount = %order.total_amount,
            "Order created"
        );
        super::publish(
            &self.event_sender,
            Event::OrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
                total_amount: order.total_amount,
            },
        )
        .await;

        Ok(OrderDetails { order, items })
    }

    /// Partial update. Status only moves forward; writing the current status
    /// again is a no-op.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "update_order").await?;

        let existing = OrderEntity::find_by_id(id)
            .one(&txn)
            .await
            .or_db_error("update_order")?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {id} not found")))?;
        let old_status = existing.status;

        let status_change = match request.status {
            Some(next) if next != old_status => {
                if !old_status.can_transition_to(next) {
                    return Err(ServiceError::InvalidStatus(format!(
                        "Order {id} cannot move from {old_status} to {next}"
                    )));
                }
                Some(next)
            }
            _ => None,
        };

        let mut active: order::ActiveModel = existing.into();
        if let Some(customer) = request.customer {
            let customer = customer.trim().to_string();
            if customer.is_empty() {
                return Err(ServiceError::ValidationError(
                    "Customer must not be empty".to_string(),
                ));
            }
            active.customer = Set(customer);
        }
        if let Some(delivery_date) = request.delivery_date {
            active.delivery_date = Set(Some(delivery_date));
        }
        if let Some(status) = status_change {
            active.status = Set(status);
        }

        let updated = active.update(&txn).await.or_db_error("update_order")?;
        db::commit(txn, "update_order", started).await?;

        info!(order_id = id, "Order updated");
        match status_change {
            Some(new_status) => {
                super::publish(
                    &self.event_sender,
                    Event::OrderStatusChanged {
                        order_id: id,
                        old_status: old_status.to_string(),
                        new_status: new_status.to_string(),
                    },
                )
                .await
            }
            None => super::publish(&self.event_sender, Event::OrderUpdated(id)).await,
        }
        Ok(updated)
    }

    /// Deletes the order's items and then the order in one transaction.
    /// Returns false when the order did not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "delete_order").await?;

        if OrderEntity::find_by_id(id)
            .one(&txn)
            .await
            .or_db_error("delete_order")?
            .is_none()
        {
            return Ok(false);
        }

        let items = OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(id))
            .exec(&txn)
            .await
            .or_db_error("delete_order_items")?;
        OrderEntity::delete_by_id(id)
            .exec(&txn)
            .await
            .or_db_error("delete_order")?;

        db::commit(txn, "delete_order", started).await?;

        info!(order_id = id, items_removed = items.rows_affected, "Order deleted");
        super::publish(&self.event_sender, Event::OrderDeleted(id)).await;
        Ok(true)
    }

    #[instrument(skip(self))]
    pub async fn list_for_order(&self, order_id: i32) -> Result<Vec<OrderItemDetails>, ServiceError> {
        let db = &*self.db_pool;
        if self.get_by_id(order_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Order {order_id} not found")));
        }
        load_item_details(db, order_id).await
    }

    /// Adds a line at the current catalog price and recomputes the total.
    #[instrument(skip(self, line), fields(product_id = line.product_id, quantity = line.quantity))]
    pub async fn add_item(
        &self,
        order_id: i32,
        line: OrderLineRequest,
    ) -> Result<OrderDetails, ServiceError> {
        line.validate()?;
        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "add_order_item").await?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .or_db_error("add_order_item")?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let prices = catalog_prices(&txn, [line.product_id]).await?;
        order_item::ActiveModel {
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            unit_price: Set(prices[&line.product_id].price),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .or_db_error("add_order_item")?;

        let order = recompute_total(&txn, order).await?;
        let items = load_item_details(&txn, order_id).await?;
        db::commit(txn, "add_order_item", started).await?;

        info!(order_id, total_amount = %order.total_amount, "Order item added");
        super::publish(&self.event_sender, Event::OrderUpdated(order_id)).await;
        Ok(OrderDetails { order, items })
    }

    /// Removes one line and recomputes the total.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, order_id: i32, item_id: i32) -> Result<OrderDetails, ServiceError> {
        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "remove_order_item").await?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .or_db_error("remove_order_item")?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let removed = OrderItemEntity::delete_many()
            .filter(order_item::Column::Id.eq(item_id))
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await
            .or_db_error("remove_order_item")?;
        if removed.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Item {item_id} not found on order {order_id}"
            )));
        }

        let order = recompute_total(&txn, order).await?;
        let items = load_item_details(&txn, order_id).await?;
        if items.is_empty() {
            warn!(order_id, "Order has no items left");
        }
        db::commit(txn, "remove_order_item", started).await?;

        info!(order_id, item_id, total_amount = %order.total_amount, "Order item removed");
        super::publish(&self.event_sender, Event::OrderUpdated(order_id)).await;
        Ok(OrderDetails { order, items })
    }
}

/// Current catalog rows for the requested product ids; any missing id is NotFound.
async fn catalog_prices<C, I>(conn: &C, ids: I) -> Result<HashMap<i32, product::Model>, ServiceError>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = i32>,
{
    let wanted: HashSet<i32> = ids.into_iter().collect();
    let found: HashMap<i32, product::Model> = ProductEntity::find()
        .filter(product::Column::Id.is_in(wanted.iter().copied()))
        .all(conn)
        .await
        .or_db_error("lookup_catalog_prices")?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut missing: Vec<i32> = wanted
        .into_iter()
        .filter(|id| !found.contains_key(id))
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(ServiceError::NotFound(format!(
            "Products not found: {missing:?}"
        )));
    }
    Ok(found)
}

async fn load_item_details<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<Vec<OrderItemDetails>, ServiceError> {
    let rows = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .find_also_related(ProductEntity)
        .all(conn)
        .await
        .or_db_error("load_order_items")?;

    Ok(rows
        .into_iter()
        .map(|(item, product)| OrderItemDetails { item, product })
        .collect())
}

async fn recompute_total<C: ConnectionTrait>(
    conn: &C,
    order: order::Model,
) -> Result<order::Model, ServiceError> {
    let items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .all(conn)
        .await
        .or_db_error("recompute_order_total")?;

    let mut active: order::ActiveModel = order.into();
    active.total_amount = Set(order_total(&items));
    active.update(conn).await.or_db_error("recompute_order_total")
}
