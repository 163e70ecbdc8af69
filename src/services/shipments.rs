use crate::{
    db::{self, DbPool, SearchBuilder},
    entities::shipment::{self, Entity as ShipmentEntity, ShipmentStatus, PENDING_TRANSPORTER},
    errors::{DbResultExt, ServiceError},
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QueryTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::identifiers::{allocate_display_id, SHIPMENT_PREFIX};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateShipmentRequest {
    /// Server generated (`SHP-…`) when omitted
    #[validate(length(min = 1, max = 32, message = "Shipment number must be 1-32 characters"))]
    pub shipment_number: Option<String>,
    #[serde(rename = "from")]
    #[validate(length(min = 1, max = 255, message = "Origin is required"))]
    pub origin: String,
    #[serde(rename = "to")]
    #[validate(length(min = 1, max = 255, message = "Destination is required"))]
    pub destination: String,
    #[validate(range(min = 1, message = "Quantity must be a positive integer"))]
    pub quantity: i32,
    pub transporter: Option<String>,
    /// Defaults to today
    pub dispatch_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateShipmentRequest {
    #[serde(rename = "from")]
    #[validate(length(min = 1, max = 255, message = "Origin must not be empty"))]
    pub origin: Option<String>,
    #[serde(rename = "to")]
    #[validate(length(min = 1, max = 255, message = "Destination must not be empty"))]
    pub destination: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be a positive integer"))]
    pub quantity: Option<i32>,
    pub transporter: Option<String>,
    pub dispatch_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub status: Option<ShipmentStatus>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateShipmentStatusRequest {
    pub status: ShipmentStatus,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShipmentFilters {
    /// Case-insensitive match on shipment number, origin or destination
    pub search: Option<String>,
    pub status: Option<ShipmentStatus>,
    /// Exact transporter name
    pub transporter: Option<String>,
}

/// Validates a status write against the shipment lifecycle. `Ok(None)` means
/// the status is unchanged and nothing should be written.
pub fn next_status(
    current: ShipmentStatus,
    requested: ShipmentStatus,
) -> Result<Option<ShipmentStatus>, ServiceError> {
    if current == requested {
        return Ok(None);
    }
    if !current.can_transition_to(requested) {
        return Err(ServiceError::InvalidStatus(format!(
            "Shipment cannot move from {current} to {requested}"
        )));
    }
    Ok(Some(requested))
}

/// Transport movements between named locations
#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ShipmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filters: &ShipmentFilters,
    ) -> Result<Vec<shipment::Model>, ServiceError> {
        let search = SearchBuilder::new(filters.search.as_deref())
            .add_like(shipment::Column::ShipmentNumber)
            .add_like(shipment::Column::Origin)
            .add_like(shipment::Column::Destination)
            .build();
        let transporter = filters
            .transporter
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        ShipmentEntity::find()
            .apply_if(search, |q, cond| q.filter(cond))
            .apply_if(filters.status, |q, status| {
                q.filter(shipment::Column::Status.eq(status))
            })
            .apply_if(transporter, |q, t| {
                q.filter(shipment::Column::Transporter.eq(t))
            })
            .order_by_desc(shipment::Column::DispatchDate)
            .order_by_desc(shipment::Column::Id)
            .all(&*self.db_pool)
            .await
            .or_db_error("list_shipments")
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<Option<shipment::Model>, ServiceError> {
        ShipmentEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .or_db_error("get_shipment")
    }

    /// New shipments start Scheduled. A caller-supplied number that is
    /// already taken is a Conflict.
    #[instrument(skip(self, request), fields(quantity = request.quantity))]
    pub async fn create(
        &self,
        request: CreateShipmentRequest,
    ) -> Result<shipment::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "create_shipment").await?;

        let shipment_number = match request.shipment_number.map(|n| n.trim().to_string()) {
            Some(number) if !number.is_empty() => {
                let taken = ShipmentEntity::find()
                    .filter(shipment::Column::ShipmentNumber.eq(number.as_str()))
                    .one(&txn)
                    .await
                    .or_db_error("create_shipment")?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Shipment number {number} already exists"
                    )));
                }
                number
            }
            _ => {
                allocate_display_id::<ShipmentEntity, _>(
                    &txn,
                    shipment::Column::ShipmentNumber,
                    SHIPMENT_PREFIX,
                )
                .await?
            }
        };

        let transporter = request
            .transporter
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| PENDING_TRANSPORTER.to_string());

        let created = shipment::ActiveModel {
            shipment_number: Set(shipment_number),
            origin: Set(request.origin.trim().to_string()),
            destination: Set(request.destination.trim().to_string()),
            quantity: Set(request.quantity),
            transporter: Set(transporter),
            dispatch_date: Set(request
                .dispatch_date
                .unwrap_or_else(|| Utc::now().date_naive())),
            delivery_date: Set(request.delivery_date),
            status: Set(ShipmentStatus::Scheduled),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .or_db_error("create_shipment")?;

        db::commit(txn, "create_shipment", started).await?;

        info!(
            shipment_id = created.id,
            shipment_number = %created.shipment_number,
            "Shipment created"
        );
        super::publish(
            &self.event_sender,
            Event::ShipmentCreated {
                shipment_id: created.id,
                shipment_number: created.shipment_number.clone(),
            },
        )
        .await;
        Ok(created)
    }

    /// Partial update; a status in the request goes through the same
    /// transition check as [`Self::update_status`].
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateShipmentRequest,
    ) -> Result<shipment::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "update_shipment").await?;

        let existing = ShipmentEntity::find_by_id(id)
            .one(&txn)
            .await
            .or_db_error("update_shipment")?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {id} not found")))?;
        let old_status = existing.status;
        let had_delivery_date = existing.delivery_date.is_some();

        let status_change = match request.status {
            Some(requested) => next_status(old_status, requested)?,
            None => None,
        };

        let mut active: shipment::ActiveModel = existing.into();
        if let Some(origin) = request.origin {
            active.origin = Set(origin.trim().to_string());
        }
        if let Some(destination) = request.destination {
            active.destination = Set(destination.trim().to_string());
        }
        if let Some(quantity) = request.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(transporter) = request.transporter {
            let transporter = transporter.trim().to_string();
            active.transporter = Set(if transporter.is_empty() {
                PENDING_TRANSPORTER.to_string()
            } else {
                transporter
            });
        }
        if let Some(dispatch_date) = request.dispatch_date {
            active.dispatch_date = Set(dispatch_date);
        }
        if let Some(delivery_date) = request.delivery_date {
            active.delivery_date = Set(Some(delivery_date));
        }
        if let Some(status) = status_change {
            active.status = Set(status);
            if status == ShipmentStatus::Delivered
                && !had_delivery_date
                && request.delivery_date.is_none()
            {
                active.delivery_date = Set(Some(Utc::now().date_naive()));
            }
        }

        let updated = active.update(&txn).await.or_db_error("update_shipment")?;
        db::commit(txn, "update_shipment", started).await?;

        info!(shipment_id = id, "Shipment updated");
        if let Some(new_status) = status_change {
            super::publish(
                &self.event_sender,
                Event::ShipmentStatusChanged {
                    shipment_id: id,
                    old_status: old_status.to_string(),
                    new_status: new_status.to_string(),
                },
            )
            .await;
        }
        Ok(updated)
    }

    /// Moves a shipment along Scheduled -> In Transit -> Delivered.
    /// Reaching Delivered stamps today's date when none is recorded.
    #[instrument(skip(self), fields(status = %status))]
    pub async fn update_status(
        &self,
        id: i32,
        status: ShipmentStatus,
    ) -> Result<shipment::Model, ServiceError> {
        self.update(
            id,
            UpdateShipmentRequest {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<bool, ServiceError> {
        let result = ShipmentEntity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .or_db_error("delete_shipment")?;
        if result.rows_affected == 0 {
            return Ok(false);
        }
        info!(shipment_id = id, "Shipment deleted");
        super::publish(&self.event_sender, Event::ShipmentDeleted(id)).await;
        Ok(true)
    }
}
