//! Raw material intake and processing batches.
//!
//! Completing a batch credits the finished product's stock exactly once: the
//! status flip is a conditional `UPDATE ... WHERE status = 'In Progress'` and
//! only the caller whose update changed the row increments stock.

use crate::{
    db::{self, DbPool, SearchBuilder},
    entities::{
        processing_batch::{self, BatchStatus, Entity as BatchEntity},
        product::{self, Entity as ProductEntity},
        raw_material::{self, Entity as RawMaterialEntity, RawMaterialStatus},
    },
    errors::{DbResultExt, ServiceError},
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QueryTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::identifiers::{sequence_code, BATCH_PREFIX, RAW_MATERIAL_PREFIX};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateRawMaterialRequest {
    #[validate(length(min = 1, max = 255, message = "Supplier is required"))]
    pub supplier: String,
    #[validate(range(min = 1, message = "Quantity must be a positive integer"))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 64, message = "Quality is required"))]
    pub quality: String,
    /// Defaults to today
    pub received_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProcessRawMaterialRequest {
    /// Name of the catalog product the batch will produce
    #[validate(length(min = 1, max = 255, message = "Product is required"))]
    pub product: String,
    /// Defaults to the whole raw material quantity
    #[validate(range(min = 1, message = "Quantity must be a positive integer"))]
    pub quantity: Option<i32>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBatchRequest {
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    pub progress: Option<i32>,
    pub status: Option<BatchStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RawMaterialFilters {
    /// Case-insensitive match on code, supplier or quality
    pub search: Option<String>,
    pub status: Option<RawMaterialStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BatchFilters {
    /// Case-insensitive match on code, product or raw material code
    pub search: Option<String>,
    pub status: Option<BatchStatus>,
}

/// What happened to product stock during a batch update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StockUpdate {
    /// This call completed the batch and credited the product
    #[serde(rename_all = "camelCase")]
    Incremented { product_id: i32, new_stock: i32 },
    /// This call completed the batch but no product carries its name
    ProductNotFound { product: String },
    /// The batch was already completed; nothing was credited again
    AlreadyCompleted,
    /// The batch did not complete
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdate {
    pub batch: processing_batch::Model,
    pub stock_update: StockUpdate,
}

/// Result of processing a raw material
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStarted {
    pub raw_material: raw_material::Model,
    pub batch: processing_batch::Model,
}

/// Raw materials and processing batches
#[derive(Clone)]
pub struct ProcessingService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProcessingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_raw_materials(
        &self,
        filters: &RawMaterialFilters,
    ) -> Result<Vec<raw_material::Model>, ServiceError> {
        let search = SearchBuilder::new(filters.search.as_deref())
            .add_like(raw_material::Column::BatchCode)
            .add_like(raw_material::Column::Supplier)
            .add_like(raw_material::Column::Quality)
            .build();

        RawMaterialEntity::find()
            .apply_if(search, |q, cond| q.filter(cond))
            .apply_if(filters.status, |q, status| {
                q.filter(raw_material::Column::Status.eq(status))
            })
            .order_by_asc(raw_material::Column::Id)
            .all(&*self.db_pool)
            .await
            .or_db_error("list_raw_materials")
    }

    #[instrument(skip(self))]
    pub async fn get_raw_material(
        &self,
        id: i32,
    ) -> Result<Option<raw_material::Model>, ServiceError> {
        RawMaterialEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .or_db_error("get_raw_material")
    }

    /// Receives a raw material; its code `RM-<1000+id>` is derived from the
    /// id assigned inside the same transaction.
    #[instrument(skip(self, request), fields(supplier = %request.supplier, quantity = request.quantity))]
    pub async fn create_raw_material(
        &self,
        request: CreateRawMaterialRequest,
    ) -> Result<raw_material::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "create_raw_material").await?;

        let inserted = raw_material::ActiveModel {
            batch_code: Set(pending_code()),
            supplier: Set(request.supplier.trim().to_string()),
            quantity: Set(request.quantity),
            quality: Set(request.quality.trim().to_string()),
            received_date: Set(request
                .received_date
                .unwrap_or_else(|| Utc::now().date_naive())),
            status: Set(RawMaterialStatus::Available),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .or_db_error("create_raw_material")?;

        let code = sequence_code(RAW_MATERIAL_PREFIX, inserted.id);
        let mut active: raw_material::ActiveModel = inserted.into();
        active.batch_code = Set(code);
        let created = active.update(&txn).await.or_db_error("create_raw_material")?;

        db::commit(txn, "create_raw_material", started).await?;

        info!(raw_material_id = created.id, batch_code = %created.batch_code, "Raw material received");
        super::publish(
            &self.event_sender,
            Event::RawMaterialReceived {
                raw_material_id: created.id,
                batch_code: created.batch_code.clone(),
            },
        )
        .await;
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list_batches(
        &self,
        filters: &BatchFilters,
    ) -> Result<Vec<processing_batch::Model>, ServiceError> {
        let search = SearchBuilder::new(filters.search.as_deref())
            .add_like(processing_batch::Column::BatchCode)
            .add_like(processing_batch::Column::Product)
            .add_like(processing_batch::Column::RawMaterial)
            .build();

        BatchEntity::find()
            .apply_if(search, |q, cond| q.filter(cond))
            .apply_if(filters.status, |q, status| {
                q.filter(processing_batch::Column::Status.eq(status))
            })
            .order_by_asc(processing_batch::Column::Id)
            .all(&*self.db_pool)
            .await
            .or_db_error("list_batches")
    }

    #[instrument(skip(self))]
    pub async fn get_batch(
        &self,
        id: i32,
    ) -> Result<Option<processing_batch::Model>, ServiceError> {
        BatchEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .or_db_error("get_batch")
    }

    /// Marks an Available raw material as In Processing and opens a batch for
    /// it, in one transaction.
    #[instrument(skip(self, request), fields(product = %request.product))]
    pub async fn process_raw_material(
        &self,
        material_id: i32,
        request: ProcessRawMaterialRequest,
    ) -> Result<ProcessingStarted, ServiceError> {
        request.validate()?;
        let product_name = request.product.trim().to_string();
        if product_name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Product is required".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "process_raw_material").await?;

        let material = RawMaterialEntity::find_by_id(material_id)
            .one(&txn)
            .await
            .or_db_error("process_raw_material")?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Raw material {material_id} not found"))
            })?;

        if material.status != RawMaterialStatus::Available {
            return Err(ServiceError::InvalidStatus(format!(
                "Raw material {} is {} and cannot be processed",
                material.batch_code, material.status
            )));
        }

        let quantity = request.quantity.unwrap_or(material.quantity);
        if quantity > material.quantity {
            return Err(ServiceError::ValidationError(format!(
                "Quantity {quantity} exceeds the {} units available in {}",
                material.quantity, material.batch_code
            )));
        }

        // Guarded flip so two concurrent callers cannot both start a batch.
        let flipped = RawMaterialEntity::update_many()
            .col_expr(
                raw_material::Column::Status,
                Expr::value(RawMaterialStatus::InProcessing),
            )
            .filter(raw_material::Column::Id.eq(material_id))
            .filter(raw_material::Column::Status.eq(RawMaterialStatus::Available))
            .exec(&txn)
            .await
            .or_db_error("process_raw_material")?;
        if flipped.rows_affected != 1 {
            return Err(ServiceError::InvalidStatus(format!(
                "Raw material {} is no longer available",
                material.batch_code
            )));
        }

        let inserted = processing_batch::ActiveModel {
            batch_code: Set(pending_code()),
            product: Set(product_name),
            raw_material_id: Set(material.id),
            raw_material: Set(material.batch_code.clone()),
            quantity: Set(quantity),
            start_date: Set(Utc::now().date_naive()),
            end_date: Set(request.end_date),
            status: Set(BatchStatus::InProgress),
            progress: Set(0),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .or_db_error("create_batch")?;

        let code = sequence_code(BATCH_PREFIX, inserted.id);
        let mut active: processing_batch::ActiveModel = inserted.into();
        active.batch_code = Set(code);
        let batch = active.update(&txn).await.or_db_error("create_batch")?;

        let raw_material = RawMaterialEntity::find_by_id(material_id)
            .one(&txn)
            .await
            .or_db_error("process_raw_material")?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Raw material {material_id} not found"))
            })?;

        db::commit(txn, "process_raw_material", started).await?;

        info!(
            raw_material_id = material_id,
            batch_id = batch.id,
            batch_code = %batch.batch_code,
            quantity,
            "Processing batch started"
        );
        super::publish(
            &self.event_sender,
            Event::BatchStarted {
                batch_id: batch.id,
                raw_material_id: material_id,
                quantity,
            },
        )
        .await;

        Ok(ProcessingStarted {
            raw_material,
            batch,
        })
    }

    /// Updates progress and/or status. Reaching 100% or an explicit Completed
    /// completes the batch; completion credits the product stock at most once.
    #[instrument(skip(self, request), fields(progress = ?request.progress, status = ?request.status))]
    pub async fn update_batch(
        &self,
        batch_id: i32,
        request: UpdateBatchRequest,
    ) -> Result<BatchUpdate, ServiceError> {
        request.validate()?;
        if request.progress.is_none() && request.status.is_none() {
            return Err(ServiceError::ValidationError(
                "Either progress or status must be provided".to_string(),
            ));
        }
        if request.status == Some(BatchStatus::InProgress) && request.progress == Some(100) {
            return Err(ServiceError::ValidationError(
                "A batch at 100% progress cannot stay In Progress".to_string(),
            ));
        }

        let completing =
            request.progress == Some(100) || request.status == Some(BatchStatus::Completed);

        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "update_batch").await?;

        let batch = BatchEntity::find_by_id(batch_id)
            .one(&txn)
            .await
            .or_db_error("update_batch")?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {batch_id} not found")))?;

        if batch.status.is_terminal() {
            return if completing && batch.status == BatchStatus::Completed {
                info!(batch_id, "Batch already completed, stock left untouched");
                Ok(BatchUpdate {
                    batch,
                    stock_update: StockUpdate::AlreadyCompleted,
                })
            } else {
                Err(ServiceError::InvalidStatus(format!(
                    "Batch {} is {} and can no longer change",
                    batch.batch_code, batch.status
                )))
            };
        }

        let outcome = if completing {
            self.complete_batch(&txn, &batch).await?
        } else {
            let mut active: processing_batch::ActiveModel = batch.clone().into();
            if let Some(progress) = request.progress {
                active.progress = Set(progress);
            }
            if let Some(status) = request.status {
                active.status = Set(status);
                if status == BatchStatus::Canceled {
                    active.end_date = Set(Some(Utc::now().date_naive()));
                }
            }
            active.update(&txn).await.or_db_error("update_batch")?;
            StockUpdate::Unchanged
        };

        let batch = BatchEntity::find_by_id(batch_id)
            .one(&txn)
            .await
            .or_db_error("update_batch")?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {batch_id} not found")))?;

        db::commit(txn, "update_batch", started).await?;

        match &outcome {
            StockUpdate::Incremented { new_stock, .. } => {
                super::publish(
                    &self.event_sender,
                    Event::BatchCompleted {
                        batch_id,
                        product: batch.product.clone(),
                        quantity: batch.quantity,
                        new_stock: Some(*new_stock),
                    },
                )
                .await
            }
            StockUpdate::ProductNotFound { product } => {
                super::publish(
                    &self.event_sender,
                    Event::BatchCompleted {
                        batch_id,
                        product: product.clone(),
                        quantity: batch.quantity,
                        new_stock: None,
                    },
                )
                .await
            }
            StockUpdate::AlreadyCompleted => {}
            StockUpdate::Unchanged => {
                if batch.status == BatchStatus::Canceled {
                    super::publish(&self.event_sender, Event::BatchCanceled(batch_id)).await;
                }
            }
        }

        Ok(BatchUpdate {
            batch,
            stock_update: outcome,
        })
    }

    async fn complete_batch<C: ConnectionTrait>(
        &self,
        conn: &C,
        batch: &processing_batch::Model,
    ) -> Result<StockUpdate, ServiceError> {
        let today = Utc::now().date_naive();
        let flipped = BatchEntity::update_many()
            .col_expr(
                processing_batch::Column::Status,
                Expr::value(BatchStatus::Completed),
            )
            .col_expr(processing_batch::Column::Progress, Expr::value(100))
            .col_expr(
                processing_batch::Column::EndDate,
                Expr::value(batch.end_date.unwrap_or(today)),
            )
            .filter(processing_batch::Column::Id.eq(batch.id))
            .filter(processing_batch::Column::Status.eq(BatchStatus::InProgress))
            .exec(conn)
            .await
            .or_db_error("complete_batch")?;

        if flipped.rows_affected != 1 {
            info!(batch_id = batch.id, "Batch completed concurrently, stock left untouched");
            return Ok(StockUpdate::AlreadyCompleted);
        }

        counter!("agrichain_batches.completed", 1);

        let Some(product) = ProductEntity::find()
            .filter(product::Column::Name.eq(batch.product.as_str()))
            .order_by_asc(product::Column::Id)
            .one(conn)
            .await
            .or_db_error("complete_batch")?
        else {
            warn!(
                batch_id = batch.id,
                product = %batch.product,
                "Completed batch has no matching product; stock not credited"
            );
            counter!("agrichain_batches.product_not_found", 1);
            return Ok(StockUpdate::ProductNotFound {
                product: batch.product.clone(),
            });
        };

        ProductEntity::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).add(batch.quantity),
            )
            .filter(product::Column::Id.eq(product.id))
            .exec(conn)
            .await
            .or_db_error("credit_product_stock")?;

        let new_stock = ProductEntity::find_by_id(product.id)
            .one(conn)
            .await
            .or_db_error("credit_product_stock")?
            .map(|p| p.stock)
            .unwrap_or(product.stock + batch.quantity);

        info!(
            batch_id = batch.id,
            product_id = product.id,
            quantity = batch.quantity,
            new_stock,
            "Batch completed, product stock credited"
        );
        Ok(StockUpdate::Incremented {
            product_id: product.id,
            new_stock,
        })
    }
}

/// Unique placeholder held by a row until its sequence code is known.
fn pending_code() -> String {
    format!("PENDING-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_update_serializes_with_outcome_tag() {
        let json = serde_json::to_value(StockUpdate::Incremented {
            product_id: 1,
            new_stock: 1700,
        })
        .unwrap();
        assert_eq!(json["outcome"], "incremented");
        assert_eq!(json["newStock"], 1700);

        let json = serde_json::to_value(StockUpdate::AlreadyCompleted).unwrap();
        assert_eq!(json["outcome"], "alreadyCompleted");
    }

    #[test]
    fn progress_is_bounded() {
        let request = UpdateBatchRequest {
            progress: Some(101),
            status: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn placeholder_codes_are_unique() {
        assert_ne!(pending_code(), pending_code());
    }
}
