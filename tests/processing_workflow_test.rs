//! Raw material intake, batch processing and exactly-once stock crediting.

mod common;

use agrichain_api::{
    entities::{
        processing_batch::BatchStatus, product, raw_material::RawMaterialStatus, user::UserRole,
    },
    errors::ServiceError,
    services::processing::{
        BatchFilters, CreateRawMaterialRequest, ProcessRawMaterialRequest, StockUpdate,
        UpdateBatchRequest,
    },
};
use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use chrono::NaiveDate;
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use serde_json::json;

fn receive(quantity: i32) -> CreateRawMaterialRequest {
    CreateRawMaterialRequest {
        supplier: "Farm C".to_string(),
        quantity,
        quality: "Grade A".to_string(),
        received_date: NaiveDate::from_ymd_opt(2023, 11, 2),
    }
}

fn progress(value: i32) -> UpdateBatchRequest {
    UpdateBatchRequest {
        progress: Some(value),
        status: None,
    }
}

async fn stock_of(app: &TestApp, id: i32) -> i32 {
    product::Entity::find_by_id(id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("product exists")
        .stock
}

#[tokio::test]
async fn raw_material_codes_follow_the_row_id() {
    let app = TestApp::new().await;
    let processing = &app.state.services.processing;

    let first = processing.create_raw_material(receive(1_500)).await.unwrap();
    let second = processing.create_raw_material(receive(2_000)).await.unwrap();

    assert_eq!(first.batch_code, format!("RM-{}", 1000 + first.id));
    assert_eq!(second.batch_code, format!("RM-{}", 1000 + second.id));
    assert_eq!(first.status, RawMaterialStatus::Available);
}

#[tokio::test]
async fn processing_a_raw_material_opens_a_batch_once() {
    let app = TestApp::new().await;
    let processing = &app.state.services.processing;
    let material = processing.create_raw_material(receive(1_200)).await.unwrap();

    let started = processing
        .process_raw_material(
            material.id,
            ProcessRawMaterialRequest {
                product: "Cassava Flour".to_string(),
                quantity: None,
                end_date: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(started.raw_material.status, RawMaterialStatus::InProcessing);
    assert_eq!(started.batch.status, BatchStatus::InProgress);
    assert_eq!(started.batch.progress, 0);
    assert_eq!(started.batch.quantity, 1_200);
    assert_eq!(started.batch.raw_material, material.batch_code);
    assert_eq!(started.batch.batch_code, format!("PB-{}", 1000 + started.batch.id));

    let again = processing
        .process_raw_material(
            material.id,
            ProcessRawMaterialRequest {
                product: "Cassava Flour".to_string(),
                quantity: None,
                end_date: None,
            },
        )
        .await;
    assert_matches!(again, Err(ServiceError::InvalidStatus(_)));

    let too_much = processing
        .create_raw_material(receive(100))
        .await
        .unwrap();
    let over = processing
        .process_raw_material(
            too_much.id,
            ProcessRawMaterialRequest {
                product: "Cassava Flour".to_string(),
                quantity: Some(101),
                end_date: None,
            },
        )
        .await;
    assert_matches!(over, Err(ServiceError::ValidationError(_)));

    let batches = processing.list_batches(&BatchFilters::default()).await.unwrap();
    assert_eq!(batches.len(), 1);
}

#[tokio::test]
async fn completing_a_batch_credits_stock_exactly_once() {
    let app = TestApp::new().await;
    let flour = app.seed_product("Cassava Flour", dec!(5.00), 1_200).await;
    let processing = &app.state.services.processing;
    let material = processing.create_raw_material(receive(1_200)).await.unwrap();
    let batch = processing
        .process_raw_material(
            material.id,
            ProcessRawMaterialRequest {
                product: "Cassava Flour".to_string(),
                quantity: Some(500),
                end_date: None,
            },
        )
        .await
        .unwrap()
        .batch;

    let halfway = processing.update_batch(batch.id, progress(65)).await.unwrap();
    assert_eq!(halfway.stock_update, StockUpdate::Unchanged);
    assert_eq!(halfway.batch.progress, 65);
    assert_eq!(stock_of(&app, flour.id).await, 1_200);

    let done = processing.update_batch(batch.id, progress(100)).await.unwrap();
    assert_eq!(
        done.stock_update,
        StockUpdate::Incremented {
            product_id: flour.id,
            new_stock: 1_700
        }
    );
    assert_eq!(done.batch.status, BatchStatus::Completed);
    assert!(done.batch.end_date.is_some());

    let again = processing.update_batch(batch.id, progress(100)).await.unwrap();
    assert_eq!(again.stock_update, StockUpdate::AlreadyCompleted);
    assert_eq!(again.batch.status, BatchStatus::Completed);
    assert_eq!(stock_of(&app, flour.id).await, 1_700);

    let repeat = processing
        .update_batch(
            batch.id,
            UpdateBatchRequest {
                progress: None,
                status: Some(BatchStatus::Completed),
            },
        )
        .await
        .unwrap();
    assert_eq!(repeat.stock_update, StockUpdate::AlreadyCompleted);
    assert_eq!(stock_of(&app, flour.id).await, 1_700);

    let reopen = processing.update_batch(batch.id, progress(10)).await;
    assert_matches!(reopen, Err(ServiceError::InvalidStatus(_)));
}

#[tokio::test]
async fn concurrent_completions_credit_once() {
    let app = TestApp::new().await;
    let chips = app.seed_product("Cassava Chips", dec!(3.50), 0).await;
    let processing = app.state.services.processing.clone();
    let material = processing.create_raw_material(receive(400)).await.unwrap();
    let batch = processing
        .process_raw_material(
            material.id,
            ProcessRawMaterialRequest {
                product: "Cassava Chips".to_string(),
                quantity: None,
                end_date: None,
            },
        )
        .await
        .unwrap()
        .batch;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let processing = processing.clone();
            tokio::spawn(async move { processing.update_batch(batch.id, progress(100)).await })
        })
        .collect();

    let mut incremented = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap().stock_update {
            StockUpdate::Incremented { .. } => incremented += 1,
            StockUpdate::AlreadyCompleted => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(incremented, 1);
    assert_eq!(stock_of(&app, chips.id).await, 400);
}

#[tokio::test]
async fn completion_without_matching_product_still_completes() {
    let app = TestApp::new().await;
    let processing = &app.state.services.processing;
    let material = processing.create_raw_material(receive(300)).await.unwrap();
    let batch = processing
        .process_raw_material(
            material.id,
            ProcessRawMaterialRequest {
                product: "Cassava Pellets".to_string(),
                quantity: None,
                end_date: None,
            },
        )
        .await
        .unwrap()
        .batch;

    let done = processing.update_batch(batch.id, progress(100)).await.unwrap();
    assert_eq!(
        done.stock_update,
        StockUpdate::ProductNotFound {
            product: "Cassava Pellets".to_string()
        }
    );
    assert_eq!(done.batch.status, BatchStatus::Completed);
}

#[tokio::test]
async fn canceled_batches_are_terminal() {
    let app = TestApp::new().await;
    let processing = &app.state.services.processing;
    let material = processing.create_raw_material(receive(300)).await.unwrap();
    let batch = processing
        .process_raw_material(
            material.id,
            ProcessRawMaterialRequest {
                product: "Cassava Flour".to_string(),
                quantity: None,
                end_date: None,
            },
        )
        .await
        .unwrap()
        .batch;

    let canceled = processing
        .update_batch(
            batch.id,
            UpdateBatchRequest {
                progress: None,
                status: Some(BatchStatus::Canceled),
            },
        )
        .await
        .unwrap();
    assert_eq!(canceled.batch.status, BatchStatus::Canceled);

    let complete = processing.update_batch(batch.id, progress(100)).await;
    assert_matches!(complete, Err(ServiceError::InvalidStatus(_)));

    let empty = processing
        .update_batch(batch.id, UpdateBatchRequest::default())
        .await;
    assert_matches!(empty, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn processing_endpoints_are_for_processors() {
    let app = TestApp::new().await;
    let processor = app.token_for(UserRole::Processor).await;
    let farmer = app.token_for(UserRole::Farmer).await;

    let body = json!({ "supplier": "Farm A", "quantity": 1000, "quality": "Grade B" });
    let denied = app
        .request(
            Method::POST,
            "/api/v1/processing/raw-materials",
            Some(body.clone()),
            Some(&farmer),
        )
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let created = app
        .request(
            Method::POST,
            "/api/v1/processing/raw-materials",
            Some(body),
            Some(&processor),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let id = response_json(created).await["data"]["id"]
        .as_i64()
        .expect("raw material id");

    let started = app
        .request(
            Method::POST,
            &format!("/api/v1/processing/raw-materials/{id}/process"),
            Some(json!({ "product": "Cassava Starch" })),
            Some(&processor),
        )
        .await;
    assert_eq!(started.status(), StatusCode::CREATED);
    let started = response_json(started).await;
    assert_eq!(started["data"]["rawMaterial"]["status"], "In Processing");
    assert_eq!(started["data"]["batch"]["status"], "In Progress");

    let conflict = app
        .request(
            Method::POST,
            &format!("/api/v1/processing/raw-materials/{id}/process"),
            Some(json!({ "product": "Cassava Starch" })),
            Some(&processor),
        )
        .await;
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
}
