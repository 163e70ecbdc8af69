//! Order creation, item maintenance, status rules and deletion.

mod common;

use agrichain_api::{
    entities::{
        order::{self, OrderStatus},
        order_item,
        user::UserRole,
    },
    errors::ServiceError,
    services::orders::{CreateOrderRequest, OrderFilters, OrderLineRequest, UpdateOrderRequest},
};
use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

fn line(product_id: i32, quantity: i32) -> OrderLineRequest {
    OrderLineRequest {
        product_id,
        quantity,
    }
}

#[tokio::test]
async fn order_total_is_derived_from_catalog_prices() {
    let app = TestApp::new().await;
    let flour = app.seed_product("Cassava Flour", dec!(10.00), 100).await;
    let starch = app.seed_product("Cassava Starch", dec!(32.50), 100).await;

    let details = app
        .state
        .services
        .orders
        .create_order(CreateOrderRequest {
            customer: "Customer A".to_string(),
            delivery_date: None,
            items: vec![line(flour.id, 2), line(starch.id, 2)],
        })
        .await
        .expect("order created");

    assert_eq!(details.order.total_amount, dec!(85.00));
    assert_eq!(details.order.status, OrderStatus::Processing);
    assert!(details.order.order_number.starts_with("ORD-"));
    assert_eq!(details.items.len(), 2);
    assert_eq!(details.items[0].item.unit_price, dec!(10.00));
    assert_eq!(details.items[1].item.unit_price, dec!(32.50));
}

#[tokio::test]
async fn unknown_product_rolls_back_the_whole_order() {
    let app = TestApp::new().await;
    let flour = app.seed_product("Cassava Flour", dec!(5.00), 10).await;

    let result = app
        .state
        .services
        .orders
        .create_order(CreateOrderRequest {
            customer: "Customer B".to_string(),
            delivery_date: None,
            items: vec![line(flour.id, 1), line(9_999, 1)],
        })
        .await;

    assert_matches!(result, Err(ServiceError::NotFound(msg)) if msg.contains("9999"));
    let orders = app
        .state
        .services
        .orders
        .list(&OrderFilters::default())
        .await
        .unwrap();
    assert!(orders.is_empty());
    let items = order_item::Entity::find().count(&*app.state.db).await.unwrap();
    assert_eq!(items, 0);
}

#[tokio::test]
async fn empty_orders_and_non_positive_quantities_are_rejected() {
    let app = TestApp::new().await;
    let flour = app.seed_product("Cassava Flour", dec!(5.00), 10).await;
    let orders = &app.state.services.orders;

    let empty = orders
        .create_order(CreateOrderRequest {
            customer: "Customer C".to_string(),
            delivery_date: None,
            items: vec![],
        })
        .await;
    assert_matches!(empty, Err(ServiceError::ValidationError(_)));

    let zero = orders
        .create_order(CreateOrderRequest {
            customer: "Customer C".to_string(),
            delivery_date: None,
            items: vec![line(flour.id, 0)],
        })
        .await;
    assert_matches!(zero, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn adding_and_removing_items_recomputes_the_total() {
    let app = TestApp::new().await;
    let flour = app.seed_product("Cassava Flour", dec!(5.00), 10).await;
    let chips = app.seed_product("Cassava Chips", dec!(3.50), 10).await;
    let orders = &app.state.services.orders;

    let created = orders
        .create_order(CreateOrderRequest {
            customer: "Customer D".to_string(),
            delivery_date: None,
            items: vec![line(flour.id, 4)],
        })
        .await
        .unwrap();
    assert_eq!(created.order.total_amount, dec!(20.00));

    let with_chips = orders
        .add_item(created.order.id, line(chips.id, 2))
        .await
        .unwrap();
    assert_eq!(with_chips.order.total_amount, dec!(27.00));
    assert_eq!(with_chips.items.len(), 2);

    let first_item = with_chips.items[0].item.id;
    let after_remove = orders
        .remove_item(created.order.id, first_item)
        .await
        .unwrap();
    assert_eq!(after_remove.order.total_amount, dec!(7.00));
    assert_eq!(after_remove.items.len(), 1);

    let missing = orders.remove_item(created.order.id, first_item).await;
    assert_matches!(missing, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn status_only_moves_forward() {
    let app = TestApp::new().await;
    let flour = app.seed_product("Cassava Flour", dec!(5.00), 10).await;
    let orders = &app.state.services.orders;

    let created = orders
        .create_order(CreateOrderRequest {
            customer: "Customer E".to_string(),
            delivery_date: None,
            items: vec![line(flour.id, 1)],
        })
        .await
        .unwrap();
    let id = created.order.id;

    let shipped = orders
        .update(
            id,
            UpdateOrderRequest {
                status: Some(OrderStatus::Shipped),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let backwards = orders
        .update(
            id,
            UpdateOrderRequest {
                status: Some(OrderStatus::Pending),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(backwards, Err(ServiceError::InvalidStatus(_)));

    // Same status again is accepted and changes nothing.
    let same = orders
        .update(
            id,
            UpdateOrderRequest {
                status: Some(OrderStatus::Shipped),
                customer: Some("Customer E2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same.status, OrderStatus::Shipped);
    assert_eq!(same.customer, "Customer E2");
}

#[tokio::test]
async fn deleting_an_order_removes_its_items() {
    let app = TestApp::new().await;
    let flour = app.seed_product("Cassava Flour", dec!(5.00), 10).await;
    let orders = &app.state.services.orders;

    let created = orders
        .create_order(CreateOrderRequest {
            customer: "Customer F".to_string(),
            delivery_date: None,
            items: vec![line(flour.id, 1), line(flour.id, 3)],
        })
        .await
        .unwrap();

    assert!(orders.delete(created.order.id).await.unwrap());
    assert!(!orders.delete(created.order.id).await.unwrap());

    let db = &*app.state.db;
    assert!(order::Entity::find_by_id(created.order.id)
        .one(db)
        .await
        .unwrap()
        .is_none());
    let remaining = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(created.order.id))
        .count(db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn order_endpoints_respect_roles() {
    let app = TestApp::new().await;
    let flour = app.seed_product("Cassava Flour", dec!(5.00), 10).await;
    let processor = app.token_for(UserRole::Processor).await;
    let farmer = app.token_for(UserRole::Farmer).await;
    let body = json!({
        "customer": "Customer G",
        "items": [{ "productId": flour.id, "quantity": 3 }]
    });

    let forbidden = app
        .request(Method::POST, "/api/v1/orders", Some(body.clone()), Some(&farmer))
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let created = app
        .request(Method::POST, "/api/v1/orders", Some(body), Some(&processor))
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = response_json(created).await;
    let total: Decimal = created["data"]["totalAmount"]
        .as_str()
        .expect("decimal serialized as string")
        .parse()
        .unwrap();
    assert_eq!(total, dec!(15));
    assert_eq!(created["data"]["status"], "Processing");
    let id = created["data"]["id"].as_i64().expect("order id");

    // Every authenticated role can read.
    let read = app
        .request(Method::GET, &format!("/api/v1/orders/{id}/items"), None, Some(&farmer))
        .await;
    assert_eq!(read.status(), StatusCode::OK);
    let read = response_json(read).await;
    assert_eq!(read["data"].as_array().map(Vec::len), Some(1));

    let deleted = app
        .request(Method::DELETE, &format!("/api/v1/orders/{id}"), None, Some(&processor))
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .request(Method::GET, &format!("/api/v1/orders/{id}"), None, Some(&processor))
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}
