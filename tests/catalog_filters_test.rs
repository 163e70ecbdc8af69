//! List search and filters, capacity rules and referenced-row deletes.

mod common;

use agrichain_api::{
    entities::{order::OrderStatus, user::UserRole},
    errors::ServiceError,
    services::{
        inventory::CreateInventoryRequest,
        orders::{CreateOrderRequest, OrderFilters, OrderLineRequest, UpdateOrderRequest},
        products::{CreateProductRequest, ProductFilters},
        shipments::{CreateShipmentRequest, ShipmentFilters},
        warehouses::{UpdateWarehouseRequest, WarehouseFilters},
    },
};
use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use chrono::NaiveDate;
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

async fn catalog(app: &TestApp) {
    for (name, category) in [
        ("Cassava Flour", "Flour"),
        ("Starch 50%", "Starch"),
        ("Chips", "Snack"),
        ("Tapioca Pearls", "Snack"),
    ] {
        app.state
            .services
            .products
            .create(CreateProductRequest {
                name: name.to_string(),
                description: None,
                category: Some(category.to_string()),
                price: dec!(4.00),
                stock: 10,
            })
            .await
            .expect("product created");
    }
}

fn names<T>(rows: &[T], name: impl Fn(&T) -> &str) -> Vec<String> {
    rows.iter().map(|r| name(r).to_string()).collect()
}

#[tokio::test]
async fn product_search_is_case_insensitive_and_literal() {
    let app = TestApp::new().await;
    catalog(&app).await;
    let products = &app.state.services.products;

    let search = |s: &str, category: Option<&str>| ProductFilters {
        search: Some(s.to_string()),
        category: category.map(str::to_string),
    };

    let flour = products.list(&search("FLOUR", None)).await.unwrap();
    assert_eq!(names(&flour, |p| p.name.as_str()), ["Cassava Flour"]);

    let percent = products.list(&search("%", None)).await.unwrap();
    assert_eq!(names(&percent, |p| p.name.as_str()), ["Starch 50%"]);

    // "a" hits every row through name or category; the category narrows it.
    let snacks = products.list(&search("a", Some("Snack"))).await.unwrap();
    assert_eq!(names(&snacks, |p| p.name.as_str()), ["Chips", "Tapioca Pearls"]);
    let chips = products.list(&search("chi", Some("Snack"))).await.unwrap();
    assert_eq!(names(&chips, |p| p.name.as_str()), ["Chips"]);

    let none = products.list(&search("flour", Some("Snack"))).await.unwrap();
    assert!(none.is_empty());

    let token = app.token_for(UserRole::Farmer).await;
    let listed = response_json(
        app.request(
            Method::GET,
            "/api/v1/products?search=tapioca&category=Snack",
            None,
            Some(&token),
        )
        .await,
    )
    .await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(listed["data"][0]["name"], "Tapioca Pearls");
}

#[tokio::test]
async fn warehouse_search_matches_name_or_location() {
    let app = TestApp::new().await;
    app.seed_warehouse("Warehouse A", 10_000, 0).await;
    app.seed_warehouse("Cold Store", 2_000, 0).await;
    let warehouses = &app.state.services.warehouses;

    let by_name = warehouses
        .list(&WarehouseFilters {
            search: Some("cold".into()),
        })
        .await
        .unwrap();
    assert_eq!(names(&by_name, |w| w.name.as_str()), ["Cold Store"]);

    // seed_warehouse puts the location at "<name> yard"
    let by_location = warehouses
        .list(&WarehouseFilters {
            search: Some("YARD".into()),
        })
        .await
        .unwrap();
    assert_eq!(by_location.len(), 2);
}

#[tokio::test]
async fn order_search_combines_with_status() {
    let app = TestApp::new().await;
    let flour = app.seed_product("Cassava Flour", dec!(5.00), 100).await;
    let orders = &app.state.services.orders;

    let mut ids = Vec::new();
    for customer in ["Farm Shop Ltd", "Village Shop", "Bakery Co"] {
        let details = orders
            .create_order(CreateOrderRequest {
                customer: customer.to_string(),
                delivery_date: None,
                items: vec![OrderLineRequest {
                    product_id: flour.id,
                    quantity: 1,
                }],
            })
            .await
            .expect("order created");
        ids.push(details.order.id);
    }
    orders
        .update(
            ids[1],
            UpdateOrderRequest {
                status: Some(OrderStatus::Shipped),
                ..Default::default()
            },
        )
        .await
        .expect("shipped");

    let shops = orders
        .list(&OrderFilters {
            search: Some("shop".into()),
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(shops.len(), 2);

    let shipped_shops = orders
        .list(&OrderFilters {
            search: Some("SHOP".into()),
            status: Some(OrderStatus::Shipped),
        })
        .await
        .unwrap();
    assert_eq!(names(&shipped_shops, |o| o.customer.as_str()), ["Village Shop"]);

    let shipped_bakery = orders
        .list(&OrderFilters {
            search: Some("bakery".into()),
            status: Some(OrderStatus::Shipped),
        })
        .await
        .unwrap();
    assert!(shipped_bakery.is_empty());

    let number = shipped_shops[0].order_number.to_lowercase();
    let by_number = orders
        .list(&OrderFilters {
            search: Some(number),
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(by_number.len(), 1);
    assert_eq!(by_number[0].id, ids[1]);
}

#[tokio::test]
async fn shipment_search_covers_number_and_places() {
    let app = TestApp::new().await;
    let shipments = &app.state.services.shipments;

    for (number, from, to) in [
        ("SHP-1001", "Farm A", "Processor B"),
        ("SHP-1002", "Processor B", "Warehouse C"),
        ("SHP-2001", "Farm D", "Market E"),
    ] {
        shipments
            .create(CreateShipmentRequest {
                shipment_number: Some(number.to_string()),
                origin: from.to_string(),
                destination: to.to_string(),
                quantity: 100,
                transporter: None,
                dispatch_date: NaiveDate::from_ymd_opt(2023, 11, 5),
                delivery_date: None,
            })
            .await
            .expect("shipment created");
    }

    let search = |s: &str| ShipmentFilters {
        search: Some(s.to_string()),
        ..Default::default()
    };

    let processor = shipments.list(&search("processor")).await.unwrap();
    assert_eq!(processor.len(), 2);

    let numbered = shipments.list(&search("shp-1")).await.unwrap();
    let mut numbers = names(&numbered, |s| s.shipment_number.as_str());
    numbers.sort();
    assert_eq!(numbers, ["SHP-1001", "SHP-1002"]);

    let market = shipments.list(&search("MARKET")).await.unwrap();
    assert_eq!(names(&market, |s| s.shipment_number.as_str()), ["SHP-2001"]);
}

#[tokio::test]
async fn warehouse_used_cannot_exceed_capacity() {
    let app = TestApp::new().await;
    let warehouse = app.seed_warehouse("Warehouse B", 1_000, 800).await;
    let warehouses = &app.state.services.warehouses;

    let over = warehouses
        .update(
            warehouse.id,
            UpdateWarehouseRequest {
                used: Some(1_001),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(over, Err(ServiceError::ValidationError(_)));

    let shrunk = warehouses
        .update(
            warehouse.id,
            UpdateWarehouseRequest {
                capacity: Some(500),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(shrunk, Err(ServiceError::ValidationError(_)));

    let admin = app.token_for(UserRole::Admin).await;
    let created = app
        .request(
            Method::POST,
            "/api/v1/warehouses",
            Some(json!({
                "name": "Overfull",
                "location": "South",
                "capacity": 100,
                "used": 101
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(created.status(), StatusCode::BAD_REQUEST);

    let unchanged = warehouses.get_by_id(warehouse.id).await.unwrap().unwrap();
    assert_eq!((unchanged.capacity, unchanged.used), (1_000, 800));
}

#[tokio::test]
async fn referenced_product_and_warehouse_cannot_be_deleted() {
    let app = TestApp::new().await;
    let flour = app.seed_product("Cassava Flour", dec!(5.00), 100).await;
    let warehouse = app.seed_warehouse("Warehouse A", 10_000, 0).await;
    app.state
        .services
        .inventory
        .create(CreateInventoryRequest {
            product_id: flour.id,
            warehouse_id: warehouse.id,
            quantity: 50,
            date: None,
        })
        .await
        .expect("inventory created");

    let admin = app.token_for(UserRole::Admin).await;
    for uri in [
        format!("/api/v1/products/{}", flour.id),
        format!("/api/v1/warehouses/{}", warehouse.id),
    ] {
        let response = app.request(Method::DELETE, &uri, None, Some(&admin)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let message = response_json(response).await["message"]
            .as_str()
            .unwrap_or_default()
            .to_lowercase();
        assert!(message.contains("still referenced"));
        assert!(!message.contains("inventory"));
        assert!(!message.contains("foreign key"));
    }

    assert!(app
        .state
        .services
        .products
        .get_by_id(flour.id)
        .await
        .unwrap()
        .is_some());

    let unreferenced = app.seed_product("Gari", dec!(2.00), 5).await;
    let removed = app
        .request(
            Method::DELETE,
            &format!("/api/v1/products/{}", unreferenced.id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);
}
