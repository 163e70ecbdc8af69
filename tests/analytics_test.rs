//! Dashboard aggregations over seeded rows.

mod common;

use agrichain_api::{
    entities::{
        order::OrderStatus,
        quality_metric::{self, Grade},
        sale,
        shipment::ShipmentStatus,
        user::{UserRole, UserStatus},
    },
    services::{
        inventory::CreateInventoryRequest,
        orders::{CreateOrderRequest, OrderLineRequest},
        shipments::CreateShipmentRequest,
    },
};
use axum::http::{Method, StatusCode};
use chrono::NaiveDate;
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};

async fn record_sale(app: &TestApp, month: &str, year: i32, amount: Decimal) {
    sale::ActiveModel {
        month: Set(month.to_string()),
        year: Set(year),
        amount: Set(amount),
        product_id: Set(None),
        ..Default::default()
    }
    .insert(&*app.state.db)
    .await
    .expect("insert sale");
}

async fn record_quality(app: &TestApp, grade: Grade, percentage: f64, date: NaiveDate) {
    quality_metric::ActiveModel {
        product_id: Set(None),
        grade: Set(grade),
        percentage: Set(percentage),
        date: Set(date),
        ..Default::default()
    }
    .insert(&*app.state.db)
    .await
    .expect("insert quality metric");
}

#[tokio::test]
async fn sales_are_grouped_by_month_in_calendar_order() {
    let app = TestApp::new().await;
    record_sale(&app, "Mar", 2023, dec!(24000)).await;
    record_sale(&app, "Jan", 2023, dec!(12000)).await;
    record_sale(&app, "Jan", 2023, dec!(500)).await;
    record_sale(&app, "Feb", 2024, dec!(19000)).await;

    let sales = app.state.services.analytics.sales_by_year(2023).await.unwrap();
    let months: Vec<&str> = sales.iter().map(|s| s.month.as_str()).collect();
    assert_eq!(months, ["Jan", "Mar"]);
    assert_eq!(sales[0].amount, dec!(12500));
    assert_eq!(sales[1].amount, dec!(24000));

    let empty = app.state.services.analytics.sales_by_year(1999).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn quality_distribution_is_per_day() {
    let app = TestApp::new().await;
    let day = NaiveDate::from_ymd_opt(2023, 11, 4).unwrap();
    let other = NaiveDate::from_ymd_opt(2023, 11, 5).unwrap();
    record_quality(&app, Grade::B, 25.0, day).await;
    record_quality(&app, Grade::A, 65.0, day).await;
    record_quality(&app, Grade::C, 10.0, day).await;
    record_quality(&app, Grade::A, 90.0, other).await;

    let shares = app
        .state
        .services
        .analytics
        .quality_distribution(Some(day))
        .await
        .unwrap();
    let grades: Vec<Grade> = shares.iter().map(|s| s.grade).collect();
    assert_eq!(grades, [Grade::A, Grade::B, Grade::C]);
    assert_eq!(shares[0].percentage, 65.0);
    let total: f64 = shares.iter().map(|s| s.percentage).sum();
    assert!((total - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn status_counts_cover_every_status() {
    let app = TestApp::new().await;
    let flour = app.seed_product("Cassava Flour", dec!(5.00), 100).await;
    let shipments = &app.state.services.shipments;

    for number in ["SHP-1001", "SHP-1002", "SHP-1003"] {
        shipments
            .create(CreateShipmentRequest {
                shipment_number: Some(number.to_string()),
                origin: "Farm A".to_string(),
                destination: "Processor B".to_string(),
                quantity: 100,
                transporter: None,
                dispatch_date: None,
                delivery_date: None,
            })
            .await
            .unwrap();
    }
    let listed = shipments.list(&Default::default()).await.unwrap();
    shipments
        .update_status(listed[0].id, ShipmentStatus::Delivered)
        .await
        .unwrap();

    app.state
        .services
        .orders
        .create_order(CreateOrderRequest {
            customer: "Customer A".to_string(),
            delivery_date: None,
            items: vec![OrderLineRequest {
                product_id: flour.id,
                quantity: 2,
            }],
        })
        .await
        .unwrap();

    let analytics = &app.state.services.analytics;
    let transport = analytics.transport_status().await.unwrap();
    assert_eq!(transport.len(), 3);
    let count_of = |status: ShipmentStatus| {
        transport
            .iter()
            .find(|c| c.status == status)
            .map(|c| c.count)
            .unwrap_or(-1)
    };
    assert_eq!(count_of(ShipmentStatus::Scheduled), 2);
    assert_eq!(count_of(ShipmentStatus::InTransit), 0);
    assert_eq!(count_of(ShipmentStatus::Delivered), 1);

    let orders = analytics.order_status().await.unwrap();
    assert_eq!(orders.len(), 4);
    for entry in orders {
        let expected = if entry.status == OrderStatus::Processing { 1 } else { 0 };
        assert_eq!(entry.count, expected, "{:?}", entry.status);
    }
}

#[tokio::test]
async fn dashboard_and_warehouse_utilization() {
    let app = TestApp::new().await;
    app.seed_user(UserRole::Farmer, UserStatus::Active).await;
    let flour = app.seed_product("Cassava Flour", dec!(5.00), 100).await;
    let starch = app.seed_product("Cassava Starch", dec!(6.50), 100).await;
    let a = app.seed_warehouse("Warehouse A", 10_000, 6_500).await;
    let empty = app.seed_warehouse("Empty Shed", 0, 0).await;

    let inventory = &app.state.services.inventory;
    for (product_id, quantity, date) in [
        (flour.id, 2_500, NaiveDate::from_ymd_opt(2023, 10, 3)),
        (starch.id, 1_800, NaiveDate::from_ymd_opt(2023, 11, 20)),
        (flour.id, 200, NaiveDate::from_ymd_opt(2023, 11, 21)),
    ] {
        inventory
            .create(CreateInventoryRequest {
                product_id,
                warehouse_id: a.id,
                quantity,
                date,
            })
            .await
            .unwrap();
    }

    let analytics = &app.state.services.analytics;
    let summary = analytics.dashboard_summary().await.unwrap();
    assert_eq!(summary.total_users, 1);
    assert_eq!(summary.total_products, 2);
    assert_eq!(summary.total_orders, 0);
    assert_eq!(summary.total_inventory_units, 4_500);
    assert_eq!(summary.active_batches, 0);

    let levels = analytics.inventory_levels().await.unwrap();
    let months: Vec<(&str, i64)> = levels.iter().map(|l| (l.month.as_str(), l.quantity)).collect();
    assert_eq!(months, [("2023-10", 2_500), ("2023-11", 2_000)]);

    let utilization = analytics.warehouse_utilization().await.unwrap();
    assert_eq!(utilization.len(), 2);
    assert_eq!(utilization[0].warehouse_id, a.id);
    assert_eq!(utilization[0].inventory_quantity, 4_500);
    assert_eq!(utilization[0].drift, 4_500 - 6_500);
    assert!((utilization[0].utilization_percent - 65.0).abs() < 1e-9);
    assert_eq!(utilization[1].warehouse_id, empty.id);
    assert_eq!(utilization[1].utilization_percent, 0.0);
}

#[tokio::test]
async fn analytics_endpoints_are_open_to_every_role() {
    let app = TestApp::new().await;
    record_sale(&app, "Jun", 2023, dec!(32000)).await;
    let transporter = app.token_for(UserRole::Transporter).await;

    let sales = app
        .request(
            Method::GET,
            "/api/v1/analytics/sales?year=2023",
            None,
            Some(&transporter),
        )
        .await;
    assert_eq!(sales.status(), StatusCode::OK);
    let body = response_json(sales).await;
    assert_eq!(body["data"][0]["month"], "Jun");

    let bad_year = app
        .request(
            Method::GET,
            "/api/v1/analytics/sales?year=12",
            None,
            Some(&transporter),
        )
        .await;
    assert_eq!(bad_year.status(), StatusCode::BAD_REQUEST);

    for path in [
        "/api/v1/analytics/dashboard",
        "/api/v1/analytics/quality",
        "/api/v1/analytics/inventory",
        "/api/v1/analytics/transport",
        "/api/v1/analytics/orders",
        "/api/v1/analytics/warehouses",
    ] {
        let response = app.request(Method::GET, path, None, Some(&transporter)).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }

    let anonymous = app
        .request(Method::GET, "/api/v1/analytics/dashboard", None, None)
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}
