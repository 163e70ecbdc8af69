#![allow(dead_code)]

use std::sync::Arc;

use agrichain_api::{
    build_router,
    config::AppConfig,
    db,
    entities::{
        product,
        user::{self, UserRole, UserStatus},
        warehouse,
    },
    events::{self, EventSender},
    services::{products::CreateProductRequest, warehouses::CreateWarehouseRequest},
    AppState,
};
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration_test_secret_with_enough_entropy_0123456789";

/// Application state and router over a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection keeps the in-memory database alive for the whole test.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = build_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Inserts a user directly. The password hash is a placeholder, so these
    /// accounts can only authenticate through [`Self::token_for`].
    pub async fn seed_user(&self, role: UserRole, status: UserStatus) -> user::Model {
        user::ActiveModel {
            name: Set(format!("{role} Tester")),
            email: Set(format!("{}@agrichain.test", Uuid::new_v4().simple())),
            password_hash: Set("not-a-real-hash".to_string()),
            role: Set(role),
            status: Set(status),
            last_active: Set(None),
            date_joined: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed user")
    }

    /// A fresh active user of `role` and a signed session token for them.
    pub async fn token_for(&self, role: UserRole) -> String {
        let user = self.seed_user(role, UserStatus::Active).await;
        self.state
            .auth
            .issue_token(&user)
            .expect("issue test token")
            .token
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> product::Model {
        self.state
            .services
            .products
            .create(CreateProductRequest {
                name: name.to_string(),
                description: Some(format!("{name} for tests")),
                category: Some("Flour".to_string()),
                price,
                stock,
            })
            .await
            .expect("seed product")
    }

    pub async fn seed_warehouse(&self, name: &str, capacity: i32, used: i32) -> warehouse::Model {
        self.state
            .services
            .warehouses
            .create(CreateWarehouseRequest {
                name: name.to_string(),
                location: format!("{name} yard"),
                capacity,
                used,
            })
            .await
            .expect("seed warehouse")
    }

    /// Sends one request through the full middleware stack.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        self.request_with_headers(method, uri, body, token, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {tok}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
