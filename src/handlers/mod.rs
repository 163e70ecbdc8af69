pub mod analytics;
pub mod auth;
pub mod common;
pub mod inventory;
pub mod orders;
pub mod processing;
pub mod products;
pub mod shipments;
pub mod users;
pub mod warehouses;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    analytics::AnalyticsService, inventory::InventoryService, orders::OrderService,
    processing::ProcessingService, products::ProductService, shipments::ShipmentService,
    users::UserService, warehouses::WarehouseService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub products: Arc<ProductService>,
    pub warehouses: Arc<WarehouseService>,
    pub inventory: Arc<InventoryService>,
    pub orders: Arc<OrderService>,
    pub shipments: Arc<ShipmentService>,
    pub processing: Arc<ProcessingService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let events = Some(event_sender);

        Self {
            users: Arc::new(UserService::new(db_pool.clone(), events.clone())),
            products: Arc::new(ProductService::new(db_pool.clone(), events.clone())),
            warehouses: Arc::new(WarehouseService::new(db_pool.clone(), events.clone())),
            inventory: Arc::new(InventoryService::new(db_pool.clone(), events.clone())),
            orders: Arc::new(OrderService::new(db_pool.clone(), events.clone())),
            shipments: Arc::new(ShipmentService::new(db_pool.clone(), events.clone())),
            processing: Arc::new(ProcessingService::new(db_pool.clone(), events)),
            analytics: Arc::new(AnalyticsService::new(db_pool)),
        }
    }
}
