use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Stock level at or below which inventory events raise a warning
pub const LOW_STOCK_THRESHOLD: i32 = 100;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event and only logs when the processor is gone. Domain writes
    /// have already committed by the time events are emitted.
    pub async fn publish(&self, event: Event) {
        let kind = event.kind();
        if let Err(e) = self.send(event).await {
            warn!(event = kind, error = %e, "Failed to publish event");
            counter!("agrichain_events.dropped", 1, "event" => kind);
        }
    }
}

/// Domain events emitted after a successful write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Users
    UserRegistered(i32),
    UserUpdated(i32),
    UserDeleted(i32),

    // Catalog
    ProductCreated(i32),
    ProductUpdated(i32),
    ProductDeleted(i32),
    WarehouseCreated(i32),
    WarehouseUpdated(i32),
    WarehouseDeleted(i32),

    // Inventory
    InventoryRecorded {
        inventory_id: i32,
        product_id: i32,
        warehouse_id: i32,
        quantity: i32,
    },
    InventoryAdjusted {
        inventory_id: i32,
        product_id: i32,
        old_quantity: i32,
        new_quantity: i32,
    },
    InventoryDeleted(i32),

    // Orders
    OrderCreated {
        order_id: i32,
        order_number: String,
        total_amount: Decimal,
    },
    OrderUpdated(i32),
    OrderStatusChanged {
        order_id: i32,
        old_status: String,
        new_status: String,
    },
    OrderDeleted(i32),

    // Shipments
    ShipmentCreated {
        shipment_id: i32,
        shipment_number: String,
    },
    ShipmentStatusChanged {
        shipment_id: i32,
        old_status: String,
        new_status: String,
    },
    ShipmentDeleted(i32),

    // Processing
    RawMaterialReceived {
        raw_material_id: i32,
        batch_code: String,
    },
    BatchStarted {
        batch_id: i32,
        raw_material_id: i32,
        quantity: i32,
    },
    BatchCompleted {
        batch_id: i32,
        product: String,
        quantity: i32,
        new_stock: Option<i32>,
    },
    BatchCanceled(i32),
}

impl Event {
    /// Stable label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::UserRegistered(_) => "user_registered",
            Event::UserUpdated(_) => "user_updated",
            Event::UserDeleted(_) => "user_deleted",
            Event::ProductCreated(_) => "product_created",
            Event::ProductUpdated(_) => "product_updated",
            Event::ProductDeleted(_) => "product_deleted",
            Event::WarehouseCreated(_) => "warehouse_created",
            Event::WarehouseUpdated(_) => "warehouse_updated",
            Event::WarehouseDeleted(_) => "warehouse_deleted",
            Event::InventoryRecorded { .. } => "inventory_recorded",
            Event::InventoryAdjusted { .. } => "inventory_adjusted",
            Event::InventoryDeleted(_) => "inventory_deleted",
            Event::OrderCreated { .. } => "order_created",
            Event::OrderUpdated(_) => "order_updated",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::OrderDeleted(_) => "order_deleted",
            Event::ShipmentCreated { .. } => "shipment_created",
            Event::ShipmentStatusChanged { .. } => "shipment_status_changed",
            Event::ShipmentDeleted(_) => "shipment_deleted",
            Event::RawMaterialReceived { .. } => "raw_material_received",
            Event::BatchStarted { .. } => "batch_started",
            Event::BatchCompleted { .. } => "batch_completed",
            Event::BatchCanceled(_) => "batch_canceled",
        }
    }
}

// Drains the channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("agrichain_events.processed", 1, "event" => event.kind());
        debug!("Received event: {:?}", event);

        match event {
            Event::OrderCreated {
                order_id,
                order_number,
                total_amount,
            } => {
                info!(order_id, %order_number, %total_amount, "Order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id, %old_status, %new_status, "Order status changed");
            }
            Event::InventoryAdjusted {
                inventory_id,
                product_id,
                old_quantity,
                new_quantity,
            } => {
                info!(
                    inventory_id,
                    product_id, old_quantity, new_quantity, "Inventory adjusted"
                );
                if new_quantity <= LOW_STOCK_THRESHOLD {
                    warn!(
                        "Low inventory alert: product {} has only {} units in entry {}",
                        product_id, new_quantity, inventory_id
                    );
                }
            }
            Event::ShipmentStatusChanged {
                shipment_id,
                old_status,
                new_status,
            } => {
                info!(shipment_id, %old_status, %new_status, "Shipment status changed");
            }
            Event::BatchCompleted {
                batch_id,
                product,
                quantity,
                new_stock,
            } => match new_stock {
                Some(stock) => info!(
                    batch_id,
                    %product, quantity, stock, "Batch completed and stock credited"
                ),
                None => warn!(
                    batch_id,
                    %product, quantity, "Batch completed without a matching product"
                ),
            },
            other => {
                debug!("No specific handler for event: {}", other.kind());
            }
        }
    }

    warn!("Event processing loop has ended");
}
