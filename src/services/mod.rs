// Identity
pub mod users;

// Catalog and stock
pub mod inventory;
pub mod products;
pub mod warehouses;

// Order and logistics workflows
pub mod orders;
pub mod shipments;

// Raw material intake and processing batches
pub mod processing;

// Reporting
pub mod analytics;

// Shared helpers
pub mod identifiers;

use crate::events::{Event, EventSender};
use std::sync::Arc;

/// Publishes a domain event when the service was built with a sender.
/// Delivery failures are logged by the sender and never fail the caller.
pub(crate) async fn publish(sender: &Option<Arc<EventSender>>, event: Event) {
    if let Some(sender) = sender {
        sender.publish(event).await;
    }
}
